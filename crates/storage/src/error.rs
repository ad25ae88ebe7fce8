//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Container does not exist
    #[display("container not found: {_0}")]
    ContainerNotFound(#[error(not(source))] String),
    /// Blob does not exist
    #[display("blob not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (S3 connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Container name breaks the provider naming rules
    #[display("invalid container name: {_0}")]
    InvalidContainer(#[error(not(source))] String),
    /// Blob name contains invalid characters or escapes its container
    #[display("invalid blob name: {_0}")]
    InvalidBlob(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("logs/a.txt".to_string()).to_string(), "blob not found: logs/a.txt");
        assert_eq!(
            ErrorKind::ContainerNotFound("reports".to_string()).to_string(),
            "container not found: reports"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network("connection reset".to_string()).is_retryable());
        assert!(!ErrorKind::NotFound("a.txt".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidContainer("A".to_string()).is_retryable());
    }
}
