//! Record Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A record store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Table name breaks the naming rules.
    #[display("invalid table name: {_0}")]
    InvalidTable(#[error(not(source))] String),
    /// Table was never created.
    #[display("table not found: {_0}")]
    TableNotFound(#[error(not(source))] String),
    /// A record with the same partition and row key already exists.
    #[display("record already exists: {_0}")]
    Conflict(#[error(not(source))] String),
    /// Serialization/deserialization error.
    #[display("invalid record data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A locked or unreachable database may recover; everything else is
        // about the data itself.
        matches!(self, Self::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::TableNotFound("Results".to_string()).to_string(), "table not found: Results");
        assert_eq!(ErrorKind::Conflict("a.txt_1.000000001".to_string()).to_string(), "record already exists: a.txt_1.000000001");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Database.is_retryable());
        assert!(!ErrorKind::Conflict("key".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidData("scan time").is_retryable());
    }
}
