//! Error types for the [`scan`](super) module.
//!
//! Per-blob failures ([`Fetch`](ErrorKind::Fetch), [`Decode`](ErrorKind::Decode))
//! and entries the listing could not describe ([`Entry`](ErrorKind::Entry)) are
//! reported and skipped; [`Listing`](ErrorKind::Listing) ends the scan.

use derive_more::{Display, Error};

/// A scan error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The blob could not be read from the container.
    #[display("could not fetch blob {_0}")]
    Fetch(#[error(not(source))] String),
    /// The blob was read but is not UTF-8 text.
    #[display("blob {_0} is not valid UTF-8 text")]
    Decode(#[error(not(source))] String),
    /// One entry of the container listing was unusable; the rest still get scanned.
    #[display("skipped an unlistable entry in container {_0}")]
    Entry(#[error(not(source))] String),
    /// The container could not be listed.
    #[display("could not list container {_0}")]
    Listing(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Entry(_) | Self::Listing(_))
    }

    /// Returns `true` if the scan cannot go on after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Listing(_))
    }

    /// The blob that failed, for per-blob errors.
    pub fn blob(&self) -> Option<&str> {
        match self {
            Self::Fetch(blob) | Self::Decode(blob) => Some(blob),
            Self::Entry(_) | Self::Listing(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_classification() {
        let fetch = ErrorKind::Fetch("a.txt".to_string());
        assert!(!fetch.is_fatal());
        assert_eq!(fetch.blob(), Some("a.txt"));
        let decode = ErrorKind::Decode("b.bin".to_string());
        assert!(!decode.is_retryable());
        assert_eq!(decode.to_string(), "blob b.bin is not valid UTF-8 text");
        let listing = ErrorKind::Listing("logs".to_string());
        assert!(listing.is_fatal());
        assert_eq!(listing.blob(), None);
        let entry = ErrorKind::Entry("logs".to_string());
        assert!(!entry.is_fatal());
        assert_eq!(entry.blob(), None);
    }
}
