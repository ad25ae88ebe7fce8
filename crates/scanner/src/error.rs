//! Scanner Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::format::ContentFormat;
use derive_more::{Display, Error};

/// A scanner error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a scanner failure.
///
/// ### Recoverable
/// - [`ErrorKind::Format`]: content could not be parsed; treated as having
///   nothing to search.
/// - [`ErrorKind::Record`]: one match could not be saved; the scan goes on.
///
/// ### Fatal
/// - [`ErrorKind::Scan`]: wraps the scan orchestrator's own errors. Whether it
///   ends the scan depends on the inner [`scan::error::ErrorKind`](crate::scan::error::ErrorKind).
/// - [`ErrorKind::Export`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("malformed {_0} content")]
    Format(#[error(not(source))] ContentFormat),
    #[display("could not save match from {blob} under row key {row_key}")]
    Record { blob: String, row_key: String },
    #[display("could not export records")]
    Export,
    #[display("scan failed")]
    Scan,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Records are never retried with the same row key; a new attempt
        // needs a fresh key, so the failure itself is final.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Format(ContentFormat::Json).to_string(), "malformed JSON content");
        let record = ErrorKind::Record {
            blob: "a.txt".to_string(),
            row_key: "a.txt_1.000000001".to_string(),
        };
        assert_eq!(record.to_string(), "could not save match from a.txt under row key a.txt_1.000000001");
    }
}
