//! Walking a container and recording every match.

pub mod error;
mod blob;
mod stream;
mod summary;

pub use self::blob::{BlobScan, FoundMatch, scan_blob};
pub use self::stream::{ScanEvent, scan};
pub use self::summary::{FailedBlob, ScanSummary, SummaryMatch, scan_container};

/// What to scan for, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub container: String,
    pub query: String,
    pub ignore_case: bool,
    /// Blobs in flight at once; `0` is treated as `1`.
    pub concurrency: usize,
}

impl ScanRequest {
    /// A case-sensitive, sequential scan.
    pub fn new(container: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            query: query.into(),
            ignore_case: false,
            concurrency: 1,
        }
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}
