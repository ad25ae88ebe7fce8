use crate::error::{ErrorKind as ScannerErrorKind, Result as ScannerResult};
use crate::record::Recorder;
use crate::scan::ScanRequest;
use crate::scan::blob::BlobScan;
use crate::scan::error::Result;
use crate::scan::stream::{ScanEvent, scan};
use exn::ResultExt;
use findit_storage::BackendHandle;
use futures::StreamExt;

/// A match as it appears in the end-of-run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryMatch {
    pub blob: String,
    pub text: String,
    pub saved: bool,
}

/// A blob that was listed but could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBlob {
    pub blob: String,
    pub reason: String,
}

/// Everything a finished scan found.
///
/// Matches are listed whether or not their record was saved, blobs in listing
/// order and matches in content order within each blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub container: String,
    pub query: String,
    pub ignore_case: bool,
    pub matches: Vec<SummaryMatch>,
    pub blobs_scanned: u64,
    pub failed_blobs: Vec<FailedBlob>,
    /// Listing entries that could not be scanned at all.
    pub skipped_entries: u64,
    /// Matches whose record could not be saved.
    pub unsaved: u64,
}

impl ScanSummary {
    pub fn new(request: &ScanRequest) -> Self {
        Self {
            container: request.container.clone(),
            query: request.query.clone(),
            ignore_case: request.ignore_case,
            matches: Vec::new(),
            blobs_scanned: 0,
            failed_blobs: Vec::new(),
            skipped_entries: 0,
            unsaved: 0,
        }
    }

    /// Fold one item of the [`scan`] stream into the summary.
    ///
    /// Per-blob failures are counted; a fatal error is left for the caller.
    pub fn observe(&mut self, item: &Result<ScanEvent>) {
        match item {
            Ok(ScanEvent::Scanned(scan)) => self.add_scan(scan),
            Err(e) => match e.blob() {
                Some(blob) => self.failed_blobs.push(FailedBlob {
                    blob: blob.to_string(),
                    reason: (**e).to_string(),
                }),
                None if !e.is_fatal() => self.skipped_entries += 1,
                None => {},
            },
            Ok(_) => {},
        }
    }

    fn add_scan(&mut self, scan: &BlobScan) {
        self.blobs_scanned += 1;
        for found in &scan.matches {
            if !found.saved {
                self.unsaved += 1;
            }
            self.matches.push(SummaryMatch {
                blob: scan.blob.clone(),
                text: found.text.clone(),
                saved: found.saved,
            });
        }
    }

    /// `true` when some blob or listing entry could not be scanned, or some
    /// match was not saved.
    pub fn is_partial(&self) -> bool {
        !self.failed_blobs.is_empty() || self.skipped_entries > 0 || self.unsaved > 0
    }
}

/// Scan a whole container and return the summary.
///
/// Only a failure to list the container is an error.
pub async fn scan_container(
    backend: &BackendHandle,
    recorder: &Recorder,
    request: &ScanRequest,
) -> ScannerResult<ScanSummary> {
    let mut summary = ScanSummary::new(request);
    let mut events = std::pin::pin!(scan(backend, recorder, request));
    while let Some(item) = events.next().await {
        summary.observe(&item);
        if let Err(e) = item
            && e.is_fatal()
        {
            return Err(e).or_raise(|| ScannerErrorKind::Scan);
        }
    }
    tracing::info!(
        container = %summary.container,
        blobs = summary.blobs_scanned,
        failed = summary.failed_blobs.len(),
        skipped = summary.skipped_entries,
        matches = summary.matches.len(),
        unsaved = summary.unsaved,
        "Scan complete"
    );
    Ok(summary)
}
