use crate::matcher::Matcher;
use crate::record::Recorder;
use crate::scan::ScanRequest;
use crate::scan::blob::{BlobScan, scan_blob};
use crate::scan::error::{ErrorKind, Result};
use async_stream::stream;
use findit_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};
use findit_storage::{BackendHandle, BlobInfo};
use futures::{Stream, StreamExt};

/// Progress events emitted by [`scan`] as it works through a container.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`DiscoveryComplete`](Self::DiscoveryComplete): exactly once, with the
///    number of blobs listed.
/// 3. [`Scanned`](Self::Scanned): zero or more times, one per blob that could
///    be read, in listing order.
/// 4. [`Complete`](Self::Complete): exactly once, signalling the stream is
///    finished.
///
/// Listing entries that could not be turned into a blob come out as
/// [`Entry`](ErrorKind::Entry) errors right after discovery. A blob that
/// cannot be fetched or decoded shows up as an `Err` item in its place. In
/// both cases the stream carries on. Failing to list the container at all
/// ends the stream with an `Err`, in which case [`Complete`](Self::Complete)
/// is never emitted.
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    DiscoveryComplete(u64),
    Scanned(BlobScan),
    Complete,
}

#[derive(Default)]
struct Discovery {
    blobs: Vec<BlobInfo>,
    skipped: Vec<StorageError>,
}

/// Whether a listing error means the container itself cannot be listed.
///
/// `only_item` is set when the error was the one thing the listing produced,
/// such as a first page that failed to load.
fn is_container_failure(kind: &StorageErrorKind, only_item: bool) -> bool {
    match kind {
        StorageErrorKind::ContainerNotFound(_) | StorageErrorKind::InvalidContainer(_) => true,
        StorageErrorKind::InvalidBlob(_) => false,
        _ => only_item,
    }
}

async fn discover(backend: &BackendHandle, container: &str) -> Result<Discovery> {
    let entries: Vec<_> = backend.list_stream(container).collect().await;
    let only_item = entries.len() == 1;
    let mut discovery = Discovery::default();
    for entry in entries {
        match entry {
            Ok(info) => discovery.blobs.push(info),
            Err(e) if is_container_failure(&e, only_item) => {
                return Err(e.raise(ErrorKind::Listing(container.to_string())));
            },
            Err(e) => discovery.skipped.push(e),
        }
    }
    Ok(discovery)
}

/// Streams [`ScanEvent`]s for every blob in the requested container.
///
/// The container is listed up front, then blobs are scanned up to
/// `request.concurrency` at a time. Results come out in listing order no
/// matter which blob finishes first.
pub fn scan<'a>(
    backend: &'a BackendHandle,
    recorder: &'a Recorder,
    request: &'a ScanRequest,
) -> impl Stream<Item = Result<ScanEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(ScanEvent::Started);
        tracing::info!(
            backend = backend.name(),
            container = %request.container,
            query = %request.query,
            ignore_case = request.ignore_case,
            "Scanning container"
        );

        let Discovery { blobs, skipped } = match discover(backend, &request.container).await {
            Ok(discovery) => discovery,
            Err(e) => {
                tracing::error!(container = %request.container, error = ?e, "Could not list container");
                yield Err(e);
                return;
            },
        };
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(ScanEvent::DiscoveryComplete(u64::try_from(blobs.len()).unwrap_or(u64::MAX)));
        for e in skipped {
            tracing::warn!(container = %request.container, error = ?e, "Skipping unlistable entry");
            yield Err(e.raise(ErrorKind::Entry(request.container.clone())));
        }

        let matcher = Matcher::new(&request.query, request.ignore_case);
        let scans = futures::stream::iter(blobs)
            .map(|info| scan_blob(backend, recorder, &request.container, &matcher, &request.query, info.name))
            .buffered(request.concurrency.max(1));
        let mut scans = std::pin::pin!(scans);
        while let Some(result) = scans.next().await {
            yield result.map(ScanEvent::Scanned);
        }

        yield Ok(ScanEvent::Complete);
    })
}
