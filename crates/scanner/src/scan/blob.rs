use crate::format::ContentFormat;
use crate::matcher::Matcher;
use crate::normalize::normalize;
use crate::record::Recorder;
use crate::scan::error::{ErrorKind, Result};
use exn::ResultExt;
use findit_storage::BackendHandle;

/// One match found in a blob, and whether its record made it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundMatch {
    pub text: String,
    pub saved: bool,
}

/// Outcome of scanning one blob that could be fetched and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobScan {
    pub blob: String,
    pub format: ContentFormat,
    /// Searchable strings the content was normalized into.
    pub candidates: usize,
    /// Matches in content order.
    pub matches: Vec<FoundMatch>,
}

impl BlobScan {
    pub fn unsaved(&self) -> usize {
        self.matches.iter().filter(|m| !m.saved).count()
    }
}

/// Fetch, decode, normalize and match one blob, recording every match.
///
/// Fails only when the blob cannot be fetched or is not UTF-8. Content that
/// cannot be parsed has nothing to search, and a match whose record cannot be
/// saved is still reported, marked as not saved.
pub async fn scan_blob(
    backend: &BackendHandle,
    recorder: &Recorder,
    container: &str,
    matcher: &Matcher,
    query: &str,
    blob: String,
) -> Result<BlobScan> {
    let bytes = backend
        .read(container, &blob)
        .await
        .inspect_err(|e| tracing::warn!(container, blob = %blob, error = ?e, "Could not read blob; skipping"))
        .or_raise(|| ErrorKind::Fetch(blob.clone()))?;
    let content = String::from_utf8(bytes)
        .inspect_err(|_| tracing::warn!(container, blob = %blob, "Blob is not UTF-8 text; skipping"))
        .or_raise(|| ErrorKind::Decode(blob.clone()))?;

    let format = ContentFormat::from_blob_name(&blob);
    let candidates = normalize(&content, format);
    let candidate_count = candidates.len();
    let mut matches = Vec::new();
    for found in matcher.filter(candidates) {
        let saved = recorder.record(&blob, query, &found).await.is_ok();
        matches.push(FoundMatch {
            text: found.into_inner(),
            saved,
        });
    }

    if matches.is_empty() {
        tracing::info!(container, blob = %blob, %format, candidates = candidate_count, "No matches in blob");
    } else {
        tracing::info!(container, blob = %blob, %format, matches = matches.len(), "Found matches in blob");
    }
    Ok(BlobScan {
        blob,
        format,
        candidates: candidate_count,
        matches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use findit_records::{MockStore, RecordStore};
    use findit_storage::backend::MockBackend;
    use std::sync::Arc;

    async fn setup(backend: MockBackend, store: MockStore) -> (BackendHandle, Arc<MockStore>, Recorder) {
        store.create_table("Results").await.unwrap();
        let store = Arc::new(store);
        let recorder = Recorder::new(store.clone(), "Results");
        let backend: BackendHandle = Arc::new(backend);
        (backend, store, recorder)
    }

    #[tokio::test]
    async fn test_scan_plain_text_blob() {
        let backend = MockBackend::with_blobs("logs", [("app.log", "hello world\nbye\nsay hello")]);
        let (backend, store, recorder) = setup(backend, MockStore::default()).await;
        let matcher = Matcher::new("hello", false);
        let scan = scan_blob(&backend, &recorder, "logs", &matcher, "hello", "app.log".to_string()).await.unwrap();
        assert_eq!(scan.format, ContentFormat::PlainText);
        assert_eq!(scan.candidates, 3);
        let texts: Vec<_> = scan.matches.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hello world", "say hello"]);
        assert_eq!(scan.unsaved(), 0);
        assert_eq!(store.records("Results").await.len(), 2);
    }

    #[tokio::test]
    async fn test_unsaved_matches_are_still_reported() {
        let backend = MockBackend::with_blobs("logs", [("app.log", "hello one\nhello two\nhello three")]);
        let store = MockStore::default().fail_inserts_when(|r| r.match_text == "hello two");
        let (backend, store, recorder) = setup(backend, store).await;
        let matcher = Matcher::new("hello", false);
        let scan = scan_blob(&backend, &recorder, "logs", &matcher, "hello", "app.log".to_string()).await.unwrap();
        let saved: Vec<_> = scan.matches.iter().map(|m| m.saved).collect();
        assert_eq!(saved, vec![true, false, true]);
        assert_eq!(scan.unsaved(), 1);
        assert_eq!(store.list("Results").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_blob() {
        let backend = MockBackend::with_blobs("logs", [("secret.txt", "hello")]).with_unreadable("secret.txt");
        let (backend, store, recorder) = setup(backend, MockStore::default()).await;
        let matcher = Matcher::new("hello", false);
        let err = scan_blob(&backend, &recorder, "logs", &matcher, "hello", "secret.txt".to_string()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fetch(blob) if blob == "secret.txt"));
        assert!(store.records("Results").await.is_empty());
    }

    #[tokio::test]
    async fn test_binary_blob() {
        let backend = MockBackend::with_blobs("logs", [("image.png", vec![0x89, 0x50, 0xff, 0xfe])]);
        let (backend, _store, recorder) = setup(backend, MockStore::default()).await;
        let matcher = Matcher::new("P", false);
        let err = scan_blob(&backend, &recorder, "logs", &matcher, "P", "image.png".to_string()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
    }

    #[tokio::test]
    async fn test_malformed_json_has_no_candidates() {
        let backend = MockBackend::with_blobs("logs", [("broken.json", "{\"hello\": ")]);
        let (backend, _store, recorder) = setup(backend, MockStore::default()).await;
        let matcher = Matcher::new("hello", false);
        let scan = scan_blob(&backend, &recorder, "logs", &matcher, "hello", "broken.json".to_string()).await.unwrap();
        assert_eq!(scan.format, ContentFormat::Json);
        assert_eq!(scan.candidates, 0);
        assert!(scan.matches.is_empty());
    }
}
