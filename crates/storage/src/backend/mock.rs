//! In-memory storage backend for testing.

use super::BlobInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::{BlobInfo, ContainerStatus};
use crate::name::{validate_blob, validate_container};
use crate::StorageBackend;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use time::OffsetDateTime;
use tokio::sync::RwLock;

type Container = BTreeMap<String, (OffsetDateTime, Vec<u8>)>;

/// In-memory storage backend for testing.
///
/// Containers are stored in a `BTreeMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation, and
/// listings come back in name order. Blobs can be marked unreadable to
/// simulate access or network failures.
///
/// # Examples
///
/// ```
/// use findit_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_blobs("logs", [
///     ("app.log", "started\nstopped"),
/// ]);
/// assert!(backend.exists("logs", "app.log").await?);
///
/// backend.write("logs", "other.log", b"data...").await?;
/// assert!(backend.exists("logs", "other.log").await?);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<String, Container>>,
    unreadable: HashSet<String>,
    unlistable: Vec<(String, String)>,
}

impl MockBackend {
    /// Create a mock backend with one container pre-populated with blobs.
    ///
    /// Panics if any name fails validation. If test setup is wrong, then
    /// the test should not pass.
    pub fn with_blobs(
        container: &str,
        blobs: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>,
    ) -> Self {
        let Ok(container) = validate_container(container) else {
            // The panic here is DELIBERATE. MockBackend is intended to be
            // used in tests; panics are expected. There is no error result.
            panic!("MockBackend::with_blobs: invalid container {container}");
        };
        let now = OffsetDateTime::now_utc();
        let mut map = Container::new();
        for (name, data) in blobs {
            let name = name.into();
            let Ok(validated) = validate_blob(&name) else {
                panic!("MockBackend::with_blobs: invalid blob name {name}");
            };
            map.insert(validated, (now, data.into()));
        }
        let mut storage = BTreeMap::new();
        storage.insert(container.to_string(), map);
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(storage),
            unreadable: HashSet::new(),
            unlistable: Vec::new(),
        }
    }

    /// Add an entry that breaks listings of `container`: it comes out of
    /// [`list_stream`](StorageBackend::list_stream) as an
    /// [`InvalidBlob`](ErrorKind::InvalidBlob) error, ahead of the blobs.
    pub fn with_unlistable(mut self, container: impl Into<String>, entry: impl Into<String>) -> Self {
        self.unlistable.push((container.into(), entry.into()));
        self
    }

    /// Make reads of the named blob fail with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied). The blob still
    /// shows up in listings.
    pub fn with_unreadable(mut self, blob: impl Into<String>) -> Self {
        self.unreadable.insert(blob.into());
        self
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(BTreeMap::new()),
            unreadable: HashSet::new(),
            unlistable: Vec::new(),
        }
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container(&self, container: &str) -> Result<ContainerStatus> {
        let container = validate_container(container)?;
        let mut guard = self.storage.write().await;
        if guard.contains_key(container) {
            return Ok(ContainerStatus::AlreadyExists);
        }
        guard.insert(container.to_string(), Container::new());
        Ok(ContainerStatus::Created)
    }

    async fn container_exists(&self, container: &str) -> Result<bool> {
        let container = validate_container(container)?;
        Ok(self.storage.read().await.contains_key(container))
    }

    fn list_stream<'a>(&'a self, container: &'a str) -> BlobInfoStream<'a> {
        if let Err(e) = validate_container(container) {
            return Box::pin(futures::stream::once(async { Err(e) }));
        }

        Box::pin(stream! {
            // Snapshot under the read lock, then drop it before yielding to
            // avoid holding the lock across yield points.
            let entries: Option<Vec<BlobInfo>> = {
                let guard = self.storage.read().await;
                guard.get(container).map(|blobs| {
                    blobs
                        .iter()
                        .map(|(name, (modified, data))| BlobInfo::new(name.clone(), data.len() as u64, *modified))
                        .collect()
                })
            };
            match entries {
                Some(entries) => {
                    for (_, entry) in self.unlistable.iter().filter(|(c, _)| c == container) {
                        yield Err(exn::Exn::from(ErrorKind::InvalidBlob(entry.clone())));
                    }
                    for entry in entries {
                        yield Ok(entry);
                    }
                },
                None => yield Err(exn::Exn::from(ErrorKind::ContainerNotFound(container.to_string()))),
            }
        })
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        let container = validate_container(container)?;
        let blob = validate_blob(blob)?;
        Ok(self.storage.read().await.get(container).is_some_and(|blobs| blobs.contains_key(&blob)))
    }

    async fn read(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let container = validate_container(container)?;
        let blob = validate_blob(blob)?;
        if self.unreadable.contains(&blob) {
            exn::bail!(ErrorKind::PermissionDenied(blob));
        }
        let guard = self.storage.read().await;
        let blobs = guard.get(container).ok_or_else(|| ErrorKind::ContainerNotFound(container.to_string()))?;
        let (_modified, data) = blobs.get(&blob).ok_or_else(|| ErrorKind::NotFound(blob.clone()))?;
        Ok(data.clone())
    }

    async fn write(&self, container: &str, blob: &str, data: &[u8]) -> Result<()> {
        let container = validate_container(container)?;
        let blob = validate_blob(blob)?;
        let mut guard = self.storage.write().await;
        let blobs = guard.get_mut(container).ok_or_else(|| ErrorKind::ContainerNotFound(container.to_string()))?;
        blobs.insert(blob, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.create_container("logs").await.unwrap();
        backend.write("logs", "test.txt", b"hello").await.unwrap();
        assert_eq!(backend.read("logs", "test.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_with_blobs() {
        let backend = MockBackend::with_blobs("logs", [("a/file.txt", "one"), ("b.json", "{}")]);
        assert!(backend.exists("logs", "a/file.txt").await.unwrap());
        assert!(backend.exists("logs", "b.json").await.unwrap());
        assert!(!backend.exists("logs", "c/nope").await.unwrap());
        assert!(!backend.exists("other", "b.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_container_twice() {
        let backend = MockBackend::default();
        assert_eq!(backend.create_container("logs").await.unwrap(), ContainerStatus::Created);
        assert_eq!(backend.create_container("logs").await.unwrap(), ContainerStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::with_blobs("logs", [("a.txt", "a")]);
        let err = backend.read("logs", "missing.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        let err = backend.read("nothere", "a.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_unreadable_blob() {
        let backend = MockBackend::with_blobs("logs", [("a.txt", "a"), ("b.txt", "b")]).with_unreadable("a.txt");
        let err = backend.read("logs", "a.txt").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert_eq!(backend.read("logs", "b.txt").await.unwrap(), b"b");
        // Still listed
        assert_eq!(backend.list("logs").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_in_name_order() {
        let backend = MockBackend::with_blobs("logs", [("c.txt", "3"), ("a.txt", "1"), ("b.txt", "22")]);
        let listed: Vec<_> = backend.list("logs").await.unwrap().into_iter().map(|b| (b.name, b.size)).collect();
        assert_eq!(
            listed,
            vec![("a.txt".to_string(), 1), ("b.txt".to_string(), 2), ("c.txt".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_unlistable_entry() {
        use futures::StreamExt;
        let backend = MockBackend::with_blobs("logs", [("a.txt", "a")]).with_unlistable("logs", "bad\u{fffd}.txt");
        let entries: Vec<_> = backend.list_stream("logs").collect().await;
        assert_eq!(entries.len(), 2);
        assert!(matches!(&entries[0], Err(e) if matches!(&**e, ErrorKind::InvalidBlob(_))));
        assert!(matches!(&entries[1], Ok(info) if info.name == "a.txt"));
        // The collecting listing gives up on the first bad entry.
        assert!(backend.list("logs").await.is_err());
    }

    #[tokio::test]
    async fn test_list_missing_container() {
        let backend = MockBackend::default();
        let err = backend.list("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let backend = MockBackend::with_blobs("logs", [("a.txt", "a")]);
        assert!(backend.read("logs", "../etc/passwd").await.is_err());
        assert!(backend.write("logs", "../escape", b"bad").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid blob name")]
    fn test_with_blobs_panics_on_bad_name() {
        MockBackend::with_blobs("logs", [("../escape", "bad")]);
    }
}
