//! What each subcommand does, wired to the configured backends.

use crate::cli::{ExportArgs, ScanArgs, UploadArgs};
use crate::error::{ErrorKind, Result};
use crate::report::Reporter;
use exn::ResultExt;
use findit_config::{Config, StorageConfig};
use findit_records::{Database, Repository, StoreHandle, TableStatus};
use findit_scanner::scan::{ScanSummary, scan};
use findit_scanner::{Recorder, ScanRequest, export_to_path};
use findit_storage::backend::LocalBackend;
use findit_storage::{BackendHandle, ContainerStatus};
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// How a command finished, when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The scan ran to the end, but some blob or record was lost on the way.
    Partial,
}

pub async fn backend(config: &StorageConfig) -> Result<BackendHandle> {
    match config {
        StorageConfig::Local { root } => {
            let backend = LocalBackend::new("local", root).or_raise(|| ErrorKind::Setup("storage backend"))?;
            Ok(Arc::new(backend))
        },
        #[cfg(feature = "s3")]
        StorageConfig::S3 {
            region,
            endpoint,
            prefix,
            key_id,
            key_secret,
        } => {
            let backend = findit_storage::backend::S3Backend::new(
                "s3",
                prefix.clone(),
                region,
                endpoint.clone(),
                key_id,
                key_secret,
            )
            .await
            .or_raise(|| ErrorKind::Setup("storage backend"))?;
            Ok(Arc::new(backend))
        },
        #[cfg(not(feature = "s3"))]
        StorageConfig::S3 { .. } => exn::bail!(ErrorKind::Unsupported("s3")),
    }
}

pub async fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Setup("record store"))?;
    }
    Database::connect(path).await.or_raise(|| ErrorKind::Setup("record store"))
}

pub async fn scan_command(config: &Config, args: ScanArgs, out: impl Write) -> Result<Outcome> {
    let backend = backend(&config.storage).await?;
    let db = open_database(&config.records.path).await?;
    let store: StoreHandle = Arc::new(Repository::from(&db));
    let concurrency = args.concurrency.unwrap_or(config.scan.concurrency);
    let result = run_scan(&backend, &store, args, concurrency, out).await;
    db.close().await;
    result
}

/// Prepare the result table, scan, report, and optionally export.
pub async fn run_scan(
    backend: &BackendHandle,
    store: &StoreHandle,
    args: ScanArgs,
    concurrency: usize,
    out: impl Write,
) -> Result<Outcome> {
    match store.create_table(&args.table).await.or_raise(|| ErrorKind::Table(args.table.clone()))? {
        TableStatus::Created => tracing::info!(table = %args.table, "Created result table"),
        TableStatus::AlreadyExists => tracing::info!(table = %args.table, "Result table already exists"),
    }
    let exists = backend
        .container_exists(&args.container)
        .await
        .or_raise(|| ErrorKind::Container(args.container.clone()))?;
    if !exists {
        exn::bail!(ErrorKind::ContainerNotFound(args.container));
    }

    let request = ScanRequest::new(&args.container, &args.query)
        .ignore_case(args.ignore_case)
        .concurrency(concurrency);
    let recorder = Recorder::new(store.clone(), &args.table);
    let mut reporter = Reporter::new(out);
    let mut summary = ScanSummary::new(&request);
    let mut events = std::pin::pin!(scan(backend, &recorder, &request));
    while let Some(item) = events.next().await {
        reporter.event(&summary, &item).or_raise(|| ErrorKind::Output)?;
        summary.observe(&item);
        if let Err(e) = item
            && e.is_fatal()
        {
            return Err(e).or_raise(|| ErrorKind::Scan);
        }
    }
    reporter.summary(&summary).or_raise(|| ErrorKind::Output)?;

    if let Some(path) = args.export_csv.filter(|p| !p.as_os_str().is_empty()) {
        let count = export_to_path(store.as_ref(), &args.table, &path).await.or_raise(|| ErrorKind::Export)?;
        let mut out = reporter.into_inner();
        writeln!(out, "Table successfully exported to '{}' ({count} records).", path.display())
            .or_raise(|| ErrorKind::Output)?;
    }

    Ok(match summary.is_partial() {
        true => Outcome::Partial,
        false => Outcome::Success,
    })
}

pub async fn upload_command(config: &Config, args: UploadArgs, out: impl Write) -> Result<Outcome> {
    let backend = backend(&config.storage).await?;
    upload(&backend, args, out).await
}

pub async fn upload(backend: &BackendHandle, args: UploadArgs, mut out: impl Write) -> Result<Outcome> {
    let display = args.file.display().to_string();
    let blob = match args.name {
        Some(name) => name,
        None => {
            let Some(file_name) = args.file.file_name().and_then(|n| n.to_str()) else {
                exn::bail!(ErrorKind::Upload(display));
            };
            findit_storage::validate_blob_name(file_name).or_raise(|| ErrorKind::Upload(display.clone()))?
        },
    };
    match backend
        .create_container(&args.container)
        .await
        .or_raise(|| ErrorKind::Container(args.container.clone()))?
    {
        ContainerStatus::Created => tracing::info!(container = %args.container, "Created container"),
        ContainerStatus::AlreadyExists => tracing::info!(container = %args.container, "Container already exists"),
    }
    let data = tokio::fs::read(&args.file).await.or_raise(|| ErrorKind::Upload(display.clone()))?;
    backend
        .write(&args.container, &blob, &data)
        .await
        .or_raise(|| ErrorKind::Upload(display.clone()))?;
    tracing::info!(container = %args.container, blob = %blob, bytes = data.len(), "Uploaded file");
    writeln!(out, "Uploaded '{display}' to '{}/{blob}'.", args.container).or_raise(|| ErrorKind::Output)?;
    Ok(Outcome::Success)
}

pub async fn export_command(config: &Config, args: ExportArgs, mut out: impl Write) -> Result<Outcome> {
    let db = open_database(&config.records.path).await?;
    let store = Repository::from(&db);
    let result = export_to_path(&store, &args.table, &args.output).await.or_raise(|| ErrorKind::Export);
    db.close().await;
    let count = result?;
    writeln!(out, "Table successfully exported to '{}' ({count} records).", args.output.display())
        .or_raise(|| ErrorKind::Output)?;
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use findit_records::{MockStore, RecordStore};
    use findit_storage::backend::MockBackend;
    use std::path::PathBuf;

    fn scan_args(container: &str, query: &str) -> ScanArgs {
        ScanArgs {
            container: container.to_string(),
            table: "Results".to_string(),
            query: query.to_string(),
            ignore_case: false,
            export_csv: None,
            concurrency: None,
        }
    }

    fn handles(backend: MockBackend, store: MockStore) -> (BackendHandle, Arc<MockStore>, StoreHandle) {
        let backend: BackendHandle = Arc::new(backend);
        let store = Arc::new(store);
        let handle: StoreHandle = store.clone();
        (backend, store, handle)
    }

    #[tokio::test]
    async fn test_scan_success() {
        let (backend, store, handle) =
            handles(MockBackend::with_blobs("logs", [("a.txt", "hello world\nbye")]), MockStore::default());
        let mut out = Vec::new();
        let outcome = run_scan(&backend, &handle, scan_args("logs", "hello"), 1, &mut out).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(store.records("Results").await.len(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Matches found in 'a.txt':"));
        assert!(text.contains("a.txt | hello | hello world"));
    }

    #[tokio::test]
    async fn test_scan_existing_table() {
        let (backend, store, handle) =
            handles(MockBackend::with_blobs("logs", [("a.txt", "hello")]), MockStore::default());
        store.create_table("Results").await.unwrap();
        let outcome = run_scan(&backend, &handle, scan_args("logs", "hello"), 1, Vec::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[tokio::test]
    async fn test_scan_no_results() {
        let (backend, _store, handle) =
            handles(MockBackend::with_blobs("logs", [("a.txt", "nothing here")]), MockStore::default());
        let mut out = Vec::new();
        run_scan(&backend, &handle, scan_args("logs", "hello"), 1, &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("No results found.\n"));
    }

    #[tokio::test]
    async fn test_scan_partial() {
        let backend = MockBackend::with_blobs("logs", [("a.txt", "hello"), ("b.txt", "hello")]).with_unreadable("a.txt");
        let (backend, store, handle) = handles(backend, MockStore::default());
        let mut out = Vec::new();
        let outcome = run_scan(&backend, &handle, scan_args("logs", "hello"), 1, &mut out).await.unwrap();
        assert_eq!(outcome, Outcome::Partial);
        assert_eq!(store.records("Results").await.len(), 1);
        assert!(String::from_utf8(out).unwrap().contains("Error reading blob 'a.txt'"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scan_skips_undecodable_local_name() {
        use findit_storage::StorageBackend;
        use std::os::unix::ffi::OsStrExt;
        let dir = tempfile::tempdir().unwrap();
        let local = LocalBackend::new("local", dir.path()).unwrap();
        local.create_container("logs").await.unwrap();
        local.write("logs", "good.txt", b"hello").await.unwrap();
        std::fs::write(dir.path().join("logs").join(std::ffi::OsStr::from_bytes(b"bad\xff.txt")), b"hello").unwrap();
        let backend: BackendHandle = Arc::new(local);
        let store = Arc::new(MockStore::default());
        let handle: StoreHandle = store.clone();

        let mut out = Vec::new();
        let outcome = run_scan(&backend, &handle, scan_args("logs", "hello"), 1, &mut out).await.unwrap();
        assert_eq!(outcome, Outcome::Partial);
        assert_eq!(store.records("Results").await.len(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Matches found in 'good.txt':"));
        assert!(text.contains("1 listing entr(ies) could not be scanned."));
    }

    #[tokio::test]
    async fn test_scan_missing_container() {
        let (backend, _store, handle) = handles(MockBackend::default(), MockStore::default());
        let err = run_scan(&backend, &handle, scan_args("missing", "hello"), 1, Vec::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::ContainerNotFound(_)));
    }

    #[tokio::test]
    async fn test_scan_store_unavailable() {
        let (backend, _store, handle) =
            handles(MockBackend::with_blobs("logs", [("a.txt", "hello")]), MockStore::unavailable());
        let err = run_scan(&backend, &handle, scan_args("logs", "hello"), 1, Vec::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Table(_)));
    }

    #[tokio::test]
    async fn test_scan_with_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let (backend, _store, handle) =
            handles(MockBackend::with_blobs("logs", [("a.txt", "hello\nhello again")]), MockStore::default());
        let mut args = scan_args("logs", "hello");
        args.export_csv = Some(path.clone());
        let mut out = Vec::new();
        run_scan(&backend, &handle, args, 1, &mut out).await.unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(String::from_utf8(out).unwrap().contains("(2 records)"));
    }

    #[tokio::test]
    async fn test_upload_then_scan_local() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "first hello\nsecond").unwrap();
        let backend: BackendHandle = Arc::new(LocalBackend::new("local", dir.path().join("blobs")).unwrap());

        let args = UploadArgs {
            container: "notes".to_string(),
            file: file.clone(),
            name: None,
        };
        upload(&backend, args, Vec::new()).await.unwrap();
        // Uploading again overwrites and tolerates the existing container.
        let args = UploadArgs {
            container: "notes".to_string(),
            file,
            name: Some("archive/notes.txt".to_string()),
        };
        upload(&backend, args, Vec::new()).await.unwrap();
        assert!(backend.exists("notes", "notes.txt").await.unwrap());
        assert!(backend.exists("notes", "archive/notes.txt").await.unwrap());

        let store: StoreHandle = Arc::new(MockStore::default());
        let outcome = run_scan(&backend, &store, scan_args("notes", "hello"), 2, Vec::new()).await.unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(store.list("Results").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let backend: BackendHandle = Arc::new(MockBackend::default());
        let args = UploadArgs {
            container: "notes".to_string(),
            file: PathBuf::from("/definitely/not/here.txt"),
            name: None,
        };
        let err = upload(&backend, args, Vec::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Upload(_)));
    }

    #[tokio::test]
    async fn test_open_database_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("findit.sqlite3");
        let db = open_database(&path).await.unwrap();
        assert!(path.exists());
        db.close().await;
    }
}
