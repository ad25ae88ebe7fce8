//! Local filesystem storage backend.
//!
//! This module provides a storage backend implementation for the local filesystem.
//! Each container is a directory under the configured root, and blobs are files
//! below it (nested blob names become nested directories). Accessed using
//! `tokio::fs` for async I/O.

use crate::backend::BlobInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::{BlobInfo, ContainerStatus};
use crate::name::{validate_blob, validate_container};
use crate::StorageBackend;
use async_stream::stream;
use async_trait::async_trait;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, DirEntry};

/// In-flight uploads are written next to their blob under this prefix, then
/// renamed into place. Listings skip them.
const PARTIAL_PREFIX: &str = ".findit-partial-";

enum WalkEntry {
    File(BlobInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores containers as directories inside a root directory on the local
/// filesystem.
///
/// # Examples
///
/// ```no_run
/// use findit_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/var/lib/findit/blobs")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory holding one sub-directory per container
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let display = root.display().to_string();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::BackendError(format!("storage root `{display}` is not absolute")));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::BackendError(format!("storage root `{display}` is not a directory")));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &display))?;
        }
        Ok(Self { name: name.into(), root })
    }

    fn container_path(&self, container: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_container(container)?))
    }

    fn blob_path(&self, container: &str, blob: &str) -> Result<PathBuf> {
        let validated = validate_blob(blob)?;
        Ok(self.container_path(container)?.join(validated))
    }

    /// Convert an absolute path back to a blob name relative to its container.
    fn blob_name(container_dir: &Path, absolute: &Path) -> Result<String> {
        let relative = absolute.strip_prefix(container_dir).map_err(|_| {
            ErrorKind::BackendError(format!(
                "path `{}` is not within container `{}`",
                absolute.display(),
                container_dir.display()
            ))
        })?;
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => match part.to_str() {
                    Some(part) => parts.push(part),
                    None => exn::bail!(ErrorKind::InvalidBlob(relative.to_string_lossy().into_owned())),
                },
                _ => exn::bail!(ErrorKind::InvalidBlob(relative.to_string_lossy().into_owned())),
            }
        }
        validate_blob(&parts.join("/"))
    }

    fn blob_info(name: String, metadata: Metadata) -> Result<BlobInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(BlobInfo::new(name, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, name: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(name.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(name.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Keeps the stream loop free of error conversions; the loop can't `?`.
    async fn process_entry(container_dir: &Path, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let display = path.display().to_string();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &display))?;
        if metadata.is_dir() {
            return Ok(WalkEntry::Descend(path));
        }
        if metadata.is_file() {
            if entry.file_name().to_str().is_some_and(|name| name.starts_with(PARTIAL_PREFIX)) {
                return Ok(WalkEntry::Skip);
            }
            let name = Self::blob_name(container_dir, &path)?;
            return Ok(WalkEntry::File(Self::blob_info(name, metadata)?));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container(&self, container: &str) -> Result<ContainerStatus> {
        let path = self.container_path(container)?;
        match fs::create_dir(&path).await {
            Ok(()) => Ok(ContainerStatus::Created),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => {
                Ok(ContainerStatus::AlreadyExists)
            },
            Err(e) => Err(Self::map_io_error(e, container).into()),
        }
    }

    async fn container_exists(&self, container: &str) -> Result<bool> {
        let path = self.container_path(container)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_error(e, container).into()),
        }
    }

    fn list_stream<'a>(&'a self, container: &'a str) -> BlobInfoStream<'a> {
        let container_dir = match self.container_path(container) {
            Ok(dir) => dir,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            match fs::metadata(&container_dir).await {
                Ok(metadata) if metadata.is_dir() => {},
                Ok(_) => {
                    yield Err(exn::Exn::from(ErrorKind::ContainerNotFound(container.to_string())));
                    return;
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    yield Err(exn::Exn::from(ErrorKind::ContainerNotFound(container.to_string())));
                    return;
                },
                Err(e) => {
                    yield Err(exn::Exn::from(Self::map_io_error(e, container)));
                    return;
                },
            }

            let mut stack = vec![container_dir.clone()];
            'dirs: while let Some(current) = stack.pop() {
                let display = current.display().to_string();
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &display)));
                        continue 'dirs;
                    }
                };
                // Directory order is filesystem-dependent; sort so listings
                // are stable between runs.
                let mut files = Vec::new();
                let mut dirs = Vec::new();
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &display))); continue 'entries; },
                    };
                    match Self::process_entry(&container_dir, entry).await {
                        Ok(WalkEntry::File(f)) => files.push(f),
                        Ok(WalkEntry::Descend(d)) => dirs.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
                files.sort_by(|a, b| a.name.cmp(&b.name));
                for file in files {
                    yield Ok(file);
                }
                // Popped last-in first-out, so push in reverse to descend in name order.
                dirs.sort_unstable_by(|a, b| b.cmp(a));
                stack.extend(dirs);
            }
        })
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        let path = self.blob_path(container, blob)?;
        Ok(fs::try_exists(&path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let path = self.blob_path(container, blob)?;
        Ok(fs::read(&path).await.map_err(|e| Self::map_io_error(e, blob))?)
    }

    async fn write(&self, container: &str, blob: &str, data: &[u8]) -> Result<()> {
        if !self.container_exists(container).await? {
            exn::bail!(ErrorKind::ContainerNotFound(container.to_string()));
        }
        let path = self.blob_path(container, blob)?;
        // Nested blob names need their parent directories, to keep behaviour
        // consistent with S3-compatible storage.
        let Some((parent, file_name)) = path.parent().zip(path.file_name()) else {
            exn::bail!(ErrorKind::InvalidBlob(blob.to_string()));
        };
        fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, blob))?;
        // Readers never see a half-written blob.
        let partial = parent.join(format!("{PARTIAL_PREFIX}{}", file_name.to_string_lossy()));
        fs::write(&partial, data).await.map_err(|e| Self::map_io_error(e, blob))?;
        if let Err(e) = fs::rename(&partial, &path).await {
            _ = fs::remove_file(&partial).await;
            exn::bail!(Self::map_io_error(e, blob));
        }
        Ok(())
    }
}
