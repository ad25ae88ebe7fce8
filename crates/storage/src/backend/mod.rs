//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for container and blob operations across different backends
//! (local filesystem, S3-compatible services, etc.).
//!

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::{BlobInfo, ContainerStatus};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

type BlobInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<BlobInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All storage operations are asynchronous to efficiently handle network
/// operations and concurrent access. A backend holds named containers, and
/// each container holds named blobs.
///
/// # Naming
/// Container names must pass [`validate_container_name`](crate::validate_container_name)
/// and blob names are normalized by [`validate_blob_name`](crate::validate_blob_name).
/// Implementations should enforce both.
///
/// # Examples
///
/// ```
/// use findit_storage::{backend::StorageBackend, error::Result};
///
/// async fn size_of_hardcoded_blob(backend: &dyn StorageBackend) -> Result<u64> {
///     if backend.exists("logs", "2024/app.log").await? {
///         let data = backend.read("logs", "2024/app.log").await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Create a container if it does not exist yet.
    ///
    /// Returns [`ContainerStatus::AlreadyExists`] when the container is
    /// already there; any other failure is an error.
    async fn create_container(&self, container: &str) -> Result<ContainerStatus>;

    /// Check if a container exists.
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// List all blobs in a container.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream) into a [`Vec`] before
    /// returning.
    async fn list(&self, container: &str) -> Result<Vec<BlobInfo>> {
        self.list_stream(container).try_collect().await
    }

    /// Stream blob metadata for every blob in a container.
    ///
    /// Yields results incrementally. Listing a container that does not exist
    /// yields a single [`ContainerNotFound`](crate::error::ErrorKind::ContainerNotFound)
    /// error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// # use findit_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream("logs");
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.name, info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, container: &'a str) -> BlobInfoStream<'a>;

    /// Check if a blob exists.
    async fn exists(&self, container: &str, blob: &str) -> Result<bool>;

    /// Read blob contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the blob
    /// does not exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use findit_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let data = backend.read("logs", "app.log").await?;
    /// println!("Read {} bytes", data.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn read(&self, container: &str, blob: &str) -> Result<Vec<u8>>;

    /// Write blob contents.
    ///
    /// Creates a new blob or overwrites an existing one. The container must
    /// already exist.
    async fn write(&self, container: &str, blob: &str, data: &[u8]) -> Result<()>;
}
