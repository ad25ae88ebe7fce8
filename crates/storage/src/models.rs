//! Storage models.

use time::OffsetDateTime;

/// Blob metadata returned by storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Name relative to its container, `/`-separated
    pub name: String,
    /// Blob size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl BlobInfo {
    pub fn new(name: impl Into<String>, size: u64, modified: OffsetDateTime) -> Self {
        Self { name: name.into(), size, modified }
    }
}

/// Outcome of asking a backend to create a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    AlreadyExists,
}
