//! Blob container storage for findit.
//!
//! A [`StorageBackend`] holds any number of named containers, each holding
//! any number of named blobs. Backends are shared between tasks through a
//! [`BackendHandle`].

pub mod backend;
pub mod error;
mod models;
mod name;

pub use crate::backend::StorageBackend;
pub use crate::models::{BlobInfo, ContainerStatus};
pub use crate::name::{validate_blob as validate_blob_name, validate_container as validate_container_name};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
