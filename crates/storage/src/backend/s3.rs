//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, MinIO, and local emulators.
//! Each container maps to a bucket; blobs are object keys, optionally below a
//! fixed key prefix shared by every bucket.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use crate::backend::BlobInfoStream;
use crate::error::{ErrorKind, Result};
use crate::models::{BlobInfo, ContainerStatus};
use crate::name::{validate_blob, validate_container};
use crate::StorageBackend;
use async_stream::stream;
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::{ByteStream, DateTime},
    types::{BucketLocationConstraint, CreateBucketConfiguration},
};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;
/// The only region where a bucket may be created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// S3-compatible storage backend.
///
/// # Examples
///
/// ```no_run
/// use findit_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "minio",
///     None,
///     "us-east-1",
///     Some("http://127.0.0.1:9000".to_string()),
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    region: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `prefix` - Optional key prefix (acts as a virtual directory in every bucket)
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub async fn new(
        name: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(|p| validate_blob(&p)).transpose()?;
        let region = region.into();
        let credentials = Credentials::new(key_id, key_secret, None, None, "findit-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.clone()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (MinIO, emulators, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            region,
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    fn object_key(&self, blob: &str) -> Result<String> {
        Ok(full_key(self.prefix.as_deref(), &validate_blob(blob)?))
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        Ok(self
            .rate_limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ErrorKind::BackendError("request limiter closed".to_string()))?)
    }

    fn parse_datetime(dt: &DateTime) -> Result<OffsetDateTime> {
        Ok(OffsetDateTime::from_unix_timestamp_nanos(dt.as_nanos())
            .map_err(|_| ErrorKind::BackendError("S3 datetime out of range".to_string()))?)
    }
}

/// Join an optional key prefix and a blob name into an object key.
fn full_key(prefix: Option<&str>, blob: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), blob),
        None => blob.to_string(),
    }
}

/// Strip the configured prefix from an object key to get the blob name.
fn relative_key<'k>(prefix: Option<&str>, key: &'k str) -> &'k str {
    match prefix {
        Some(prefix) => {
            let prefix = prefix.trim_end_matches('/');
            key.strip_prefix(prefix).and_then(|s| s.strip_prefix('/')).unwrap_or(key)
        },
        None => key,
    }
}

fn sdk_error<E, R>(err: &SdkError<E, R>, name: &str) -> ErrorKind
where
    E: std::error::Error + ProvideErrorMetadata + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();
    if let Some(code) = err.as_service_error().and_then(|e| e.code())
        && code == "AccessDenied"
    {
        return ErrorKind::PermissionDenied(name.to_string());
    }
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ErrorKind::Network(message),
        _ => ErrorKind::BackendError(message),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_container(&self, container: &str) -> Result<ContainerStatus> {
        let bucket = validate_container(container)?;
        let _permit = self.acquire_permit().await?;
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            let location = BucketLocationConstraint::from(self.region.as_str());
            request = request
                .create_bucket_configuration(CreateBucketConfiguration::builder().location_constraint(location).build());
        }
        match request.send().await {
            Ok(_) => Ok(ContainerStatus::Created),
            Err(err) => match err.as_service_error() {
                Some(e) if e.is_bucket_already_owned_by_you() => Ok(ContainerStatus::AlreadyExists),
                // Exists, but belongs to somebody else.
                Some(e) if e.is_bucket_already_exists() => {
                    exn::bail!(ErrorKind::PermissionDenied(bucket.to_string()))
                },
                _ => exn::bail!(sdk_error(&err, bucket)),
            },
        }
    }

    async fn container_exists(&self, container: &str) -> Result<bool> {
        let bucket = validate_container(container)?;
        let _permit = self.acquire_permit().await?;
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => exn::bail!(sdk_error(&err, bucket)),
        }
    }

    fn list_stream<'a>(&'a self, container: &'a str) -> BlobInfoStream<'a> {
        if let Err(e) = validate_container(container) {
            return Box::pin(futures::stream::once(async { Err(e) }));
        }

        Box::pin(stream! {
            let prefix = self.prefix.as_deref().map(|p| format!("{}/", p.trim_end_matches('/')));
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(container)
                .set_prefix(prefix)
                .into_paginator()
                .send();
            while let Some(page) = pages.next().await {
                let page = match page {
                    Ok(page) => page,
                    Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_bucket()) => {
                        yield Err(exn::Exn::from(ErrorKind::ContainerNotFound(container.to_string())));
                        return;
                    },
                    Err(err) => {
                        yield Err(exn::Exn::from(sdk_error(&err, container)));
                        return;
                    },
                };
                for object in page.contents() {
                    let Some(key) = object.key() else { continue };
                    // "Directory" placeholder objects carry no content.
                    if key.ends_with('/') {
                        continue;
                    }
                    let name = match validate_blob(relative_key(self.prefix.as_deref(), key)) {
                        Ok(name) => name,
                        Err(e) => { yield Err(e); continue; },
                    };
                    let modified = match object.last_modified().map(Self::parse_datetime).transpose() {
                        Ok(modified) => modified.unwrap_or(OffsetDateTime::UNIX_EPOCH),
                        Err(e) => { yield Err(e); continue; },
                    };
                    let size = u64::try_from(object.size().unwrap_or(0)).unwrap_or(0);
                    yield Ok(BlobInfo::new(name, size, modified));
                }
            }
        })
    }

    async fn exists(&self, container: &str, blob: &str) -> Result<bool> {
        let bucket = validate_container(container)?;
        let key = self.object_key(blob)?;
        let _permit = self.acquire_permit().await?;
        match self.client.head_object().bucket(bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => exn::bail!(sdk_error(&err, blob)),
        }
    }

    async fn read(&self, container: &str, blob: &str) -> Result<Vec<u8>> {
        let bucket = validate_container(container)?;
        let key = self.object_key(blob)?;
        let _permit = self.acquire_permit().await?;
        let output = match self.client.get_object().bucket(bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                exn::bail!(ErrorKind::NotFound(blob.to_string()))
            },
            Err(err) => exn::bail!(sdk_error(&err, blob)),
        };
        let body = output.body.collect().await.map_err(|e| ErrorKind::Network(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn write(&self, container: &str, blob: &str, data: &[u8]) -> Result<()> {
        let bucket = validate_container(container)?;
        let key = self.object_key(blob)?;
        let _permit = self.acquire_permit().await?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|err| sdk_error(&err, blob))?;
        tracing::debug!(backend = %self.name, bucket, key = %key, bytes = data.len(), "Uploaded object");
        Ok(())
    }
}
