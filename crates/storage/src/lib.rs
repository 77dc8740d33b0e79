//! Object store access by opaque location.
//!
//! The rest of the workspace only sees [`ObjectAccessor`]: fetch the bytes at
//! a location, or store bytes at one. [`BlobStore`] resolves `s3://` and local
//! locations to the matching backend.

pub mod backend;
pub mod bucket;
pub mod error;
pub mod location;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

pub use backend::{LocalBackend, S3Backend};
pub use bucket::{BucketManager, BucketState, S3BucketManager};
pub use error::StorageError;
pub use location::Location;

/// Read and write whole objects by opaque location.
#[async_trait]
pub trait ObjectAccessor: Send + Sync {
    /// Read the full contents at `location`.
    async fn fetch(&self, location: &str) -> Result<Bytes, StorageError>;

    /// Write `data` to `location`, creating the containing namespace (bucket,
    /// directories) when needed.
    async fn store(&self, data: Bytes, location: &str) -> Result<(), StorageError>;
}

/// [`ObjectAccessor`] over S3 and the local filesystem.
pub struct BlobStore {
    s3: Option<S3Backend>,
    local: LocalBackend,
}

impl BlobStore {
    pub fn new(s3: S3Backend) -> Self {
        Self {
            s3: Some(s3),
            local: LocalBackend::new(),
        }
    }

    /// A store that only understands local paths.
    pub fn local_only() -> Self {
        Self {
            s3: None,
            local: LocalBackend::new(),
        }
    }

    fn s3(&self, location: &str) -> Result<&S3Backend, StorageError> {
        self.s3
            .as_ref()
            .ok_or_else(|| StorageError::invalid(location, "S3 is not configured"))
    }

    /// Make sure the namespace holding `location` exists. For S3 this is the
    /// bucket; local directories are created on write.
    pub async fn ensure_namespace(&self, location: &str) -> Result<(), StorageError> {
        if let Location::S3 { bucket, .. } = Location::parse(location)? {
            let state = self.s3(location)?.ensure_bucket(&bucket).await?;
            info!(bucket = %bucket, state = ?state, "bucket ready");
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectAccessor for BlobStore {
    async fn fetch(&self, location: &str) -> Result<Bytes, StorageError> {
        match Location::parse(location)? {
            Location::S3 { bucket, key } => {
                if key.is_empty() {
                    return Err(StorageError::invalid(location, "missing object key"));
                }
                self.s3(location)?.get(&bucket, &key).await
            }
            Location::Local(path) => self.local.get(&path).await,
        }
    }

    async fn store(&self, data: Bytes, location: &str) -> Result<(), StorageError> {
        match Location::parse(location)? {
            Location::S3 { bucket, key } => {
                if key.is_empty() {
                    return Err(StorageError::invalid(location, "missing object key"));
                }
                let s3 = self.s3(location)?;
                s3.ensure_bucket(&bucket).await?;
                s3.put(&bucket, &key, data).await
            }
            Location::Local(path) => self.local.put(&path, data).await,
        }
    }
}
