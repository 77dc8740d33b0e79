use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use bytes::Bytes;
use object_store::aws::{AmazonS3Builder, AwsCredential, AwsCredentialProvider};
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{CredentialProvider, ObjectStore, PutPayload};
use tracing::{debug, info};

use crate::bucket::{BucketManager, BucketState, S3BucketManager};
use crate::error::StorageError;

// ── S3 ──────────────────────────────────────────────────────────

/// S3 backend: one `object_store` client per bucket, created lazily.
pub struct S3Backend {
    region: String,
    credentials: Option<AwsCredentialProvider>,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
    buckets: Arc<dyn BucketManager>,
}

impl S3Backend {
    /// Build from a loaded AWS SDK config, sharing its credential chain so
    /// profiles and SSO sessions work for object reads and writes too.
    pub fn from_sdk_config(sdk_config: &aws_types::SdkConfig) -> Self {
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "us-east-1".to_string());
        let credentials = sdk_config
            .credentials_provider()
            .map(|p| Arc::new(SdkCredentials(p)) as AwsCredentialProvider);

        Self {
            region,
            credentials,
            stores: Mutex::new(HashMap::new()),
            buckets: Arc::new(S3BucketManager::new(sdk_config)),
        }
    }

    /// Build with an explicit bucket manager. Object stores come from the
    /// environment unless registered with [`register_store`](Self::register_store).
    pub fn with_bucket_manager(region: impl Into<String>, buckets: Arc<dyn BucketManager>) -> Self {
        Self {
            region: region.into(),
            credentials: None,
            stores: Mutex::new(HashMap::new()),
            buckets,
        }
    }

    /// Use `store` for every object in `bucket`.
    pub fn register_store(&self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        stores.insert(bucket.into(), store);
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, StorageError> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(&self.region)
            .with_bucket_name(bucket);
        if let Some(ref credentials) = self.credentials {
            builder = builder.with_credentials(credentials.clone());
        }
        let store: Arc<dyn ObjectStore> = Arc::new(builder.build()?);

        info!(bucket = %bucket, region = %self.region, "S3 store initialised");
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    pub async fn ensure_bucket(&self, bucket: &str) -> Result<BucketState, StorageError> {
        self.buckets.ensure_bucket(bucket).await
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let store = self.store_for(bucket)?;
        let path = ObjectPath::from(key);
        let location = format!("s3://{bucket}/{key}");
        let result = store.get(&path).await.map_err(|e| map_object_error(&location, e))?;
        let data = result.bytes().await.map_err(|e| map_object_error(&location, e))?;
        debug!(bucket = %bucket, key = %key, bytes = data.len(), "fetched object");
        Ok(data)
    }

    pub async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError> {
        let store = self.store_for(bucket)?;
        let path = ObjectPath::from(key);
        let len = data.len();
        store
            .put(&path, PutPayload::from(data))
            .await
            .map_err(|e| map_object_error(&format!("s3://{bucket}/{key}"), e))?;
        debug!(bucket = %bucket, key = %key, bytes = len, "stored object");
        Ok(())
    }
}

fn map_object_error(location: &str, err: object_store::Error) -> StorageError {
    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(location.to_string()),
        object_store::Error::PermissionDenied { .. } | object_store::Error::Unauthenticated { .. } => {
            StorageError::Access(location.to_string())
        }
        other => StorageError::ObjectStore(other),
    }
}

/// Bridges the AWS SDK credential chain into `object_store`.
#[derive(Debug)]
struct SdkCredentials(SharedCredentialsProvider);

#[async_trait]
impl CredentialProvider for SdkCredentials {
    type Credential = AwsCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AwsCredential>> {
        let creds = self
            .0
            .provide_credentials()
            .await
            .map_err(|e| object_store::Error::Generic {
                store: "S3",
                source: Box::new(e),
            })?;
        Ok(Arc::new(AwsCredential {
            key_id: creds.access_key_id().to_string(),
            secret_key: creds.secret_access_key().to_string(),
            token: creds.session_token().map(str::to_string),
        }))
    }
}

// ── Local filesystem ────────────────────────────────────────────

/// Local filesystem backend over the `object_store` local store.
pub struct LocalBackend {
    store: LocalFileSystem,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            store: LocalFileSystem::new(),
        }
    }

    pub async fn get(&self, path: &Path) -> Result<Bytes, StorageError> {
        let location = path.display().to_string();
        let object = object_path(path)?;
        let result = self
            .store
            .get(&object)
            .await
            .map_err(|e| map_object_error(&location, e))?;
        result.bytes().await.map_err(|e| map_object_error(&location, e))
    }

    /// Write `data`, creating missing parent directories.
    pub async fn put(&self, path: &Path, data: Bytes) -> Result<(), StorageError> {
        let location = path.display().to_string();
        let object = object_path(path)?;
        let len = data.len();
        self.store
            .put(&object, PutPayload::from(data))
            .await
            .map_err(|e| map_object_error(&location, e))?;
        debug!(path = %location, bytes = len, "wrote file");
        Ok(())
    }
}

/// Absolute, lexically normalized store path for a filesystem path. The
/// file itself need not exist yet.
fn object_path(path: &Path) -> Result<ObjectPath, StorageError> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    ObjectPath::from_absolute_path(&normalized)
        .map_err(|e| StorageError::invalid(&path.display().to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_put_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/dir/result.csv");
        let local = LocalBackend::new();

        local.put(&path, Bytes::from_static(b"a,b\n")).await.unwrap();
        let data = local.get(&path).await.unwrap();
        assert_eq!(&data[..], b"a,b\n");
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n");
    }

    #[tokio::test]
    async fn local_get_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.csv");
        let err = LocalBackend::new().get(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref p) if *p == path.display().to_string()));
    }

    #[tokio::test]
    async fn local_paths_with_dot_segments_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        let local = LocalBackend::new();
        let dotted = tmp.path().join("a/./b/../result.csv");

        local.put(&dotted, Bytes::from_static(b"x\n")).await.unwrap();
        assert_eq!(std::fs::read(tmp.path().join("a/result.csv")).unwrap(), b"x\n");
    }

    #[test]
    fn s3_not_found_keeps_location() {
        let err = map_object_error(
            "s3://results/q.csv",
            object_store::Error::NotFound {
                path: "q.csv".into(),
                source: "missing".into(),
            },
        );
        assert!(matches!(err, StorageError::NotFound(ref l) if l == "s3://results/q.csv"));
    }
}
