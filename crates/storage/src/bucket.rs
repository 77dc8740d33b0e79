//! Bucket provisioning for S3 destinations.

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::operation::create_bucket::CreateBucketError;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tracing::{debug, info, warn};

use crate::error::StorageError;

/// Outcome of [`BucketManager::ensure_bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    Created,
    AlreadyOwned,
    /// The caller may not create buckets. The bucket is assumed to exist and
    /// the following write reports the real outcome.
    Unverified,
}

/// Creates buckets on demand.
///
/// Implementations must be idempotent: a bucket the caller already owns is a
/// success, a bucket owned by anyone else is [`StorageError::BucketOwnedElsewhere`].
#[async_trait]
pub trait BucketManager: Send + Sync {
    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketState, StorageError>;
}

/// [`BucketManager`] backed by the S3 `CreateBucket` API.
pub struct S3BucketManager {
    client: aws_sdk_s3::Client,
    region: String,
}

impl S3BucketManager {
    pub fn new(sdk_config: &aws_types::SdkConfig) -> Self {
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "us-east-1".to_string());
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
            region,
        }
    }
}

#[async_trait]
impl BucketManager for S3BucketManager {
    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketState, StorageError> {
        let mut req = self.client.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint.
        if self.region != "us-east-1" {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match req.send().await {
            Ok(_) => {
                info!(bucket = %bucket, region = %self.region, "created bucket");
                Ok(BucketState::Created)
            }
            Err(err) => classify_create_error(bucket, err.into_service_error()),
        }
    }
}

fn classify_create_error(
    bucket: &str,
    err: CreateBucketError,
) -> Result<BucketState, StorageError> {
    if err.is_bucket_already_owned_by_you() {
        debug!(bucket = %bucket, "bucket already exists");
        Ok(BucketState::AlreadyOwned)
    } else if err.is_bucket_already_exists() {
        Err(StorageError::BucketOwnedElsewhere(bucket.to_string()))
    } else if err.code() == Some("AccessDenied") {
        warn!(bucket = %bucket, "no permission to create bucket, assuming it exists");
        Ok(BucketState::Unverified)
    } else {
        Err(StorageError::Bucket {
            bucket: bucket.to_string(),
            reason: DisplayErrorContext(&err).to_string(),
        })
    }
}
