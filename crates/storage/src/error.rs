use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    Access(String),

    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("bucket {0} already exists and is owned by another account")]
    BucketOwnedElsewhere(String),

    #[error("could not create bucket {bucket}: {reason}")]
    Bucket { bucket: String, reason: String },

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn invalid(location: &str, reason: impl Into<String>) -> Self {
        StorageError::InvalidLocation {
            location: location.to_string(),
            reason: reason.into(),
        }
    }
}
