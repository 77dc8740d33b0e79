use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

const S3_SCHEME: &str = "s3://";
const FILE_SCHEME: &str = "file://";

/// A parsed opaque location.
///
/// `s3://bucket/key` addresses an object, `file://path` or a bare path
/// addresses the local filesystem. Relative paths stay relative to the
/// working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    S3 { bucket: String, key: String },
    Local(PathBuf),
}

impl Location {
    pub fn parse(location: &str) -> Result<Self, StorageError> {
        if location.is_empty() {
            return Err(StorageError::invalid(location, "empty location"));
        }

        if let Some(rest) = location.strip_prefix(S3_SCHEME) {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(StorageError::invalid(location, "missing bucket"));
            }
            return Ok(Location::S3 {
                bucket: bucket.to_string(),
                key: key.trim_start_matches('/').to_string(),
            });
        }

        if let Some(rest) = location.strip_prefix(FILE_SCHEME) {
            if rest.is_empty() {
                return Err(StorageError::invalid(location, "missing path"));
            }
            return Ok(Location::Local(PathBuf::from(rest)));
        }

        if let Some((scheme, _)) = location.split_once("://") {
            return Err(StorageError::invalid(
                location,
                format!("unsupported scheme {scheme:?}"),
            ));
        }

        Ok(Location::Local(PathBuf::from(location)))
    }

    /// Append path elements, e.g. a query id under a results prefix.
    pub fn join(&self, elem: &str) -> Location {
        let elem = elem.trim_matches('/');
        match self {
            Location::S3 { bucket, key } => {
                let key = key.trim_end_matches('/');
                let key = if key.is_empty() {
                    elem.to_string()
                } else {
                    format!("{key}/{elem}")
                };
                Location::S3 {
                    bucket: bucket.clone(),
                    key,
                }
            }
            Location::Local(path) => Location::Local(path.join(elem)),
        }
    }

    /// Bucket of an S3 location.
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Location::S3 { bucket, .. } => Some(bucket),
            Location::Local(_) => None,
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::S3 { .. } => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::S3 { bucket, key } if key.is_empty() => write!(f, "s3://{bucket}"),
            Location::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
