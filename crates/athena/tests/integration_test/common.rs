//! Shared fakes: a scripted query service and an in-memory blob store.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use object_store::memory::InMemory;

use qrun_athena::{AthenaError, ExecutorConfig, QueryService};
use qrun_core::{JobStatus, StatusReport};
use qrun_storage::{BlobStore, BucketManager, BucketState, S3Backend, StorageError};

pub const RESULTS_BUCKET: &str = "results";
pub const TEMP_PATH: &str = "s3://results/Unsaved/2024/03/07";

/// Query service whose status answers are scripted per query text. Every
/// query's result lands at `{TEMP_PATH}/{id}.csv`. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedService {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<HashMap<String, VecDeque<StatusReport>>>,
    ids: Mutex<HashMap<String, String>>,
    submitted: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn script(self, query: &str, statuses: Vec<StatusReport>) -> Self {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .insert(query.to_string(), statuses.into());
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.inner.submitted.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.inner.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn submit(&self, query: &str, output_location: &str) -> Result<String, AthenaError> {
        assert_eq!(output_location, TEMP_PATH);
        let mut submitted = self.inner.submitted.lock().unwrap();
        submitted.push(query.to_string());
        let id = format!("q-{}", submitted.len());
        self.inner
            .ids
            .lock()
            .unwrap()
            .insert(id.clone(), query.to_string());
        Ok(id)
    }

    async fn get_status(&self, query_id: &str) -> Result<StatusReport, AthenaError> {
        self.inner.status_calls.fetch_add(1, Ordering::SeqCst);
        let query = self
            .inner
            .ids
            .lock()
            .unwrap()
            .get(query_id)
            .cloned()
            .ok_or_else(|| AthenaError::StatusQuery {
                query_id: query_id.to_string(),
                reason: "InvalidRequestException: unknown id".into(),
            })?;
        let next = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .get_mut(&query)
            .and_then(|s| s.pop_front());
        Ok(match next {
            Some(report) if report.status == JobStatus::Succeeded => {
                report.with_result_location(format!("{TEMP_PATH}/{query_id}.csv"))
            }
            Some(report) => report,
            None => StatusReport::new(JobStatus::Running),
        })
    }
}

/// Every bucket is owned by the caller.
#[derive(Default)]
pub struct OwnedBuckets {
    seen: Mutex<HashSet<String>>,
}

#[async_trait]
impl BucketManager for OwnedBuckets {
    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketState, StorageError> {
        if self.seen.lock().unwrap().insert(bucket.to_string()) {
            Ok(BucketState::Created)
        } else {
            Ok(BucketState::AlreadyOwned)
        }
    }
}

pub fn blob_store() -> BlobStore {
    let backend = S3Backend::with_bucket_manager("eu-central-1", Arc::new(OwnedBuckets::default()));
    backend.register_store(RESULTS_BUCKET, Arc::new(InMemory::new()));
    BlobStore::new(backend)
}

pub fn executor_config() -> ExecutorConfig {
    ExecutorConfig::new(TEMP_PATH).with_poll_interval(Duration::from_millis(2))
}

pub fn running() -> StatusReport {
    StatusReport::new(JobStatus::Running)
}

pub fn succeeded() -> StatusReport {
    StatusReport::new(JobStatus::Succeeded)
}

pub fn failed(reason: &str) -> StatusReport {
    StatusReport::new(JobStatus::Failed).with_reason(reason)
}
