use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use qrun_athena::{ErrorKind, ExecError, QueryExecutor};
use qrun_core::JobStatus;
use qrun_storage::{ObjectAccessor, StorageError};

use crate::common::*;

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

#[tokio::test]
async fn succeeded_query_fetches_result_from_temp_path() {
    let service = ScriptedService::default().script(
        "SELECT 1",
        vec![running(), running(), succeeded()],
    );
    let executor = QueryExecutor::new(service.clone(), blob_store(), executor_config());
    executor
        .accessor()
        .store(Bytes::from_static(b"a,b\n1,2\n"), &format!("{TEMP_PATH}/q-1.csv"))
        .await
        .unwrap();

    let data = executor
        .execute("SELECT 1", deadline(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(data.as_deref(), Some(&b"a,b\n1,2\n"[..]));
    assert_eq!(service.submitted(), vec!["SELECT 1"]);
    assert_eq!(service.status_calls(), 3);
}

#[tokio::test]
async fn failed_query_reports_reason_and_skips_fetch() {
    let service = ScriptedService::default().script(
        "SELECT broken",
        vec![running(), failed("SYNTAX_ERROR: line 1:8")],
    );
    let executor = QueryExecutor::new(service.clone(), blob_store(), executor_config());

    let err = executor
        .execute("SELECT broken", deadline(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ExecError::JobFailed {
            query_id,
            state,
            reason,
        } => {
            assert_eq!(query_id, "q-1");
            assert_eq!(state, JobStatus::Failed);
            assert_eq!(reason, "SYNTAX_ERROR: line 1:8");
        }
        other => panic!("expected JobFailed, got {other:?}"),
    }
    assert_eq!(service.status_calls(), 2);
}

#[tokio::test]
async fn missing_result_object_is_fetch_error() {
    let service = ScriptedService::default().script("SELECT 1", vec![succeeded()]);
    let executor = QueryExecutor::new(service, blob_store(), executor_config());

    let err = executor
        .execute("SELECT 1", deadline(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fetch);
    match err {
        ExecError::Fetch {
            location, source, ..
        } => {
            assert_eq!(location, format!("{TEMP_PATH}/q-1.csv"));
            assert!(matches!(source, StorageError::NotFound(_)));
        }
        other => panic!("expected Fetch, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_disabled_returns_nothing() {
    let service = ScriptedService::default().script("SELECT 1", vec![running(), succeeded()]);
    let executor = QueryExecutor::new(
        service.clone(),
        blob_store(),
        executor_config().with_fetch_result(false),
    );

    let data = executor
        .execute("SELECT 1", deadline(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(data.is_none());
    assert_eq!(service.status_calls(), 2);
}

#[tokio::test]
async fn never_ending_query_hits_deadline() {
    // No script: the service answers RUNNING forever.
    let service = ScriptedService::default();
    let executor = QueryExecutor::new(service.clone(), blob_store(), executor_config());

    let started = Instant::now();
    let err = executor
        .execute(
            "SELECT sleep",
            Instant::now() + Duration::from_millis(50),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(service.submitted().len(), 1);
    assert!(service.status_calls() >= 1);
}
