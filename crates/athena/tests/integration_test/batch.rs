use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use qrun_athena::{BatchRunner, ErrorKind, QueryExecutor};
use qrun_storage::ObjectAccessor;

use crate::common::*;

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(30)
}

#[tokio::test]
async fn batch_concatenates_results_in_order() {
    let service = ScriptedService::default()
        .script("SELECT 1", vec![running(), succeeded()])
        .script("SELECT 2", vec![succeeded()]);
    let executor = QueryExecutor::new(service.clone(), blob_store(), executor_config());
    for (id, body) in [("q-1", "one\n"), ("q-2", "two\n")] {
        executor
            .accessor()
            .store(Bytes::from(body), &format!("{TEMP_PATH}/{id}.csv"))
            .await
            .unwrap();
    }

    let queries = vec!["SELECT 1".to_string(), "SELECT 2".to_string()];
    let mut out = Vec::new();
    let done = BatchRunner::new(&executor)
        .run(&queries, deadline(), &CancellationToken::new(), |_, data| {
            out.extend_from_slice(&data);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(done, 2);
    assert_eq!(out, b"one\ntwo\n");
    assert_eq!(service.submitted(), queries);
}

#[tokio::test]
async fn failing_first_query_stops_batch() {
    let service = ScriptedService::default()
        .script("SELECT broken", vec![running(), failed("TABLE_NOT_FOUND")])
        .script("SELECT 2", vec![succeeded()]);
    let executor = QueryExecutor::new(service.clone(), blob_store(), executor_config());

    let queries = vec!["SELECT broken".to_string(), "SELECT 2".to_string()];
    let mut sink_calls = 0;
    let err = BatchRunner::new(&executor)
        .run(&queries, deadline(), &CancellationToken::new(), |_, _| {
            sink_calls += 1;
            Ok(())
        })
        .await
        .unwrap_err();

    assert_eq!(err.index, 0);
    assert_eq!(err.total, 2);
    assert_eq!(err.kind(), ErrorKind::JobFailed);
    assert!(err.to_string().contains("TABLE_NOT_FOUND"));
    assert_eq!(sink_calls, 0);
    assert_eq!(service.submitted(), vec!["SELECT broken"]);
}

#[tokio::test]
async fn cancelled_batch_submits_nothing_more() {
    let service = ScriptedService::default().script("SELECT 1", vec![succeeded()]);
    let executor = QueryExecutor::new(
        service.clone(),
        blob_store(),
        executor_config().with_fetch_result(false),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let queries = vec!["SELECT 1".to_string(), "SELECT 2".to_string()];
    let err = BatchRunner::new(&executor)
        .run(&queries, deadline(), &cancel, |_, _| Ok(()))
        .await
        .unwrap_err();

    assert_eq!(err.index, 0);
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(service.submitted().is_empty());
}
