//! Drives one query through submit, poll and fetch.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use qrun_core::{QueryJob, RunConfig};
use qrun_storage::{ObjectAccessor, StorageError};

use crate::client::QueryService;
use crate::error::{CancelCause, ExecError};
use crate::lifecycle::{Lifecycle, Phase};

/// Default fixed interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Settings for a [`QueryExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Where the service should write results.
    pub output_location: String,
    /// Fixed wait before every status call. No backoff.
    pub poll_interval: Duration,
    /// Fetch result bytes after success. When `false`, a succeeded query
    /// returns `None` without touching the object store.
    pub fetch_result: bool,
}

impl ExecutorConfig {
    pub fn new(output_location: impl Into<String>) -> Self {
        Self {
            output_location: output_location.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            fetch_result: true,
        }
    }

    pub fn from_run_config(config: &RunConfig, output_location: impl Into<String>) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            ..Self::new(output_location)
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_fetch_result(mut self, fetch: bool) -> Self {
        self.fetch_result = fetch;
        self
    }
}

/// Runs query lifecycles against a [`QueryService`] and an [`ObjectAccessor`].
///
/// Every remote call and every wait races the caller's deadline and
/// cancellation token. When either fires the in-flight call is dropped and
/// [`ExecError::Cancelled`] is returned. The remote job is not stopped.
pub struct QueryExecutor<S, A> {
    service: S,
    accessor: A,
    config: ExecutorConfig,
}

impl<S: QueryService, A: ObjectAccessor> QueryExecutor<S, A> {
    pub fn new(service: S, accessor: A, config: ExecutorConfig) -> Self {
        Self {
            service,
            accessor,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Execute `query` to completion.
    ///
    /// Returns the result bytes, or `None` when fetching is disabled.
    pub async fn execute(
        &self,
        query: &str,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<Option<Bytes>, ExecError> {
        let output_location = self.config.output_location.as_str();

        // 1. Submit
        let query_id = guard(None, deadline, cancel, self.service.submit(query, output_location))
            .await?
            .map_err(ExecError::Submission)?;

        let mut lifecycle =
            Lifecycle::submitted(QueryJob::submitted(query_id.as_str(), query, output_location));

        // 2. Poll until terminal
        loop {
            guard(
                Some(&query_id),
                deadline,
                cancel,
                tokio::time::sleep(self.config.poll_interval),
            )
            .await?;

            let report = guard(
                Some(&query_id),
                deadline,
                cancel,
                self.service.get_status(&query_id),
            )
            .await?
            .map_err(ExecError::StatusQuery)?;

            match lifecycle.record(&report) {
                Phase::Submitted | Phase::Polling => {
                    debug!(query_id = %query_id, state = %report.status, "query still running");
                }
                Phase::Succeeded => break,
                Phase::Failed | Phase::Cancelled => {
                    let job = lifecycle.job();
                    let reason = job.reason().unwrap_or("unknown").to_string();
                    warn!(query_id = %query_id, state = %job.status(), reason = %reason, "query did not succeed");
                    return Err(ExecError::JobFailed {
                        query_id,
                        state: job.status().clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            query_id = %query_id,
            polls = lifecycle.polls(),
            result_location = lifecycle.job().result_location().unwrap_or("(none)"),
            "query succeeded"
        );

        if !self.config.fetch_result {
            return Ok(None);
        }

        // 3. Fetch result
        let Some(location) = lifecycle.job().result_location().map(str::to_string) else {
            return Err(ExecError::Fetch {
                query_id,
                location: String::new(),
                source: StorageError::invalid("", "service reported no result location"),
            });
        };

        let data = guard(Some(&query_id), deadline, cancel, self.accessor.fetch(&location))
            .await?
            .map_err(|source| ExecError::Fetch {
                query_id: query_id.clone(),
                location: location.clone(),
                source,
            })?;

        debug!(query_id = %query_id, bytes = data.len(), "fetched result");
        Ok(Some(data))
    }
}

/// Race `fut` against the deadline and the cancellation token outside any
/// query lifecycle, e.g. setup calls and the final result write.
pub async fn with_deadline<F: Future>(
    deadline: Instant,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ExecError> {
    guard(None, deadline, cancel, fut).await
}

/// Race `fut` against the deadline and the cancellation token.
///
/// Cancellation wins ties, so nothing is started once the deadline has
/// passed.
async fn guard<F: Future>(
    query_id: Option<&str>,
    deadline: Instant,
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, ExecError> {
    let cause = tokio::select! {
        biased;
        _ = cancel.cancelled() => CancelCause::Interrupted,
        _ = tokio::time::sleep_until(deadline) => CancelCause::DeadlineExceeded,
        out = fut => return Ok(out),
    };

    match query_id {
        Some(query_id) => warn!(
            query_id = %query_id,
            cause = %cause,
            "abandoning query; remote execution is left running"
        ),
        None => warn!(cause = %cause, "abandoning operation"),
    }
    Err(ExecError::Cancelled {
        query_id: query_id.map(str::to_string),
        cause,
    })
}
