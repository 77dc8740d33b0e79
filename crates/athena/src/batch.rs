//! Sequential execution of several queries under one deadline.

use bytes::Bytes;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use qrun_storage::ObjectAccessor;

use crate::client::QueryService;
use crate::error::{ErrorKind, ExecError};
use crate::executor::QueryExecutor;

/// A batch stopped at query `index` (zero-based) of `total`.
#[derive(Debug, thiserror::Error)]
#[error("query {}/{} failed [{}]: {source}", .index + 1, .total, .source.kind())]
pub struct BatchError {
    pub index: usize,
    pub total: usize,
    #[source]
    pub source: ExecError,
}

impl BatchError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Runs queries one after another, stopping at the first error.
///
/// Results are handed to a sink as soon as each query finishes. A sink error
/// aborts the batch like a query error does.
pub struct BatchRunner<'a, S, A> {
    executor: &'a QueryExecutor<S, A>,
}

impl<'a, S: QueryService, A: ObjectAccessor> BatchRunner<'a, S, A> {
    pub fn new(executor: &'a QueryExecutor<S, A>) -> Self {
        Self { executor }
    }

    /// Execute `queries` in order. Returns how many completed.
    pub async fn run<F>(
        &self,
        queries: &[String],
        deadline: Instant,
        cancel: &CancellationToken,
        mut sink: F,
    ) -> Result<usize, BatchError>
    where
        F: FnMut(usize, Bytes) -> Result<(), ExecError>,
    {
        let total = queries.len();
        for (index, query) in queries.iter().enumerate() {
            info!(index = index + 1, total, "executing query");

            let outcome = match self.executor.execute(query, deadline, cancel).await {
                Ok(Some(data)) => sink(index, data),
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(source) = outcome {
                error!(index = index + 1, total, kind = %source.kind(), error = %source, "batch aborted");
                return Err(BatchError {
                    index,
                    total,
                    source,
                });
            }
        }
        Ok(total)
    }
}
