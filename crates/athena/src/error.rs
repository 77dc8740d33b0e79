use std::fmt;

use qrun_core::JobStatus;
use qrun_storage::StorageError;

/// Errors from the remote query service calls themselves.
///
/// A job that legitimately ends in `FAILED` is not an `AthenaError`; it is
/// reported through [`ExecError::JobFailed`].
#[derive(Debug, thiserror::Error)]
pub enum AthenaError {
    /// `StartQueryExecution` failed or returned no execution id.
    #[error("could not start query execution: {0}")]
    Submission(String),

    /// `GetQueryExecution` failed at the transport or auth level.
    #[error("could not get status of query {query_id}: {reason}")]
    StatusQuery { query_id: String, reason: String },

    /// `GetCallerIdentity` failed.
    #[error("could not get caller identity: {0}")]
    Identity(String),
}

/// Why a lifecycle was abandoned locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    DeadlineExceeded,
    Interrupted,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::DeadlineExceeded => f.write_str("deadline exceeded"),
            CancelCause::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Category tag of an [`ExecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Submission,
    StatusQuery,
    JobFailed,
    Cancelled,
    Fetch,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Submission => "submission",
            ErrorKind::StatusQuery => "status",
            ErrorKind::JobFailed => "job_failed",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Store => "store",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can end one query lifecycle early.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Submission(AthenaError),

    #[error(transparent)]
    StatusQuery(AthenaError),

    /// The service finished the job as `FAILED` or `CANCELLED`.
    #[error("query {query_id} {state}: {reason}")]
    JobFailed {
        query_id: String,
        state: JobStatus,
        reason: String,
    },

    /// Abandoned locally. The remote job, if submitted, is left running.
    /// Without a query id the abandoned work was setup or the result write.
    #[error("{cause}{}", .query_id.as_ref().map(|id| format!(" while running query {id}")).unwrap_or_default())]
    Cancelled {
        query_id: Option<String>,
        cause: CancelCause,
    },

    #[error("could not fetch result of query {query_id} from {location:?}: {source}")]
    Fetch {
        query_id: String,
        location: String,
        #[source]
        source: StorageError,
    },

    #[error("could not write result to {location}: {source}")]
    Store {
        location: String,
        #[source]
        source: StorageError,
    },
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::Submission(_) => ErrorKind::Submission,
            ExecError::StatusQuery(_) => ErrorKind::StatusQuery,
            ExecError::JobFailed { .. } => ErrorKind::JobFailed,
            ExecError::Cancelled { .. } => ErrorKind::Cancelled,
            ExecError::Fetch { .. } => ErrorKind::Fetch,
            ExecError::Store { .. } => ErrorKind::Store,
        }
    }

    pub fn store(location: impl Into<String>, source: impl Into<StorageError>) -> Self {
        ExecError::Store {
            location: location.into(),
            source: source.into(),
        }
    }
}
