//! Query job model shared by the service client and the executor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a remote query job as reported by the service.
///
/// Only [`Succeeded`](JobStatus::Succeeded), [`Failed`](JobStatus::Failed) and
/// [`Cancelled`](JobStatus::Cancelled) are terminal. Anything the service
/// reports that we do not recognise is kept verbatim in
/// [`Unknown`](JobStatus::Unknown) and treated as still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    Unknown(String),
}

impl JobStatus {
    /// Map a service state string (`"RUNNING"`, `"SUCCEEDED"`, ...) to a status.
    pub fn parse(state: &str) -> Self {
        match state {
            "QUEUED" => JobStatus::Queued,
            "RUNNING" => JobStatus::Running,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" => JobStatus::Cancelled,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Unknown(s) => s,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answer to a status call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: JobStatus,
    /// Where the service wrote the result. Only meaningful once succeeded.
    pub result_location: Option<String>,
    /// Service-provided explanation of the last state change.
    pub reason: Option<String>,
}

impl StatusReport {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            result_location: None,
            reason: None,
        }
    }

    pub fn with_result_location(mut self, location: impl Into<String>) -> Self {
        self.result_location = Some(location.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A submitted query tracked by the executor for the length of one lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJob {
    id: String,
    pub query: String,
    pub output_location: String,
    status: JobStatus,
    result_location: Option<String>,
    reason: Option<String>,
}

impl QueryJob {
    /// A job the service has just accepted.
    pub fn submitted(
        id: impl Into<String>,
        query: impl Into<String>,
        output_location: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            output_location: output_location.into(),
            status: JobStatus::Queued,
            result_location: None,
            reason: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn result_location(&self) -> Option<&str> {
        self.result_location.as_deref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Record a status report. Returns `false` and leaves the job untouched
    /// when a terminal status was already recorded.
    pub fn observe(&mut self, report: &StatusReport) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = report.status.clone();
        if report.result_location.is_some() {
            self.result_location = report.result_location.clone();
        }
        if report.reason.is_some() {
            self.reason = report.reason.clone();
        }
        true
    }
}
