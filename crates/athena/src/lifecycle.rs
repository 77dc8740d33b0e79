//! Query lifecycle state machine.
//!
//! ```text
//! Submitted ──► Polling ──► Succeeded
//!     │            │  ▲  ├──► Failed
//!     └────────────┴──┘  └──► Cancelled
//! ```
//!
//! Transitions are driven only by status reports. Terminal phases absorb
//! every later report, so a job that finished stays finished.

use qrun_core::{JobStatus, QueryJob, StatusReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    Cancelled,
}

impl Phase {
    /// Next phase after observing `status`.
    pub fn advance(self, status: &JobStatus) -> Phase {
        if self.is_terminal() {
            return self;
        }
        match status {
            JobStatus::Succeeded => Phase::Succeeded,
            JobStatus::Failed => Phase::Failed,
            JobStatus::Cancelled => Phase::Cancelled,
            JobStatus::Queued | JobStatus::Running | JobStatus::Unknown(_) => Phase::Polling,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed | Phase::Cancelled)
    }
}

/// One job plus where it is in its lifecycle.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    job: QueryJob,
    phase: Phase,
    polls: u64,
}

impl Lifecycle {
    pub fn submitted(job: QueryJob) -> Self {
        Self {
            job,
            phase: Phase::Submitted,
            polls: 0,
        }
    }

    pub fn job(&self) -> &QueryJob {
        &self.job
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of status reports applied before reaching a terminal phase.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Apply a status report and return the resulting phase.
    pub fn record(&mut self, report: &StatusReport) -> Phase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        self.polls = self.polls.saturating_add(1);
        self.job.observe(report);
        self.phase = self.phase.advance(&report.status);
        self.phase
    }
}
