//! Query lifecycle against AWS Athena: submit, poll until terminal, fetch.

pub mod batch;
pub mod client;
pub mod error;
pub mod executor;
pub mod identity;
pub mod lifecycle;

pub use batch::{BatchError, BatchRunner};
pub use client::{load_aws_config, AthenaClient, QueryService};
pub use error::{AthenaError, CancelCause, ErrorKind, ExecError};
pub use executor::{with_deadline, ExecutorConfig, QueryExecutor};
pub use identity::account_id;
pub use lifecycle::{Lifecycle, Phase};
