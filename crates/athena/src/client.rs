//! AWS Athena query service client.
//!
//! [`QueryService`] is the two-call contract the executor drives: submit a
//! query, then ask for its status. [`AthenaClient`] implements it over the
//! AWS SDK. Neither retries: a failed remote call is surfaced immediately.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};
use tracing::{debug, info};

use qrun_core::{JobStatus, StatusReport};

use crate::error::AthenaError;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Remote query service as seen by the executor.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Start `query`, asking the service to write its result under
    /// `output_location`. Returns the service-assigned job id.
    async fn submit(&self, query: &str, output_location: &str) -> Result<String, AthenaError>;

    /// Fetch the current status of a submitted job.
    async fn get_status(&self, query_id: &str) -> Result<StatusReport, AthenaError>;
}

/// Load the shared AWS SDK config for `region`.
pub async fn load_aws_config(region: &str) -> aws_types::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(aws_sdk_athena::config::Region::new(region.to_string()))
        .load()
        .await
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`QueryService`] backed by AWS Athena.
pub struct AthenaClient {
    athena_client: aws_sdk_athena::Client,
    database: Option<String>,
    workgroup: Option<String>,
}

impl AthenaClient {
    pub fn new(sdk_config: &aws_types::SdkConfig) -> Self {
        info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("(none)"),
            "AthenaClient initialised"
        );
        Self {
            athena_client: aws_sdk_athena::Client::new(sdk_config),
            database: None,
            workgroup: None,
        }
    }

    /// Run queries against `database` unless they qualify table names.
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database.filter(|d| !d.is_empty());
        self
    }

    /// Submit into `workgroup` instead of the account default.
    pub fn with_workgroup(mut self, workgroup: Option<String>) -> Self {
        self.workgroup = workgroup.filter(|w| !w.is_empty());
        self
    }
}

#[async_trait]
impl QueryService for AthenaClient {
    async fn submit(&self, query: &str, output_location: &str) -> Result<String, AthenaError> {
        let mut req = self
            .athena_client
            .start_query_execution()
            .query_string(query)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(output_location)
                    .build(),
            );
        if let Some(ref database) = self.database {
            req = req.query_execution_context(
                QueryExecutionContext::builder().database(database).build(),
            );
        }
        if let Some(ref workgroup) = self.workgroup {
            req = req.work_group(workgroup);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| AthenaError::Submission(DisplayErrorContext(&e).to_string()))?;

        let query_id = resp
            .query_execution_id()
            .ok_or_else(|| AthenaError::Submission("no query execution id returned".into()))?
            .to_string();

        info!(query_id = %query_id, "query execution started");
        Ok(query_id)
    }

    async fn get_status(&self, query_id: &str) -> Result<StatusReport, AthenaError> {
        let resp = self
            .athena_client
            .get_query_execution()
            .query_execution_id(query_id)
            .send()
            .await
            .map_err(|e| AthenaError::StatusQuery {
                query_id: query_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let qe = resp.query_execution().ok_or_else(|| AthenaError::StatusQuery {
            query_id: query_id.to_string(),
            reason: "no query execution in response".into(),
        })?;

        let status = qe
            .status()
            .and_then(|s| s.state())
            .map(|s| JobStatus::parse(s.as_str()))
            .unwrap_or(JobStatus::Queued);

        let report = StatusReport {
            status,
            result_location: qe
                .result_configuration()
                .and_then(|rc| rc.output_location())
                .map(str::to_string),
            reason: qe
                .status()
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
        };

        debug!(query_id = %query_id, state = %report.status, "polled query status");
        Ok(report)
    }
}
