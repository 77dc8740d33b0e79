use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::Instant;

use qrun_core::config::parse_duration;
use qrun_core::RunConfig;

/// Run SQL against AWS Athena and print or store the results.
///
/// Queries are read from a file or stdin and separated by `;`. Every query is
/// a template over the process environment, e.g. `{{ USER }}`.
#[derive(Parser, Debug)]
#[command(name = "qrun", version, about = "Run Athena queries from the command line")]
pub struct CliArgs {
    /// Overall deadline for all queries, e.g. `90s`, `45m`, `1h30m` [env: QRUN_TIMEOUT, default: 60m]
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Template of the Athena result location [env: QRUN_TEMP_PATH]
    #[arg(long = "temp-path")]
    pub temp_path: Option<String>,

    /// AWS region [env: AWS_REGION, default: eu-central-1]
    #[arg(long)]
    pub region: Option<String>,

    /// Output: `-` for none, empty for stdout, or a `file://`, path or `s3://` location
    #[arg(long, default_value = "")]
    pub out: String,

    /// Input file with `;`-separated queries (default: stdin)
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Print the rendered queries instead of running them
    #[arg(long)]
    pub dry: bool,

    /// Database for the query execution context [env: QRUN_DATABASE]
    #[arg(long)]
    pub database: Option<String>,

    /// Athena workgroup [env: QRUN_WORKGROUP]
    #[arg(long)]
    pub workgroup: Option<String>,

    /// Interval between status polls in milliseconds [env: QRUN_POLL_INTERVAL_MS, default: 500]
    #[arg(long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,
}

impl CliArgs {
    /// Apply flags given on the command line on top of `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(ref temp_path) = self.temp_path {
            config.temp_path_template = temp_path.clone();
        }
        if let Some(ref region) = self.region {
            config.region = region.clone();
        }
        if let Some(ref database) = self.database {
            config.database = Some(database.clone());
        }
        if let Some(ref workgroup) = self.workgroup {
            config.workgroup = Some(workgroup.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
    }
}

/// Deadline for the whole run, `timeout` from now.
pub fn deadline_after(timeout: Duration) -> Result<Instant> {
    Instant::now()
        .checked_add(timeout)
        .with_context(|| format!("timeout of {}s is too large", timeout.as_secs()))
}
