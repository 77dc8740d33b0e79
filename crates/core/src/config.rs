use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default result location template for the query service.
///
/// Mirrors the bucket naming the Athena console uses for unsaved queries.
pub const DEFAULT_TEMP_PATH: &str = "s3://aws-athena-query-results-{{ account }}-{{ region }}/Unsaved/{{ now(\"%Y\") }}/{{ now(\"%m\") }}/{{ now(\"%d\") }}";

const DEFAULT_REGION: &str = "eu-central-1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── RunConfig ─────────────────────────────────────────────────

/// Everything one `qrun` invocation needs besides the queries themselves.
///
/// Built from the environment first, then overridden by CLI flags. The
/// executor receives the relevant pieces explicitly; nothing below the binary
/// reads process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// AWS region for the query service and the result bucket.
    pub region: String,
    /// Template of the service-side result location.
    pub temp_path_template: String,
    /// Overall deadline for the whole batch.
    pub timeout: Duration,
    /// Fixed interval between status polls.
    pub poll_interval_ms: u64,
    /// Optional database for the query execution context.
    pub database: Option<String>,
    /// Optional workgroup to submit into.
    pub workgroup: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            region: DEFAULT_REGION.to_string(),
            temp_path_template: DEFAULT_TEMP_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            database: None,
            workgroup: None,
        }
    }
}

impl RunConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `QRUN_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, CoreError> {
        let profile = env_opt("QRUN_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn from_env_profiled(profile: &str) -> Result<Self, CoreError> {
        let p = profile.to_uppercase();
        let p = p.as_str();

        let timeout = match profiled_env_opt(p, "QRUN_TIMEOUT") {
            Some(raw) => parse_duration(&raw)
                .map_err(|e| CoreError::Config(format!("QRUN_TIMEOUT: {e}")))?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            profile: p.to_string(),
            region: profiled_env_or(p, "AWS_REGION", DEFAULT_REGION),
            temp_path_template: profiled_env_or(p, "QRUN_TEMP_PATH", DEFAULT_TEMP_PATH),
            timeout,
            poll_interval_ms: profiled_env_u64(p, "QRUN_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            database: profiled_env_opt(p, "QRUN_DATABASE"),
            workgroup: profiled_env_opt(p, "QRUN_WORKGROUP"),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::debug!(
            profile = self.profile_label(),
            region = %self.region,
            timeout_secs = self.timeout.as_secs(),
            poll_interval_ms = self.poll_interval_ms,
            database = self.database.as_deref().unwrap_or("(none)"),
            workgroup = self.workgroup.as_deref().unwrap_or("(none)"),
            "config loaded"
        );
    }
}

// ── Duration parsing ──────────────────────────────────────────

/// Parse a duration such as `90s`, `45m`, `2h`, `1h30m`, `250ms` or a plain
/// number of seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration {input:?}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(60 * 60).map(Duration::from_secs),
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        total = part
            .and_then(|part| total.checked_add(part))
            .ok_or_else(|| format!("duration {input:?} too large"))?;
        rest = &rest[unit_len..];
    }
    Ok(total)
}

// ── Tests ────────────────────────────────────────────────────────
