// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, read from the environment once at construction.

use cw_metrics::Thresholds;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Environment knobs.
pub const ENV_DATA_DIR: &str = "CHARTWORK_DATA_DIR";
pub const ENV_ASYNC: &str = "CHARTWORK_ASYNC";
pub const ENV_WORKERS: &str = "CHARTWORK_WORKERS";
pub const ENV_EXECUTE: &str = "CHARTWORK_EXECUTE";
pub const ENV_EXECUTE_USER_CODE: &str = "CHARTWORK_EXECUTE_USER_CODE";
pub const ENV_SANDBOX_SUBPROCESS: &str = "CHARTWORK_SANDBOX_SUBPROCESS";
pub const ENV_SANDBOX_TIMEOUT_MS: &str = "CHARTWORK_SANDBOX_TIMEOUT_MS";
pub const ENV_METRICS_LOG: &str = "CHARTWORK_METRICS_LOG";
pub const ENV_SLO_THRESHOLDS: &str = "CHARTWORK_SLO_THRESHOLDS";
pub const ENV_PYTHON: &str = "CHARTWORK_PYTHON";

/// Construction-time engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of persisted state; default `./data`.
    pub data_root: PathBuf,
    /// Submit enqueues and a worker completes the job.
    pub async_mode: bool,
    /// Size of the worker pool (async mode only).
    pub workers: u32,
    /// Render charts from real dataset rows in a child interpreter.
    pub execute_generated: bool,
    /// Honour user-supplied code via the code-exec path.
    pub execute_user_code: bool,
    /// Run template rendering in a child interpreter instead of inline.
    pub sandbox_subprocess: bool,
    /// Wall-clock bound for sandbox children.
    pub sandbox_timeout: Duration,
    /// Event-log override; default `<data_root>/metrics/events.jsonl`.
    pub metrics_log: Option<PathBuf>,
    /// Per-event SLO thresholds.
    pub slo_thresholds: BTreeMap<String, Thresholds>,
    /// Child interpreter binary.
    pub python: PathBuf,
    /// Spawn the worker pool on construction (async mode). Off only in
    /// tests that drive the queue by hand.
    pub spawn_workers: bool,
}

impl EngineConfig {
    /// Read every knob from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config.data_root = PathBuf::from(dir);
        }
        config.async_mode = env_flag(ENV_ASYNC);
        config.workers = env_parse(ENV_WORKERS).unwrap_or(1).max(1);
        config.execute_generated = env_flag(ENV_EXECUTE);
        config.execute_user_code = env_flag(ENV_EXECUTE_USER_CODE);
        config.sandbox_subprocess = env_flag(ENV_SANDBOX_SUBPROCESS);
        if let Some(ms) = env_parse::<u64>(ENV_SANDBOX_TIMEOUT_MS) {
            config.sandbox_timeout = Duration::from_millis(ms);
        }
        if let Ok(path) = std::env::var(ENV_METRICS_LOG) {
            config.metrics_log = Some(PathBuf::from(path));
        }
        if let Ok(json) = std::env::var(ENV_SLO_THRESHOLDS) {
            match serde_json::from_str(&json) {
                Ok(thresholds) => config.slo_thresholds = thresholds,
                Err(e) => tracing::warn!(error = %e, "ignoring malformed SLO threshold override"),
            }
        }
        if let Ok(python) = std::env::var(ENV_PYTHON) {
            config.python = PathBuf::from(python);
        }
        config
    }

    pub fn effective_parallelism(&self, requested: u32) -> u32 {
        requested.clamp(1, self.workers.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            async_mode: false,
            workers: 1,
            execute_generated: false,
            execute_user_code: false,
            sandbox_subprocess: false,
            sandbox_timeout: Duration::from_secs(10),
            metrics_log: None,
            slo_thresholds: default_thresholds(),
            python: PathBuf::from("python3"),
            spawn_workers: true,
        }
    }
}

/// Built-in SLO bounds, overridable via [`ENV_SLO_THRESHOLDS`].
pub fn default_thresholds() -> BTreeMap<String, Thresholds> {
    let mut map = BTreeMap::new();
    map.insert(
        "EDAReportGenerated".to_string(),
        Thresholds {
            p95: Some(10_000.0),
            groundedness: Some(0.9),
        },
    );
    map.insert(
        "EDAQueryAnswered".to_string(),
        Thresholds {
            p95: Some(4_000.0),
            groundedness: Some(0.8),
        },
    );
    map
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).unwrap_or_default().as_str(),
        "1" | "true" | "TRUE"
    )
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
