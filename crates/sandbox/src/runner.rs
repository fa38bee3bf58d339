// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot sandboxed execution of chart snippets.
//!
//! Each invocation gets a fresh temporary working directory (pruned on
//! exit, failure included), a scrubbed environment, and kernel resource
//! caps. The parent polls the child and kills it on cancel or timeout;
//! no attempt is made to interrupt the child gently.

use crate::error::SandboxError;
use crate::guard;
use crate::limits::{self, ResourceLimits};
use crate::snippet;
use crate::template;
use cw_core::{ChartKind, ChartResult, DatasetId, JobId};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Granularity of the parent's child-status poll.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Row bound for generated charts reading real CSV data.
const MAX_CSV_ROWS: u64 = 200;

/// Cancellation probe observed at runner checkpoints.
pub type CancelFn<'a> = &'a (dyn Fn() -> bool + Sync);

/// Executes chart snippets and constrained user code in isolation.
#[derive(Debug, Clone)]
pub struct SandboxRunner {
    timeout: Duration,
    limits: ResourceLimits,
    python: PathBuf,
    datasets_dir: PathBuf,
    child_env: Vec<(String, String)>,
}

impl SandboxRunner {
    pub fn new() -> Self {
        let mut child_env = Vec::new();
        // Forward the test-only delay knob when the host process carries it.
        if let Ok(delay) = std::env::var(snippet::DELAY_ENV) {
            child_env.push((snippet::DELAY_ENV.to_string(), delay));
        }
        Self {
            timeout: DEFAULT_TIMEOUT,
            limits: ResourceLimits::default(),
            python: PathBuf::from("python3"),
            datasets_dir: PathBuf::from("data/datasets"),
            child_env,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_datasets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.datasets_dir = dir.into();
        self
    }

    pub fn with_child_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.child_env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Render a built-in template in-process. Trusted path, no child.
    pub fn run_template(
        &self,
        kind: ChartKind,
        dataset_id: Option<&DatasetId>,
        cancel: Option<CancelFn<'_>>,
    ) -> Result<ChartResult, SandboxError> {
        let start = Instant::now();
        if is_cancelled(cancel) {
            return Err(SandboxError::cancelled());
        }
        let mut result = template::template_result(kind, dataset_id);
        result.meta_insert("sandbox", json!("inline"));
        result.meta_insert("duration_ms", json!(elapsed_ms(start)));
        Ok(result)
    }

    /// Render a built-in template in an isolated child interpreter.
    pub fn run_template_subprocess(
        &self,
        kind: ChartKind,
        dataset_id: Option<&DatasetId>,
        cancel: Option<CancelFn<'_>>,
    ) -> Result<ChartResult, SandboxError> {
        let input = json!({
            "kind": kind.as_str(),
            "dataset_id": dataset_id.map(DatasetId::as_str),
        });
        let mut result = self.run_child(snippet::TEMPLATE_SNIPPET, &input, cancel, self.timeout)?;
        result.meta_insert("engine", json!("template"));
        result.meta_insert("sandbox", json!("subprocess"));
        result.meta_insert("hint", json!(kind.as_str()));
        Ok(result)
    }

    /// Render a chart from real dataset rows in an isolated child.
    pub fn run_generated_chart(
        &self,
        job_id: &JobId,
        kind: ChartKind,
        dataset_id: Option<&DatasetId>,
        cancel: Option<CancelFn<'_>>,
    ) -> Result<ChartResult, SandboxError> {
        let input = json!({
            "kind": kind.as_str(),
            "csv_path": dataset_id.map(|id| self.dataset_csv_path(id)),
            "max_rows": MAX_CSV_ROWS,
        });
        let mut result = self.run_child(snippet::GENERATED_SNIPPET, &input, cancel, self.timeout)?;
        result.meta_insert("engine", json!("generated"));
        result.meta_insert("job_id", json!(job_id.as_str()));
        result.meta_insert("hint", json!(kind.as_str()));
        Ok(result)
    }

    /// Execute a user-provided analysis snippet under the static allowlist
    /// plus subprocess isolation.
    pub fn run_code_exec(
        &self,
        code: &str,
        dataset_id: Option<&DatasetId>,
        timeout: Duration,
    ) -> Result<ChartResult, SandboxError> {
        guard::scan(code).map_err(|reason| SandboxError::forbidden(&reason))?;
        let input = json!({
            "csv_path": dataset_id.map(|id| self.dataset_csv_path(id)),
        });
        let program = snippet::user_harness(code);
        let mut result = self.run_child(&program, &input, None, timeout)?;
        result.meta_insert("engine", json!("exec"));
        Ok(result)
    }

    fn dataset_csv_path(&self, id: &DatasetId) -> String {
        let path = self.datasets_dir.join(format!("{}.csv", id.as_str()));
        std::fs::canonicalize(&path)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Spawn `program` in a fresh sandbox directory, poll it to completion,
    /// and parse its stdout as a chart result.
    fn run_child(
        &self,
        program: &str,
        input: &Value,
        cancel: Option<CancelFn<'_>>,
        timeout: Duration,
    ) -> Result<ChartResult, SandboxError> {
        if is_cancelled(cancel) {
            return Err(SandboxError::cancelled());
        }

        let dir = tempfile::Builder::new()
            .prefix("cw-sbx-")
            .tempdir()
            .map_err(|e| SandboxError::unknown(&format!("sandbox dir: {e}")))?;
        let payload = serde_json::to_vec(input)
            .map_err(|e| SandboxError::unknown(&format!("sandbox input: {e}")))?;
        std::fs::write(dir.path().join("in.json"), payload)
            .map_err(|e| SandboxError::unknown(&format!("sandbox input: {e}")))?;

        let mut cmd = Command::new(&self.python);
        cmd.args(["-I", "-c", program])
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        limits::scrub_env(&mut cmd, &self.child_env);
        limits::apply(&mut cmd, self.limits);

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            SandboxError::unknown(&format!("spawn {}: {e}", self.python.display()))
        })?;
        tracing::debug!(dir = %dir.path().display(), "sandbox child started");

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill(&mut child);
                    return Err(SandboxError::unknown(&format!("child wait: {e}")));
                }
            }
            if is_cancelled(cancel) {
                tracing::debug!("cancel observed, killing sandbox child");
                kill(&mut child);
                return Err(SandboxError::cancelled());
            }
            if start.elapsed() >= timeout {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "sandbox child timed out");
                kill(&mut child);
                return Err(SandboxError::timeout(timeout.as_millis() as u64));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let duration_ms = elapsed_ms(start);

        let mut result: ChartResult = serde_json::from_str(stdout.trim()).map_err(|_| {
            SandboxError::format(
                &format!("child exited ({status}) without a valid chart result"),
                &stderr,
            )
        })?;
        if result.outputs.is_empty() {
            return Err(SandboxError::format("chart result has no outputs", &stderr));
        }
        result.meta_insert("duration_ms", json!(duration_ms));
        Ok(result)
    }
}

impl Default for SandboxRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cancelled(cancel: Option<CancelFn<'_>>) -> bool {
    cancel.map(|probe| probe()).unwrap_or(false)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// True when `python` can be invoked; used by callers to pick the inline
/// template path on hosts without an interpreter.
pub fn interpreter_available(python: &Path) -> bool {
    Command::new(python)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
