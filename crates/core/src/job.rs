// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.

use crate::chart::ChartResult;
use crate::id::{BatchId, ChartId, DatasetId, JobId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of chart a job renders.
///
/// Unknown hints coerce to `Bar`; the engine never rejects a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Scatter,
}

impl<'de> Deserialize<'de> for ChartKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hint = String::deserialize(deserializer)?;
        Ok(ChartKind::parse_lossy(Some(&hint)))
    }
}

impl ChartKind {
    /// Parse a client hint, coercing anything unrecognised to `Bar`.
    pub fn parse_lossy(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()).as_deref() {
            Some("line") => ChartKind::Line,
            Some("scatter") => ChartKind::Scatter,
            _ => ChartKind::Bar,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        }
    }

    /// Vega-Lite mark name. Scatter plots render as `point` marks.
    pub fn mark(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "point",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress stage of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Generating,
    Rendering,
    Done,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStage::Generating => "generating",
            JobStage::Rendering => "rendering",
            JobStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Canonical failure taxonomy surfaced at the job boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Cancelled,
    ForbiddenImport,
    FormatError,
    Unknown,
}

impl ErrorKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::ForbiddenImport => "forbidden_import",
            ErrorKind::FormatError => "format_error",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Parse a wire code. Anything unrecognised maps to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "timeout" => ErrorKind::Timeout,
            "cancelled" => ErrorKind::Cancelled,
            "forbidden_import" => ErrorKind::ForbiddenImport,
            "format_error" => ErrorKind::FormatError,
            _ => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// One submit item: what to render, from which dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub dataset_id: DatasetId,
    #[serde(default)]
    pub hint: ChartKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// User-supplied analysis snippet; honoured only by the code-exec path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Language of `code`. Only `python` is executable; anything else
    /// makes the job complete as skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<ChartId>,
}

impl ChartRequest {
    pub fn new(dataset_id: impl Into<DatasetId>, hint: ChartKind) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            hint,
            columns: Vec::new(),
            library: None,
            seed: None,
            code: None,
            language: None,
            chart_id: None,
        }
    }

    pub fn with_chart_id(mut self, chart_id: impl Into<ChartId>) -> Self {
        self.chart_id = Some(chart_id.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// A job instance.
///
/// Created on submit; mutated only by the worker that owns it or by the
/// cancel path. Once in a terminal state no further transition occurs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    pub request: ChartRequest,
    pub submitted_at_ms: u64,
    /// Set once, on the queued → running transition. Basis for wait-time
    /// accounting in batch polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ChartResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Short human-readable failure summary (already redacted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Redacted diagnostic detail from the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl Job {
    pub fn new(id: JobId, request: ChartRequest, state: JobState, submitted_at_ms: u64) -> Self {
        Self {
            id,
            batch_id: None,
            request,
            submitted_at_ms,
            started_at_ms: None,
            state,
            stage: None,
            result: None,
            error_kind: None,
            error: None,
            error_detail: None,
        }
    }

    pub fn in_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Wire-shaped status snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id.clone(),
            status: self.state,
            stage: self.stage,
            chart_id: self.request.chart_id.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            error_code: self.error_kind.map(|k| k.as_code().to_string()),
            error_detail: self.error_detail.clone(),
        }
    }
}

/// Job status response shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<ChartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ChartResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
