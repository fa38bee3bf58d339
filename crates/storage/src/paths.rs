// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout under the data root.
//!
//! ```text
//! data/
//!   charts/<job_id>/result.json   per-job artifacts
//!   charts/saved.json             saved-chart store
//!   metrics/events.jsonl          append-only event log
//!   datasets/<id>.csv             uploaded datasets (external collaborator)
//! ```

use cw_core::{DatasetId, JobId};
use std::path::{Path, PathBuf};

/// Root of all persisted state. Defaults to `./data`.
#[derive(Debug, Clone)]
pub struct DataRoot(PathBuf);

impl DataRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.0.join("charts")
    }

    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.charts_dir().join(job_id.as_str())
    }

    pub fn job_result_file(&self, job_id: &JobId) -> PathBuf {
        self.job_dir(job_id).join("result.json")
    }

    pub fn saved_charts_file(&self) -> PathBuf {
        self.charts_dir().join("saved.json")
    }

    pub fn metrics_log_file(&self) -> PathBuf {
        self.0.join("metrics").join("events.jsonl")
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.0.join("datasets")
    }

    pub fn dataset_csv(&self, id: &DatasetId) -> PathBuf {
        self.datasets_dir().join(format!("{}.csv", id.as_str()))
    }
}

impl Default for DataRoot {
    fn default() -> Self {
        Self::new("data")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
