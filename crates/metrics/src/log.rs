// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL event log.

use cw_core::MetricEvent;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One JSON object per line; order reflects arrival within this process.
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event. Persistence failures are logged and swallowed;
    /// callers never fail because the log is unwritable.
    pub fn append(&self, event: &MetricEvent) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            let line = serde_json::to_string(event).unwrap_or_default();
            writeln!(file, "{line}")
        })();
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist metric event");
        }
    }

    /// Stream every parseable line; garbage lines are skipped.
    pub fn load(&self) -> Vec<MetricEvent> {
        let Ok(file) = std::fs::File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
