// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metric event record, as held in memory and appended to the JSONL log.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observability event.
///
/// Serialized as a single JSON line; free-form properties flatten into
/// the top-level object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub event_name: String,
    pub ts_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Bounded score in [0,1]; tracked by its per-event minimum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundedness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(flatten)]
    pub props: serde_json::Map<String, Value>,
}

impl MetricEvent {
    pub fn new(event_name: impl Into<String>, ts_ms: u64) -> Self {
        Self {
            event_name: event_name.into(),
            ts_ms,
            duration_ms: None,
            groundedness: None,
            status: None,
            error_code: None,
            props: serde_json::Map::new(),
        }
    }

    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    pub fn with_groundedness(mut self, score: f64) -> Self {
        self.groundedness = Some(score);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
