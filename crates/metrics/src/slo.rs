// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLO snapshot and threshold evaluation over the metrics store and
//! event log.

use crate::log::EventLog;
use crate::store::{EventSummary, MetricsStore};
use cw_core::MetricEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Events whose outcome breakdown is computed from the persisted log.
pub const BREAKDOWN_EVENTS: &[&str] = &["ChartJobFinished", "ChartBatchFinished"];

/// Outcome counters for one event name, streamed from the event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub total: u64,
    /// Rounded to three decimals; 0.0 with no data.
    pub success_rate: f64,
    pub failures: u64,
    pub failure_by_code: BTreeMap<String, u64>,
}

/// Point-in-time read of per-event summaries plus outcome breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct SloSnapshot {
    pub events: BTreeMap<String, EventSummary>,
    pub breakdown: BTreeMap<String, StatusBreakdown>,
}

/// Per-event thresholds. Absent bounds are not evaluated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundedness: Option<f64>,
}

/// Violation flags for one event. A flag is present only when the
/// matching threshold was configured; missing data evaluates to false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Violations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p95_exceeded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groundedness_below: Option<bool>,
}

impl Violations {
    /// True when any configured bound is broken.
    pub fn any(&self) -> bool {
        self.p95_exceeded == Some(true) || self.groundedness_below == Some(true)
    }
}

/// The metrics subsystem: in-memory store plus append-only log.
pub struct Metrics {
    store: MetricsStore,
    log: EventLog,
}

impl Metrics {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            store: MetricsStore::new(),
            log: EventLog::new(log_path),
        }
    }

    pub fn log_path(&self) -> &std::path::Path {
        self.log.path()
    }

    /// Record in memory only.
    pub fn record(&self, event: &MetricEvent) {
        self.store.record(
            &event.event_name,
            event.duration_ms.map(|d| d as f64),
            event.groundedness,
        );
    }

    /// Append to the event log only. Never fails the caller.
    pub fn persist(&self, event: &MetricEvent) {
        self.log.append(event);
    }

    /// The usual path: record in memory and append to the log.
    pub fn record_and_persist(&self, event: &MetricEvent) {
        self.record(event);
        self.persist(event);
    }

    /// Replay an event stream into a reset store; used by offline checkers.
    pub fn bootstrap_from_events(&self, events: impl IntoIterator<Item = MetricEvent>) {
        self.store.reset();
        for event in events {
            self.record(&event);
        }
    }

    /// Events currently persisted in the log.
    pub fn load_log(&self) -> Vec<MetricEvent> {
        self.log.load()
    }

    /// In-memory summaries plus log-derived outcome breakdown.
    pub fn snapshot(&self) -> SloSnapshot {
        SloSnapshot {
            events: self.store.summaries(),
            breakdown: self.status_breakdown(BREAKDOWN_EVENTS),
        }
    }

    fn status_breakdown(&self, event_names: &[&str]) -> BTreeMap<String, StatusBreakdown> {
        let log = self.log.load();
        let mut counters: BTreeMap<String, StatusBreakdown> = event_names
            .iter()
            .map(|name| (name.to_string(), StatusBreakdown::default()))
            .collect();
        let mut ok_counts: BTreeMap<String, u64> = BTreeMap::new();

        for event in &log {
            let Some(entry) = counters.get_mut(&event.event_name) else {
                continue;
            };
            entry.total += 1;
            let status = event
                .status
                .as_deref()
                .unwrap_or("")
                .to_ascii_lowercase();
            match status.as_str() {
                "succeeded" | "success" | "ok" => {
                    *ok_counts.entry(event.event_name.clone()).or_insert(0) += 1;
                }
                "failed" | "error" | "cancelled" => {
                    entry.failures += 1;
                    let code = event
                        .error_code
                        .clone()
                        .or_else(|| event.props.get("error").and_then(|v| v.as_str()).map(String::from))
                        .unwrap_or_else(|| "unknown".to_string());
                    *entry.failure_by_code.entry(code).or_insert(0) += 1;
                }
                _ => {}
            }
        }

        for (name, entry) in counters.iter_mut() {
            let ok = ok_counts.get(name).copied().unwrap_or(0);
            entry.success_rate = if entry.total > 0 {
                (ok as f64 / entry.total as f64 * 1000.0).round() / 1000.0
            } else {
                0.0
            };
        }
        counters
    }

    /// Compare the snapshot against per-event thresholds.
    pub fn detect_violations(
        &self,
        config: &BTreeMap<String, Thresholds>,
    ) -> BTreeMap<String, Violations> {
        let events = self.store.summaries();
        config
            .iter()
            .map(|(name, thresholds)| {
                let summary = events.get(name);
                let has_data = summary.map(|s| s.count > 0).unwrap_or(false);
                let report = Violations {
                    p95_exceeded: thresholds.p95.map(|bound| {
                        has_data
                            && summary.map(|s| s.p95 as f64 > bound).unwrap_or(false)
                    }),
                    groundedness_below: thresholds.groundedness.map(|bound| {
                        has_data
                            && summary
                                .map(|s| s.groundedness_min < bound)
                                .unwrap_or(false)
                    }),
                };
                (name.clone(), report)
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "slo_tests.rs"]
mod tests;
