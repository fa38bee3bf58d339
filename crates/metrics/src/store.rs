// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory per-event series and percentile summaries.
//!
//! Percentiles use linear interpolation between the two order statistics
//! bracketing the requested rank: deterministic, no streaming sketch,
//! right-sized for the small in-process sample counts this store sees.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default, Clone)]
struct EventSeries {
    durations: Vec<f64>,
    groundedness: Vec<f64>,
}

/// Per-event summary exposed in the SLO snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub count: usize,
    /// Interpolated 95th percentile of durations, integer milliseconds.
    pub p95: u64,
    /// Minimum groundedness observed; 1.0 when none was recorded.
    pub groundedness_min: f64,
}

/// Thread-safe in-memory metrics aggregation.
#[derive(Default)]
pub struct MetricsStore {
    inner: Mutex<HashMap<String, EventSeries>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Safe under concurrent callers.
    pub fn record(&self, event_name: &str, duration_ms: Option<f64>, groundedness: Option<f64>) {
        let mut inner = self.inner.lock();
        let series = inner.entry(event_name.to_string()).or_default();
        if let Some(duration) = duration_ms {
            series.durations.push(duration);
        }
        if let Some(score) = groundedness {
            series.groundedness.push(score);
        }
    }

    pub fn reset(&self) {
        self.inner.lock().clear();
    }

    /// Summaries for every event seen so far.
    pub fn summaries(&self) -> BTreeMap<String, EventSummary> {
        let inner = self.inner.lock();
        inner
            .iter()
            .map(|(name, series)| (name.clone(), summarize(series)))
            .collect()
    }

    pub fn summary(&self, event_name: &str) -> Option<EventSummary> {
        self.inner.lock().get(event_name).map(summarize)
    }
}

fn summarize(series: &EventSeries) -> EventSummary {
    let count = if series.durations.is_empty() {
        series.groundedness.len()
    } else {
        series.durations.len()
    };
    EventSummary {
        count,
        p95: percentile(&series.durations, 0.95),
        groundedness_min: series
            .groundedness
            .iter()
            .copied()
            .reduce(f64::min)
            .unwrap_or(1.0),
    }
}

/// Interpolated percentile of `values`, rounded to integer milliseconds.
/// An empty sample reads as 0; a single sample is its own percentile.
pub fn percentile(values: &[f64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let pct = pct.clamp(0.0, 1.0);
    let mut ordered = values.to_vec();
    ordered.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if ordered.len() == 1 {
        return ordered[0].round() as u64;
    }
    let pos = (ordered.len() - 1) as f64 * pct;
    let lower = pos.floor() as usize;
    let upper = (lower + 1).min(ordered.len() - 1);
    let fraction = pos - lower as f64;
    let interpolated = ordered[lower] + (ordered[upper] - ordered[lower]) * fraction;
    interpolated.round() as u64
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
