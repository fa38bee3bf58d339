// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLO threshold evaluation over recorded events.

use cw_core::MetricEvent;
use cw_metrics::{Metrics, Thresholds};
use std::collections::BTreeMap;

#[test]
fn groundedness_violation_is_detected_but_p95_holds() {
    let dir = tempfile::tempdir().unwrap();
    let metrics = Metrics::new(dir.path().join("events.jsonl"));

    let durations = [120u64, 150, 140, 145, 155, 320];
    let scores = [0.92, 0.92, 0.92, 0.92, 0.92, 0.7];
    for (duration, score) in durations.iter().zip(scores) {
        metrics.record(
            &MetricEvent::new("EDAReportGenerated", 0)
                .with_duration_ms(*duration)
                .with_groundedness(score),
        );
    }

    let mut thresholds = BTreeMap::new();
    thresholds.insert(
        "EDAReportGenerated".to_string(),
        Thresholds {
            p95: Some(400.0),
            groundedness: Some(0.9),
        },
    );

    let report = metrics.detect_violations(&thresholds);
    let violations = report["EDAReportGenerated"];
    assert_eq!(violations.p95_exceeded, Some(false));
    assert_eq!(violations.groundedness_below, Some(true));
}

#[test]
fn offline_bootstrap_reproduces_the_live_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let live = Metrics::new(dir.path().join("events.jsonl"));
    for duration in [100u64, 200, 300] {
        live.record_and_persist(
            &MetricEvent::new("ChartJobFinished", 0)
                .with_duration_ms(duration)
                .with_status("succeeded"),
        );
    }
    let live_snapshot = live.snapshot();

    // A fresh checker over the same log file sees the same summaries.
    let checker = Metrics::new(dir.path().join("events.jsonl"));
    checker.bootstrap_from_events(checker.load_log());
    let replayed = checker.snapshot();

    similar_asserts::assert_eq!(
        serde_json::to_value(&live_snapshot.events).unwrap(),
        serde_json::to_value(&replayed.events).unwrap()
    );
    assert_eq!(replayed.breakdown["ChartJobFinished"].total, 3);
}
