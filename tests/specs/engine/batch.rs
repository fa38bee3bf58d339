// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous batches: polling, totals, and result maps.

use crate::prelude::*;
use cw_core::{BatchStatus, ChartKind, ChartRequest, JobState};

#[test]
fn asynchronous_batch_with_two_items() {
    let dir = tempfile::tempdir().unwrap();
    let engine = async_engine(&dir, 2);

    let status = engine.generate_batch(
        vec![
            ChartRequest::new("d", ChartKind::Bar).with_chart_id("c-bar"),
            ChartRequest::new("d", ChartKind::Scatter).with_chart_id("c-scat"),
        ],
        3,
    );
    assert_eq!(status.total, 2);
    assert_eq!(status.parallelism, 3);
    assert_eq!(status.parallelism_effective, 2, "min(3, workers=2)");

    let terminal = wait_until(|| {
        engine
            .batch(&status.batch_id)
            .filter(BatchStatus::is_terminal)
    });
    assert_eq!(terminal.done, 2);
    assert_eq!(terminal.failed, 0);
    assert_eq!(terminal.cancelled, 0);

    let map = terminal.results_map.unwrap();
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["c-bar", "c-scat"]);
}

#[test]
fn results_map_preserves_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let engine = async_engine(&dir, 1);

    let status = engine.generate_batch(
        (0..4)
            .map(|i| ChartRequest::new("d", ChartKind::Bar).with_chart_id(format!("c{i}")))
            .collect(),
        1,
    );

    let terminal = wait_until(|| {
        engine
            .batch(&status.batch_id)
            .filter(BatchStatus::is_terminal)
    });

    let keys: Vec<String> = terminal.results_map.unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["c0", "c1", "c2", "c3"]);
}

#[test]
fn every_job_reaches_exactly_one_terminal_state() {
    let dir = tempfile::tempdir().unwrap();
    let engine = async_engine(&dir, 2);

    let status = engine.generate_batch(
        (0..6)
            .map(|_| ChartRequest::new("d", ChartKind::Line))
            .collect(),
        2,
    );
    let terminal = wait_until(|| {
        engine
            .batch(&status.batch_id)
            .filter(BatchStatus::is_terminal)
    });

    assert_eq!(terminal.served, 6);
    for item in &terminal.items {
        assert!(item.status.is_terminal());
        assert_eq!(item.status, JobState::Succeeded);
    }
    // Terminal snapshots are frozen: polling again yields the same counts.
    let again = engine.batch(&status.batch_id).unwrap();
    assert_eq!(again.done, terminal.done);
    assert_eq!(again.served, terminal.served);
}
