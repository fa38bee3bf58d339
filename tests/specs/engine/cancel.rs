// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation: immediate for queued jobs, cooperative for running ones.

use crate::prelude::*;
use cw_core::{ChartKind, ChartRequest, JobState};
use cw_engine::{ChartEngine, EngineConfig};
use serial_test::serial;
use std::time::Duration;

#[test]
fn cancel_while_queued_is_immediate_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    // Async engine with no workers: every member stays queued.
    let engine = ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        async_mode: true,
        workers: 1,
        spawn_workers: false,
        ..EngineConfig::default()
    });

    let status = engine.generate_batch(
        (0..4)
            .map(|_| ChartRequest::new("d", ChartKind::Bar))
            .collect(),
        2,
    );
    let ids: Vec<_> = status.items.iter().map(|i| i.job_id.clone()).collect();

    let removed = engine.cancel_batch(&status.batch_id, Some(&ids));
    assert_eq!(removed, ids.len());

    let polled = engine.batch(&status.batch_id).unwrap();
    assert_eq!(polled.cancelled, 4);
    assert!(polled.is_terminal());
    // No cancelled-while-queued job ever reaches running.
    for id in &ids {
        assert_eq!(engine.job(id).unwrap().status, JobState::Cancelled);
        assert!(engine.job(id).unwrap().stage.is_none());
    }
}

#[test]
fn cancelling_a_terminal_job_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let engine = sync_engine(&dir);

    let status = engine.generate_batch(vec![ChartRequest::new("d", ChartKind::Bar)], 1);
    assert_eq!(status.done, 1);

    let removed = engine.cancel_batch(&status.batch_id, None);
    assert_eq!(removed, 0);
    assert_eq!(
        engine.job(&status.items[0].job_id).unwrap().status,
        JobState::Succeeded
    );
}

#[test]
#[serial]
fn cooperative_cancel_mid_flight() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("CHARTWORK_SBX_DELAY_MS", "500");
    let engine = ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        async_mode: true,
        workers: 1,
        sandbox_subprocess: true,
        sandbox_timeout: Duration::from_secs(5),
        ..EngineConfig::default()
    });
    std::env::remove_var("CHARTWORK_SBX_DELAY_MS");

    let status = engine.generate_batch(vec![ChartRequest::new("ds_c", ChartKind::Bar)], 1);
    let job_id = status.items[0].job_id.clone();

    // Let the job reach the child, then flip the cancel flag.
    wait_until(|| {
        engine
            .job(&job_id)
            .filter(|j| j.status == JobState::Running)
    });
    let removed = engine.cancel_batch(&status.batch_id, None);
    assert_eq!(removed, 0, "running jobs are not cancelled synchronously");

    let done = wait_until(|| engine.job(&job_id).filter(|j| j.status.is_terminal()));
    assert_eq!(done.status, JobState::Cancelled);

    let polled = engine.batch(&status.batch_id).unwrap();
    assert_eq!(polled.cancelled, 1);
    assert!(polled.is_terminal());
}
