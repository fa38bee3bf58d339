// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess isolation: timeouts and the per-batch gate under real
//! child processes. These specs hold children open via the injected
//! delay knob and skip without python3.

use crate::prelude::*;
use cw_core::{BatchStatus, ChartKind, ChartRequest, JobState};
use cw_engine::{ChartEngine, EngineConfig};
use serial_test::serial;
use std::time::{Duration, Instant};

const DELAY_ENV: &str = "CHARTWORK_SBX_DELAY_MS";

fn subprocess_engine(dir: &tempfile::TempDir, workers: u32, timeout: Duration) -> ChartEngine {
    ChartEngine::new(EngineConfig {
        data_root: dir.path().to_path_buf(),
        async_mode: true,
        workers,
        sandbox_subprocess: true,
        sandbox_timeout: timeout,
        ..EngineConfig::default()
    })
}

#[test]
#[serial]
fn timed_out_job_fails_within_the_envelope() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(DELAY_ENV, "500");
    let engine = subprocess_engine(&dir, 1, Duration::from_millis(100));
    std::env::remove_var(DELAY_ENV);

    let submitted = Instant::now();
    let snap = engine.generate(ChartRequest::new("ds_t", ChartKind::Bar));
    let done = wait_until(|| engine.job(&snap.job_id).filter(|j| j.status.is_terminal()));
    let elapsed = submitted.elapsed();

    assert_eq!(done.status, JobState::Failed);
    assert_eq!(done.error_code.as_deref(), Some("timeout"));
    assert!(elapsed >= Duration::from_millis(100), "ended early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "kill was not prompt: {elapsed:?}");

    let events = engine.metrics().load_log();
    let finished = events
        .iter()
        .find(|e| e.event_name == "ChartJobFinished")
        .unwrap();
    assert_eq!(finished.error_code.as_deref(), Some("timeout"));
}

#[test]
#[serial]
fn batch_gate_bounds_concurrent_members() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(DELAY_ENV, "150");
    // Two workers, but the batch declares parallelism 1.
    let engine = subprocess_engine(&dir, 2, Duration::from_secs(5));
    std::env::remove_var(DELAY_ENV);

    let status = engine.generate_batch(
        (0..3)
            .map(|_| ChartRequest::new("ds_g", ChartKind::Bar))
            .collect(),
        1,
    );
    assert_eq!(status.parallelism_effective, 1);

    // While the batch drains, its running count never exceeds the gate.
    let deadline = Instant::now() + WAIT_MAX;
    loop {
        let polled = engine.batch(&status.batch_id).unwrap();
        assert!(
            polled.running <= 1,
            "gate violated: {} members running",
            polled.running
        );
        if polled.is_terminal() {
            assert_eq!(polled.done, 3);
            break;
        }
        assert!(Instant::now() < deadline, "batch did not finish");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
#[serial]
fn concurrent_batches_make_progress_together() {
    if !have_python() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var(DELAY_ENV, "50");
    let engine = subprocess_engine(&dir, 2, Duration::from_secs(5));
    std::env::remove_var(DELAY_ENV);

    let first = engine.generate_batch(
        (0..3)
            .map(|_| ChartRequest::new("ds_a", ChartKind::Bar))
            .collect(),
        2,
    );
    let second = engine.generate_batch(
        (0..3)
            .map(|_| ChartRequest::new("ds_b", ChartKind::Line))
            .collect(),
        2,
    );

    let first_done = wait_until(|| engine.batch(&first.batch_id).filter(BatchStatus::is_terminal));
    let second_done =
        wait_until(|| engine.batch(&second.batch_id).filter(BatchStatus::is_terminal));
    assert_eq!(first_done.done, 3);
    assert_eq!(second_done.done, 3);
}
