// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use cw_core::{ChartKind, ChartOutput, ChartRequest};

fn store() -> JobStore {
    JobStore::new(DataRoot::new("unused"))
}

fn queued_job(id: &str) -> Job {
    Job::new(
        JobId::new(id),
        ChartRequest::new("ds1", ChartKind::Bar),
        JobState::Queued,
        1000,
    )
}

fn some_result() -> ChartResult {
    ChartResult {
        language: "python".to_string(),
        library: "vega".to_string(),
        code: None,
        seed: None,
        outputs: vec![ChartOutput::image("<svg/>")],
        meta: None,
    }
}

#[test]
fn running_transition_records_first_start_once() {
    let store = store();
    store.insert_job(queued_job("j1"));

    assert!(store.mark_running(&JobId::new("j1"), JobStage::Generating, 1500));
    assert!(store.mark_running(&JobId::new("j1"), JobStage::Rendering, 2000));

    let job = store.job(&JobId::new("j1")).unwrap();
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.stage, Some(JobStage::Rendering));
    assert_eq!(job.started_at_ms, Some(1500));
}

#[test]
fn no_transition_after_terminal_state() {
    let store = store();
    store.insert_job(queued_job("j1"));
    let id = JobId::new("j1");

    store.mark_running(&id, JobStage::Generating, 1500);
    assert!(store.finish_success(&id, some_result()));

    // Every later transition is refused.
    assert!(!store.finish_failure(&id, ErrorKind::Timeout, "late".into(), None));
    assert!(!store.mark_running(&id, JobStage::Generating, 3000));
    assert!(!store.cancel_queued(&id));
    assert_eq!(store.job_state(&id), Some(JobState::Succeeded));
}

#[test]
fn cancel_flag_after_success_does_not_demote() {
    let store = store();
    store.insert_job(queued_job("j1"));
    let id = JobId::new("j1");

    store.mark_running(&id, JobStage::Generating, 1500);
    store.finish_success(&id, some_result());
    store.request_cancel(&id);

    assert_eq!(store.job_state(&id), Some(JobState::Succeeded));
    assert!(!store.finish_failure(&id, ErrorKind::Cancelled, "cancel".into(), None));
}

#[test]
fn cancelled_failure_kind_maps_to_cancelled_state() {
    let store = store();
    store.insert_job(queued_job("j1"));
    let id = JobId::new("j1");

    store.mark_running(&id, JobStage::Generating, 1500);
    assert!(store.finish_failure(&id, ErrorKind::Cancelled, "execution cancelled".into(), None));

    let job = store.job(&id).unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    // Cancellation is not part of the failure taxonomy on the record.
    assert!(job.error_kind.is_none());
}

#[test]
fn failed_jobs_carry_kind_and_detail() {
    let store = store();
    store.insert_job(queued_job("j1"));
    let id = JobId::new("j1");

    store.mark_running(&id, JobStage::Generating, 1500);
    store.finish_failure(
        &id,
        ErrorKind::FormatError,
        "child emitted no JSON".into(),
        Some("SyntaxError: invalid syntax".into()),
    );

    let job = store.job(&id).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.error_kind, Some(ErrorKind::FormatError));
    assert!(job.error_detail.unwrap().contains("SyntaxError"));
}

#[test]
fn cancel_queued_only_moves_queued_jobs() {
    let store = store();
    store.insert_job(queued_job("j1"));
    store.insert_job(queued_job("j2"));
    let running = JobId::new("j2");
    store.mark_running(&running, JobStage::Generating, 1500);

    assert!(store.cancel_queued(&JobId::new("j1")));
    assert!(!store.cancel_queued(&running));
    assert_eq!(store.job_state(&JobId::new("j1")), Some(JobState::Cancelled));
    assert_eq!(store.job_state(&running), Some(JobState::Running));
}

#[test]
fn batch_gate_enforces_the_limit() {
    let store = store();
    let batch_id = BatchId::new("b1");
    store.insert_batch(Batch::new(batch_id.clone(), 5, 2, 1000));

    assert!(store.try_enter_batch_gate(&batch_id));
    assert!(store.try_enter_batch_gate(&batch_id));
    assert!(!store.try_enter_batch_gate(&batch_id));
    assert_eq!(store.batch_running_count(&batch_id), 2);

    store.leave_batch_gate(&batch_id);
    assert!(store.try_enter_batch_gate(&batch_id));
}

#[test]
fn gate_without_a_batch_is_open() {
    // Single jobs have no batch cap.
    let store = store();
    for _ in 0..16 {
        assert!(store.try_enter_batch_gate(&BatchId::new("loose")));
    }
}

#[test]
fn persist_result_writes_the_wire_payload() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(DataRoot::new(dir.path()));
    let mut job = queued_job("j1");
    job.state = JobState::Succeeded;
    job.result = Some(some_result());
    store.insert_job(job.clone());

    store.persist_result(&job);

    let path = store.data_root().job_result_file(&job.id);
    let payload: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(payload["job_id"], "j1");
    assert_eq!(payload["status"], "succeeded");
    assert_eq!(payload["result"]["outputs"][0]["mime"], "image/svg+xml");
}

#[test]
fn persist_result_failure_is_swallowed() {
    // Root under a path that cannot be created.
    let file = tempfile::NamedTempFile::new().unwrap();
    let store = JobStore::new(DataRoot::new(file.path().join("nested")));
    let mut job = queued_job("j1");
    job.state = JobState::Succeeded;
    job.result = Some(some_result());

    // Must not panic or propagate.
    store.persist_result(&job);
    assert!(store.job(&job.id).is_none()); // store content untouched by persistence
}
