// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe job and batch records.
//!
//! The store owns every `Job` and `Batch`, the cancellation flags, and
//! the per-batch concurrency accounting. All mutation happens under one
//! internal mutex; terminal states are final — a transition attempted
//! after one is a no-op, and callers learn that from the return value.

use crate::paths::DataRoot;
use cw_core::{Batch, BatchId, ChartResult, ErrorKind, Job, JobId, JobStage, JobState};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    batches: HashMap<BatchId, Batch>,
    cancel_flags: HashMap<JobId, bool>,
    batch_limits: HashMap<BatchId, u32>,
    batch_running: HashMap<BatchId, u32>,
}

/// Mapping from identifiers to job/batch records plus cancellation and
/// gate state.
pub struct JobStore {
    inner: Mutex<Inner>,
    root: DataRoot,
}

impl JobStore {
    pub fn new(root: DataRoot) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            root,
        }
    }

    pub fn data_root(&self) -> &DataRoot {
        &self.root
    }

    // -- records --

    pub fn insert_job(&self, job: Job) {
        self.inner.lock().jobs.insert(job.id.clone(), job);
    }

    pub fn job(&self, id: &JobId) -> Option<Job> {
        self.inner.lock().jobs.get(id).cloned()
    }

    pub fn job_state(&self, id: &JobId) -> Option<JobState> {
        self.inner.lock().jobs.get(id).map(|j| j.state)
    }

    pub fn insert_batch(&self, batch: Batch) {
        let mut inner = self.inner.lock();
        inner
            .batch_limits
            .insert(batch.id.clone(), batch.parallelism_effective);
        inner.batches.insert(batch.id.clone(), batch);
    }

    pub fn batch(&self, id: &BatchId) -> Option<Batch> {
        self.inner.lock().batches.get(id).cloned()
    }

    /// Fill in the member list once the batch's jobs exist.
    pub fn set_batch_members(&self, id: &BatchId, members: Vec<cw_core::BatchMember>) {
        let mut inner = self.inner.lock();
        if let Some(batch) = inner.batches.get_mut(id) {
            batch.members = members;
        }
    }

    // -- transitions --

    /// queued → running(stage). Records the first-running timestamp once.
    /// Returns false when the job is missing or already terminal.
    pub fn mark_running(&self, id: &JobId, stage: JobStage, now_ms: u64) -> bool {
        let mut inner = self.inner.lock();
        let Some(job) = inner.jobs.get_mut(id) else {
            return false;
        };
        if job.is_terminal() {
            return false;
        }
        job.state = JobState::Running;
        job.stage = Some(stage);
        if job.started_at_ms.is_none() {
            job.started_at_ms = Some(now_ms);
        }
        true
    }

    /// Update the stage of a running job.
    pub fn set_stage(&self, id: &JobId, stage: JobStage) {
        let mut inner = self.inner.lock();
        if let Some(job) = inner.jobs.get_mut(id) {
            if !job.is_terminal() {
                job.stage = Some(stage);
            }
        }
    }

    /// running → succeeded. Terminal-state precedence: a cancel flag set
    /// after the work finished does not demote the result.
    pub fn finish_success(&self, id: &JobId, result: ChartResult) -> bool {
        let mut inner = self.inner.lock();
        let Some(job) = inner.jobs.get_mut(id) else {
            return false;
        };
        if job.is_terminal() {
            return false;
        }
        job.state = JobState::Succeeded;
        job.stage = Some(JobStage::Done);
        job.result = Some(result);
        true
    }

    /// running → failed(kind) or cancelled, depending on `kind`.
    pub fn finish_failure(
        &self,
        id: &JobId,
        kind: ErrorKind,
        error: String,
        detail: Option<String>,
    ) -> bool {
        let mut inner = self.inner.lock();
        let Some(job) = inner.jobs.get_mut(id) else {
            return false;
        };
        if job.is_terminal() {
            return false;
        }
        if kind == ErrorKind::Cancelled {
            job.state = JobState::Cancelled;
            job.error = Some(error);
        } else {
            job.state = JobState::Failed;
            job.error_kind = Some(kind);
            job.error = Some(error);
            job.error_detail = detail;
        }
        true
    }

    /// Cancel path for jobs that never started. Only a queued job moves.
    pub fn cancel_queued(&self, id: &JobId) -> bool {
        let mut inner = self.inner.lock();
        let Some(job) = inner.jobs.get_mut(id) else {
            return false;
        };
        if job.state != JobState::Queued {
            return false;
        }
        job.state = JobState::Cancelled;
        true
    }

    // -- cancellation flags --

    /// Advisory flag observed by the worker and the sandbox runner at
    /// their checkpoints.
    pub fn request_cancel(&self, id: &JobId) {
        self.inner.lock().cancel_flags.insert(id.clone(), true);
    }

    pub fn cancel_requested(&self, id: &JobId) -> bool {
        self.inner
            .lock()
            .cancel_flags
            .get(id)
            .copied()
            .unwrap_or(false)
    }

    // -- per-batch gate --

    /// Try to take a running slot for `batch_id`. Atomic with respect to
    /// other workers; false means the gate is closed right now.
    pub fn try_enter_batch_gate(&self, batch_id: &BatchId) -> bool {
        let mut inner = self.inner.lock();
        let limit = inner.batch_limits.get(batch_id).copied().unwrap_or(u32::MAX);
        let running = inner.batch_running.entry(batch_id.clone()).or_insert(0);
        if *running >= limit {
            return false;
        }
        *running += 1;
        true
    }

    /// Release a slot taken with [`Self::try_enter_batch_gate`].
    pub fn leave_batch_gate(&self, batch_id: &BatchId) {
        let mut inner = self.inner.lock();
        if let Some(running) = inner.batch_running.get_mut(batch_id) {
            *running = running.saturating_sub(1);
        }
    }

    pub fn batch_running_count(&self, batch_id: &BatchId) -> u32 {
        self.inner
            .lock()
            .batch_running
            .get(batch_id)
            .copied()
            .unwrap_or(0)
    }

    // -- persistence --

    /// Write `{job_id, status, result}` under the job's directory.
    ///
    /// Failures are logged and swallowed; the in-memory record is already
    /// the source of truth.
    pub fn persist_result(&self, job: &Job) {
        let Some(result) = &job.result else {
            return;
        };
        let payload = json!({
            "job_id": job.id.as_str(),
            "status": job.state,
            "result": result,
        });
        let dir = self.root.job_dir(&job.id);
        let write = std::fs::create_dir_all(&dir).and_then(|()| {
            let body = serde_json::to_vec_pretty(&payload).unwrap_or_default();
            std::fs::write(self.root.job_result_file(&job.id), body)
        });
        if let Err(e) = write {
            tracing::warn!(job_id = %job.id, error = %e, "failed to persist job result");
        }
    }
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
