// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker pool, queue, and dispatch rules.
//!
//! Exactly `P` workers share one FIFO queue behind a single mutex and
//! condition variable. Selection is round-robin fair across batches: a
//! worker skips over jobs belonging to the most recently served batch
//! when any other batch has a ready job. The per-batch gate re-enqueues
//! at the tail when a batch is already running at its effective
//! parallelism. All waits are bounded.

use crate::config::EngineConfig;
use cw_core::{BatchId, ChartResult, Clock, ErrorKind, Job, JobId, JobStage, MetricEvent, SystemClock};
use cw_metrics::Metrics;
use cw_sandbox::{CancelFn, SandboxError, SandboxRunner};
use cw_storage::{JobStore, SavedChartStore};
use parking_lot::{Condvar, Mutex};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on any single condition-variable wait.
pub const MAX_WAIT: Duration = Duration::from_millis(50);

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub batch_id: Option<BatchId>,
}

/// Queue plus the fairness pointer, guarded by one mutex.
#[derive(Default)]
pub struct QueueState {
    pub queue: VecDeque<QueuedJob>,
    pub last_served_batch: Option<BatchId>,
}

/// State shared between the facade and the worker pool.
pub struct Shared {
    pub store: JobStore,
    pub saved: SavedChartStore,
    pub metrics: Metrics,
    pub runner: SandboxRunner,
    pub config: EngineConfig,
    pub clock: SystemClock,
    pub queue: Mutex<QueueState>,
    pub cv: Condvar,
    pub shutdown: AtomicBool,
}

impl Shared {
    /// Enqueue a job and wake one worker.
    pub fn enqueue(&self, job: QueuedJob) {
        self.queue.lock().queue.push_back(job);
        self.cv.notify_one();
    }

    pub fn enqueue_all(&self, jobs: impl IntoIterator<Item = QueuedJob>) {
        let mut state = self.queue.lock();
        state.queue.extend(jobs);
        drop(state);
        self.cv.notify_all();
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cv.notify_all();
    }
}

/// Pick the next job under round-robin fairness: skip jobs whose batch
/// was served last, falling back to the queue head when no other batch
/// has a ready job. Does not update the fairness pointer.
pub fn select_next(state: &mut QueueState) -> Option<QueuedJob> {
    if state.queue.is_empty() {
        return None;
    }
    let mut index = 0;
    if let Some(last) = &state.last_served_batch {
        if let Some(other) = state
            .queue
            .iter()
            .position(|job| job.batch_id.as_ref() != Some(last))
        {
            index = other;
        }
    }
    state.queue.remove(index)
}

/// Body of one pool worker. Returns when shutdown is requested.
pub fn worker_loop(shared: Arc<Shared>) {
    loop {
        // Step 1-2: wait for work, select under fairness, update the pointer.
        let job = {
            let mut state = shared.queue.lock();
            loop {
                if shared.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(job) = select_next(&mut state) {
                    state.last_served_batch = job.batch_id.clone();
                    break job;
                }
                shared.cv.wait_for(&mut state, MAX_WAIT);
            }
        };

        // Step 3: per-batch gate. Closed gate: back to the tail, brief wait.
        if let Some(batch_id) = &job.batch_id {
            if !shared.store.try_enter_batch_gate(batch_id) {
                let mut state = shared.queue.lock();
                state.queue.push_back(job);
                shared.cv.wait_for(&mut state, MAX_WAIT);
                continue;
            }
        }

        run_one(&shared, &job.job_id);

        // Step 7: release the gate and let siblings reconsider the queue.
        if let Some(batch_id) = &job.batch_id {
            shared.store.leave_batch_gate(batch_id);
        }
        shared.cv.notify_all();
    }
}

/// Steps 4-6: transition to running, dispatch the runner, settle the job.
fn run_one(shared: &Shared, job_id: &JobId) {
    let Some(record) = shared.store.job(job_id) else {
        return;
    };
    let now_ms = shared.clock.epoch_ms();
    if !shared.store.mark_running(job_id, JobStage::Generating, now_ms) {
        // Cancelled between selection and dispatch; nothing to run.
        return;
    }
    let outcome = execute(shared, &record);
    settle(shared, &record, outcome);
}

/// Dispatch the sandbox runner according to the configured mode, with a
/// cancel callback observing the job's cancellation flag.
pub fn execute(shared: &Shared, job: &Job) -> Result<ChartResult, SandboxError> {
    let store = &shared.store;
    let job_id = job.id.clone();
    let probe = move || store.cancel_requested(&job_id);
    let cancel: CancelFn<'_> = &probe;

    let kind = job.request.hint;
    let dataset = Some(&job.request.dataset_id);

    if shared.config.execute_user_code {
        if let Some(code) = &job.request.code {
            return shared
                .runner
                .run_code_exec(code, dataset, shared.runner.timeout());
        }
    }
    if shared.config.execute_generated {
        shared
            .runner
            .run_generated_chart(&job.id, kind, dataset, Some(cancel))
    } else if shared.config.sandbox_subprocess {
        shared
            .runner
            .run_template_subprocess(kind, dataset, Some(cancel))
    } else {
        shared.runner.run_template(kind, dataset, Some(cancel))
    }
}

/// Record the terminal transition, persist, and emit `ChartJobFinished`
/// only after the terminal state is visible in the store.
pub fn settle(shared: &Shared, job: &Job, outcome: Result<ChartResult, SandboxError>) {
    let now_ms = shared.clock.epoch_ms();
    let duration_ms = now_ms.saturating_sub(job.submitted_at_ms);

    let mut event = MetricEvent::new("ChartJobFinished", now_ms)
        .with_duration_ms(duration_ms)
        .with_prop("job_id", json!(job.id.as_str()))
        .with_prop("dataset_id", json!(job.request.dataset_id.as_str()))
        .with_prop("hint", json!(job.request.hint.as_str()));

    match outcome {
        Ok(result) => {
            shared.store.set_stage(&job.id, JobStage::Rendering);
            if shared.store.finish_success(&job.id, result) {
                if let Some(finished) = shared.store.job(&job.id) {
                    shared.store.persist_result(&finished);
                }
            }
            event = event.with_status("succeeded");
        }
        Err(err) => {
            let friendly = friendly_message(&err);
            let detail = err.logs.clone().unwrap_or_else(|| err.detail.clone());
            shared
                .store
                .finish_failure(&job.id, err.kind, friendly, Some(detail));
            let status = if err.kind == ErrorKind::Cancelled {
                "cancelled"
            } else {
                "failed"
            };
            event = event.with_status(status).with_error_code(err.kind.as_code());
            tracing::debug!(job_id = %job.id, kind = %err.kind, "job settled with failure");
        }
    }

    shared.metrics.record_and_persist(&event);
}

fn friendly_message(err: &SandboxError) -> String {
    match err.kind {
        ErrorKind::Timeout => "execution timed out (wall-clock limit exceeded)".to_string(),
        ErrorKind::Cancelled => "execution cancelled".to_string(),
        ErrorKind::ForbiddenImport => format!("code rejected by sandbox allowlist: {}", err.detail),
        ErrorKind::FormatError => "sandbox produced no usable result".to_string(),
        ErrorKind::Unknown => format!("execution failed: {}", err.detail),
    }
}

/// Spawn `P` named workers over the shared state.
pub fn spawn_workers(shared: &Arc<Shared>) -> Vec<std::thread::JoinHandle<()>> {
    (0..shared.config.workers.max(1))
        .filter_map(|i| {
            let shared = Arc::clone(shared);
            std::thread::Builder::new()
                .name(format!("cw-worker-{}", i + 1))
                .spawn(move || worker_loop(shared))
                .map_err(|e| tracing::warn!(error = %e, "failed to spawn worker thread"))
                .ok()
        })
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
