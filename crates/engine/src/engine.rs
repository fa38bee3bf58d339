// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public engine facade: submit, poll, cancel, saved charts, SLO report.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::scheduler::{self, QueuedJob, QueueState, Shared};
use cw_core::{
    Batch, BatchId, BatchItemStatus, BatchMember, BatchStatus, ChartRequest, ChartResult, Clock,
    DatasetId, IdGen, Job, JobId, JobSnapshot, JobStage, JobState, MetricEvent, SavedChart,
    SavedChartId, SavedContent, SystemClock, UuidIdGen,
};
use cw_metrics::{Metrics, SloSnapshot, Thresholds, Violations};
use cw_sandbox::SandboxRunner;
use cw_storage::{DataRoot, JobStore, SavedChartStore};
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

/// SLO snapshot together with the configured thresholds and the
/// per-event violation map.
#[derive(Debug, Serialize)]
pub struct SloReport {
    pub snapshot: SloSnapshot,
    pub thresholds: BTreeMap<String, Thresholds>,
    pub violations: BTreeMap<String, Violations>,
}

impl SloReport {
    pub fn any_violation(&self) -> bool {
        self.violations.values().any(Violations::any)
    }
}

/// The chart execution engine.
///
/// Synchronous mode runs submissions inline and returns terminal
/// snapshots; asynchronous mode enqueues and lets the worker pool
/// complete them. Mode is fixed at construction.
pub struct ChartEngine {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    id_gen: UuidIdGen,
}

impl ChartEngine {
    pub fn new(config: EngineConfig) -> Self {
        let root = DataRoot::new(&config.data_root);
        let metrics_path = config
            .metrics_log
            .clone()
            .unwrap_or_else(|| root.metrics_log_file());
        let runner = SandboxRunner::new()
            .with_timeout(config.sandbox_timeout)
            .with_python(&config.python)
            .with_datasets_dir(root.datasets_dir());
        let saved = SavedChartStore::new(root.saved_charts_file());

        let shared = Arc::new(Shared {
            store: JobStore::new(root),
            saved,
            metrics: Metrics::new(metrics_path),
            runner,
            config,
            clock: SystemClock,
            queue: Mutex::new(QueueState::default()),
            cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let workers = if shared.config.async_mode && shared.config.spawn_workers {
            scheduler::spawn_workers(&shared)
        } else {
            Vec::new()
        };

        Self {
            shared,
            workers: Mutex::new(workers),
            id_gen: UuidIdGen,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    pub fn data_root(&self) -> &DataRoot {
        self.shared.store.data_root()
    }

    // -- submit --

    /// Submit one chart job. Returns a queued snapshot in async mode and
    /// a terminal one in sync mode.
    pub fn generate(&self, request: ChartRequest) -> JobSnapshot {
        self.submit(request, None)
    }

    /// Submit an ordered group of jobs with a declared concurrency cap.
    pub fn generate_batch(&self, items: Vec<ChartRequest>, parallelism: u32) -> BatchStatus {
        let batch_id = BatchId::new(self.id_gen.next());
        let now_ms = self.shared.clock.epoch_ms();
        let effective = self.shared.config.effective_parallelism(parallelism);
        self.shared
            .store
            .insert_batch(Batch::new(batch_id.clone(), parallelism, effective, now_ms));

        let mut members = Vec::new();
        for item in items {
            let snap = self.submit(item, Some(batch_id.clone()));
            members.push(BatchMember {
                job_id: snap.job_id.clone(),
                chart_id: snap.chart_id.clone(),
                status: snap.status,
                stage: snap.stage,
            });
        }
        self.shared.store.set_batch_members(&batch_id, members);

        let status = self
            .batch(&batch_id)
            .unwrap_or_else(|| empty_batch_status(&batch_id, parallelism, effective));

        if !self.shared.config.async_mode {
            let finished_ms = self.shared.clock.epoch_ms();
            let batch_status = if status.failed > 0 { "failed" } else { "succeeded" };
            self.shared.metrics.record_and_persist(
                &MetricEvent::new("ChartBatchFinished", finished_ms)
                    .with_duration_ms(finished_ms.saturating_sub(now_ms))
                    .with_status(batch_status)
                    .with_prop("batch_id", json!(batch_id.as_str()))
                    .with_prop("total", json!(status.total)),
            );
        }
        status
    }

    fn submit(&self, request: ChartRequest, batch_id: Option<BatchId>) -> JobSnapshot {
        let job_id = JobId::new(self.id_gen.next());
        let now_ms = self.shared.clock.epoch_ms();

        if self.user_code_skipped(&request) {
            return self.complete_skipped(job_id, request, batch_id, now_ms);
        }

        if self.shared.config.async_mode {
            let mut job = Job::new(job_id, request, JobState::Queued, now_ms);
            if let Some(batch_id) = batch_id {
                job = job.in_batch(batch_id);
            }
            let queued = QueuedJob {
                job_id: job.id.clone(),
                batch_id: job.batch_id.clone(),
            };
            let snapshot = job.snapshot();
            self.shared.store.insert_job(job);
            self.shared.enqueue(queued);
            snapshot
        } else {
            self.run_inline(job_id, request, batch_id, now_ms)
        }
    }

    /// Inline (synchronous) execution of one job through the same
    /// dispatch/settle path the workers use.
    fn run_inline(
        &self,
        job_id: JobId,
        request: ChartRequest,
        batch_id: Option<BatchId>,
        now_ms: u64,
    ) -> JobSnapshot {
        let mut job = Job::new(job_id, request, JobState::Running, now_ms);
        job.stage = Some(JobStage::Generating);
        job.started_at_ms = Some(now_ms);
        if let Some(batch_id) = batch_id {
            job = job.in_batch(batch_id);
        }
        self.shared.store.insert_job(job.clone());

        let outcome = scheduler::execute(&self.shared, &job);
        scheduler::settle(&self.shared, &job, outcome);

        self.shared
            .store
            .job(&job.id)
            .map(|j| j.snapshot())
            .unwrap_or_else(|| job.snapshot())
    }

    /// The "skipped" fold: user code that is empty or not python
    /// completes as succeeded with an empty-outputs result and a note.
    fn user_code_skipped(&self, request: &ChartRequest) -> bool {
        if !self.shared.config.execute_user_code {
            return false;
        }
        let Some(code) = &request.code else {
            return false;
        };
        let language = request.language.as_deref().unwrap_or("python");
        code.trim().is_empty() || !language.eq_ignore_ascii_case("python")
    }

    fn complete_skipped(
        &self,
        job_id: JobId,
        request: ChartRequest,
        batch_id: Option<BatchId>,
        now_ms: u64,
    ) -> JobSnapshot {
        let mut job = Job::new(job_id, request, JobState::Running, now_ms);
        job.started_at_ms = Some(now_ms);
        if let Some(batch_id) = batch_id {
            job = job.in_batch(batch_id);
        }
        let mut result = ChartResult {
            language: "python".to_string(),
            library: job
                .request
                .library
                .clone()
                .unwrap_or_else(|| "vega".to_string()),
            code: None,
            seed: job.request.seed,
            outputs: Vec::new(),
            meta: None,
        };
        result.meta_insert("note", json!("user code skipped: empty or non-python"));
        tracing::info!(job_id = %job.id, "user code skipped (empty or non-python)");

        self.shared.store.insert_job(job.clone());
        self.shared.store.finish_success(&job.id, result);
        self.shared.metrics.record_and_persist(
            &MetricEvent::new("ChartJobFinished", now_ms)
                .with_duration_ms(0)
                .with_status("succeeded")
                .with_prop("job_id", json!(job.id.as_str()))
                .with_prop("note", json!("skipped")),
        );

        self.shared
            .store
            .job(&job.id)
            .map(|j| j.snapshot())
            .unwrap_or_else(|| job.snapshot())
    }

    // -- poll --

    pub fn job(&self, id: &JobId) -> Option<JobSnapshot> {
        self.shared.store.job(id).map(|j| j.snapshot())
    }

    /// Recompute batch progress from member job states. Results appear
    /// only once every member is terminal.
    pub fn batch(&self, id: &BatchId) -> Option<BatchStatus> {
        let batch = self.shared.store.batch(id)?;
        let mut queued = 0;
        let mut running = 0;
        let mut done = 0;
        let mut failed = 0;
        let mut cancelled = 0;
        let mut items = Vec::new();
        let mut results = Vec::new();
        let mut results_map: IndexMap<String, ChartResult> = IndexMap::new();
        let mut waits = Vec::new();

        for member in &batch.members {
            let job = self.shared.store.job(&member.job_id);
            let (status, stage) = job
                .as_ref()
                .map(|j| (j.state, j.stage))
                .unwrap_or((member.status, member.stage));

            match status {
                JobState::Queued => queued += 1,
                JobState::Running => running += 1,
                JobState::Succeeded => {
                    done += 1;
                    if let Some(result) = job.as_ref().and_then(|j| j.result.clone()) {
                        if let Some(chart_id) = &member.chart_id {
                            results_map.insert(chart_id.as_str().to_string(), result.clone());
                        }
                        results.push(result);
                    }
                }
                JobState::Failed => failed += 1,
                JobState::Cancelled => cancelled += 1,
            }

            if let Some(job) = &job {
                if job.is_terminal() {
                    if let Some(started) = job.started_at_ms {
                        waits.push(started.saturating_sub(job.submitted_at_ms));
                    }
                }
            }

            items.push(BatchItemStatus {
                job_id: member.job_id.clone(),
                status,
                stage,
                chart_id: member.chart_id.clone(),
            });
        }

        let total = batch.members.len();
        let served = done + failed + cancelled;
        let avg_wait_ms = if waits.is_empty() {
            0
        } else {
            waits.iter().sum::<u64>() / waits.len() as u64
        };
        let terminal = served == total;

        Some(BatchStatus {
            batch_id: batch.id.clone(),
            total,
            queued,
            running,
            done,
            failed,
            cancelled,
            served,
            avg_wait_ms,
            parallelism: batch.parallelism,
            parallelism_effective: batch.parallelism_effective,
            items,
            results: terminal.then_some(results),
            results_map: terminal.then_some(results_map),
        })
    }

    // -- cancel --

    /// Cancel batch members. Queued targets are atomically removed from
    /// the queue and marked cancelled; running targets get their
    /// cancellation flag set and become visible via later polls. Returns
    /// the count of cancelled-while-queued jobs.
    pub fn cancel_batch(&self, id: &BatchId, job_ids: Option<&[JobId]>) -> usize {
        let Some(batch) = self.shared.store.batch(id) else {
            return 0;
        };
        let targets: HashSet<JobId> = match job_ids {
            Some(ids) => ids.iter().cloned().collect(),
            None => batch.members.iter().map(|m| m.job_id.clone()).collect(),
        };

        let mut removed = 0;
        {
            let mut state = self.shared.queue.lock();
            state.queue.retain(|queued| {
                if targets.contains(&queued.job_id)
                    && self.shared.store.cancel_queued(&queued.job_id)
                {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }

        for target in &targets {
            match self.shared.store.job_state(target) {
                Some(JobState::Running) => self.shared.store.request_cancel(target),
                // Popped by a worker but still gated: not in the queue,
                // yet cancellable before it runs.
                Some(JobState::Queued) => {
                    if self.shared.store.cancel_queued(target) {
                        removed += 1;
                    }
                }
                _ => {}
            }
        }
        self.shared.cv.notify_all();
        removed
    }

    // -- saved charts --

    pub fn save_chart(
        &self,
        dataset_id: DatasetId,
        title: Option<String>,
        hint: Option<String>,
        content: SavedContent,
    ) -> Result<SavedChart, EngineError> {
        let item = SavedChart {
            id: SavedChartId::new(self.id_gen.next()),
            dataset_id,
            title,
            hint,
            content,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        Ok(self.shared.saved.add(item)?)
    }

    pub fn list_saved(&self, dataset_id: Option<&DatasetId>) -> Vec<SavedChart> {
        self.shared.saved.list(dataset_id)
    }

    pub fn delete_saved(&self, id: &SavedChartId) -> Result<bool, EngineError> {
        Ok(self.shared.saved.delete(id)?)
    }

    // -- observability --

    pub fn slo_report(&self) -> SloReport {
        let thresholds = self.shared.config.slo_thresholds.clone();
        SloReport {
            snapshot: self.shared.metrics.snapshot(),
            violations: self.shared.metrics.detect_violations(&thresholds),
            thresholds,
        }
    }
}

impl Drop for ChartEngine {
    fn drop(&mut self) {
        self.shared.request_shutdown();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

fn empty_batch_status(batch_id: &BatchId, parallelism: u32, effective: u32) -> BatchStatus {
    BatchStatus {
        batch_id: batch_id.clone(),
        total: 0,
        queued: 0,
        running: 0,
        done: 0,
        failed: 0,
        cancelled: 0,
        served: 0,
        avg_wait_ms: 0,
        parallelism,
        parallelism_effective: effective,
        items: Vec::new(),
        results: Some(Vec::new()),
        results_map: Some(IndexMap::new()),
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
