// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch record and the polled status snapshot.

use crate::chart::ChartResult;
use crate::id::{BatchId, ChartId, JobId};
use crate::job::{JobStage, JobState};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Member entry of a batch: a job plus its latest observed status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMember {
    pub job_id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<ChartId>,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
}

/// An ordered group of jobs submitted together, with a declared
/// concurrency cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub members: Vec<BatchMember>,
    /// Parallelism as requested by the client.
    pub parallelism: u32,
    /// min(requested, global worker count); the per-batch gate bound.
    pub parallelism_effective: u32,
    pub created_at_ms: u64,
}

impl Batch {
    pub fn new(id: BatchId, parallelism: u32, parallelism_effective: u32, now_ms: u64) -> Self {
        Self {
            id,
            members: Vec::new(),
            parallelism,
            parallelism_effective,
            created_at_ms: now_ms,
        }
    }
}

/// Wire entry of `BatchStatus.items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemStatus {
    pub job_id: JobId,
    pub status: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<ChartId>,
}

/// Batch status snapshot, recomputed at poll time.
///
/// `results`/`results_map` are present only once every member job is
/// terminal; `results_map` preserves submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatus {
    pub batch_id: BatchId,
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// done + failed + cancelled.
    pub served: usize,
    /// Mean queued→running wait of jobs that have started, integer ms.
    pub avg_wait_ms: u64,
    pub parallelism: u32,
    pub parallelism_effective: u32,
    pub items: Vec<BatchItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ChartResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_map: Option<IndexMap<String, ChartResult>>,
}

impl BatchStatus {
    /// True when every member job is terminal.
    pub fn is_terminal(&self) -> bool {
        self.served == self.total
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
