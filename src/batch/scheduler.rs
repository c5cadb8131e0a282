//! Unit scheduling against the gateway.

use super::correlate::correlate;
use super::job::ImportJob;
use super::unit::{units_for, ImportUnit};
use crate::aggregate::Summary;
use crate::config::IngestConfig;
use crate::gateway::BatchGateway;
use crate::progress::{noop_sink, ProgressEvent, ProgressSink};
use crate::types::{ItemResult, ParsedBatch, Progress};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub(crate) const CANCELLED: &str = "cancelled";

/// How units of one job are drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// One unit at a time in submission order. Used for flat imports, where a
    /// later chunk may depend on records an earlier chunk created.
    Sequential,
    /// A pool of workers for grouped imports, whose groups are independent.
    /// Ungrouped chunks of a mixed batch still run one at a time on the lane
    /// worker, which joins the pool once they are done.
    Concurrent { max_concurrency: usize },
}

impl SchedulePolicy {
    pub fn workers(&self, units: usize) -> usize {
        match self {
            SchedulePolicy::Sequential => 1,
            SchedulePolicy::Concurrent { max_concurrency } => (*max_concurrency).max(1).min(units.max(1)),
        }
    }
}

/// Outcome of one resolved job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: String,
    /// One result per submitted item, in submission order.
    pub results: Vec<ItemResult>,
    pub summary: Summary,
    pub progress: Progress,
    pub cancelled: bool,
    #[serde(skip)]
    pub duration: Duration,
}

impl JobReport {
    pub fn failed(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    pub fn is_clean(&self) -> bool {
        self.summary.fail() == 0
    }
}

/// Drives import jobs: splits a batch into units, submits them under the
/// batch's policy and collects one result per item.
///
/// Every queued unit is resolved before a run returns. A unit whose gateway
/// call fails marks all of its items failed and does not affect siblings.
pub struct ChunkScheduler {
    gateway: Arc<dyn BatchGateway>,
    chunk_size: usize,
    group_concurrency: usize,
    sink: Arc<dyn ProgressSink>,
}

impl ChunkScheduler {
    pub fn new(gateway: Arc<dyn BatchGateway>, config: &IngestConfig) -> Self {
        Self {
            gateway,
            chunk_size: config.chunk_size.max(1),
            group_concurrency: config.group_concurrency.max(1),
            sink: noop_sink(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn policy_for(&self, batch: &ParsedBatch) -> SchedulePolicy {
        if batch.is_grouped() {
            SchedulePolicy::Concurrent {
                max_concurrency: self.group_concurrency,
            }
        } else {
            SchedulePolicy::Sequential
        }
    }

    pub async fn run(&self, batch: &ParsedBatch) -> JobReport {
        self.run_with_cancel(batch, CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), stopping before the next unit once `cancel`
    /// fires. In-flight units finish; units never started are recorded as
    /// failed with `"cancelled"` so they stay retryable.
    pub async fn run_with_cancel(&self, batch: &ParsedBatch, cancel: CancellationToken) -> JobReport {
        let units = units_for(batch, self.chunk_size);
        let policy = self.policy_for(batch);
        self.run_units(units, policy, cancel).await
    }

    pub async fn run_units(
        &self,
        units: Vec<ImportUnit>,
        policy: SchedulePolicy,
        cancel: CancellationToken,
    ) -> JobReport {
        let start = Instant::now();
        let workers = policy.workers(units.len());
        let job = ImportJob::new(units);
        let total_units = job.progress().total;

        info!(
            job_id = job.id(),
            units = total_units,
            items = job.total_items(),
            workers,
            "import job started"
        );
        self.emit(ProgressEvent::JobStarted {
            job_id: job.id().to_string(),
            total_units,
            total_items: job.total_items(),
        })
        .await;

        futures::stream::iter(0..workers)
            .map(|worker| self.drain(worker, &job, &cancel))
            .buffer_unordered(workers)
            .collect::<Vec<()>>()
            .await;

        let pending = job.drain_pending();
        let cancelled = !pending.is_empty();
        if cancelled {
            warn!(job_id = job.id(), units = pending.len(), "job cancelled; pending units marked failed");
        }
        for unit in pending {
            let results = unit
                .items
                .iter()
                .map(|i| ItemResult::failed(&i.title, CANCELLED).with_client_id(&i.client_id))
                .collect();
            self.finish_unit(&job, unit.index, results).await;
        }

        let summary = job.summary();
        let progress = job.progress();
        let job_id = job.id().to_string();
        let duration = start.elapsed();
        info!(
            job_id = job_id.as_str(),
            created = summary.created,
            merged = summary.merged,
            updated = summary.updated,
            failed = summary.failed,
            duration_ms = duration.as_millis(),
            "import job finished"
        );
        self.emit(ProgressEvent::JobFinished {
            job_id: job_id.clone(),
            summary,
        })
        .await;

        JobReport {
            job_id,
            results: job.into_results(),
            summary,
            progress,
            cancelled,
            duration,
        }
    }

    // Worker 0 is the lane worker and the only one popping ordered chunks.
    async fn drain(&self, worker: usize, job: &ImportJob, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            let next = if worker == 0 {
                job.next_unit()
            } else {
                job.next_pooled()
            };
            let Some(unit) = next else {
                break;
            };
            let results = self.submit(worker, &unit).await;
            self.finish_unit(job, unit.index, results).await;
        }
    }

    async fn submit(&self, worker: usize, unit: &ImportUnit) -> Vec<ItemResult> {
        let start = Instant::now();
        match self
            .gateway
            .create(unit.kind, &unit.items, unit.meta.as_ref())
            .await
        {
            Ok(resp) => {
                let results = correlate(&unit.items, resp.results);
                info!(
                    worker,
                    unit = unit.index,
                    kind = %unit.kind,
                    items = unit.len(),
                    failed = results.iter().filter(|r| r.is_failure()).count(),
                    duration_ms = start.elapsed().as_millis(),
                    "unit submitted"
                );
                results
            }
            Err(err) => {
                let message = err.surface_message();
                warn!(
                    worker,
                    unit = unit.index,
                    items = unit.len(),
                    error = %err,
                    duration_ms = start.elapsed().as_millis(),
                    "unit failed"
                );
                unit.items
                    .iter()
                    .map(|i| ItemResult::failed(&i.title, message.clone()).with_client_id(&i.client_id))
                    .collect()
            }
        }
    }

    async fn finish_unit(&self, job: &ImportJob, unit: usize, results: Vec<ItemResult>) {
        let _turn = job.report_turn().await;
        let progress = job.record(unit, results.clone());
        self.emit(ProgressEvent::UnitCompleted {
            job_id: job.id().to_string(),
            unit,
            progress,
            results,
        })
        .await;
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Err(err) = self.sink.report(event).await {
            warn!(error = %err, "progress sink rejected event");
        }
    }
}
