use super::unit::ImportUnit;
use crate::aggregate::{ResultAggregator, Summary};
use crate::types::progress::ProgressCounter;
use crate::types::{ItemResult, Progress};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Run state of one submission: pending queues, progress and results.
///
/// Ungrouped chunks wait on the ordered lane, which only one worker pops;
/// series units wait in the pooled queue. A job is created per run and never
/// reused, so a retry can not race with the queues or accumulator of the run
/// it retries.
#[derive(Debug)]
pub struct ImportJob {
    id: String,
    ordered: Mutex<VecDeque<ImportUnit>>,
    pooled: Mutex<VecDeque<ImportUnit>>,
    progress: ProgressCounter,
    results: Mutex<ResultAggregator>,
    total_items: usize,
    /// Held while a unit is recorded and reported, so observers see
    /// progress in non-decreasing order.
    report_order: tokio::sync::Mutex<()>,
}

// A poisoned lock only means another worker panicked mid-append; the data is
// still a valid prefix, so keep going with it.
fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ImportJob {
    pub fn new(units: Vec<ImportUnit>) -> Self {
        let total_items = units.iter().map(ImportUnit::len).sum();
        let total_units = units.len();
        let (ordered, pooled): (VecDeque<_>, VecDeque<_>) =
            units.into_iter().partition(ImportUnit::is_ordered);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            progress: ProgressCounter::new(total_units),
            ordered: Mutex::new(ordered),
            pooled: Mutex::new(pooled),
            results: Mutex::new(ResultAggregator::new()),
            total_items,
            report_order: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    /// Pop the next unit for the lane worker: ordered chunks first, then
    /// pooled units. The caller must finish a unit before popping again.
    pub fn next_unit(&self) -> Option<ImportUnit> {
        let next = relock(&self.ordered).pop_front();
        next.or_else(|| self.next_pooled())
    }

    /// Pop the next series unit in FIFO order. Never yields an ordered chunk.
    pub fn next_pooled(&self) -> Option<ImportUnit> {
        relock(&self.pooled).pop_front()
    }

    /// Remove every unit that was never started, in submission order.
    pub fn drain_pending(&self) -> Vec<ImportUnit> {
        let mut pending: Vec<ImportUnit> = relock(&self.ordered).drain(..).collect();
        pending.extend(relock(&self.pooled).drain(..));
        pending.sort_by_key(|u| u.index);
        pending
    }

    /// Append a finished unit's results and advance progress by one unit.
    pub fn record(&self, unit: usize, results: Vec<ItemResult>) -> Progress {
        relock(&self.results).append(unit, results);
        self.progress.advance()
    }

    pub(crate) async fn report_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.report_order.lock().await
    }

    pub fn summary(&self) -> Summary {
        relock(&self.results).summary()
    }

    /// Snapshot of results received so far, in arrival order.
    pub fn partial_results(&self) -> Vec<ItemResult> {
        relock(&self.results).results().cloned().collect()
    }

    pub fn into_results(self) -> Vec<ItemResult> {
        self.results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .into_submission_order()
    }
}
