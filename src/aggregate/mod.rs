//! Result aggregation, summaries and retry of failures.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResultAggregator`] | Per-job accumulator, appended unit by unit |
//! | [`Summary`] | Counts by outcome kind |
//! | [`merge_results`] | Keyed union that never drops a prior success |
//! | [`failed_subset`] | Items whose latest result failed, grouping kept |
//! | [`retry_failed`] | Resubmit only the failed remainder in a fresh job |

mod merge;
mod retry;

pub use merge::{failed_subset, merge_results};
pub use retry::{retry_failed, retry_failed_with_cancel, RetryReport};

use crate::types::{ItemResult, Outcome};
use serde::{Deserialize, Serialize};

/// Counts by outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub created: usize,
    pub merged: usize,
    pub updated: usize,
    pub failed: usize,
}

impl Summary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ItemResult>,
    {
        let mut s = Summary::default();
        for r in results {
            s.record(r);
        }
        s
    }

    fn record(&mut self, result: &ItemResult) {
        match result.outcome() {
            Outcome::Created => self.created += 1,
            Outcome::Merged => self.merged += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn success(&self) -> usize {
        self.created + self.merged + self.updated
    }

    pub fn fail(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.success() + self.failed
    }
}

/// Results of one job in arrival order, tagged with the unit that produced them.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    entries: Vec<(usize, ItemResult)>,
    summary: Summary,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, unit: usize, results: impl IntoIterator<Item = ItemResult>) {
        for r in results {
            self.summary.record(&r);
            self.entries.push((unit, r));
        }
    }

    /// Live view in arrival order.
    pub fn results(&self) -> impl Iterator<Item = &ItemResult> {
        self.entries.iter().map(|(_, r)| r)
    }

    pub fn failed(&self) -> Vec<&ItemResult> {
        self.results().filter(|r| r.is_failure()).collect()
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Final results ordered by unit, then by position within the unit.
    pub fn into_submission_order(mut self) -> Vec<ItemResult> {
        self.entries.sort_by_key(|(unit, _)| *unit);
        self.entries.into_iter().map(|(_, r)| r).collect()
    }
}
