use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of `(completed units, total units)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Monotonic completed-units counter shared by the workers of one job.
#[derive(Debug)]
pub(crate) struct ProgressCounter {
    completed: AtomicUsize,
    total: usize,
}

impl ProgressCounter {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
        }
    }

    /// Advance by one unit and return the snapshot observed by this writer.
    pub(crate) fn advance(&self) -> Progress {
        let total = self.total;
        let prev = self
            .completed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some((c + 1).min(total))
            })
            .unwrap_or(total);
        Progress::new((prev + 1).min(total), total)
    }

    pub(crate) fn snapshot(&self) -> Progress {
        Progress::new(self.completed.load(Ordering::Acquire), self.total)
    }
}
