//! Import progress observers.
//!
//! The scheduler reports every job start, unit completion and job end to a
//! [`ProgressSink`]. Unit completions carry that unit's results so a caller can
//! render partial outcomes before the job resolves.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`NoopProgressSink`] | Default, discards everything |
//! | [`InMemoryProgressSink`] | Records events, for tests |
//! | [`TracingProgressSink`] | Logs each observation at `debug` |

use crate::aggregate::Summary;
use crate::types::{ItemResult, Progress};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    JobStarted {
        job_id: String,
        total_units: usize,
        total_items: usize,
    },
    UnitCompleted {
        job_id: String,
        unit: usize,
        progress: Progress,
        results: Vec<ItemResult>,
    },
    JobFinished {
        job_id: String,
        summary: Summary,
    },
}

impl ProgressEvent {
    pub fn job_id(&self) -> &str {
        match self {
            ProgressEvent::JobStarted { job_id, .. }
            | ProgressEvent::UnitCompleted { job_id, .. }
            | ProgressEvent::JobFinished { job_id, .. } => job_id,
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        match self {
            ProgressEvent::UnitCompleted { progress, .. } => Some(*progress),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, event: ProgressEvent) -> Result<()>;
}

pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn report(&self, _: ProgressEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgressSink)
}

/// Records events in arrival order.
#[derive(Default)]
pub struct InMemoryProgressSink {
    events: RwLock<Vec<ProgressEvent>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .read()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Progress observations in the order they were reported.
    pub fn observations(&self) -> Vec<Progress> {
        self.events().iter().filter_map(ProgressEvent::progress).collect()
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.events.write() {
            Ok(mut e) => e.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<()> {
        match self.events.write() {
            Ok(mut e) => e.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
        Ok(())
    }
}

pub struct TracingProgressSink;

#[async_trait]
impl ProgressSink for TracingProgressSink {
    async fn report(&self, event: ProgressEvent) -> Result<()> {
        match &event {
            ProgressEvent::JobStarted {
                job_id,
                total_units,
                total_items,
            } => debug!(job_id = job_id.as_str(), total_units, total_items, "job started"),
            ProgressEvent::UnitCompleted {
                job_id,
                unit,
                progress,
                results,
            } => debug!(
                job_id = job_id.as_str(),
                unit,
                current = progress.current,
                total = progress.total,
                failed = results.iter().filter(|r| r.is_failure()).count(),
                "unit completed"
            ),
            ProgressEvent::JobFinished { job_id, summary } => debug!(
                job_id = job_id.as_str(),
                success = summary.success(),
                fail = summary.fail(),
                "job finished"
            ),
        }
        Ok(())
    }
}
