use super::{failed_subset, merge_results, Summary};
use crate::batch::ChunkScheduler;
use crate::types::{ItemResult, ParsedBatch};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Aggregate after a retry, with the prior successes folded back in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryReport {
    pub results: Vec<ItemResult>,
    pub summary: Summary,
    /// Items actually resubmitted; zero means no gateway call was made.
    pub resubmitted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl RetryReport {
    pub fn failed(&self) -> impl Iterator<Item = &ItemResult> {
        self.results.iter().filter(|r| r.is_failure())
    }
}

/// Resubmit only the items of `original` whose latest result in `last` failed.
///
/// `original` should carry any corrections the user made; items are matched
/// to `last` by client id, so corrected items keep their identity. The subset
/// runs as a fresh job under the original batch's grouping.
pub async fn retry_failed(
    scheduler: &ChunkScheduler,
    original: &ParsedBatch,
    last: &[ItemResult],
) -> RetryReport {
    retry_failed_with_cancel(scheduler, original, last, CancellationToken::new()).await
}

pub async fn retry_failed_with_cancel(
    scheduler: &ChunkScheduler,
    original: &ParsedBatch,
    last: &[ItemResult],
    cancel: CancellationToken,
) -> RetryReport {
    let subset = failed_subset(original, last);
    if subset.is_empty() {
        return RetryReport {
            results: last.to_vec(),
            summary: Summary::from_results(last),
            resubmitted: 0,
            job_id: None,
        };
    }

    info!(items = subset.total_items, "retrying failed items");
    let report = scheduler.run_with_cancel(&subset, cancel).await;
    let results = merge_results(last, &report.results);
    RetryReport {
        summary: Summary::from_results(&results),
        results,
        resubmitted: subset.total_items,
        job_id: Some(report.job_id),
    }
}
