//! End-to-end import runs against the in-memory gateway.

use async_trait::async_trait;
use catalog_ingest::aggregate::{merge_results, retry_failed, Summary};
use catalog_ingest::batch::ChunkScheduler;
use catalog_ingest::config::IngestConfig;
use catalog_ingest::gateway::{BatchGateway, CreateResponse, MemoryGateway};
use catalog_ingest::progress::{InMemoryProgressSink, ProgressEvent, ProgressSink};
use catalog_ingest::regex_edit::{RegexApplyResponse, RegexEditRequest, RegexPreviewResponse};
use catalog_ingest::source::{parse_source, parse_url_list, rows_to_batch};
use catalog_ingest::types::{BatchGroup, CanonicalItem, ContentKind, GroupMeta, ParsedBatch};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn videos(prefix: &str, n: usize) -> Vec<CanonicalItem> {
    (0..n)
        .map(|i| CanonicalItem::video(format!("{prefix} {i}"), format!("https://v/{prefix}/{i}.mp4")))
        .collect()
}

fn grouped(groups: usize, per_group: usize) -> ParsedBatch {
    ParsedBatch::from_groups(
        (0..groups)
            .map(|g| {
                let title = format!("S{g}");
                BatchGroup::with_meta(GroupMeta::titled(&title), videos(&title, per_group))
            })
            .collect(),
    )
}

#[tokio::test]
async fn test_scenario_flat_partial_failure_then_retry() {
    let gw = Arc::new(MemoryGateway::new());
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default());

    let mut batch = ParsedBatch::flat(vec![
        CanonicalItem::video("Ep 1", "https://v/1.mp4"),
        CanonicalItem::video("Ep 2", "https://v/2.mp4"),
        CanonicalItem::video("Ep 3", ""),
    ]);

    let first = sched.run(&batch).await;
    assert_eq!(gw.create_calls().len(), 1);
    assert_eq!((first.summary.success(), first.summary.fail()), (2, 1));
    assert_eq!(first.results[2].error.as_deref(), Some("videoUrl required"));

    for item in batch.items_mut() {
        if item.title == "Ep 3" {
            item.video_url = "https://v/3.mp4".to_string();
        }
    }

    let retried = retry_failed(&sched, &batch, &first.results).await;
    let calls = gw.create_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].titles, vec!["Ep 3".to_string()]);
    assert_eq!(retried.resubmitted, 1);
    assert_eq!((retried.summary.success(), retried.summary.fail()), (3, 0));
    assert_eq!(retried.results[0].id, first.results[0].id);

    // Nothing left: a second retry is a no-op.
    let again = retry_failed(&sched, &batch, &retried.results).await;
    assert_eq!(again.resubmitted, 0);
    assert_eq!(again.results, retried.results);
    assert_eq!(gw.create_calls().len(), 2);
}

#[tokio::test]
async fn test_every_item_gets_exactly_one_result() {
    for (n, chunk) in [(250usize, 40usize), (100, 100), (101, 100), (7, 1)] {
        let gw = Arc::new(MemoryGateway::new());
        let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_chunk_size(chunk));
        let mut items = videos("v", n);
        // Every fifth item is invalid.
        for item in items.iter_mut().step_by(5) {
            item.video_url.clear();
        }
        let report = sched.run(&ParsedBatch::flat(items)).await;

        assert_eq!(gw.create_calls().len(), n.div_ceil(chunk), "n={n} chunk={chunk}");
        assert_eq!(report.results.len(), n);
        assert!(report.results.iter().all(|r| r.id.is_some() != r.error.is_some()));
        let s = report.summary;
        assert_eq!(s.created + s.merged + s.updated + s.failed, n);
        assert_eq!(s.failed, n.div_ceil(5));
    }
}

#[tokio::test]
async fn test_flat_chunks_run_strictly_in_order() {
    let gw = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(5)));
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_chunk_size(2));
    sched.run(&ParsedBatch::flat(videos("v", 9))).await;

    assert_eq!(gw.max_in_flight(), 1);
    let firsts: Vec<String> = gw.create_calls().iter().map(|c| c.titles[0].clone()).collect();
    assert_eq!(firsts, vec!["v 0", "v 2", "v 4", "v 6", "v 8"]);
}

/// Counts ungrouped create calls that overlap in time.
struct FlatOverlapGateway {
    inner: MemoryGateway,
    flat_in_flight: AtomicUsize,
    max_flat_in_flight: AtomicUsize,
}

#[async_trait]
impl BatchGateway for FlatOverlapGateway {
    async fn create(
        &self,
        kind: ContentKind,
        items: &[CanonicalItem],
        meta: Option<&GroupMeta>,
    ) -> catalog_ingest::Result<CreateResponse> {
        if meta.is_some() {
            return self.inner.create(kind, items, meta).await;
        }
        let now = self.flat_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_flat_in_flight.fetch_max(now, Ordering::SeqCst);
        let resp = self.inner.create(kind, items, meta).await;
        self.flat_in_flight.fetch_sub(1, Ordering::SeqCst);
        resp
    }

    async fn regex_preview(&self, request: &RegexEditRequest) -> catalog_ingest::Result<RegexPreviewResponse> {
        self.inner.regex_preview(request).await
    }

    async fn regex_apply(&self, request: &RegexEditRequest) -> catalog_ingest::Result<RegexApplyResponse> {
        self.inner.regex_apply(request).await
    }
}

#[tokio::test]
async fn test_mixed_batch_keeps_ungrouped_chunks_in_order() {
    let gw = Arc::new(FlatOverlapGateway {
        inner: MemoryGateway::new().with_latency(Duration::from_millis(30)),
        flat_in_flight: AtomicUsize::new(0),
        max_flat_in_flight: AtomicUsize::new(0),
    });
    let sched = ChunkScheduler::new(
        gw.clone(),
        &IngestConfig::default().with_chunk_size(2).with_group_concurrency(3),
    );
    let batch = ParsedBatch::from_groups(vec![
        BatchGroup::ungrouped(videos("f", 6)),
        BatchGroup::with_meta(GroupMeta::titled("S"), videos("s", 1)),
        BatchGroup::with_meta(GroupMeta::titled("T"), videos("t", 1)),
    ]);
    let report = sched.run(&batch).await;

    assert_eq!(gw.max_flat_in_flight.load(Ordering::SeqCst), 1);
    assert!(gw.inner.max_in_flight() <= 3);
    let flat_firsts: Vec<String> = gw
        .inner
        .create_calls()
        .iter()
        .filter(|c| c.series.is_none())
        .map(|c| c.titles[0].clone())
        .collect();
    assert_eq!(flat_firsts, vec!["f 0", "f 2", "f 4"]);
    // Series ran alongside the ordered chunks.
    assert!(gw.inner.max_in_flight() >= 2);
    assert_eq!(report.summary.created, 8);
    assert_eq!(report.results[0].title, "f 0");
    assert_eq!(report.results[7].title, "t 0");
}

#[tokio::test]
async fn test_grouped_import_is_bounded_by_concurrency() {
    let gw = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(20)));
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_group_concurrency(3));
    let report = sched.run(&grouped(8, 4)).await;

    assert_eq!(gw.create_calls().len(), 8);
    assert_eq!(gw.max_in_flight(), 3);
    assert_eq!(report.summary.created, 32);
    // Results come back in submission order even though units finish out of order.
    assert_eq!(report.results[0].title, "S0 0");
    assert_eq!(report.results[31].title, "S7 3");
    for g in 0..8 {
        assert!(gw.series_id(&format!("S{g}")).is_some());
    }
}

#[tokio::test]
async fn test_unit_transport_failure_spares_siblings() {
    let gw = Arc::new(MemoryGateway::new());
    gw.fail_units_containing("S1 0");
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default());
    let batch = grouped(3, 2);

    let first = sched.run(&batch).await;
    assert_eq!(gw.create_calls().len(), 3);
    assert_eq!(first.summary.success(), 4);
    let failed: Vec<_> = first.failed().collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|r| r.title.starts_with("S1")));
    assert!(failed.iter().all(|r| r.error.as_deref() == Some("service unavailable")));

    gw.clear_faults();
    let retried = retry_failed(&sched, &batch, &first.results).await;
    assert_eq!(retried.resubmitted, 2);
    assert_eq!(retried.summary, Summary { created: 6, ..Summary::default() });
    let last_call = gw.create_calls().pop().unwrap();
    assert_eq!(last_call.series.as_deref(), Some("S1"));
}

#[tokio::test]
async fn test_progress_observations_are_monotonic() {
    let gw = Arc::new(MemoryGateway::new().with_latency(Duration::from_millis(3)));
    let sink = Arc::new(InMemoryProgressSink::new());
    let sched = ChunkScheduler::new(gw, &IngestConfig::default()).with_sink(sink.clone());
    let report = sched.run(&grouped(10, 1)).await;

    let seen = sink.observations();
    assert_eq!(seen.len(), 10);
    assert!(seen.windows(2).all(|w| w[0].current <= w[1].current));
    assert!(seen.iter().all(|p| p.current <= p.total && p.total == 10));
    assert!(report.progress.is_complete());

    let events = sink.events();
    assert!(matches!(events.first(), Some(ProgressEvent::JobStarted { total_units: 10, .. })));
    assert!(matches!(events.last(), Some(ProgressEvent::JobFinished { .. })));
}

/// Cancels its token as soon as the first unit completes.
struct CancelAfterFirstUnit(CancellationToken);

#[async_trait]
impl ProgressSink for CancelAfterFirstUnit {
    async fn report(&self, event: ProgressEvent) -> catalog_ingest::Result<()> {
        if let ProgressEvent::UnitCompleted { .. } = event {
            self.0.cancel();
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_keeps_unstarted_units_retryable() {
    let gw = Arc::new(MemoryGateway::new());
    let token = CancellationToken::new();
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_chunk_size(2))
        .with_sink(Arc::new(CancelAfterFirstUnit(token.clone())));
    let batch = ParsedBatch::flat(videos("v", 6));

    let report = sched.run_with_cancel(&batch, token).await;
    assert!(report.cancelled);
    assert_eq!(gw.create_calls().len(), 1);
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.summary.success(), 2);
    assert!(report.failed().all(|r| r.error.as_deref() == Some("cancelled")));
    assert!(report.progress.is_complete());

    let plain = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_chunk_size(2));
    let retried = retry_failed(&plain, &batch, &report.results).await;
    assert_eq!(retried.resubmitted, 4);
    assert_eq!(retried.summary.fail(), 0);
    assert_eq!(retried.results.len(), 6);
}

#[tokio::test]
async fn test_interrupted_retry_never_loses_prior_success() {
    let gw = Arc::new(MemoryGateway::new());
    gw.fail_units_containing("v 3");
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default().with_chunk_size(2));
    let batch = ParsedBatch::flat(videos("v", 6));
    let first = sched.run(&batch).await;
    assert_eq!(first.summary.fail(), 2);

    let token = CancellationToken::new();
    token.cancel();
    let subset_report = sched
        .run_with_cancel(&catalog_ingest::aggregate::failed_subset(&batch, &first.results), token)
        .await;
    let merged = merge_results(&first.results, &subset_report.results);
    assert_eq!(merged.len(), 6);
    assert_eq!(merged.iter().filter(|r| r.is_success()).count(), 4);
}

#[tokio::test]
async fn test_duplicate_titles_without_echoed_ids() {
    let gw = Arc::new(MemoryGateway::new().without_client_ids());
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default());
    let batch = ParsedBatch::flat(vec![
        CanonicalItem::video("Trailer", "https://v/a.mp4"),
        CanonicalItem::video("Trailer", ""),
    ]);
    let report = sched.run(&batch).await;
    assert!(report.results[0].is_success());
    assert_eq!(report.results[1].error.as_deref(), Some("videoUrl required"));
    let ids: Vec<_> = batch.items().map(|i| i.client_id.clone()).collect();
    assert_eq!(report.results[1].client_id.as_ref(), Some(&ids[1]));
}

#[tokio::test]
async fn test_reimport_reports_merges_and_updates() {
    let gw = Arc::new(MemoryGateway::new());
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default());

    sched.run(&ParsedBatch::flat(videos("v", 2))).await;
    let again = sched.run(&ParsedBatch::flat(videos("v", 2))).await;
    assert_eq!(again.summary.merged, 2);

    let games = ParsedBatch::flat(vec![CanonicalItem::game("Celeste")]);
    sched.run(&games).await;
    let again = sched.run(&games).await;
    assert_eq!(again.summary.updated, 1);
}

#[tokio::test]
async fn test_labeled_text_and_url_list_sources_import() {
    let gw = Arc::new(MemoryGateway::new());
    let sched = ChunkScheduler::new(gw.clone(), &IngestConfig::default());

    let labeled = "合集：Lost Tapes\n\n标题：Tape 1\n视频：https://v/t1.mp4\n\n标题：Tape 2\n视频：https://v/t2.mp4\n";
    let batch = parse_source(labeled, ContentKind::Video);
    assert!(batch.is_grouped());
    let report = sched.run(&batch).await;
    assert_eq!(report.summary.created, 2);
    assert_eq!(gw.create_calls()[0].series.as_deref(), Some("Lost Tapes"));

    let urls = "https://cdn.example/clips/Night_Drive-01.mp4\n\nhttps://cdn.example/clips/Night_Drive-01.mp4\n";
    let batch = rows_to_batch(parse_url_list(urls), ContentKind::Video);
    assert_eq!(batch.total_items, 1);
    let report = sched.run(&batch).await;
    assert_eq!(report.results[0].title, "Night Drive 01");
    assert!(report.results[0].is_success());
}
