//! Chunked, policy-driven submission of parsed batches.
//!
//! A [`ParsedBatch`](crate::types::ParsedBatch) is split into [`ImportUnit`]s:
//! chunks of at most `chunk_size` items for flat input, one unit per group for
//! grouped input. [`ChunkScheduler`] drains the units of a fresh [`ImportJob`]
//! against a [`BatchGateway`](crate::gateway::BatchGateway).
//!
//! ## Strategies
//!
//! - **Sequential**: flat imports; chunk *k+1* waits for chunk *k*
//! - **Concurrent**: grouped imports; up to N workers share one FIFO queue
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use catalog_ingest::batch::ChunkScheduler;
//! use catalog_ingest::config::IngestConfig;
//! use catalog_ingest::gateway::MemoryGateway;
//! use catalog_ingest::source::parse_source;
//! use catalog_ingest::types::ContentKind;
//!
//! # tokio_test::block_on(async {
//! let batch = parse_source(
//!     r#"[{"title":"Ep 1","videoUrl":"https://v/1.mp4"},{"title":"Ep 2"}]"#,
//!     ContentKind::Video,
//! );
//! let scheduler = ChunkScheduler::new(Arc::new(MemoryGateway::new()), &IngestConfig::default());
//! let report = scheduler.run(&batch).await;
//! assert_eq!(report.summary.success(), 1);
//! assert_eq!(report.failed().next().unwrap().error.as_deref(), Some("videoUrl required"));
//! # });
//! ```

mod correlate;
mod job;
mod scheduler;
mod unit;

pub use job::ImportJob;
pub use scheduler::{ChunkScheduler, JobReport, SchedulePolicy};
pub use unit::{chunk_items, units_for, ImportUnit};
