//! # catalog-ingest
//!
//! Batch content ingestion and bulk mutation for the video/game catalog admin.
//!
//! ## Overview
//!
//! Heterogeneous bulk input (grouped or flat JSON, the legacy labeled-text
//! export, pasted URL lists, manually entered rows) is normalized into
//! canonical items, split into units and submitted to the admin API with
//! bounded concurrency. Every item ends with exactly one outcome (created,
//! merged, updated or failed), and failures can be retried without ever
//! losing an earlier success.
//!
//! A separate regex bulk editor rewrites one text field across a selection of
//! existing records, gated by a preview that is invalidated by any parameter
//! change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_ingest::aggregate::retry_failed;
//! use catalog_ingest::batch::ChunkScheduler;
//! use catalog_ingest::config::IngestConfig;
//! use catalog_ingest::gateway::HttpGateway;
//! use catalog_ingest::source::parse_file;
//! use catalog_ingest::types::ContentKind;
//!
//! #[tokio::main]
//! async fn main() -> catalog_ingest::Result<()> {
//!     let config = IngestConfig::from_env();
//!     let gateway = Arc::new(HttpGateway::new(&config)?);
//!     let scheduler = ChunkScheduler::new(gateway, &config);
//!
//!     let batch = parse_file("series.json", ContentKind::Video)?;
//!     let report = scheduler.run(&batch).await;
//!     println!("{} ok, {} failed", report.summary.success(), report.summary.fail());
//!
//!     let retried = retry_failed(&scheduler, &batch, &report.results).await;
//!     println!("{} still failing", retried.summary.fail());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`source`] | Input parsing and format detection |
//! | [`types`] | Canonical items, groups, results, progress |
//! | [`batch`] | Unit splitting and the chunk scheduler |
//! | [`gateway`] | Admin API contract, HTTP and in-memory implementations |
//! | [`aggregate`] | Summaries, result merging, retry of failures |
//! | [`regex_edit`] | Preview-gated regex bulk editor |
//! | [`progress`] | Progress observers |
//! | [`config`] | Environment-overridable settings |

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod gateway;
pub mod progress;
pub mod regex_edit;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use aggregate::{retry_failed, ResultAggregator, Summary};
pub use batch::{ChunkScheduler, JobReport};
pub use config::IngestConfig;
pub use gateway::{BatchGateway, HttpGateway, MemoryGateway};
pub use progress::{ProgressEvent, ProgressSink};
pub use regex_edit::RegexBulkEditor;
pub use types::{CanonicalItem, ContentKind, ItemResult, ParsedBatch};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
