//! Core data model shared by every stage of the pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CanonicalItem`] | One importable record, independent of the source shape |
//! | [`BatchGroup`] | Ordered items sharing optional series metadata |
//! | [`ParsedBatch`] | Parser output: groups plus total item count |
//! | [`ItemResult`] | Per-item outcome, exactly one of `id` / `error` |
//! | [`Progress`] | Completed-units counter snapshot |

pub mod item;
pub mod progress;
pub mod result;

pub use item::{BatchGroup, CanonicalItem, ContentKind, GroupMeta, ParsedBatch};
pub use progress::Progress;
pub use result::{ItemResult, Outcome};
