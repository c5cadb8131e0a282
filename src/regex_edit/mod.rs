//! Regex bulk edit: pattern find/replace over one text field of a selection
//! of existing records, gated by a mandatory preview.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RegexBulkEditor`] | Preview-then-apply state machine |
//! | [`CompiledRewrite`] | Linear-time pattern + replacement engine |
//! | [`RegexEditRequest`] | The `(field, pattern, replacement, flags, ids)` tuple |
//!
//! ## Example
//!
//! ```rust
//! use catalog_ingest::gateway::MemoryGateway;
//! use catalog_ingest::regex_edit::RegexBulkEditor;
//! use catalog_ingest::types::{CanonicalItem, ContentKind};
//!
//! # tokio_test::block_on(async {
//! let gateway = MemoryGateway::new();
//! let id = gateway.insert(CanonicalItem::game("Celeste").with_cover_url("http://old.cdn/c.png")).unwrap();
//! let selection = vec![id];
//!
//! let mut editor = RegexBulkEditor::new(ContentKind::Game, "coverUrl");
//! editor.set_pattern(r"^http://old\.cdn").unwrap();
//! editor.set_replacement("https://new.cdn").unwrap();
//! let preview = editor.preview(&gateway, &selection).await.unwrap();
//! assert_eq!(preview.stats.total_matched, 1);
//! let applied = editor.apply(&gateway, &selection).await.unwrap();
//! assert_eq!(applied.count, 1);
//! # });
//! ```

mod editor;
mod pattern;
mod request;

pub use editor::{CachedPreview, EditorState, PreviewTicket, RegexBulkEditor, DEFAULT_FLAGS};
pub use pattern::{CompiledRewrite, RegexFlags};
pub use request::{
    RegexApplyResponse, RegexEditRequest, RegexEditStats, RegexPreviewEntry, RegexPreviewResponse,
};
