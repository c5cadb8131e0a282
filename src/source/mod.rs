//! Source parsing: raw bulk input to canonical groups.
//!
//! | Input | Entry point |
//! |-------|-------------|
//! | `{"series": [...]}` JSON | [`parse_grouped`] |
//! | bare JSON array | [`parse_flat`] |
//! | labeled text export | [`parse_labeled_text`] |
//! | manual rows | [`rows_to_batch`] |
//! | pasted URL list | [`parse_url_list`] + [`rows_to_batch`] |
//!
//! [`parse_source`] sniffs the format and never fails; it returns an empty
//! batch for anything it does not understand. [`parse_source_strict`] turns
//! that empty result into a blocking [`Error::Parse`].

mod json;
mod labeled;
mod quick;
pub mod templates;

pub use json::{parse_flat, parse_grouped};
pub use labeled::parse_labeled_text;
pub use quick::{parse_url_list, rows_to_batch, synthesize_title, QuickRow};

use crate::types::{ContentKind, ParsedBatch};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub fn parse_source(raw: &str, default_kind: ContentKind) -> ParsedBatch {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return ParsedBatch::empty();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => json::grouped_from_value(&v, default_kind)
            .or_else(|| json::flat_from_value(&v, default_kind))
            .unwrap_or_default(),
        Err(_) => parse_labeled_text(trimmed, default_kind),
    }
}

pub fn parse_source_strict(raw: &str, default_kind: ContentKind) -> Result<ParsedBatch> {
    if raw.trim().is_empty() {
        return Err(Error::parse_with_context(
            "source is empty",
            ErrorContext::new().with_source("source_parser"),
        ));
    }
    let batch = parse_source(raw, default_kind);
    if batch.is_empty() {
        let details = match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Object(_)) => "JSON object without a `series` array".to_string(),
            Ok(_) => "JSON contains no item objects".to_string(),
            Err(e) => format!("not JSON ({e}) and no labeled records"),
        };
        return Err(Error::parse_with_context(
            "no importable items found",
            ErrorContext::new()
                .with_details(details)
                .with_source("source_parser"),
        ));
    }
    debug!(
        groups = batch.groups.len(),
        items = batch.total_items,
        grouped = batch.is_grouped(),
        "parsed import source"
    );
    Ok(batch)
}

/// Read and strictly parse a source file.
pub fn parse_file(path: impl AsRef<Path>, default_kind: ContentKind) -> Result<ParsedBatch> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    parse_source_strict(&raw, default_kind).map_err(|e| match e {
        Error::Parse { message, context } => Error::Parse {
            message,
            context: context.with_field_path(path.display().to_string()),
        },
        other => other,
    })
}
