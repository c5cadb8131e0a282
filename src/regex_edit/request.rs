//! Wire types for regex preview / apply.

use crate::types::ContentKind;
use serde::{Deserialize, Serialize};

/// The full tuple a preview is computed for. Apply must send the same tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexEditRequest {
    #[serde(skip)]
    pub kind: ContentKind,
    pub field: String,
    pub pattern: String,
    pub replacement: String,
    pub flags: String,
    #[serde(rename = "ids")]
    pub target_ids: Vec<String>,
}

impl RegexEditRequest {
    pub fn new(
        kind: ContentKind,
        field: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        flags: impl Into<String>,
        target_ids: Vec<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            pattern: pattern.into(),
            replacement: replacement.into(),
            flags: flags.into(),
            target_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexPreviewEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexEditStats {
    pub total_matched: usize,
    pub total_selected: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegexPreviewResponse {
    #[serde(default)]
    pub previews: Vec<RegexPreviewEntry>,
    #[serde(default)]
    pub total_matched: usize,
    #[serde(default)]
    pub total_selected: usize,
}

impl RegexPreviewResponse {
    pub fn stats(&self) -> RegexEditStats {
        RegexEditStats {
            total_matched: self.total_matched,
            total_selected: self.total_selected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexApplyResponse {
    pub count: usize,
}
