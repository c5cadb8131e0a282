//! Quick-entry rows and pasted URL lists.

use crate::types::{CanonicalItem, ContentKind, ParsedBatch};
use serde::{Deserialize, Serialize};

/// One manually entered row. Only `url` or `title` needs to be filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRow {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl QuickRow {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.url.trim().is_empty()
    }

    pub fn into_item(self, kind: ContentKind) -> CanonicalItem {
        let url = self.url.trim().to_string();
        let title = match self.title.trim() {
            "" => synthesize_title(&url).unwrap_or_default(),
            t => t.to_string(),
        };
        let mut item = CanonicalItem::new(kind, title)
            .with_description(self.description.trim())
            .with_cover_url(self.cover_url.trim())
            .with_tags(
                self.tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
            );
        match kind {
            ContentKind::Video => item.video_url = url,
            ContentKind::Game => {
                if !url.is_empty() {
                    item = item.with_field("downloadUrl", url);
                }
            }
        }
        item
    }
}

/// Turn quick-entry rows into one flat batch. Fully blank rows are dropped.
pub fn rows_to_batch(rows: Vec<QuickRow>, kind: ContentKind) -> ParsedBatch {
    let items = rows
        .into_iter()
        .filter(|r| !r.is_blank())
        .map(|r| r.into_item(kind))
        .collect();
    ParsedBatch::flat(items)
}

/// One URL per line; blank lines, comment lines and repeated URLs are skipped.
pub fn parse_url_list(text: &str) -> Vec<QuickRow> {
    let mut seen: Vec<&str> = Vec::new();
    let mut rows = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || seen.contains(&line) {
            continue;
        }
        seen.push(line);
        rows.push(QuickRow::from_url(line));
    }
    rows
}

/// Derive a display title from the last path segment of a URL.
///
/// `https://cdn.example/media/My%20Show_Ep-01.mp4?sig=x` becomes `My Show Ep 01`.
/// Returns `None` when nothing usable remains.
pub fn synthesize_title(url: &str) -> Option<String> {
    let segment = last_path_segment(url)?;

    let stem = match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => segment.as_str(),
    };

    // Malformed escapes stay verbatim; invalid UTF-8 is replaced.
    let bytes = urlencoding::decode_binary(stem.as_bytes());
    let decoded = String::from_utf8_lossy(&bytes);
    let spaced: String = decoded
        .chars()
        .map(|c| if matches!(c, '_' | '-' | '.' | '+') { ' ' } else { c })
        .collect();
    let title = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn last_path_segment(url: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(url) {
        return parsed
            .path_segments()
            .and_then(|segs| segs.filter(|s| !s.is_empty()).last().map(str::to_string));
    }
    // Relative or scheme-less input: cut query/fragment by hand.
    let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
