//! Canonical items and groups.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kind of catalog record an item creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Video,
    Game,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Game => "game",
        }
    }

    /// Plural resource segment used by the admin API.
    pub fn resource(&self) -> &'static str {
        match self {
            ContentKind::Video => "videos",
            ContentKind::Game => "games",
        }
    }

    /// Text fields the bulk editor is allowed to rewrite.
    pub fn editable_fields(&self) -> &'static [&'static str] {
        match self {
            ContentKind::Video => &["title", "description", "coverUrl", "videoUrl"],
            ContentKind::Game => &[
                "title",
                "description",
                "coverUrl",
                "originalName",
                "downloadUrl",
            ],
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "videos" => Ok(ContentKind::Video),
            "game" | "games" => Ok(ContentKind::Game),
            other => Err(format!("unknown content kind: {other}")),
        }
    }
}

/// One importable record.
///
/// `client_id` is generated locally and echoed by the gateway so results can be
/// matched to items even when two items share a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalItem {
    pub client_id: String,
    pub kind: ContentKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cover_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub video_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<Value>,
    /// Kind-specific string fields (`downloadUrl`, `originalName`, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CanonicalItem {
    pub fn new(kind: ContentKind, title: impl Into<String>) -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            description: String::new(),
            cover_url: String::new(),
            video_url: String::new(),
            tags: Vec::new(),
            extra_info: None,
            fields: Map::new(),
        }
    }

    pub fn video(title: impl Into<String>, video_url: impl Into<String>) -> Self {
        let mut item = Self::new(ContentKind::Video, title);
        item.video_url = video_url.into();
        item
    }

    pub fn game(title: impl Into<String>) -> Self {
        Self::new(ContentKind::Game, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = url.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Read a text field by its wire name.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            "coverUrl" => Some(&self.cover_url),
            "videoUrl" => Some(&self.video_url),
            other => self.fields.get(other).and_then(Value::as_str),
        }
    }
}

/// Metadata shared by all items of a group (e.g. a series).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl GroupMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.cover_url.is_none()
    }
}

/// An ordered list of items with optional shared metadata.
///
/// `meta == None` marks the ungrouped bucket produced by flat sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<GroupMeta>,
    pub items: Vec<CanonicalItem>,
}

impl BatchGroup {
    pub fn ungrouped(items: Vec<CanonicalItem>) -> Self {
        Self { meta: None, items }
    }

    pub fn with_meta(meta: GroupMeta, items: Vec<CanonicalItem>) -> Self {
        Self {
            meta: Some(meta),
            items,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.meta.is_some()
    }
}

/// Normalized parser output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBatch {
    pub groups: Vec<BatchGroup>,
    pub total_items: usize,
}

impl ParsedBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from groups, dropping empty ones and recomputing the item count.
    pub fn from_groups(groups: Vec<BatchGroup>) -> Self {
        let groups: Vec<BatchGroup> = groups.into_iter().filter(|g| !g.items.is_empty()).collect();
        let total_items = groups.iter().map(|g| g.items.len()).sum();
        Self {
            groups,
            total_items,
        }
    }

    pub fn flat(items: Vec<CanonicalItem>) -> Self {
        Self::from_groups(vec![BatchGroup::ungrouped(items)])
    }

    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// True when at least one group carries shared metadata.
    pub fn is_grouped(&self) -> bool {
        self.groups.iter().any(BatchGroup::is_grouped)
    }

    pub fn items(&self) -> impl Iterator<Item = &CanonicalItem> {
        self.groups.iter().flat_map(|g| g.items.iter())
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut CanonicalItem> {
        self.groups.iter_mut().flat_map(|g| g.items.iter_mut())
    }

    /// Keep only the items matching `keep`, preserving group order and metadata.
    pub fn filter_items<F>(&self, mut keep: F) -> ParsedBatch
    where
        F: FnMut(&CanonicalItem) -> bool,
    {
        let groups = self
            .groups
            .iter()
            .map(|g| BatchGroup {
                meta: g.meta.clone(),
                items: g.items.iter().filter(|i| keep(i)).cloned().collect(),
            })
            .collect();
        ParsedBatch::from_groups(groups)
    }
}
