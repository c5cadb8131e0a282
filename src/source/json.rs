//! JSON source shapes.
//!
//! Two shapes are accepted:
//!
//! ```json
//! { "series": [ { "title": "...", "description": "...", "coverUrl": "...", "videos": [ {...} ] } ] }
//! [ { "title": "...", "videoUrl": "...", "tags": ["a", "b"] } ]
//! ```
//!
//! Anything else yields an empty batch. Per-item fields with the wrong type
//! fall back to empty values instead of failing the whole file.

use crate::types::{BatchGroup, CanonicalItem, ContentKind, GroupMeta, ParsedBatch};
use serde_json::{Map, Value};

/// Top-level keys that hold an array of groups.
const GROUP_KEYS: &[&str] = &["series", "collections"];
/// Keys of the nested item array inside a group.
const ITEM_KEYS: &[&str] = &["videos", "games", "items", "episodes"];
/// Either tag-list spelling is accepted; both are merged.
const TAG_KEYS: &[&str] = &["tags", "tagNames"];

const KNOWN_ITEM_KEYS: &[&str] = &[
    "kind",
    "type",
    "title",
    "name",
    "description",
    "coverUrl",
    "cover",
    "videoUrl",
    "url",
    "tags",
    "tagNames",
    "extraInfo",
    "clientId",
];

pub fn parse_grouped(raw: &str, default_kind: ContentKind) -> ParsedBatch {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => grouped_from_value(&v, default_kind).unwrap_or_default(),
        Err(_) => ParsedBatch::empty(),
    }
}

pub fn parse_flat(raw: &str, default_kind: ContentKind) -> ParsedBatch {
    match serde_json::from_str::<Value>(raw) {
        Ok(v) => flat_from_value(&v, default_kind).unwrap_or_default(),
        Err(_) => ParsedBatch::empty(),
    }
}

/// `None` when the value does not have the grouped shape at all.
pub(crate) fn grouped_from_value(v: &Value, default_kind: ContentKind) -> Option<ParsedBatch> {
    let obj = v.as_object()?;
    let groups_raw = GROUP_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))?;

    let groups = groups_raw
        .iter()
        .filter_map(Value::as_object)
        .map(|g| {
            let items = ITEM_KEYS
                .iter()
                .find_map(|k| g.get(*k).and_then(Value::as_array))
                .map(|arr| items_from_array(arr, default_kind))
                .unwrap_or_default();
            BatchGroup::with_meta(group_meta(g), items)
        })
        .collect();

    Some(ParsedBatch::from_groups(groups))
}

/// `None` when the value is not a bare array.
pub(crate) fn flat_from_value(v: &Value, default_kind: ContentKind) -> Option<ParsedBatch> {
    let arr = v.as_array()?;
    Some(ParsedBatch::flat(items_from_array(arr, default_kind)))
}

fn group_meta(g: &Map<String, Value>) -> GroupMeta {
    GroupMeta {
        title: opt_str(g, &["title", "seriesTitle", "name"]),
        description: opt_str(g, &["description"]),
        cover_url: opt_str(g, &["coverUrl", "cover"]),
    }
}

fn items_from_array(arr: &[Value], default_kind: ContentKind) -> Vec<CanonicalItem> {
    arr.iter()
        .filter_map(|v| item_from_value(v, default_kind))
        .collect()
}

pub(crate) fn item_from_value(v: &Value, default_kind: ContentKind) -> Option<CanonicalItem> {
    let obj = v.as_object()?;

    let kind = ["kind", "type"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .and_then(|s| s.parse::<ContentKind>().ok())
        .unwrap_or(default_kind);

    let mut item = CanonicalItem::new(kind, str_field(obj, &["title", "name"]));
    item.description = str_field(obj, &["description"]);
    item.cover_url = str_field(obj, &["coverUrl", "cover"]);
    item.video_url = str_field(obj, &["videoUrl", "url"]);
    item.tags = merge_tags(obj);
    item.extra_info = obj.get("extraInfo").filter(|v| !v.is_null()).cloned();

    for (key, value) in obj {
        if KNOWN_ITEM_KEYS.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                item.fields.insert(key.clone(), value.clone());
            }
            _ => {}
        }
    }
    Some(item)
}

fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    opt_str(obj, keys).unwrap_or_default()
}

fn opt_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn merge_tags(obj: &Map<String, Value>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for key in TAG_KEYS {
        let raw: Vec<String> = match obj.get(*key) {
            Some(Value::Array(arr)) => arr
                .iter()
                .filter_map(|t| match t {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => split_tag_list(s),
            _ => Vec::new(),
        };
        for tag in raw {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
    }
    tags
}

/// Split a free-text tag list on ASCII and CJK separators.
pub(crate) fn split_tag_list(s: &str) -> Vec<String> {
    s.split(&[',', '，', '、', ';', '；'][..])
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouped_shape_with_and_without_meta() {
        let raw = r#"{
            "series": [
                {"title": "Season 1", "coverUrl": "c.jpg", "videos": [
                    {"title": "Ep 1", "videoUrl": "https://v/1.mp4"},
                    {"title": "Ep 2", "videoUrl": "https://v/2.mp4"}
                ]},
                {"videos": [{"title": "Loose", "videoUrl": "https://v/3.mp4"}]}
            ]
        }"#;
        let batch = parse_grouped(raw, ContentKind::Video);
        assert_eq!(batch.total_items, 3);
        assert_eq!(batch.groups.len(), 2);
        let meta = batch.groups[0].meta.as_ref().unwrap();
        assert_eq!(meta.title.as_deref(), Some("Season 1"));
        assert_eq!(meta.cover_url.as_deref(), Some("c.jpg"));
        assert!(meta.description.is_none());
        assert!(batch.groups[1].meta.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_flat_shape() {
        let raw = r#"[{"title": "A", "videoUrl": "u1"}, {"title": "B", "videoUrl": "u2"}]"#;
        let batch = parse_flat(raw, ContentKind::Video);
        assert_eq!(batch.total_items, 2);
        assert_eq!(batch.groups.len(), 1);
        assert!(batch.groups[0].meta.is_none());
    }

    #[test]
    fn test_unknown_shapes_are_empty() {
        assert!(parse_grouped("[]", ContentKind::Video).is_empty());
        assert!(parse_grouped(r#"{"other": 1}"#, ContentKind::Video).is_empty());
        assert!(parse_flat(r#"{"series": []}"#, ContentKind::Video).is_empty());
        assert!(parse_flat("not json", ContentKind::Video).is_empty());
    }

    #[test]
    fn test_malformed_fields_default_to_empty() {
        let raw = r#"[{"title": 42, "videoUrl": null, "tags": "x"}, "junk", {"title": "ok"}]"#;
        let batch = parse_flat(raw, ContentKind::Video);
        assert_eq!(batch.total_items, 2);
        let first = &batch.groups[0].items[0];
        assert_eq!(first.title, "");
        assert_eq!(first.video_url, "");
        assert_eq!(first.tags, vec!["x".to_string()]);
    }

    #[test]
    fn test_tag_aliases_are_merged_without_duplicates() {
        let raw = r#"[{"title": "A", "tags": ["rpg", "indie"], "tagNames": ["indie", "pixel"]}]"#;
        let batch = parse_flat(raw, ContentKind::Game);
        assert_eq!(
            batch.groups[0].items[0].tags,
            vec!["rpg".to_string(), "indie".to_string(), "pixel".to_string()]
        );
    }

    #[test]
    fn test_item_kind_override_and_extra_fields() {
        let raw = r#"[{"kind": "game", "title": "G", "downloadUrl": "https://dl/g.zip", "extraInfo": {"size": "2GB"}}]"#;
        let batch = parse_flat(raw, ContentKind::Video);
        let item = &batch.groups[0].items[0];
        assert_eq!(item.kind, ContentKind::Game);
        assert_eq!(item.text_field("downloadUrl"), Some("https://dl/g.zip"));
        assert!(item.extra_info.is_some());
    }
}
