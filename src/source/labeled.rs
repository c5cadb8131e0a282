//! Labeled-text source: the plain-text export produced by the legacy site scraper.
//!
//! ```text
//! 合集：Some Author
//!
//! 标题：Episode title - 第1集
//! 描述：...
//! 封面：https://cdn/cover.jpg
//! 视频：https://cdn/1.mp4
//! 标签：tag1,tag2
//! ```
//!
//! Records are separated by blank lines; a series line opens a new group that
//! collects every following record until the next series line.

use super::json::split_tag_list;
use super::quick::synthesize_title;
use crate::types::{BatchGroup, CanonicalItem, ContentKind, GroupMeta, ParsedBatch};
use once_cell::sync::Lazy;
use regex::Regex;

static LABEL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^:：]{1,20}?)\s*[:：]\s*(.*?)\s*$").expect("label line pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Series,
    Title,
    Description,
    Cover,
    Video,
    Tags,
}

fn label_of(key: &str) -> Option<Label> {
    let key = key.trim().to_ascii_lowercase();
    let label = match key.as_str() {
        "合集" | "系列" | "series" | "collection" => Label::Series,
        "标题" | "title" => Label::Title,
        "描述" | "简介" | "description" => Label::Description,
        "封面" | "cover" | "coverurl" => Label::Cover,
        "视频" | "video" | "videourl" | "url" => Label::Video,
        "标签" | "tags" => Label::Tags,
        _ => return None,
    };
    Some(label)
}

#[derive(Debug, Default)]
struct Block {
    title: String,
    description: String,
    cover_url: String,
    video_url: String,
    tags: Vec<String>,
}

impl Block {
    fn is_empty(&self) -> bool {
        self.title.is_empty() && self.video_url.is_empty()
    }

    fn into_item(self, kind: ContentKind) -> CanonicalItem {
        let title = if self.title.is_empty() {
            synthesize_title(&self.video_url).unwrap_or_default()
        } else {
            self.title
        };
        let mut item = CanonicalItem::new(kind, title)
            .with_description(self.description)
            .with_cover_url(self.cover_url)
            .with_tags(self.tags);
        item.video_url = self.video_url;
        item
    }
}

struct Builder {
    kind: ContentKind,
    ungrouped: Vec<CanonicalItem>,
    groups: Vec<BatchGroup>,
    block: Block,
}

impl Builder {
    fn flush(&mut self) {
        let block = std::mem::take(&mut self.block);
        if block.is_empty() {
            return;
        }
        let item = block.into_item(self.kind);
        match self.groups.last_mut() {
            Some(group) => group.items.push(item),
            None => self.ungrouped.push(item),
        }
    }

    fn open_series(&mut self, title: &str) {
        self.flush();
        let meta = if title.is_empty() {
            GroupMeta::default()
        } else {
            GroupMeta::titled(title)
        };
        self.groups.push(BatchGroup::with_meta(meta, Vec::new()));
    }

    fn finish(mut self) -> ParsedBatch {
        self.flush();
        let mut all = Vec::with_capacity(self.groups.len() + 1);
        if !self.ungrouped.is_empty() {
            all.push(BatchGroup::ungrouped(self.ungrouped));
        }
        all.extend(self.groups);
        ParsedBatch::from_groups(all)
    }
}

pub fn parse_labeled_text(text: &str, kind: ContentKind) -> ParsedBatch {
    let mut b = Builder {
        kind,
        ungrouped: Vec::new(),
        groups: Vec::new(),
        block: Block::default(),
    };

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            b.flush();
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with("---") {
            continue;
        }
        let Some(caps) = LABEL_LINE.captures(trimmed) else {
            continue;
        };
        let Some(label) = label_of(&caps[1]) else {
            continue;
        };
        let value = caps[2].to_string();
        match label {
            Label::Series => b.open_series(&value),
            Label::Title => {
                // A second title without a blank line still starts a new record.
                if !b.block.title.is_empty() {
                    b.flush();
                }
                b.block.title = value;
            }
            Label::Description => b.block.description = value,
            Label::Cover => b.block.cover_url = value,
            Label::Video => b.block.video_url = value,
            Label::Tags => b.block.tags = split_tag_list(&value),
        }
    }

    b.finish()
}
