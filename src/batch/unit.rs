//! Splitting a parsed batch into submission units.

use crate::types::{CanonicalItem, ContentKind, GroupMeta, ParsedBatch};

/// One gateway call worth of items: a chunk of a flat import or one group.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportUnit {
    /// Position in submission order, used to restore result order.
    pub index: usize,
    pub kind: ContentKind,
    pub meta: Option<GroupMeta>,
    pub items: Vec<CanonicalItem>,
}

impl ImportUnit {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Chunks of the ungrouped bucket must run one after another, since a
    /// later chunk may attach to records an earlier one created.
    pub fn is_ordered(&self) -> bool {
        self.meta.is_none()
    }
}

/// Split `items` into runs of at most `chunk_size` items of the same kind.
pub fn chunk_items(items: &[CanonicalItem], chunk_size: usize) -> Vec<Vec<CanonicalItem>> {
    let chunk_size = chunk_size.max(1);
    let mut chunks: Vec<Vec<CanonicalItem>> = Vec::new();
    for item in items {
        match chunks.last_mut() {
            Some(last) if last.len() < chunk_size && last[0].kind == item.kind => {
                last.push(item.clone())
            }
            _ => chunks.push(vec![item.clone()]),
        }
    }
    chunks
}

/// Units for a whole batch, in submission order.
///
/// Groups with metadata become one unit each (split only where the item kind
/// changes). The ungrouped bucket is chunked by `chunk_size`; its chunks are
/// [ordered](ImportUnit::is_ordered) even inside a mixed batch.
pub fn units_for(batch: &ParsedBatch, chunk_size: usize) -> Vec<ImportUnit> {
    let mut units = Vec::new();
    for group in &batch.groups {
        let size = if group.is_grouped() {
            usize::MAX
        } else {
            chunk_size
        };
        for items in chunk_items(&group.items, size) {
            units.push(ImportUnit {
                index: units.len(),
                kind: items[0].kind,
                meta: group.meta.clone(),
                items,
            });
        }
    }
    units
}
