use crate::types::{CanonicalItem, ItemResult, ParsedBatch};
use std::collections::{HashMap, HashSet};

/// Union of a prior aggregate and a retry run's results, keyed by
/// [`ItemResult::key`].
///
/// Order follows `prior`; retry results with unseen keys are appended. A prior
/// success is never replaced, so an interrupted retry cannot lose one.
pub fn merge_results(prior: &[ItemResult], retry: &[ItemResult]) -> Vec<ItemResult> {
    let mut by_key: HashMap<&str, &ItemResult> = HashMap::with_capacity(retry.len());
    for r in retry {
        by_key.insert(r.key(), r);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(prior.len());
    let mut merged: Vec<ItemResult> = prior
        .iter()
        .map(|p| {
            seen.insert(p.key());
            match by_key.get(p.key()) {
                Some(newer) if p.is_failure() => (*newer).clone(),
                _ => p.clone(),
            }
        })
        .collect();

    merged.extend(
        retry
            .iter()
            .filter(|r| !seen.contains(r.key()))
            .cloned(),
    );
    merged
}

/// Items of `original` whose latest result in `last` is a failure.
///
/// Items are matched by client id, then by title for results that carry none.
/// Group metadata and order are preserved; groups left empty are dropped.
pub fn failed_subset(original: &ParsedBatch, last: &[ItemResult]) -> ParsedBatch {
    let mut by_client: HashMap<&str, &ItemResult> = HashMap::new();
    let mut by_title: HashMap<&str, Vec<&ItemResult>> = HashMap::new();
    for r in last {
        match r.client_id.as_deref() {
            Some(id) => {
                by_client.insert(id, r);
            }
            None => by_title.entry(r.title.as_str()).or_default().push(r),
        }
    }

    // Title-matched results are consumed in order so duplicate titles pair
    // with items positionally.
    let mut title_cursor: HashMap<&str, usize> = HashMap::new();
    let mut latest_failed = |item: &CanonicalItem| -> bool {
        if let Some(r) = by_client.get(item.client_id.as_str()) {
            return r.is_failure();
        }
        let Some((title, candidates)) = by_title.get_key_value(item.title.as_str()) else {
            return false;
        };
        let cursor = title_cursor.entry(*title).or_insert(0);
        let hit = candidates.get(*cursor).map(|r| r.is_failure()).unwrap_or(false);
        *cursor += 1;
        hit
    };

    original.filter_items(&mut latest_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BatchGroup, GroupMeta};

    fn keyed(r: ItemResult, key: &str) -> ItemResult {
        r.with_client_id(key)
    }

    #[test]
    fn test_merge_replaces_only_failures() {
        let prior = vec![
            keyed(ItemResult::created("a", "1"), "k1"),
            keyed(ItemResult::failed("b", "timeout"), "k2"),
            keyed(ItemResult::failed("c", "videoUrl required"), "k3"),
        ];
        let retry = vec![
            keyed(ItemResult::created("b", "2"), "k2"),
            keyed(ItemResult::failed("c", "still bad"), "k3"),
        ];
        let merged = merge_results(&prior, &retry);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].id.as_deref(), Some("1"));
        assert_eq!(merged[1].id.as_deref(), Some("2"));
        assert_eq!(merged[2].error.as_deref(), Some("still bad"));
    }

    #[test]
    fn test_merge_never_drops_prior_success() {
        let prior = vec![keyed(ItemResult::created("a", "1"), "k1")];
        let retry = vec![keyed(ItemResult::failed("a", "cancelled"), "k1")];
        let merged = merge_results(&prior, &retry);
        assert!(merged[0].is_success());
    }

    #[test]
    fn test_failed_subset_preserves_groups() {
        let a = crate::types::CanonicalItem::video("a", "ua");
        let b = crate::types::CanonicalItem::video("b", "ub");
        let c = crate::types::CanonicalItem::video("c", "uc");
        let batch = ParsedBatch::from_groups(vec![
            BatchGroup::with_meta(GroupMeta::titled("S1"), vec![a.clone(), b.clone()]),
            BatchGroup::with_meta(GroupMeta::titled("S2"), vec![c.clone()]),
        ]);
        let last = vec![
            ItemResult::created("a", "1").with_client_id(&a.client_id),
            ItemResult::failed("b", "boom").with_client_id(&b.client_id),
            ItemResult::created("c", "3").with_client_id(&c.client_id),
        ];
        let subset = failed_subset(&batch, &last);
        assert_eq!(subset.total_items, 1);
        assert_eq!(subset.groups[0].meta, Some(GroupMeta::titled("S1")));
        assert_eq!(subset.groups[0].items[0].client_id, b.client_id);
    }

    #[test]
    fn test_failed_subset_falls_back_to_title_in_order() {
        let batch = ParsedBatch::flat(vec![
            crate::types::CanonicalItem::video("dup", "u1"),
            crate::types::CanonicalItem::video("dup", "u2"),
        ]);
        let last = vec![
            ItemResult::created("dup", "1"),
            ItemResult::failed("dup", "boom"),
        ];
        let subset = failed_subset(&batch, &last);
        assert_eq!(subset.total_items, 1);
        assert_eq!(subset.groups[0].items[0].video_url, "u2");
    }
}
