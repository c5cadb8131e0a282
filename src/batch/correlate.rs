//! Matching gateway results back to the items of a unit.

use crate::types::{CanonicalItem, ItemResult};
use std::collections::HashMap;
use tracing::warn;

pub(crate) const MISSING_RESULT: &str = "no result returned for item";

/// Pair each item with its result, in item order.
///
/// A result is matched by its echoed `clientId`, else by title against the
/// first item with that title that is still unmatched. Results that match no
/// item are dropped; items left without a result become failures. The output
/// therefore always has exactly `items.len()` entries, each carrying the
/// item's client id.
pub(crate) fn correlate(items: &[CanonicalItem], results: Vec<ItemResult>) -> Vec<ItemResult> {
    let by_client: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.client_id.as_str(), i))
        .collect();
    let mut slots: Vec<Option<ItemResult>> = vec![None; items.len()];
    let mut dropped = 0usize;

    for result in results {
        let result = result.normalized();
        let by_id = result
            .client_id
            .as_deref()
            .and_then(|id| by_client.get(id).copied())
            .filter(|&i| slots[i].is_none());
        let slot = by_id.or_else(|| {
            items
                .iter()
                .enumerate()
                .position(|(i, item)| slots[i].is_none() && item.title == result.title)
        });
        match slot {
            Some(i) => slots[i] = Some(result),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "gateway returned results that match no submitted item");
    }

    items
        .iter()
        .zip(slots)
        .map(|(item, slot)| {
            let mut result = slot.unwrap_or_else(|| ItemResult::failed(&item.title, MISSING_RESULT));
            if result.title.is_empty() {
                result.title = item.title.clone();
            }
            result.client_id = Some(item.client_id.clone());
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_client_id_regardless_of_order() {
        let items = vec![CanonicalItem::game("a"), CanonicalItem::game("b")];
        let results = vec![
            ItemResult::created("b", "2").with_client_id(&items[1].client_id),
            ItemResult::created("a", "1").with_client_id(&items[0].client_id),
        ];
        let out = correlate(&items, results);
        assert_eq!(out[0].id.as_deref(), Some("1"));
        assert_eq!(out[1].id.as_deref(), Some("2"));
    }

    #[test]
    fn test_duplicate_titles_pair_in_order() {
        let items = vec![CanonicalItem::video("dup", "u1"), CanonicalItem::video("dup", "u2")];
        let results = vec![ItemResult::created("dup", "1"), ItemResult::failed("dup", "bad")];
        let out = correlate(&items, results);
        assert!(out[0].is_success());
        assert!(out[1].is_failure());
        assert_eq!(out[1].client_id.as_deref(), Some(items[1].client_id.as_str()));
    }

    #[test]
    fn test_size_invariant_holds_for_short_and_stray_answers() {
        let items = vec![CanonicalItem::game("a"), CanonicalItem::game("b")];
        let results = vec![ItemResult::created("a", "1"), ItemResult::created("zzz", "9")];
        let out = correlate(&items, results);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].error.as_deref(), Some(MISSING_RESULT));
    }

    #[test]
    fn test_result_with_both_id_and_error_counts_as_failure() {
        let items = vec![CanonicalItem::game("a")];
        let mut r = ItemResult::created("a", "1");
        r.error = Some("conflict".into());
        let out = correlate(&items, vec![r]);
        assert!(out[0].id.is_none());
        assert_eq!(out[0].error.as_deref(), Some("conflict"));
    }
}
