//! Regex bulk edit flows against the in-memory gateway.

use catalog_ingest::gateway::{BatchGateway, MemoryGateway};
use catalog_ingest::regex_edit::{EditorState, RegexBulkEditor};
use catalog_ingest::types::{CanonicalItem, ContentKind};
use catalog_ingest::Error;

/// Five games, three of them on the old CDN.
fn seeded() -> (MemoryGateway, Vec<String>) {
    let gw = MemoryGateway::new();
    let covers = [
        "http://old.cdn/celeste.png",
        "https://img.example/hades.png",
        "http://old.cdn/hollow.png",
        "http://old.cdn/ori.png",
        "https://old.cdn/secure.png",
    ];
    let ids = covers
        .iter()
        .enumerate()
        .map(|(i, c)| gw.insert(CanonicalItem::game(format!("Game {i}")).with_cover_url(*c)).unwrap())
        .collect();
    (gw, ids)
}

fn cdn_editor() -> RegexBulkEditor {
    let mut editor = RegexBulkEditor::new(ContentKind::Game, "coverUrl");
    editor.set_pattern(r"^http://old\.cdn").unwrap();
    editor.set_replacement("https://new.cdn").unwrap();
    editor.set_flags("g").unwrap();
    editor
}

#[tokio::test]
async fn test_scenario_cdn_migration() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();

    let preview = editor.preview(&gw, &ids).await.unwrap();
    assert_eq!(preview.stats.total_matched, 3);
    assert_eq!(preview.stats.total_selected, 5);
    assert_eq!(preview.previews.len(), 3);
    assert_eq!(preview.previews[0].after, "https://new.cdn/celeste.png");
    assert!(editor.can_apply());

    let applied = editor.apply(&gw, &ids).await.unwrap();
    assert_eq!(applied.count, 3);
    assert_eq!(editor.state(), EditorState::Idle);
    assert!(editor.pattern().is_empty());

    assert_eq!(gw.record(&ids[0]).unwrap().cover_url, "https://new.cdn/celeste.png");
    assert_eq!(gw.record(&ids[1]).unwrap().cover_url, "https://img.example/hades.png");
    assert_eq!(gw.record(&ids[4]).unwrap().cover_url, "https://old.cdn/secure.png");
}

#[tokio::test]
async fn test_apply_count_matches_preview_for_same_tuple() {
    for (pattern, flags) in [(r"\.png$", "g"), (r"o", ""), (r"OLD", "gi"), (r"nomatch", "g")] {
        let (gw, ids) = seeded();
        let mut editor = RegexBulkEditor::new(ContentKind::Game, "coverUrl");
        editor.set_pattern(pattern).unwrap();
        editor.set_replacement("X").unwrap();
        editor.set_flags(flags).unwrap();

        let matched = editor.preview(&gw, &ids).await.unwrap().stats.total_matched;
        if matched == 0 {
            assert!(!editor.can_apply());
            assert!(matches!(editor.apply(&gw, &ids).await, Err(Error::InvalidState { .. })));
            assert_eq!(gw.apply_calls(), 0);
            continue;
        }
        let applied = editor.apply(&gw, &ids).await.unwrap();
        assert_eq!(applied.count, matched, "pattern {pattern} flags {flags}");
    }
}

#[tokio::test]
async fn test_edit_after_preview_blocks_apply() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();
    editor.preview(&gw, &ids).await.unwrap();

    editor.set_pattern(r"^http://").unwrap();
    assert_eq!(editor.state(), EditorState::PatternEntered);
    assert!(editor.preview_result().is_none());
    assert!(matches!(editor.apply(&gw, &ids).await, Err(Error::InvalidState { .. })));
    assert_eq!(gw.apply_calls(), 0);

    // Re-setting an identical value is not an edit.
    editor.preview(&gw, &ids).await.unwrap();
    editor.set_replacement("https://new.cdn").unwrap();
    assert!(editor.can_apply());

    let applied = editor.apply(&gw, &ids).await.unwrap();
    assert_eq!(applied.count, 3);
}

#[tokio::test]
async fn test_selection_change_invalidates_preview() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();
    editor.preview(&gw, &ids).await.unwrap();

    let fewer = ids[..2].to_vec();
    let err = editor.apply(&gw, &fewer).await.unwrap_err();
    assert!(matches!(err, Error::StalePreview { .. }));
    assert!(!editor.can_apply());
    assert_eq!(gw.apply_calls(), 0);
}

#[tokio::test]
async fn test_reordered_selection_keeps_preview() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();
    editor.preview(&gw, &ids).await.unwrap();

    let mut reordered = ids.clone();
    reordered.reverse();
    let applied = editor.apply(&gw, &reordered).await.unwrap();
    assert_eq!(applied.count, 3);
    assert_eq!(gw.preview_calls(), 1);
}

#[tokio::test]
async fn test_preview_answer_for_old_parameters_is_discarded() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();

    let ticket = editor.begin_preview(&ids).unwrap();
    assert!(matches!(editor.begin_preview(&ids), Err(Error::InvalidState { .. })));

    editor.set_replacement("https://other.cdn").unwrap();
    let answer = gw.regex_preview(&ticket.request).await;
    let err = editor.complete_preview(ticket, answer).unwrap_err();
    assert!(matches!(err, Error::StalePreview { .. }));
    assert_eq!(editor.state(), EditorState::PatternEntered);
    assert!(!editor.can_apply());

    let preview = editor.preview(&gw, &ids).await.unwrap();
    assert_eq!(preview.previews[0].after, "https://other.cdn/celeste.png");
}

#[tokio::test]
async fn test_invalid_pattern_makes_no_network_call() {
    let (gw, ids) = seeded();
    let mut editor = RegexBulkEditor::new(ContentKind::Game, "coverUrl");
    editor.set_pattern("(unclosed").unwrap();

    let err = editor.preview(&gw, &ids).await.unwrap_err();
    assert!(matches!(err, Error::PatternCompile { .. }));
    assert!(err.is_terminal());
    assert_eq!(editor.state(), EditorState::Error);
    assert!(editor.last_error().is_some());
    assert_eq!(gw.preview_calls(), 0);

    editor.set_pattern("old").unwrap();
    assert_eq!(editor.state(), EditorState::PatternEntered);
}

#[tokio::test]
async fn test_apply_failure_keeps_preview_for_retry() {
    let (gw, ids) = seeded();
    let mut editor = cdn_editor();
    editor.preview(&gw, &ids).await.unwrap();

    gw.fail_next_applies(1);
    let err = editor.apply(&gw, &ids).await.unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(editor.state(), EditorState::Previewed);
    assert!(editor.can_apply());
    assert_eq!(gw.preview_calls(), 1);

    let applied = editor.apply(&gw, &ids).await.unwrap();
    assert_eq!(applied.count, 3);
    assert_eq!(gw.preview_calls(), 1);
    assert_eq!(gw.apply_calls(), 2);
}

#[tokio::test]
async fn test_empty_replacement_deletes_matches() {
    let gw = MemoryGateway::new();
    let id = gw.insert(CanonicalItem::video("Trip [HD] Day 1 [HD]", "https://v/1.mp4")).unwrap();
    let ids = vec![id.clone()];

    let mut editor = RegexBulkEditor::new(ContentKind::Video, "title");
    editor.set_pattern(r"\s*\[HD\]").unwrap();
    editor.preview(&gw, &ids).await.unwrap();
    editor.apply(&gw, &ids).await.unwrap();
    assert_eq!(gw.record(&id).unwrap().title, "Trip Day 1");
}

#[tokio::test]
async fn test_non_editable_field_is_rejected_locally() {
    let (gw, ids) = seeded();
    let mut editor = RegexBulkEditor::new(ContentKind::Game, "videoUrl");
    editor.set_pattern("x").unwrap();
    assert!(matches!(editor.preview(&gw, &ids).await, Err(Error::Validation { .. })));
    assert_eq!(gw.preview_calls(), 0);
}
