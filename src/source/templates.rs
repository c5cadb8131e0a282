//! Downloadable example inputs for the two accepted JSON shapes.
//!
//! Reference data only; nothing in the pipeline reads these at runtime.

/// Series-grouped import: each group shares title, description and cover.
pub const GROUPED_TEMPLATE: &str = r#"{
  "series": [
    {
      "title": "Example Series",
      "description": "Shared description for every episode",
      "coverUrl": "https://cdn.example.com/covers/series.jpg",
      "videos": [
        {
          "title": "Episode 1",
          "videoUrl": "https://cdn.example.com/videos/ep1.mp4",
          "tags": ["anime", "2024"]
        },
        {
          "title": "Episode 2",
          "videoUrl": "https://cdn.example.com/videos/ep2.mp4",
          "tagNames": ["anime"]
        }
      ]
    }
  ]
}
"#;

/// Flat import: a bare array of records.
pub const FLAT_TEMPLATE: &str = r#"[
  {
    "title": "Standalone Video",
    "description": "Optional description",
    "coverUrl": "https://cdn.example.com/covers/standalone.jpg",
    "videoUrl": "https://cdn.example.com/videos/standalone.mp4",
    "tags": ["music"]
  },
  {
    "kind": "game",
    "title": "Example Game",
    "originalName": "Example Game Original",
    "downloadUrl": "https://dl.example.com/game.zip",
    "coverUrl": "https://cdn.example.com/covers/game.jpg",
    "extraInfo": { "size": "1.2GB" }
  }
]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse_source;
    use crate::types::ContentKind;

    #[test]
    fn test_templates_parse() {
        let grouped = parse_source(GROUPED_TEMPLATE, ContentKind::Video);
        assert!(grouped.is_grouped());
        assert_eq!(grouped.total_items, 2);

        let flat = parse_source(FLAT_TEMPLATE, ContentKind::Video);
        assert!(!flat.is_grouped());
        assert_eq!(flat.total_items, 2);
        assert_eq!(flat.groups[0].items[1].kind, ContentKind::Game);
    }
}
