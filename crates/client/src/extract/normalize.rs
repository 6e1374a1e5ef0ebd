//! Normalization of extracted post JSON into a [`Record`].
//!
//! Every strategy yields an object with a `shortcode_media` member. Sidecar
//! posts list their media under `edge_sidecar_to_children.edges`; single posts
//! are their own only media entry.

use embedfix_core::{Error, MediaItem, Record};
use serde_json::Value;

/// Build the canonical record for `id` from an extracted JSON value.
///
/// Media entries without a URL are dropped. A record without a username or
/// without any media is reported as [`Error::NotFound`].
pub fn normalize(id: &str, value: &Value) -> Result<Record, Error> {
    let item = value
        .get("shortcode_media")
        .filter(|item| item.is_object())
        .ok_or_else(|| Error::Parse("extracted data has no shortcode_media".into()))?;

    let entries: Vec<&Value> = match item.pointer("/edge_sidecar_to_children/edges").and_then(Value::as_array) {
        Some(edges) => edges.iter().collect(),
        None => vec![item],
    };

    let media: Vec<MediaItem> = entries
        .into_iter()
        .map(|entry| entry.get("node").unwrap_or(entry))
        .filter_map(media_item)
        .collect();

    let username = str_at(item, "/owner/username").to_string();
    let caption = str_at(item, "/edge_media_to_caption/edges/0/node/text").trim().to_string();

    if username.is_empty() {
        return Err(Error::NotFound(format!("post {id} has no owner")));
    }
    if media.is_empty() {
        return Err(Error::NotFound(format!("post {id} has no media")));
    }

    Ok(Record { id: id.to_string(), username, caption, media })
}

fn media_item(node: &Value) -> Option<MediaItem> {
    let url = [str_at(node, "/video_url"), str_at(node, "/display_url")]
        .into_iter()
        .find(|url| !url.is_empty())?;
    Some(MediaItem { kind: str_at(node, "/__typename").to_string(), url: url.to_string() })
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_image() {
        let value = json!({
            "shortcode_media": {
                "__typename": "GraphImage",
                "display_url": "https://cdn.example/a.jpg",
                "owner": { "username": "someone" },
                "edge_media_to_caption": { "edges": [{ "node": { "text": "  hello\n" } }] }
            }
        });
        let record = normalize("abc", &value).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.username, "someone");
        assert_eq!(record.caption, "hello");
        assert_eq!(record.media, vec![MediaItem { kind: "GraphImage".into(), url: "https://cdn.example/a.jpg".into() }]);
    }

    #[test]
    fn test_sidecar_prefers_video_url() {
        let value = json!({
            "shortcode_media": {
                "__typename": "GraphSidecar",
                "owner": { "username": "someone" },
                "edge_sidecar_to_children": { "edges": [
                    { "node": { "__typename": "GraphImage", "display_url": "https://cdn.example/1.jpg" } },
                    { "node": { "__typename": "GraphVideo", "display_url": "https://cdn.example/2.jpg",
                                "video_url": "https://cdn.example/2.mp4" } },
                    { "node": { "__typename": "GraphImage", "display_url": "" } }
                ] }
            }
        });
        let record = normalize("abc", &value).unwrap();
        assert_eq!(record.caption, "");
        assert_eq!(
            record.media,
            vec![
                MediaItem { kind: "GraphImage".into(), url: "https://cdn.example/1.jpg".into() },
                MediaItem { kind: "GraphVideo".into(), url: "https://cdn.example/2.mp4".into() },
            ]
        );
    }

    #[test]
    fn test_embed_shape_unwraps_node() {
        let value = json!({
            "shortcode_media": {
                "owner": { "username": "someone" },
                "node": { "__typename": "GraphVideo", "display_url": "https://cdn.example/v.mp4" },
                "edge_media_to_caption": { "edges": [{ "node": { "text": "cap" } }] }
            }
        });
        let record = normalize("abc", &value).unwrap();
        assert_eq!(record.media[0].kind, "GraphVideo");
        assert_eq!(record.media[0].url, "https://cdn.example/v.mp4");
    }

    #[test]
    fn test_missing_username_is_not_found() {
        let value = json!({ "shortcode_media": { "display_url": "https://cdn.example/a.jpg" } });
        assert!(matches!(normalize("abc", &value), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_no_media_is_not_found() {
        let value = json!({ "shortcode_media": { "owner": { "username": "someone" }, "display_url": "" } });
        assert!(matches!(normalize("abc", &value), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_missing_shortcode_media_is_parse_error() {
        assert!(matches!(normalize("abc", &json!({ "user": {} })), Err(Error::Parse(_))));
    }
}
