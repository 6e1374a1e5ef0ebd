//! Embed HTML extraction.
//!
//! Reads the visible fields of a captioned embed document (media, username,
//! caption) and synthesizes the same JSON shape the other strategies return.
//! Missing elements degrade to empty fields, and stray invalid UTF-8 bytes are
//! replaced rather than rejected.

use embedfix_core::Error;
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::{Value, json};

/// Body substring shown instead of a playable video.
const VIDEO_BLOCKED_MARKER: &str = "WatchOnInstagram";

const IMAGE_KIND: &str = "GraphImage";
const VIDEO_KIND: &str = "GraphVideo";

/// Caption subtrees that are not part of the caption text.
const CAPTION_EXCLUDED_CLASSES: &[&str] = &["CaptionComments", "CaptionUsername"];

/// Fields read from an embed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedDocument {
    pub username: String,
    pub caption: String,
    pub media_kind: String,
    pub media_url: String,
    pub video_blocked: bool,
}

impl EmbedDocument {
    /// Parse an embed document body.
    pub fn parse(body: &[u8]) -> Result<Self, Error> {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let image = selector(".EmbeddedMediaImage")?;
        let video = selector(".EmbeddedMediaVideo")?;
        let (media_kind, media) = match document.select(&image).next() {
            Some(element) => (IMAGE_KIND, Some(element)),
            None => match document.select(&video).next() {
                Some(element) => (VIDEO_KIND, Some(element)),
                None => (IMAGE_KIND, None),
            },
        };
        let media_url = media
            .and_then(|element| element.value().attr("src"))
            .unwrap_or_default()
            .to_string();

        let username = document
            .select(&selector(".UsernameText")?)
            .flat_map(|element| element.text())
            .collect::<String>();

        let mut caption = String::new();
        for element in document.select(&selector(".Caption")?) {
            push_caption_text(element, &mut caption);
        }

        Ok(Self {
            username,
            caption,
            media_kind: media_kind.to_string(),
            media_url,
            video_blocked: html.contains(VIDEO_BLOCKED_MARKER),
        })
    }

    /// Whether the GraphQL fallback should be consulted.
    pub fn needs_fallback(&self) -> bool {
        self.video_blocked || self.username.is_empty()
    }

    /// The document as a `shortcode_media` JSON record.
    pub fn to_value(&self) -> Value {
        json!({
            "shortcode_media": {
                "owner": { "username": self.username },
                "node": { "__typename": self.media_kind, "display_url": self.media_url },
                "edge_media_to_caption": { "edges": [{ "node": { "text": self.caption } }] },
                "dimensions": { "height": null, "width": null },
                "video_blocked": self.video_blocked,
            }
        })
    }
}

fn selector(css: &str) -> Result<Selector, Error> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector {css}: {e}")))
}

/// Append the text under `element`, writing a newline for every `<br>` and
/// skipping excluded caption subtrees.
fn push_caption_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else { continue };
                if child.value().name() == "br" {
                    out.push('\n');
                } else if !child
                    .value()
                    .classes()
                    .any(|class| CAPTION_EXCLUDED_CLASSES.contains(&class))
                {
                    push_caption_text(child, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_EMBED: &str = r#"
        <html><body>
            <div class="Embed">
                <a class="Username"><span class="UsernameText">photographer</span></a>
                <img class="EmbeddedMediaImage" src="https://cdn.example/photo.jpg">
                <div class="Caption">
                    <a class="CaptionUsername">photographer</a>First paragraph<br>Second "quoted" paragraph
                    <div class="CaptionComments">12 comments</div>
                </div>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_image_embed() {
        let doc = EmbedDocument::parse(IMAGE_EMBED.as_bytes()).unwrap();
        assert_eq!(doc.username, "photographer");
        assert_eq!(doc.media_kind, "GraphImage");
        assert_eq!(doc.media_url, "https://cdn.example/photo.jpg");
        assert!(!doc.video_blocked);
        assert!(!doc.needs_fallback());
        assert!(!doc.caption.contains("comments"));
        assert!(!doc.caption.contains("photographer"));
        assert!(doc.caption.contains("First paragraph\nSecond \"quoted\" paragraph"));
    }

    #[test]
    fn test_caption_line_breaks() {
        let html = r#"<div class="Caption">Line one<br>Line two</div>"#;
        let doc = EmbedDocument::parse(html.as_bytes()).unwrap();
        assert_eq!(doc.caption, "Line one\nLine two");
    }

    #[test]
    fn test_caption_nested_markup() {
        let html = r#"<div class="Caption"><span>a<b>b</b></span><br/><br>c</div>"#;
        let doc = EmbedDocument::parse(html.as_bytes()).unwrap();
        assert_eq!(doc.caption, "ab\n\nc");
    }

    #[test]
    fn test_video_embed() {
        let html = r#"
            <span class="UsernameText">filmmaker</span>
            <video class="EmbeddedMediaVideo" src="https://cdn.example/clip.mp4"></video>
        "#;
        let doc = EmbedDocument::parse(html.as_bytes()).unwrap();
        assert_eq!(doc.media_kind, "GraphVideo");
        assert_eq!(doc.media_url, "https://cdn.example/clip.mp4");
    }

    #[test]
    fn test_no_media_defaults_to_empty_image() {
        let doc = EmbedDocument::parse(b"<span class=\"UsernameText\">someone</span>").unwrap();
        assert_eq!(doc.media_kind, "GraphImage");
        assert!(doc.media_url.is_empty());
    }

    #[test]
    fn test_blocked_video_needs_fallback() {
        let html = r#"
            <span class="UsernameText">filmmaker</span>
            <a class="WatchOnInstagram" href="/p/abc/">Watch on Instagram</a>
        "#;
        let doc = EmbedDocument::parse(html.as_bytes()).unwrap();
        assert!(doc.video_blocked);
        assert!(doc.needs_fallback());
    }

    #[test]
    fn test_missing_username_needs_fallback() {
        let doc = EmbedDocument::parse(b"<html><body></body></html>").unwrap();
        assert!(doc.username.is_empty());
        assert!(doc.needs_fallback());
    }

    #[test]
    fn test_stray_invalid_utf8_is_tolerated() {
        let mut body = b"<span class=\"UsernameText\">someone</span><div class=\"Caption\">caf".to_vec();
        body.extend_from_slice(&[0xe9, 0xff]);
        body.extend_from_slice(b"</div>");

        let doc = EmbedDocument::parse(&body).unwrap();
        assert_eq!(doc.username, "someone");
        assert_eq!(doc.caption, "caf\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_to_value_escapes_caption() {
        let doc = EmbedDocument {
            username: "someone".into(),
            caption: "say \"hi\"\n\tbye\u{1}".into(),
            media_kind: "GraphImage".into(),
            media_url: "https://cdn.example/x.jpg".into(),
            video_blocked: false,
        };
        let value = doc.to_value();
        let text = value.to_string();
        let reparsed: Value = serde_json::from_str(&text).unwrap();

        let media = &reparsed["shortcode_media"];
        assert_eq!(media["edge_media_to_caption"]["edges"][0]["node"]["text"], "say \"hi\"\n\tbye\u{1}");
        assert_eq!(media["node"]["display_url"], "https://cdn.example/x.jpg");
        assert_eq!(media["video_blocked"], false);
        assert!(media["dimensions"]["height"].is_null());
    }
}
