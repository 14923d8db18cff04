//! Values flowing through the pipeline.

use serde::Deserialize;

/// A source channel resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChannel {
    pub id: i64,
    /// Handle without the leading `@`, used for the hashtag marker.
    pub handle: String,
}

/// Formatting carried by a [`StyleAnnotation`].
///
/// Serde names follow the Bot API `MessageEntity.type` values, so entity
/// lists decode straight into annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    #[serde(rename = "code")]
    InlineCode,
    #[serde(rename = "pre")]
    CodeBlock,
    Spoiler,
    #[serde(rename = "blockquote", alias = "expandable_blockquote")]
    Quote,
    #[serde(rename = "text_link")]
    Link,
    /// Mentions, hashtags, plain URLs and anything else without markup.
    #[serde(other)]
    Other,
}

/// One styled range of a post's text.
///
/// `offset` and `length` count UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StyleAnnotation {
    pub offset: usize,
    pub length: usize,
    #[serde(rename = "type")]
    pub kind: StyleKind,
    #[serde(default)]
    pub url: Option<String>,
}

impl StyleAnnotation {
    #[must_use]
    pub fn new(kind: StyleKind, offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            kind,
            url: None,
        }
    }

    #[must_use]
    pub fn link(offset: usize, length: usize, url: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            kind: StyleKind::Link,
            url: Some(url.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Document,
}

impl MediaKind {
    /// Whether uploads of this kind set the streaming flag.
    #[must_use]
    pub fn supports_streaming(self) -> bool {
        matches!(self, Self::Video)
    }
}

/// Everything needed to fetch and re-upload one media payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub mime_type: Option<String>,
    /// Size reported by the transport, if any. Routing uses the staged size.
    pub file_size: Option<u64>,
    /// Opaque handle understood by the [`MediaSource`](crate::MediaSource).
    pub file_ref: String,
}

impl MediaDescriptor {
    /// File extension used when staging the payload.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_deref() {
            Some(m) if m.starts_with("video/") => "mp4",
            Some(m) if m.starts_with("image/") => "jpg",
            Some(_) => "bin",
            None => match self.kind {
                MediaKind::Photo => "jpg",
                MediaKind::Video | MediaKind::Animation => "mp4",
                MediaKind::Document => "bin",
            },
        }
    }
}

/// One channel post as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPost {
    pub id: i64,
    pub chat_id: Option<i64>,
    pub album_id: Option<String>,
    /// Text or caption; empty when the post has none.
    pub text: String,
    pub annotations: Vec<StyleAnnotation>,
    pub media: Option<MediaDescriptor>,
}

impl InboundPost {
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    /// Key under which this post is deduplicated.
    #[must_use]
    pub fn processed_key(&self) -> ProcessedKey {
        match &self.album_id {
            Some(album) => ProcessedKey::Album(album.clone()),
            None => ProcessedKey::Post(self.id),
        }
    }
}

/// Dedup key. Post ids and album ids never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProcessedKey {
    Post(i64),
    Album(String),
}

/// Outcome of the moderation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationResult {
    pub should_post: bool,
    /// Final text to publish; `None` when the post is rejected.
    pub text: Option<String>,
}

impl ModerationResult {
    #[must_use]
    pub fn approve(text: impl Into<String>) -> Self {
        Self {
            should_post: true,
            text: Some(text.into()),
        }
    }

    #[must_use]
    pub fn reject() -> Self {
        Self {
            should_post: false,
            text: None,
        }
    }
}

/// An album whose quiet period elapsed.
#[derive(Debug, Clone)]
pub struct CompletedAlbum {
    pub album_id: String,
    pub source: SourceChannel,
    /// Members in arrival order, unique by id.
    pub posts: Vec<InboundPost>,
}

impl CompletedAlbum {
    /// The first member with non-empty text carries the album caption.
    #[must_use]
    pub fn caption_post(&self) -> Option<&InboundPost> {
        self.posts.iter().find(|p| p.has_text())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn annotation_decodes_from_entity_json() {
        let raw = serde_json::json!([
            {"type": "bold", "offset": 0, "length": 4},
            {"type": "text_link", "offset": 5, "length": 3, "url": "https://x.test"},
            {"type": "expandable_blockquote", "offset": 0, "length": 2},
            {"type": "hashtag", "offset": 9, "length": 4},
        ]);
        let anns: Vec<StyleAnnotation> = serde_json::from_value(raw).unwrap();
        assert_eq!(anns[0].kind, StyleKind::Bold);
        assert_eq!(anns[1], StyleAnnotation::link(5, 3, "https://x.test"));
        assert_eq!(anns[2].kind, StyleKind::Quote);
        assert_eq!(anns[3].kind, StyleKind::Other);
    }

    #[rstest]
    #[case(MediaKind::Photo, Some("image/jpeg"), "jpg")]
    #[case(MediaKind::Document, Some("video/mp4"), "mp4")]
    #[case(MediaKind::Document, Some("application/pdf"), "bin")]
    #[case(MediaKind::Photo, None, "jpg")]
    #[case(MediaKind::Animation, None, "mp4")]
    fn extension_from_mime_then_kind(
        #[case] kind: MediaKind,
        #[case] mime: Option<&str>,
        #[case] expected: &str,
    ) {
        let media = MediaDescriptor {
            kind,
            mime_type: mime.map(String::from),
            file_size: None,
            file_ref: "f".into(),
        };
        assert_eq!(media.extension(), expected);
    }

    #[test]
    fn album_and_post_keys_are_distinct() {
        let mut post = InboundPost {
            id: 7,
            chat_id: Some(1),
            album_id: None,
            text: String::new(),
            annotations: vec![],
            media: None,
        };
        assert_eq!(post.processed_key(), ProcessedKey::Post(7));
        post.album_id = Some("7".into());
        assert_eq!(post.processed_key(), ProcessedKey::Album("7".into()));
        assert_ne!(ProcessedKey::Post(7), ProcessedKey::Album("7".into()));
    }
}
