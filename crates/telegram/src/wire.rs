//! Bot API channel post decoding.
//!
//! Channel posts are read from their Bot API JSON form rather than through
//! teloxide accessors, so the same decoder serves live updates and fixtures.

use {
    relaygram_relay::{InboundPost, MediaDescriptor, MediaKind, StyleAnnotation},
    serde::Deserialize,
    teloxide::types::Message,
};

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct WireMessage {
    message_id: i64,
    #[serde(default)]
    chat: Option<WireChat>,
    #[serde(default)]
    media_group_id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    entities: Option<Vec<StyleAnnotation>>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    caption_entities: Option<Vec<StyleAnnotation>>,
    #[serde(default)]
    photo: Option<Vec<WirePhotoSize>>,
    #[serde(default)]
    video: Option<WireFile>,
    #[serde(default)]
    animation: Option<WireFile>,
    #[serde(default)]
    document: Option<WireFile>,
}

#[derive(Debug, Deserialize)]
struct WireChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    file_id: String,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePhotoSize {
    file_id: String,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Decode a teloxide channel post.
pub fn decode_message(msg: &Message) -> Result<InboundPost> {
    decode_value(serde_json::to_value(msg)?)
}

/// Decode a Bot API message object.
pub fn decode_value(value: serde_json::Value) -> Result<InboundPost> {
    let wire: WireMessage = serde_json::from_value(value)?;
    Ok(wire.into_post())
}

impl WireMessage {
    fn into_post(self) -> InboundPost {
        let media = self.media();
        // Media posts carry their text as a caption.
        let (text, annotations) = match self.text {
            Some(text) => (text, self.entities.unwrap_or_default()),
            None => (
                self.caption.unwrap_or_default(),
                self.caption_entities.unwrap_or_default(),
            ),
        };

        InboundPost {
            id: self.message_id,
            chat_id: self.chat.map(|c| c.id),
            album_id: self.media_group_id.filter(|id| !id.is_empty()),
            text,
            annotations,
            media,
        }
    }

    fn media(&self) -> Option<MediaDescriptor> {
        if let Some(largest) = self
            .photo
            .as_deref()
            .and_then(|sizes| sizes.iter().max_by_key(|p| p.rank()))
        {
            return Some(MediaDescriptor {
                kind: MediaKind::Photo,
                mime_type: Some("image/jpeg".into()),
                file_size: largest.file_size,
                file_ref: largest.file_id.clone(),
            });
        }

        // Animations also carry a `document` field; check them first.
        [
            (MediaKind::Video, &self.video),
            (MediaKind::Animation, &self.animation),
            (MediaKind::Document, &self.document),
        ]
        .into_iter()
        .find_map(|(kind, file)| {
            file.as_ref().map(|f| MediaDescriptor {
                kind,
                mime_type: f.mime_type.clone(),
                file_size: f.file_size,
                file_ref: f.file_id.clone(),
            })
        })
    }
}

impl WirePhotoSize {
    fn rank(&self) -> (u64, u64) {
        (
            u64::from(self.width) * u64::from(self.height),
            self.file_size.unwrap_or(0),
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, relaygram_relay::StyleKind, serde_json::json};

    #[test]
    fn text_post_with_entities() {
        let post = decode_value(json!({
            "message_id": 12,
            "date": 0,
            "chat": {"id": -1001, "type": "channel", "title": "News"},
            "text": "Hello world",
            "entities": [
                {"type": "bold", "offset": 0, "length": 5},
                {"type": "text_link", "offset": 6, "length": 5, "url": "https://example.com"}
            ]
        }))
        .unwrap();

        assert_eq!(post.id, 12);
        assert_eq!(post.chat_id, Some(-1001));
        assert_eq!(post.text, "Hello world");
        assert!(post.album_id.is_none());
        assert!(post.media.is_none());
        assert_eq!(post.annotations, vec![
            StyleAnnotation::new(StyleKind::Bold, 0, 5),
            StyleAnnotation::link(6, 5, "https://example.com"),
        ]);
    }

    #[test]
    fn photo_album_member_picks_largest_size() {
        let post = decode_value(json!({
            "message_id": 7,
            "chat": {"id": -1001, "type": "channel"},
            "media_group_id": "1357",
            "caption": "Breaking",
            "caption_entities": [{"type": "italic", "offset": 0, "length": 8}],
            "photo": [
                {"file_id": "small", "file_unique_id": "a", "width": 90, "height": 60, "file_size": 900},
                {"file_id": "large", "file_unique_id": "c", "width": 1280, "height": 853, "file_size": 99000},
                {"file_id": "medium", "file_unique_id": "b", "width": 320, "height": 213, "file_size": 9000}
            ]
        }))
        .unwrap();

        assert_eq!(post.album_id.as_deref(), Some("1357"));
        assert_eq!(post.text, "Breaking");
        assert_eq!(post.annotations.len(), 1);
        let media = post.media.unwrap();
        assert_eq!(media.kind, MediaKind::Photo);
        assert_eq!(media.file_ref, "large");
        assert_eq!(media.file_size, Some(99000));
    }

    #[test]
    fn animation_wins_over_its_document_twin() {
        let post = decode_value(json!({
            "message_id": 3,
            "chat": {"id": -1001, "type": "channel"},
            "animation": {"file_id": "anim", "file_unique_id": "u", "mime_type": "video/mp4", "file_size": 2048},
            "document": {"file_id": "anim", "file_unique_id": "u", "mime_type": "video/mp4", "file_size": 2048}
        }))
        .unwrap();

        assert!(!post.has_text());
        let media = post.media.unwrap();
        assert_eq!(media.kind, MediaKind::Animation);
        assert_eq!(media.mime_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn video_keeps_mime_and_size() {
        let post = decode_value(json!({
            "message_id": 4,
            "chat": {"id": -1001, "type": "channel"},
            "video": {"file_id": "vid", "file_unique_id": "v", "mime_type": "video/quicktime", "file_size": 83886080}
        }))
        .unwrap();

        let media = post.media.unwrap();
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.file_size, Some(83_886_080));
        assert_eq!(media.extension(), "mp4");
    }

    #[test]
    fn unknown_entity_types_are_kept_as_other() {
        let post = decode_value(json!({
            "message_id": 5,
            "chat": {"id": -1001, "type": "channel"},
            "text": "#tag and @user",
            "entities": [
                {"type": "hashtag", "offset": 0, "length": 4},
                {"type": "mention", "offset": 9, "length": 5},
                {"type": "custom_emoji", "offset": 0, "length": 1, "custom_emoji_id": "123"}
            ]
        }))
        .unwrap();

        assert!(post.annotations.iter().all(|a| a.kind == StyleKind::Other));
    }

    #[test]
    fn missing_chat_decodes_without_chat_id() {
        let post = decode_value(json!({"message_id": 9, "text": "orphan"})).unwrap();
        assert!(post.chat_id.is_none());
    }

    #[test]
    fn empty_media_group_id_is_not_an_album() {
        let post = decode_value(json!({
            "message_id": 9,
            "chat": {"id": 1},
            "media_group_id": "",
            "text": "x"
        }))
        .unwrap();
        assert!(post.album_id.is_none());
    }

    #[test]
    fn teloxide_message_round_trips_through_decoder() {
        let msg: Message = serde_json::from_value(json!({
            "message_id": 21,
            "date": 1,
            "chat": {"id": -100123, "type": "channel", "title": "News"},
            "text": "Bold move",
            "entities": [{"type": "bold", "offset": 0, "length": 4}]
        }))
        .expect("deserialize channel post");

        let post = decode_message(&msg).unwrap();
        assert_eq!(post.id, 21);
        assert_eq!(post.chat_id, Some(-100123));
        assert_eq!(post.text, "Bold move");
        assert_eq!(post.annotations, vec![StyleAnnotation::new(
            StyleKind::Bold,
            0,
            4
        )]);
    }
}
