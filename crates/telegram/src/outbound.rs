use {
    async_trait::async_trait,
    relaygram_relay::{LargeFilePublisher, MediaKind, OperatorNotifier, Publisher, StagedMedia},
    teloxide::{
        RequestError,
        payloads::{
            SendAnimationSetters, SendDocumentSetters, SendMessageSetters, SendPhotoSetters,
            SendVideoSetters,
        },
        prelude::*,
        types::{
            ChatId, InputFile, InputMedia, InputMediaDocument, InputMediaPhoto, InputMediaVideo,
            ParseMode,
        },
    },
    tracing::{info, warn},
};

use crate::{error::Error, resolver::recipient};

/// Publishes to the destination channel with HTML parse mode.
///
/// The same type serves the standard path and, pointed at a self-hosted Bot
/// API server, the large-file path.
pub struct TelegramPublisher {
    bot: Bot,
    path: &'static str,
}

impl TelegramPublisher {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            path: "standard",
        }
    }

    /// Publisher for payloads above the large-file threshold.
    #[must_use]
    pub fn large_files(bot: Bot) -> Self {
        Self {
            bot,
            path: "large-file",
        }
    }

    async fn send_staged(&self, to: &str, item: &StagedMedia) -> Result<(), RequestError> {
        let bot = &self.bot;
        let chat = recipient(to);
        let caption = item.caption.as_deref().filter(|c| !c.is_empty());
        let file = InputFile::file(item.path.clone());

        match item.kind {
            MediaKind::Photo => {
                let mut req = bot
                    .send_photo(chat, file)
                    .parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            },
            MediaKind::Video => {
                let mut req = bot
                    .send_video(chat, file)
                    .parse_mode(ParseMode::Html)
                    .supports_streaming(true);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            },
            MediaKind::Animation => {
                let mut req = bot
                    .send_animation(chat, file)
                    .parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            },
            MediaKind::Document => {
                let mut req = bot
                    .send_document(chat, file)
                    .parse_mode(ParseMode::Html);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                req.await?;
            },
        }
        Ok(())
    }
}

/// Album entry. Animations travel as videos since groups cannot hold them.
fn album_entry(item: &StagedMedia) -> InputMedia {
    let file = InputFile::file(item.path.clone());
    let caption = item.caption.clone().filter(|c| !c.is_empty());
    match item.kind {
        MediaKind::Photo => {
            let mut media = InputMediaPhoto::new(file).parse_mode(ParseMode::Html);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Photo(media)
        },
        MediaKind::Video | MediaKind::Animation => {
            let mut media = InputMediaVideo::new(file)
                .parse_mode(ParseMode::Html)
                .supports_streaming(true);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Video(media)
        },
        MediaKind::Document => {
            let mut media = InputMediaDocument::new(file).parse_mode(ParseMode::Html);
            if let Some(c) = caption {
                media = media.caption(c);
            }
            InputMedia::Document(media)
        },
    }
}

/// Split album members into groups `sendMediaGroup` accepts. Documents cannot
/// share a group with photos or videos; order within each group is kept.
fn album_groups(items: &[StagedMedia]) -> Vec<Vec<&StagedMedia>> {
    let (documents, visual): (Vec<_>, Vec<_>) = items
        .iter()
        .partition(|item| item.kind == MediaKind::Document);
    [visual, documents]
        .into_iter()
        .filter(|group| !group.is_empty())
        .collect()
}

fn publish_error(e: RequestError) -> relaygram_relay::Error {
    Error::from(e).into_publish()
}

#[async_trait]
impl Publisher for TelegramPublisher {
    async fn send_text(&self, to: &str, html: &str) -> relaygram_relay::Result<()> {
        self.bot
            .send_message(recipient(to), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(publish_error)?;
        info!(chat_id = to, text_len = html.len(), "telegram text sent");
        Ok(())
    }

    async fn send_media(&self, to: &str, item: &StagedMedia) -> relaygram_relay::Result<()> {
        self.send_staged(to, item).await.map_err(publish_error)?;
        info!(
            chat_id = to,
            path = self.path,
            kind = ?item.kind,
            "telegram media sent"
        );
        Ok(())
    }

    async fn send_album(&self, to: &str, items: &[StagedMedia]) -> relaygram_relay::Result<()> {
        let groups = album_groups(items);
        if groups.len() > 1 {
            warn!(
                chat_id = to,
                "album mixes documents with photos or videos, sending documents separately"
            );
        }
        for group in groups {
            // A media group needs at least two members.
            if let [single] = group.as_slice() {
                self.send_staged(to, single).await.map_err(publish_error)?;
                continue;
            }
            self.bot
                .send_media_group(recipient(to), group.into_iter().map(album_entry))
                .await
                .map_err(publish_error)?;
        }
        info!(chat_id = to, items = items.len(), "telegram album sent");
        Ok(())
    }
}

#[async_trait]
impl LargeFilePublisher for TelegramPublisher {
    async fn send_large_file(&self, to: &str, item: &StagedMedia) -> relaygram_relay::Result<()> {
        self.send_media(to, item).await
    }
}

/// Sends failure notices to the operator's private chat.
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl OperatorNotifier for TelegramNotifier {
    async fn notify(&self, operator: i64, html: &str) -> relaygram_relay::Result<()> {
        self.bot
            .send_message(ChatId(operator), html)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(publish_error)?;
        Ok(())
    }
}
