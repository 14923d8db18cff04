//! Per-unit processing: retrieve, format, moderate, deliver.

use std::{path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    tracing::{info, warn},
};

use crate::{
    album::AlbumFlushHandler,
    delivery::{Delivery, DeliveryRouter},
    error::Result,
    formatter,
    moderation::ModerationGate,
    services::MediaSource,
    staging::StagedMedia,
    types::{CompletedAlbum, InboundPost, SourceChannel},
};

/// Runs accepted units to completion. Errors end the unit and never reach
/// the dispatcher.
pub struct Pipeline {
    media: Arc<dyn MediaSource>,
    gate: ModerationGate,
    router: DeliveryRouter,
    staging_dir: PathBuf,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        media: Arc<dyn MediaSource>,
        gate: ModerationGate,
        router: DeliveryRouter,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media,
            gate,
            router,
            staging_dir: staging_dir.into(),
        }
    }

    /// Process a post that is not part of an album.
    pub async fn process_single(
        &self,
        source: &SourceChannel,
        post: &InboundPost,
    ) -> Result<Delivery> {
        let outcome = match &post.media {
            Some(media) => {
                let bytes = self.media.download_media(media).await?;
                let staged = StagedMedia::write(
                    &self.staging_dir,
                    post.chat_id.unwrap_or(source.id),
                    post.id,
                    media,
                    &bytes,
                )
                .await?;
                drop(bytes);
                let caption = formatter::format(&post.text, &post.annotations);
                let verdict = self.gate.evaluate(&caption, &source.handle).await;
                self.router.deliver_media(&verdict, staged).await?
            },
            None if post.has_text() => {
                let html = formatter::format(&post.text, &post.annotations);
                let verdict = self.gate.evaluate(&html, &source.handle).await;
                self.router.deliver_text(&verdict).await?
            },
            None => Delivery::Skipped,
        };
        info!(
            post_id = post.id,
            source = %source.handle,
            outcome = ?outcome,
            "post processed"
        );
        Ok(outcome)
    }

    /// Process a completed album: one moderation call for the caption, then
    /// retrieval of every member only if approved.
    pub async fn process_album(&self, album: &CompletedAlbum) -> Result<Delivery> {
        let caption = album
            .caption_post()
            .map(|p| formatter::format(&p.text, &p.annotations))
            .unwrap_or_default();
        let verdict = self.gate.evaluate(&caption, &album.source.handle).await;
        if !verdict.should_post {
            info!(album_id = %album.album_id, "album rejected by moderation");
            return Ok(Delivery::Skipped);
        }

        let mut items = Vec::with_capacity(album.posts.len());
        for post in &album.posts {
            let Some(media) = &post.media else {
                continue;
            };
            let staged = match self.media.download_media(media).await {
                Ok(bytes) => {
                    StagedMedia::write(
                        &self.staging_dir,
                        post.chat_id.unwrap_or(album.source.id),
                        post.id,
                        media,
                        &bytes,
                    )
                    .await
                },
                Err(e) => Err(e),
            };
            match staged {
                Ok(item) => items.push(item),
                Err(e) => warn!(
                    album_id = %album.album_id,
                    post_id = post.id,
                    error = %e,
                    "skipping album member"
                ),
            }
        }

        let outcome = self.router.deliver_album(&verdict, items).await?;
        info!(
            album_id = %album.album_id,
            source = %album.source.handle,
            outcome = ?outcome,
            "album processed"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl AlbumFlushHandler for Pipeline {
    async fn on_flush(&self, album: CompletedAlbum) {
        if let Err(e) = self.process_album(&album).await {
            warn!(album_id = %album.album_id, error = %e, "album delivery failed");
        }
    }
}
