//! Collaborator seams. The Telegram adapters and the moderation client
//! implement these; tests substitute in-memory doubles.

use async_trait::async_trait;

use crate::{
    error::Result,
    staging::StagedMedia,
    types::{MediaDescriptor, SourceChannel},
};

/// Turns a configured channel handle into a [`SourceChannel`].
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve_channel(&self, handle: &str) -> Result<SourceChannel>;
}

/// Fetches media payload bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fails with [`Error::Retrieval`](crate::Error::Retrieval).
    async fn download_media(&self, media: &MediaDescriptor) -> Result<Vec<u8>>;
}

/// Standard upload path to the destination. Text and captions are HTML.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn send_text(&self, to: &str, html: &str) -> Result<()>;

    async fn send_media(&self, to: &str, item: &StagedMedia) -> Result<()>;

    /// One grouped post. Only the first item carries a caption.
    async fn send_album(&self, to: &str, items: &[StagedMedia]) -> Result<()>;
}

/// Upload path for payloads at or above the large-file threshold.
#[async_trait]
pub trait LargeFilePublisher: Send + Sync {
    async fn send_large_file(&self, to: &str, item: &StagedMedia) -> Result<()>;
}

/// Chat-completion style classifier/rewriter. Returns the raw model output.
#[async_trait]
pub trait ModerationService: Send + Sync {
    /// Label used in logs and operator notices.
    fn name(&self) -> &str;

    async fn review(&self, text: &str) -> Result<String>;
}

/// Delivers failure notices to the operator.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, operator: i64, html: &str) -> Result<()>;
}
