//! Publishing approved posts to the destination.

use std::sync::Arc;

use tracing::info;

use crate::{
    error::Result,
    services::{LargeFilePublisher, Publisher},
    staging::StagedMedia,
    types::ModerationResult,
};

/// What a delivery attempt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Rejected by moderation, or nothing left to send.
    Skipped,
    Text,
    Standard,
    LargeFile,
    Album { items: usize },
}

/// Chooses between text, standard, large-file and album publishing.
///
/// Every method takes ownership of the staged files, so they are removed
/// when the call returns whatever the outcome.
pub struct DeliveryRouter {
    publisher: Arc<dyn Publisher>,
    large_files: Arc<dyn LargeFilePublisher>,
    destination: String,
    large_file_threshold: u64,
}

impl DeliveryRouter {
    #[must_use]
    pub fn new(
        publisher: Arc<dyn Publisher>,
        large_files: Arc<dyn LargeFilePublisher>,
        destination: impl Into<String>,
        large_file_threshold: u64,
    ) -> Self {
        Self {
            publisher,
            large_files,
            destination: destination.into(),
            large_file_threshold,
        }
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub async fn deliver_text(&self, verdict: &ModerationResult) -> Result<Delivery> {
        let Some(text) = approved_text(verdict) else {
            return Ok(Delivery::Skipped);
        };
        self.publisher.send_text(&self.destination, text).await?;
        Ok(Delivery::Text)
    }

    /// Publish one media item. Payloads of at least the threshold size go
    /// through the large-file path.
    pub async fn deliver_media(
        &self,
        verdict: &ModerationResult,
        mut staged: StagedMedia,
    ) -> Result<Delivery> {
        if !verdict.should_post {
            return Ok(Delivery::Skipped);
        }
        staged.caption = verdict.text.clone();

        let size = staged.size().await?;
        if size >= self.large_file_threshold {
            info!(
                path = %staged.path.display(),
                size,
                threshold = self.large_file_threshold,
                "using large-file upload"
            );
            self.large_files
                .send_large_file(&self.destination, &staged)
                .await?;
            return Ok(Delivery::LargeFile);
        }
        self.publisher
            .send_media(&self.destination, &staged)
            .await?;
        Ok(Delivery::Standard)
    }

    /// Publish `items` as one grouped post with the caption on the first.
    pub async fn deliver_album(
        &self,
        verdict: &ModerationResult,
        mut items: Vec<StagedMedia>,
    ) -> Result<Delivery> {
        if !verdict.should_post || items.is_empty() {
            return Ok(Delivery::Skipped);
        }
        for (i, item) in items.iter_mut().enumerate() {
            item.caption = if i == 0 {
                verdict.text.clone()
            } else {
                None
            };
        }
        self.publisher
            .send_album(&self.destination, &items)
            .await?;
        Ok(Delivery::Album { items: items.len() })
    }
}

fn approved_text(verdict: &ModerationResult) -> Option<&str> {
    if verdict.should_post {
        verdict.text.as_deref()
    } else {
        None
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::{MediaDescriptor, MediaKind},
        async_trait::async_trait,
        std::sync::Mutex,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Text(String),
        Media { streaming: bool, caption: Option<String> },
        Large { streaming: bool, caption: Option<String> },
        Album(Vec<Option<String>>),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(crate::Error::publish("destination unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Publisher for Recorder {
        async fn send_text(&self, _to: &str, html: &str) -> Result<()> {
            self.record(Call::Text(html.into()))
        }

        async fn send_media(&self, _to: &str, item: &StagedMedia) -> Result<()> {
            assert!(item.path.exists());
            self.record(Call::Media {
                streaming: item.supports_streaming(),
                caption: item.caption.clone(),
            })
        }

        async fn send_album(&self, _to: &str, items: &[StagedMedia]) -> Result<()> {
            self.record(Call::Album(items.iter().map(|i| i.caption.clone()).collect()))
        }
    }

    #[async_trait]
    impl LargeFilePublisher for Recorder {
        async fn send_large_file(&self, _to: &str, item: &StagedMedia) -> Result<()> {
            self.record(Call::Large {
                streaming: item.supports_streaming(),
                caption: item.caption.clone(),
            })
        }
    }

    const THRESHOLD: u64 = 1024;

    fn router(recorder: &Arc<Recorder>) -> DeliveryRouter {
        DeliveryRouter::new(recorder.clone(), recorder.clone(), "@dest", THRESHOLD)
    }

    async fn stage(dir: &std::path::Path, id: i64, kind: MediaKind, len: usize) -> StagedMedia {
        let media = MediaDescriptor {
            kind,
            mime_type: None,
            file_size: None,
            file_ref: format!("f{id}"),
        };
        StagedMedia::write(dir, 1, id, &media, &vec![0u8; len])
            .await
            .unwrap()
    }

    fn dir_is_empty(dir: &std::path::Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn one_byte_below_threshold_is_standard() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder::default());
        let staged = stage(dir.path(), 1, MediaKind::Video, (THRESHOLD - 1) as usize).await;
        let outcome = router(&rec)
            .deliver_media(&ModerationResult::approve("cap #src"), staged)
            .await
            .unwrap();
        assert_eq!(outcome, Delivery::Standard);
        assert_eq!(rec.calls(), vec![Call::Media {
            streaming: true,
            caption: Some("cap #src".into())
        }]);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn exactly_threshold_is_large_file() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder::default());
        let staged = stage(dir.path(), 2, MediaKind::Video, THRESHOLD as usize).await;
        let outcome = router(&rec)
            .deliver_media(&ModerationResult::approve("cap"), staged)
            .await
            .unwrap();
        assert_eq!(outcome, Delivery::LargeFile);
        assert_eq!(rec.calls(), vec![Call::Large {
            streaming: true,
            caption: Some("cap".into())
        }]);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn photos_do_not_stream() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder::default());
        let staged = stage(dir.path(), 3, MediaKind::Photo, 10).await;
        router(&rec)
            .deliver_media(&ModerationResult::approve("p"), staged)
            .await
            .unwrap();
        assert_eq!(rec.calls(), vec![Call::Media {
            streaming: false,
            caption: Some("p".into())
        }]);
    }

    #[tokio::test]
    async fn rejected_media_is_dropped_without_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder::default());
        let staged = stage(dir.path(), 4, MediaKind::Video, 10).await;
        let outcome = router(&rec)
            .deliver_media(&ModerationResult::reject(), staged)
            .await
            .unwrap();
        assert_eq!(outcome, Delivery::Skipped);
        assert!(rec.calls().is_empty());
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn publish_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let staged = stage(dir.path(), 5, MediaKind::Photo, 10).await;
        let err = router(&rec)
            .deliver_media(&ModerationResult::approve("x"), staged)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Publish { .. }));
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn album_caption_only_on_first_item() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder::default());
        let mut items = Vec::new();
        for id in 1..=3 {
            let mut item = stage(dir.path(), id, MediaKind::Photo, 10).await;
            item.caption = Some(format!("stale {id}"));
            items.push(item);
        }
        let outcome = router(&rec)
            .deliver_album(&ModerationResult::approve("Album #src"), items)
            .await
            .unwrap();
        assert_eq!(outcome, Delivery::Album { items: 3 });
        assert_eq!(rec.calls(), vec![Call::Album(vec![
            Some("Album #src".into()),
            None,
            None
        ])]);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn album_publish_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let mut items = Vec::new();
        for id in 1..=2 {
            items.push(stage(dir.path(), id, MediaKind::Video, 10).await);
        }
        let err = router(&rec)
            .deliver_album(&ModerationResult::approve("x"), items)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Publish { .. }));
        assert_eq!(rec.calls(), vec![Call::Album(vec![Some("x".into()), None])]);
        assert!(dir_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn empty_album_is_skipped() {
        let rec = Arc::new(Recorder::default());
        let outcome = router(&rec)
            .deliver_album(&ModerationResult::approve("x"), Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome, Delivery::Skipped);
        assert!(rec.calls().is_empty());
    }

    #[tokio::test]
    async fn text_is_sent_only_when_approved() {
        let rec = Arc::new(Recorder::default());
        let router = router(&rec);
        assert_eq!(
            router
                .deliver_text(&ModerationResult::approve("<b>hi</b> #src"))
                .await
                .unwrap(),
            Delivery::Text
        );
        assert_eq!(
            router
                .deliver_text(&ModerationResult::reject())
                .await
                .unwrap(),
            Delivery::Skipped
        );
        assert_eq!(rec.calls(), vec![Call::Text("<b>hi</b> #src".into())]);
    }
}
