//! Ingestion dispatcher.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::task::JoinHandle,
    tokio_util::task::TaskTracker,
    tracing::{debug, info, warn},
};

use crate::{
    album::{AlbumAggregator, Offer},
    dedup::DedupTracker,
    delivery::{Delivery, DeliveryRouter},
    error::Result,
    moderation::ModerationGate,
    pipeline::Pipeline,
    services::{ChannelResolver, LargeFilePublisher, MediaSource, Publisher},
    source::resolve_sources,
    types::{InboundPost, SourceChannel},
};

/// Tunables of a [`Relay`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Destination chat: `@channel` or a numeric id.
    pub destination: String,
    pub album_quiet_period: Duration,
    pub large_file_threshold: u64,
    pub staging_dir: PathBuf,
}

/// External services a [`Relay`] talks to.
pub struct Collaborators {
    pub media: Arc<dyn MediaSource>,
    pub publisher: Arc<dyn Publisher>,
    pub large_files: Arc<dyn LargeFilePublisher>,
    pub gate: ModerationGate,
}

/// What [`Relay::dispatch`] did with an event.
#[derive(Debug)]
pub enum Dispatch {
    /// Missing chat id or not a resolved source.
    Foreign,
    /// Already processed, or an album that was already flushed.
    Duplicate,
    /// Buffered as an album member.
    AlbumMember,
    /// Accepted as a single post, processing on its own task.
    Single(JoinHandle<Result<Delivery>>),
}

/// Event counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    foreign: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub duplicates: u64,
    pub foreign: u64,
}

impl DispatchStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            foreign: self.foreign.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Owns the dedup set, the album buffers and the resolved sources.
pub struct Relay {
    sources: HashMap<i64, SourceChannel>,
    dedup: Arc<DedupTracker>,
    albums: AlbumAggregator,
    pipeline: Arc<Pipeline>,
    tasks: TaskTracker,
    stats: DispatchStats,
}

impl Relay {
    /// Build a relay for already resolved sources.
    #[must_use]
    pub fn new(
        settings: RelaySettings,
        collaborators: Collaborators,
        sources: HashMap<i64, SourceChannel>,
    ) -> Self {
        let router = DeliveryRouter::new(
            collaborators.publisher,
            collaborators.large_files,
            settings.destination,
            settings.large_file_threshold,
        );
        let pipeline = Arc::new(Pipeline::new(
            collaborators.media,
            collaborators.gate,
            router,
            settings.staging_dir,
        ));
        let dedup = Arc::new(DedupTracker::new());
        let tasks = TaskTracker::new();
        let albums = AlbumAggregator::new(
            Arc::clone(&dedup),
            settings.album_quiet_period,
            pipeline.clone(),
            tasks.clone(),
        );
        Self {
            sources,
            dedup,
            albums,
            pipeline,
            tasks,
            stats: DispatchStats::default(),
        }
    }

    /// Resolve `handles` through `resolver`, then build the relay.
    pub async fn start(
        settings: RelaySettings,
        collaborators: Collaborators,
        resolver: &dyn ChannelResolver,
        handles: &[String],
    ) -> Self {
        let sources = resolve_sources(resolver, handles).await;
        if sources.is_empty() {
            warn!("no source channel could be resolved, nothing will be relayed");
        }
        Self::new(settings, collaborators, sources)
    }

    /// Accept or discard one inbound event.
    ///
    /// The accept step runs synchronously so events are admitted in arrival
    /// order; the work itself runs on spawned tasks. Must be called from
    /// within a tokio runtime.
    pub fn dispatch(&self, post: InboundPost) -> Dispatch {
        let Some(source) = post.chat_id.and_then(|id| self.sources.get(&id)) else {
            DispatchStats::bump(&self.stats.foreign);
            debug!(post_id = post.id, chat_id = ?post.chat_id, "ignoring post from unknown chat");
            return Dispatch::Foreign;
        };

        let key = post.processed_key();
        if self.dedup.seen(&key) {
            DispatchStats::bump(&self.stats.duplicates);
            debug!(post_id = post.id, key = ?key, "duplicate post");
            return Dispatch::Duplicate;
        }

        if post.album_id.is_some() {
            return match self.albums.offer(source, post) {
                Offer::AlreadyFlushed => {
                    DispatchStats::bump(&self.stats.duplicates);
                    Dispatch::Duplicate
                },
                Offer::DuplicateMember => {
                    DispatchStats::bump(&self.stats.duplicates);
                    Dispatch::AlbumMember
                },
                Offer::Started | Offer::Joined => {
                    DispatchStats::bump(&self.stats.accepted);
                    Dispatch::AlbumMember
                },
            };
        }

        if !self.dedup.try_mark(key) {
            DispatchStats::bump(&self.stats.duplicates);
            return Dispatch::Duplicate;
        }
        DispatchStats::bump(&self.stats.accepted);

        let pipeline = Arc::clone(&self.pipeline);
        let source = source.clone();
        Dispatch::Single(self.tasks.spawn(async move {
            let result = pipeline.process_single(&source, &post).await;
            if let Err(e) = &result {
                warn!(post_id = post.id, source = %source.handle, error = %e, "post delivery failed");
            }
            result
        }))
    }

    /// Wait for accepted work to finish.
    ///
    /// Pending albums flush when their quiet period runs out and in-flight
    /// deliveries run to completion. Call after ingestion has stopped.
    pub async fn shutdown(&self) {
        self.tasks.close();
        info!(
            in_flight = self.tasks.len(),
            pending_albums = self.albums.pending(),
            "waiting for in-flight work"
        );
        self.tasks.wait().await;
    }

    #[must_use]
    pub fn sources(&self) -> &HashMap<i64, SourceChannel> {
        &self.sources
    }

    #[must_use]
    pub fn dedup(&self) -> &DedupTracker {
        &self.dedup
    }

    #[must_use]
    pub fn pending_albums(&self) -> usize {
        self.albums.pending()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
