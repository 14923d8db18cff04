//! Debounced album collection.
//!
//! Members of one album arrive as separate posts. Each arrival restarts a
//! quiet-period timer; when the timer runs out the buffered album is handed
//! to an [`AlbumFlushHandler`] exactly once.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::{task::JoinHandle, time::Instant},
    tokio_util::task::TaskTracker,
    tracing::{debug, info},
};

use crate::{
    dedup::DedupTracker,
    types::{CompletedAlbum, InboundPost, ProcessedKey, SourceChannel},
};

/// Receives albums whose quiet period elapsed.
#[async_trait]
pub trait AlbumFlushHandler: Send + Sync {
    async fn on_flush(&self, album: CompletedAlbum);
}

/// Result of [`AlbumAggregator::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// First member; a buffer was created.
    Started,
    /// Appended to an existing buffer.
    Joined,
    /// Same post id already buffered. The timer was still restarted.
    DuplicateMember,
    /// The album was flushed before; nothing changed.
    AlreadyFlushed,
}

struct AlbumBuffer {
    source: SourceChannel,
    posts: Vec<InboundPost>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    albums: Mutex<HashMap<String, AlbumBuffer>>,
    dedup: Arc<DedupTracker>,
    quiet_period: Duration,
    handler: Arc<dyn AlbumFlushHandler>,
    tasks: TaskTracker,
}

/// Buffers album members until no new member arrives for `quiet_period`.
///
/// Lock order is albums map, then dedup set. Neither lock is held across an
/// await.
#[derive(Clone)]
pub struct AlbumAggregator {
    inner: Arc<Inner>,
}

impl AlbumAggregator {
    #[must_use]
    pub fn new(
        dedup: Arc<DedupTracker>,
        quiet_period: Duration,
        handler: Arc<dyn AlbumFlushHandler>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                albums: Mutex::new(HashMap::new()),
                dedup,
                quiet_period,
                handler,
                tasks,
            }),
        }
    }

    /// Add an album member and restart the album's timer.
    ///
    /// Must be called from within a tokio runtime. Posts without an album id
    /// are ignored and reported as [`Offer::AlreadyFlushed`].
    pub fn offer(&self, source: &SourceChannel, post: InboundPost) -> Offer {
        let Some(album_id) = post.album_id.clone() else {
            return Offer::AlreadyFlushed;
        };

        let mut albums = self.inner.albums.lock().unwrap_or_else(|e| e.into_inner());
        if self
            .inner
            .dedup
            .seen(&ProcessedKey::Album(album_id.clone()))
        {
            debug!(
                album_id = %album_id,
                post_id = post.id,
                "album already flushed, dropping member"
            );
            return Offer::AlreadyFlushed;
        }

        let mut offer = Offer::Joined;
        let buffer = albums.entry(album_id.clone()).or_insert_with(|| {
            offer = Offer::Started;
            AlbumBuffer {
                source: source.clone(),
                posts: Vec::new(),
                generation: 0,
                timer: None,
            }
        });
        if buffer.posts.iter().any(|p| p.id == post.id) {
            offer = Offer::DuplicateMember;
        } else {
            debug!(album_id = %album_id, post_id = post.id, "buffered album member");
            buffer.posts.push(post);
        }

        // The deadline is fixed at arrival, not when the timer task first runs.
        let deadline = Instant::now() + self.inner.quiet_period;
        buffer.generation += 1;
        if let Some(previous) = buffer.timer.take() {
            previous.abort();
        }
        buffer.timer = Some(self.inner.tasks.spawn(run_timer(
            Arc::clone(&self.inner),
            album_id,
            buffer.generation,
            deadline,
        )));
        offer
    }

    /// Albums currently collecting members.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner
            .albums
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

async fn run_timer(inner: Arc<Inner>, album_id: String, generation: u64, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;

    let Some(completed) = take_if_current(&inner, &album_id, generation) else {
        return;
    };
    info!(
        album_id = %completed.album_id,
        source = %completed.source.handle,
        members = completed.posts.len(),
        "album complete"
    );
    inner.handler.on_flush(completed).await;
}

/// Remove the buffer and mark the album seen, but only if no arrival came in
/// after the timer for `generation` was scheduled.
fn take_if_current(inner: &Inner, album_id: &str, generation: u64) -> Option<CompletedAlbum> {
    let mut albums = inner.albums.lock().unwrap_or_else(|e| e.into_inner());
    if albums.get(album_id)?.generation != generation {
        debug!(album_id, generation, "stale album timer");
        return None;
    }
    let buffer = albums.remove(album_id)?;
    inner
        .dedup
        .mark_seen(ProcessedKey::Album(album_id.to_string()));
    Some(CompletedAlbum {
        album_id: album_id.to_string(),
        source: buffer.source,
        posts: buffer.posts,
    })
}
