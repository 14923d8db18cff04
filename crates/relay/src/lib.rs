//! Channel relay pipeline.
//!
//! Inbound channel posts are deduplicated, albums are collected until their
//! members stop arriving, text is rebuilt as Telegram HTML, a moderation
//! service decides whether and how each unit is published, and the result is
//! delivered to the destination through a size-dependent upload path.

pub mod album;
pub mod dedup;
pub mod delivery;
pub mod error;
pub mod formatter;
pub mod moderation;
pub mod pipeline;
pub mod relay;
pub mod services;
pub mod source;
pub mod staging;
pub mod types;

pub use {
    album::{AlbumAggregator, AlbumFlushHandler, Offer},
    dedup::DedupTracker,
    delivery::{Delivery, DeliveryRouter},
    error::{Error, Result},
    moderation::{ModerationGate, parse_verdict},
    pipeline::Pipeline,
    relay::{Collaborators, Dispatch, DispatchStats, Relay, RelaySettings, StatsSnapshot},
    services::{
        ChannelResolver, LargeFilePublisher, MediaSource, ModerationService, OperatorNotifier,
        Publisher,
    },
    source::{normalize_handle, resolve_sources},
    staging::StagedMedia,
    types::{
        CompletedAlbum, InboundPost, MediaDescriptor, MediaKind, ModerationResult, ProcessedKey,
        SourceChannel, StyleAnnotation, StyleKind,
    },
};
