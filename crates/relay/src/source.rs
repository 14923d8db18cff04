//! Source channel handles and startup resolution.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::{services::ChannelResolver, types::SourceChannel};

/// Reduce `@name`, `t.me/name`, `https://t.me/name` or `name` to `name`.
#[must_use]
pub fn normalize_handle(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let without_host = without_scheme
        .strip_prefix("t.me/")
        .or_else(|| without_scheme.strip_prefix("telegram.me/"))
        .unwrap_or(without_scheme);
    without_host
        .trim_start_matches('@')
        .trim_end_matches('/')
        .to_string()
}

/// Resolve every configured handle once. Handles that fail to resolve are
/// logged and left out.
pub async fn resolve_sources(
    resolver: &dyn ChannelResolver,
    handles: &[String],
) -> HashMap<i64, SourceChannel> {
    let mut sources = HashMap::new();
    for raw in handles {
        let handle = normalize_handle(raw);
        if handle.is_empty() {
            continue;
        }
        match resolver.resolve_channel(&handle).await {
            Ok(channel) => {
                info!(source = %channel.handle, chat_id = channel.id, "source channel resolved");
                sources.insert(channel.id, channel);
            },
            Err(e) => {
                warn!(source = %handle, error = %e, "failed to resolve source channel, skipping");
            },
        }
    }
    sources
}
