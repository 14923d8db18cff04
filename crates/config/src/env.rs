//! Environment variable overrides applied on top of the file config.
//!
//! Recognised variables:
//!
//! | Variable | Field |
//! |---|---|
//! | `BOT_TOKEN` | `telegram.bot_token` |
//! | `TELEGRAM_API_URL` | `telegram.api_url` |
//! | `LARGE_FILE_API_URL` | `telegram.large_file_api_url` |
//! | `SOURCE_CHANNELS` | `relay.sources` (comma separated) |
//! | `DESTINATION_CHANNEL` | `relay.destination` |
//! | `OWNER_ID` | `relay.operator` |
//! | `PRIMARY_MODERATION_{API_KEY,BASE_URL,MODEL}` | `moderation.primary.*` |
//! | `FALLBACK_MODERATION_{API_KEY,BASE_URL,MODEL}` | `moderation.fallback.*` |
//! | `STAGING_DIR` | `pipeline.staging_dir` |

use std::path::PathBuf;

use secrecy::Secret;

use crate::schema::{ModerationProviderConfig, RelaygramConfig};

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut RelaygramConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Apply overrides from a custom lookup. Empty values are ignored.
pub fn apply_env_overrides_with(
    config: &mut RelaygramConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| {
        lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(token) = get("BOT_TOKEN") {
        config.telegram.bot_token = Secret::new(token);
    }
    if let Some(url) = get("TELEGRAM_API_URL") {
        config.telegram.api_url = Some(url);
    }
    if let Some(url) = get("LARGE_FILE_API_URL") {
        config.telegram.large_file_api_url = Some(url);
    }
    if let Some(raw) = get("SOURCE_CHANNELS") {
        config.relay.sources = split_list(&raw);
    }
    if let Some(dest) = get("DESTINATION_CHANNEL") {
        config.relay.destination = dest;
    }
    if let Some(owner) = get("OWNER_ID") {
        config.relay.operator = Some(owner);
    }
    if let Some(dir) = get("STAGING_DIR") {
        config.pipeline.staging_dir = PathBuf::from(dir);
    }

    provider_overrides(&mut config.moderation.primary, "PRIMARY_MODERATION", &get);
    provider_overrides(&mut config.moderation.fallback, "FALLBACK_MODERATION", &get);
}

fn provider_overrides(
    provider: &mut ModerationProviderConfig,
    prefix: &str,
    get: &impl Fn(&str) -> Option<String>,
) {
    if let Some(key) = get(&format!("{prefix}_API_KEY")) {
        provider.api_key = Some(Secret::new(key));
    }
    if let Some(url) = get(&format!("{prefix}_BASE_URL")) {
        provider.base_url = url;
    }
    if let Some(model) = get(&format!("{prefix}_MODEL")) {
        provider.model = model;
    }
}

/// Split a comma separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
