/// Config schema types (telegram transport, relay routing, moderation, pipeline).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
};

/// Quiet period after the last album member before the album is flushed.
pub const DEFAULT_ALBUM_QUIET_PERIOD_MS: u64 = 2_000;

/// Payloads at or above this size go through the high-capacity upload path.
pub const DEFAULT_LARGE_FILE_THRESHOLD_BYTES: u64 = 50 * 1024 * 1024;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelaygramConfig {
    pub telegram: TelegramConfig,
    pub relay: RelayConfig,
    pub moderation: ModerationConfig,
    pub pipeline: PipelineConfig,
}

/// Bot API transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: Secret<String>,
    /// Bot API endpoint. Defaults to the public `https://api.telegram.org`.
    pub api_url: Option<String>,
    /// Self-hosted Bot API server used for uploads above the public size
    /// limit. When unset, large files go through `api_url` as well.
    pub large_file_api_url: Option<String>,
    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            api_url: None,
            large_file_api_url: None,
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.bot_token.expose_secret().trim().is_empty()
    }
}

/// Which channels are relayed where, and who hears about failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Source channel handles (`@name`, `name` or `https://t.me/name`).
    pub sources: Vec<String>,
    /// Destination chat: `@channel` or a numeric chat id.
    pub destination: String,
    /// Chat id of the operator who receives moderation failure notices.
    pub operator: Option<String>,
}

/// Primary and fallback moderation services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub primary: ModerationProviderConfig,
    pub fallback: ModerationProviderConfig,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            primary: ModerationProviderConfig {
                name: "primary".into(),
                base_url: "https://api.a4f.co/v1".into(),
                api_key: None,
                model: "provider-3/gpt-4".into(),
            },
            fallback: ModerationProviderConfig {
                name: "fallback".into(),
                base_url: "https://openrouter.ai/api/v1".into(),
                api_key: None,
                model: "deepseek/deepseek-r1:free".into(),
            },
        }
    }
}

impl ModerationConfig {
    /// Fill blank `name`, `base_url` and `model` fields from the built-in
    /// defaults. A partially written `[moderation.primary]` table only needs
    /// the key.
    pub fn fill_defaults(&mut self) {
        let defaults = Self::default();
        self.primary.fill_from(&defaults.primary);
        self.fallback.fill_from(&defaults.fallback);
    }
}

/// One OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModerationProviderConfig {
    /// Label used in logs and operator notices.
    pub name: String,
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    pub model: String,
}

impl ModerationProviderConfig {
    /// A provider is usable once it has a non-empty API key.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_ref()
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    fn fill_from(&mut self, defaults: &Self) {
        for (field, default) in [
            (&mut self.name, &defaults.name),
            (&mut self.base_url, &defaults.base_url),
            (&mut self.model, &defaults.model),
        ] {
            if field.trim().is_empty() {
                field.clone_from(default);
            }
        }
    }
}

/// Timing and size knobs of the relay pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub album_quiet_period_ms: u64,
    pub large_file_threshold_bytes: u64,
    /// Directory where downloaded payloads are staged during delivery.
    pub staging_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            album_quiet_period_ms: DEFAULT_ALBUM_QUIET_PERIOD_MS,
            large_file_threshold_bytes: DEFAULT_LARGE_FILE_THRESHOLD_BYTES,
            staging_dir: PathBuf::from("downloads"),
        }
    }
}
