//! Moderation service implementations.

pub mod openai_compat;
pub mod prompt;

use std::sync::Arc;

use {
    relaygram_config::ModerationConfig,
    relaygram_relay::ModerationService,
    tracing::info,
};

pub use {openai_compat::OpenAiCompatModerator, prompt::MODERATION_SYSTEM_PROMPT};

/// Shared HTTP client for moderation providers.
///
/// Both tiers reuse this client to share connection pools, DNS cache, and
/// TLS sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// Primary and fallback tiers built from config. Tiers without an API key
/// are `None`.
pub struct ModerationTiers {
    pub primary: Option<Arc<dyn ModerationService>>,
    pub fallback: Option<Arc<dyn ModerationService>>,
}

#[must_use]
pub fn tiers_from_config(config: &ModerationConfig) -> ModerationTiers {
    let build = |provider| -> Option<Arc<dyn ModerationService>> {
        let moderator = OpenAiCompatModerator::from_config(provider)?;
        info!(
            provider = %moderator.name(),
            model = %moderator.model(),
            "moderation tier configured"
        );
        Some(Arc::new(moderator))
    };
    ModerationTiers {
        primary: build(&config.primary),
        fallback: build(&config.fallback),
    }
}
