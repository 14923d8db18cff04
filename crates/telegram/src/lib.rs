//! Telegram transport for the relay.
//!
//! Uses teloxide to long-poll channel posts, resolve source channels, fetch
//! media, publish to the destination and notify the operator.

pub mod bot;
pub mod error;
pub mod media;
pub mod outbound;
pub mod resolver;
pub mod wire;

#[cfg(test)]
mod mock;

use {relaygram_config::TelegramConfig, secrecy::ExposeSecret, teloxide::Bot};

pub use {
    bot::{build_bot, connect, poll_once, start_polling},
    error::{Error, Result},
    media::TelegramMediaSource,
    outbound::{TelegramNotifier, TelegramPublisher},
    resolver::{TelegramResolver, recipient},
    wire::{decode_message, decode_value},
};

/// Bots built from config.
///
/// `large_files` points at the self-hosted Bot API server when one is
/// configured and is also used for media downloads, which the public server
/// caps well below the upload threshold.
#[derive(Clone)]
pub struct TelegramTransport {
    pub polling: Bot,
    pub uploads: Bot,
    pub large_files: Bot,
}

impl TelegramTransport {
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        if !config.has_token() {
            return Err(Error::message("telegram bot token is not configured"));
        }
        let token = config.bot_token.expose_secret();
        let api_url = config.api_url.as_deref();
        let large_url = config.large_file_api_url.as_deref().or(api_url);

        Ok(Self {
            polling: build_bot(
                token,
                api_url,
                bot::polling_timeout(config.poll_timeout_secs),
            )?,
            uploads: build_bot(token, api_url, bot::UPLOAD_TIMEOUT)?,
            large_files: build_bot(token, large_url, bot::UPLOAD_TIMEOUT)?,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[test]
    fn missing_token_is_rejected() {
        let err = TelegramTransport::from_config(&TelegramConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn large_file_bot_uses_its_own_server() {
        let config = TelegramConfig {
            bot_token: Secret::new("1:abc".into()),
            large_file_api_url: Some("http://localhost:8081/".into()),
            ..Default::default()
        };
        let transport = TelegramTransport::from_config(&config).unwrap();
        assert_eq!(
            transport.uploads.api_url().as_str(),
            "https://api.telegram.org/"
        );
        assert_eq!(
            transport.large_files.api_url().as_str(),
            "http://localhost:8081/"
        );
    }
}
