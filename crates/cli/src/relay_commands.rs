use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result, bail},
    relaygram_config::RelaygramConfig,
    relaygram_providers::tiers_from_config,
    relaygram_relay::{Collaborators, ModerationGate, Relay, RelaySettings},
    relaygram_telegram::{
        TelegramMediaSource, TelegramNotifier, TelegramPublisher, TelegramResolver,
        TelegramTransport, connect, start_polling,
    },
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

/// Relay tunables derived from config.
pub fn relay_settings(config: &RelaygramConfig) -> RelaySettings {
    RelaySettings {
        destination: config.relay.destination.trim().to_string(),
        album_quiet_period: Duration::from_millis(config.pipeline.album_quiet_period_ms),
        large_file_threshold: config.pipeline.large_file_threshold_bytes,
        staging_dir: config.pipeline.staging_dir.clone(),
    }
}

/// Operator chat id, if one is configured and numeric.
pub fn operator_id(config: &RelaygramConfig) -> Option<i64> {
    let raw = config.relay.operator.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!(operator = raw, "operator id is not numeric, failure notices disabled");
            None
        },
    }
}

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = relaygram_config::discover_and_load(config_path)?;
    if config.relay.sources.is_empty() {
        bail!("no source channels configured (relay.sources or SOURCE_CHANNELS)");
    }
    if config.relay.destination.trim().is_empty() {
        bail!("no destination configured (relay.destination or DESTINATION_CHANNEL)");
    }

    let transport =
        TelegramTransport::from_config(&config.telegram).context("failed to set up telegram")?;
    connect(&transport.polling)
        .await
        .context("telegram bot login failed")?;

    let tiers = tiers_from_config(&config.moderation);
    if tiers.primary.is_none() && tiers.fallback.is_none() {
        warn!("no moderation service configured, every post is relayed unchanged");
    }
    let mut gate = ModerationGate::new(tiers.primary, tiers.fallback);
    if let Some(operator) = operator_id(&config) {
        gate = gate.with_notifier(
            Arc::new(TelegramNotifier::new(transport.uploads.clone())),
            operator,
        );
    }

    let collaborators = Collaborators {
        media: Arc::new(TelegramMediaSource::new(transport.large_files.clone())),
        publisher: Arc::new(TelegramPublisher::new(transport.uploads.clone())),
        large_files: Arc::new(TelegramPublisher::large_files(
            transport.large_files.clone(),
        )),
        gate,
    };
    let resolver = TelegramResolver::new(transport.polling.clone());
    let relay = Arc::new(
        Relay::start(
            relay_settings(&config),
            collaborators,
            &resolver,
            &config.relay.sources,
        )
        .await,
    );
    info!(
        sources = relay.sources().len(),
        destination = %config.relay.destination,
        "relay ready"
    );

    let cancel = CancellationToken::new();
    let dispatcher = Arc::clone(&relay);
    let polling = start_polling(
        transport.polling,
        config.telegram.poll_timeout_secs,
        cancel.clone(),
        move |post| {
            dispatcher.dispatch(post);
        },
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("shutdown requested");
            cancel.cancel();
        },
        () = cancel.cancelled() => {},
    }
    polling.await.context("polling task panicked")?;
    relay.shutdown().await;

    let stats = relay.stats();
    info!(
        accepted = stats.accepted,
        duplicates = stats.duplicates,
        foreign = stats.foreign,
        "relaygram stopped"
    );
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_config() {
        let mut config = RelaygramConfig::default();
        config.relay.destination = " @dest ".into();
        config.pipeline.album_quiet_period_ms = 1500;

        let settings = relay_settings(&config);
        assert_eq!(settings.destination, "@dest");
        assert_eq!(settings.album_quiet_period, Duration::from_millis(1500));
        assert_eq!(settings.large_file_threshold, 50 * 1024 * 1024);
        assert_eq!(settings.staging_dir, config.pipeline.staging_dir);
    }

    #[test]
    fn operator_must_be_numeric() {
        let mut config = RelaygramConfig::default();
        assert_eq!(operator_id(&config), None);

        config.relay.operator = Some("12345".into());
        assert_eq!(operator_id(&config), Some(12345));

        config.relay.operator = Some("@me".into());
        assert_eq!(operator_id(&config), None);
    }

    #[tokio::test]
    async fn run_refuses_config_without_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaygram.toml");
        std::fs::write(&path, "[relay]\ndestination = \"@dest\"\n").unwrap();

        // SOURCE_CHANNELS from the environment would mask the failure.
        if std::env::var_os("SOURCE_CHANNELS").is_some() {
            return;
        }
        let err = run(Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("no source channels"));
    }
}
