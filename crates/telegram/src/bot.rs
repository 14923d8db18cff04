use std::time::Duration;

use {
    relaygram_relay::InboundPost,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    error::{Error, Result},
    wire,
};

/// Pause after a failed `getUpdates` call.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// HTTP timeout for upload bots. Large videos take a while.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Build a bot, optionally pointed at a self-hosted Bot API server.
pub fn build_bot(token: &str, api_url: Option<&str>, timeout: Duration) -> Result<Bot> {
    // teloxide pins its own reqwest, so the builder error is not ours.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::external("failed to build Bot API http client", e))?;
    let mut bot = Bot::with_client(token, client);
    if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::external(format!("invalid Bot API url {url}"), e))?;
        bot = bot.set_api_url(url);
    }
    Ok(bot)
}

/// Client timeout for long polling: longer than the `getUpdates` timeout so
/// the HTTP client doesn't abort the request before Telegram responds.
#[must_use]
pub fn polling_timeout(poll_timeout_secs: u32) -> Duration {
    Duration::from_secs(u64::from(poll_timeout_secs) + 15)
}

/// Verify credentials and clear any webhook so long polling works.
pub async fn connect(bot: &Bot) -> Result<Option<String>> {
    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;
    info!(username = ?me.username, "telegram bot connected (webhook cleared)");
    Ok(me.username.clone())
}

/// One `getUpdates` round. Returns decoded channel posts and the next offset.
pub async fn poll_once(
    bot: &Bot,
    offset: i32,
    timeout_secs: u32,
) -> std::result::Result<(Vec<InboundPost>, i32), RequestError> {
    let updates = bot
        .get_updates()
        .offset(offset)
        .timeout(timeout_secs)
        .allowed_updates(vec![AllowedUpdate::ChannelPost])
        .await?;
    debug!(count = updates.len(), "got telegram updates");

    let mut next = offset;
    let mut posts = Vec::with_capacity(updates.len());
    for update in updates {
        next = update.id.as_offset();
        match update.kind {
            UpdateKind::ChannelPost(msg) => match wire::decode_message(&msg) {
                Ok(post) => posts.push(post),
                Err(e) => warn!(
                    chat_id = msg.chat.id.0,
                    error = %e,
                    "failed to decode channel post"
                ),
            },
            other => debug!("ignoring non channel post update: {other:?}"),
        }
    }
    Ok((posts, next))
}

/// Spawn the long-polling loop. Every decoded channel post is passed to
/// `on_post` in arrival order. Stops when `cancel` fires or another instance
/// takes over the token.
pub fn start_polling<F>(
    bot: Bot,
    timeout_secs: u32,
    cancel: CancellationToken,
    mut on_post: F,
) -> JoinHandle<()>
where
    F: FnMut(InboundPost) + Send + 'static,
{
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = poll_once(&bot, offset, timeout_secs) => result,
            };

            match result {
                Ok((posts, next)) => {
                    offset = next;
                    for post in posts {
                        on_post(post);
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    error!("telegram polling stopped: another instance is running with this token");
                    cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
        info!("telegram polling stopped");
    })
}
