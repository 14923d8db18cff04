use {
    async_trait::async_trait,
    relaygram_relay::{MediaDescriptor, MediaSource},
    teloxide::prelude::*,
    tracing::debug,
};

use crate::error::{Error, Result};

/// Downloads post media through `getFile` and the Bot API file endpoint.
pub struct TelegramMediaSource {
    bot: Bot,
    client: reqwest::Client,
}

impl TelegramMediaSource {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let file = self.bot.get_file(file_id).await?;
        let url = file_url(&self.bot.api_url(), self.bot.token(), &file.path);
        download(&self.client, &url).await
    }
}

/// GET a file URL. The URL carries the bot token, so it is stripped from
/// transport errors.
async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::Reqwest(e.without_url()))?;
    if !response.status().is_success() {
        return Err(Error::message(format!(
            "failed to download file: HTTP {}",
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Reqwest(e.without_url()))?;
    Ok(bytes.to_vec())
}

/// `<api>/file/bot<token>/<path>`
fn file_url(api_url: &reqwest::Url, token: &str, path: &str) -> String {
    format!(
        "{}/file/bot{token}/{}",
        api_url.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl MediaSource for TelegramMediaSource {
    async fn download_media(&self, media: &MediaDescriptor) -> relaygram_relay::Result<Vec<u8>> {
        let bytes = self
            .fetch(&media.file_ref)
            .await
            .map_err(Error::into_retrieval)?;
        debug!(
            file_id = %media.file_ref,
            kind = ?media.kind,
            bytes = bytes.len(),
            "downloaded media"
        );
        Ok(bytes)
    }
}
