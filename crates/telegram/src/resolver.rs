use {
    async_trait::async_trait,
    relaygram_relay::{ChannelResolver, Result, SourceChannel, normalize_handle},
    teloxide::{
        prelude::*,
        types::{ChatId, Recipient},
    },
    tracing::debug,
};

use crate::error::Error;

/// Resolves channel handles through `getChat`.
pub struct TelegramResolver {
    bot: Bot,
}

impl TelegramResolver {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Parse a destination or source reference into a Bot API recipient.
/// Numeric ids are used as is, anything else is treated as a public
/// channel username.
#[must_use]
pub fn recipient(reference: &str) -> Recipient {
    let reference = reference.trim();
    match reference.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(format!("@{}", normalize_handle(reference))),
    }
}

#[async_trait]
impl ChannelResolver for TelegramResolver {
    async fn resolve_channel(&self, handle: &str) -> Result<SourceChannel> {
        let chat = self
            .bot
            .get_chat(recipient(handle))
            .await
            .map_err(|e| Error::from(e).into_retrieval())?;
        let id = chat.id.0;

        // Prefer the public username for the hashtag marker.
        let username = serde_json::to_value(&chat)
            .ok()
            .and_then(|v| v["username"].as_str().map(str::to_string));
        let handle = username.unwrap_or_else(|| normalize_handle(handle));
        debug!(chat_id = id, handle = %handle, "resolved channel");

        Ok(SourceChannel { id, handle })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::mock::{MockTelegramApi, start_mock},
        rstest::rstest,
        serde_json::json,
    };

    #[rstest]
    #[case("@news", Recipient::ChannelUsername("@news".into()))]
    #[case("news", Recipient::ChannelUsername("@news".into()))]
    #[case("https://t.me/news", Recipient::ChannelUsername("@news".into()))]
    #[case("-1001234", Recipient::Id(ChatId(-1_001_234)))]
    fn recipient_forms(#[case] input: &str, #[case] expected: Recipient) {
        assert_eq!(recipient(input), expected);
    }

    fn channel(username: Option<&str>) -> serde_json::Value {
        let mut chat = json!({
            "id": -1_001_234,
            "type": "channel",
            "title": "News",
            "accent_color_id": 0,
            "max_reaction_count": 0
        });
        if let Some(name) = username {
            chat["username"] = json!(name);
        }
        chat
    }

    #[tokio::test]
    async fn resolves_username_to_id() {
        let api = MockTelegramApi::default().with_result("GetChat", channel(Some("news")));
        let resolver = TelegramResolver::new(start_mock(api.clone()).await);

        let source = resolver.resolve_channel("https://t.me/news").await.unwrap();
        assert_eq!(source, SourceChannel {
            id: -1_001_234,
            handle: "news".into(),
        });
        assert_eq!(api.requests_for("GetChat")[0]["chat_id"], "@news");
    }

    #[tokio::test]
    async fn numeric_reference_falls_back_to_given_handle() {
        let api = MockTelegramApi::default().with_result("GetChat", channel(None));
        let resolver = TelegramResolver::new(start_mock(api).await);

        let source = resolver.resolve_channel("-1001234").await.unwrap();
        assert_eq!(source.id, -1_001_234);
        assert_eq!(source.handle, "-1001234");
    }

    #[tokio::test]
    async fn unknown_channel_is_an_error() {
        let api = MockTelegramApi::default().failing("GetChat", "Bad Request: chat not found");
        let resolver = TelegramResolver::new(start_mock(api).await);

        assert!(resolver.resolve_channel("@missing").await.is_err());
    }
}
