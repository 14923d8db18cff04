//! Moderation through an OpenAI-compatible `chat/completions` endpoint.

use {
    async_trait::async_trait,
    relaygram_config::ModerationProviderConfig,
    relaygram_relay::{Error, ModerationService, Result},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, trace, warn},
};

use crate::{prompt::MODERATION_SYSTEM_PROMPT, shared_http_client};

/// One chat completion endpoint used as a moderation tier.
pub struct OpenAiCompatModerator {
    client: &'static reqwest::Client,
    name: String,
    base_url: String,
    api_key: Secret<String>,
    model: String,
    system_prompt: String,
}

impl OpenAiCompatModerator {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Secret<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: shared_http_client(),
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            system_prompt: MODERATION_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Build from config. Returns `None` when the provider has no API key.
    #[must_use]
    pub fn from_config(config: &ModerationProviderConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let api_key = config.api_key.clone()?;
        Some(Self::new(
            config.name.clone(),
            config.base_url.clone(),
            api_key,
            config.model.clone(),
        ))
    }

    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModerationService for OpenAiCompatModerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn review(&self, text: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": text },
            ],
        });

        debug!(
            provider = %self.name,
            model = %self.model,
            input_chars = text.chars().count(),
            "moderation request"
        );

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::moderation(format!("{} request failed: {e}", self.name)))?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(
                status = %status,
                provider = %self.name,
                model = %self.model,
                body = %body_text,
                "moderation API error"
            );
            return Err(Error::moderation(format!(
                "{} API error HTTP {status}: {body_text}",
                self.name
            )));
        }

        let resp = http_resp
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::moderation(format!("{} returned invalid JSON: {e}", self.name)))?;
        trace!(response = %resp, "moderation raw response");

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::moderation(format!("{} response has no content", self.name)))
    }
}
