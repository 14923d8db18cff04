use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Map into the relay's retrieval error.
    #[must_use]
    pub fn into_retrieval(self) -> relaygram_relay::Error {
        relaygram_relay::Error::retrieval(self.to_string())
    }

    /// Map into the relay's publish error.
    #[must_use]
    pub fn into_publish(self) -> relaygram_relay::Error {
        relaygram_relay::Error::publish(self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
