use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Downloading a media payload failed.
    #[error("media retrieval failed: {message}")]
    Retrieval { message: String },

    /// A moderation tier failed (transport, status, or unusable output).
    #[error("moderation failed: {message}")]
    Moderation { message: String },

    /// The destination rejected or never received a publish request.
    #[error("publish failed: {message}")]
    Publish { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn moderation(message: impl Into<String>) -> Self {
        Self::Moderation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl relaygram_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

relaygram_common::impl_context!(Error);
