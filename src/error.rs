//! Error types for quire.

use crate::content::ContentKind;

/// Errors that can occur while chunking, summarizing, or generating.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Empty or mismatched input handed to the detector, builder, or summarizer.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration values that cannot produce a valid pipeline.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A model response (or an aggregate of responses) failed its shape check.
    #[error("invalid {kind} generated: {reason}")]
    GenerationValidation {
        /// The content type being generated.
        kind: ContentKind,
        /// What was wrong with the response.
        reason: String,
    },

    /// Rate limit, network, or transient server failure.
    #[error("transport error ({class:?}): {message}")]
    Transport {
        /// The failure class, used for backoff decisions.
        class: TransportClass,
        /// Message from the underlying client.
        message: String,
    },

    /// The model provider refused the content. Never retried.
    #[error("{0}")]
    ContentPolicy(String),
}

/// Sub-classification of [`Error::Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportClass {
    /// Provider throttled the request (HTTP 429 and friends).
    RateLimit,
    /// Connection, DNS, or timeout failure.
    Network,
    /// Provider returned a 5xx.
    Server,
    /// Anything the client could not classify.
    Unknown,
}

/// How the retry wrapper treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Rethrow immediately.
    NonRetryable,
    /// Retry after doubling the delay.
    RateLimited,
    /// Retry after the current delay.
    Transient,
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a generation validation error for `kind`.
    pub fn validation(kind: ContentKind, reason: impl Into<String>) -> Self {
        Self::GenerationValidation {
            kind,
            reason: reason.into(),
        }
    }

    /// Classify this error for [`crate::RetryPolicy`].
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Transport {
                class: TransportClass::RateLimit,
                ..
            } => RetryClass::RateLimited,
            Self::Transport { .. } => RetryClass::Transient,
            Self::InvalidInput(_)
            | Self::InvalidConfig(_)
            | Self::GenerationValidation { .. }
            | Self::ContentPolicy(_) => RetryClass::NonRetryable,
        }
    }
}

/// Result type for quire operations.
pub type Result<T> = std::result::Result<T, Error>;
