//! The model client seam.
//!
//! The generator owns prompts, parsing, and validation. A [`ModelClient`]
//! owns only transport: it sends a [`ModelRequest`] and returns the raw
//! response text, or a [`ModelError`] classified for the retry wrapper.

use async_trait::async_trait;

use crate::content::ContentKind;
use crate::error::{Error, TransportClass};

/// Shown to users when the provider refuses the content.
pub const CONTENT_POLICY_MESSAGE: &str = "The content was blocked by the model provider's \
    safety filters. Check that the manuscript follows the provider's usage guidelines.";

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// What is being generated.
    pub kind: ContentKind,
    /// System prompt describing the task and the JSON shape to answer with.
    pub system_instructions: String,
    /// Book text (summary, optionally plus one chunk).
    pub context_text: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
}

impl ModelRequest {
    /// A request using `kind`'s sampling settings.
    #[must_use]
    pub fn new(
        kind: ContentKind,
        system_instructions: impl Into<String>,
        context_text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            system_instructions: system_instructions.into(),
            context_text: context_text.into(),
            temperature: kind.temperature(),
            max_tokens: kind.max_tokens(),
        }
    }
}

/// Failure class reported by a [`ModelClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Throttled.
    RateLimit,
    /// Content refused by the provider's policy filters.
    ContentPolicy,
    /// Connection failure, timeout, or 5xx.
    Transport,
    /// Anything else.
    Unknown,
}

/// Error returned by a [`ModelClient`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ModelError {
    /// Failure class.
    pub kind: ModelErrorKind,
    /// Provider or transport message.
    pub message: String,
    /// HTTP status, when there was a response.
    pub status: Option<u16>,
}

impl ModelError {
    /// Create a model error.
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP status.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        let class = match err.kind {
            ModelErrorKind::ContentPolicy => {
                return Self::ContentPolicy(format!("{CONTENT_POLICY_MESSAGE} ({})", err.message));
            }
            ModelErrorKind::RateLimit => TransportClass::RateLimit,
            ModelErrorKind::Transport if err.status.is_some_and(|s| s >= 500) => {
                TransportClass::Server
            }
            ModelErrorKind::Transport => TransportClass::Network,
            ModelErrorKind::Unknown => TransportClass::Unknown,
        };
        Self::Transport {
            class,
            message: err.message,
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `request` and return the raw response text.
    async fn complete(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetryClass;

    #[test]
    fn test_request_uses_kind_settings() {
        let req = ModelRequest::new(ContentKind::Preface, "sys", "ctx");
        assert_eq!(req.max_tokens, 1500);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ModelError::new(ModelErrorKind::ContentPolicy, "flagged").into();
        assert!(matches!(err, Error::ContentPolicy(ref m) if m.contains("flagged")));
        assert_eq!(err.retry_class(), RetryClass::NonRetryable);

        let err: Error = ModelError::new(ModelErrorKind::RateLimit, "429").into();
        assert_eq!(err.retry_class(), RetryClass::RateLimited);

        let err: Error = ModelError::new(ModelErrorKind::Transport, "bad gateway")
            .with_status(502)
            .into();
        assert!(matches!(
            err,
            Error::Transport {
                class: TransportClass::Server,
                ..
            }
        ));

        let err: Error = ModelError::new(ModelErrorKind::Unknown, "?").into();
        assert_eq!(err.retry_class(), RetryClass::Transient);
    }
}
