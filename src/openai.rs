//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{ModelClient, ModelError, ModelErrorKind, ModelRequest};

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// [`ModelClient`] over the `/v1/chat/completions` endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// Create a client from `OPENAI_API_KEY`, `OPENAI_MODEL`, and
    /// `OPENAI_BASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `OPENAI_API_KEY` is unset.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::invalid_config("OPENAI_API_KEY not set"))?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(api_key, model, base_url))
    }

    /// The model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Map a non-200 response to a classified error.
fn classify(status: u16, body: &str) -> ModelError {
    let kind = if body.contains("content_policy_violation") {
        ModelErrorKind::ContentPolicy
    } else if status == 429 {
        ModelErrorKind::RateLimit
    } else if status >= 500 {
        ModelErrorKind::Transport
    } else {
        ModelErrorKind::Unknown
    };
    ModelError::new(kind, format!("API error {status}: {body}")).with_status(status)
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
            ModelErrorKind::Transport
        } else {
            ModelErrorKind::Unknown
        };
        let error = Self::new(kind, err.to_string());
        match err.status() {
            Some(status) => error.with_status(status.as_u16()),
            None => error,
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, request: &ModelRequest) -> std::result::Result<String, ModelError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_instructions },
                { "role": "user", "content": request.context_text },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        tracing::debug!(%url, kind = %request.kind, model = %self.model, "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        let resp: serde_json::Value = response.json().await?;
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                ModelError::new(
                    ModelErrorKind::Unknown,
                    "missing choices[0].message.content",
                )
            })
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_statuses() {
        assert_eq!(classify(429, "slow down").kind, ModelErrorKind::RateLimit);
        assert_eq!(classify(503, "").kind, ModelErrorKind::Transport);
        assert_eq!(classify(401, "bad key").kind, ModelErrorKind::Unknown);
        assert_eq!(
            classify(400, r#"{"error":{"code":"content_policy_violation"}}"#).kind,
            ModelErrorKind::ContentPolicy
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiClient::new("sk-secret", DEFAULT_MODEL, DEFAULT_BASE_URL);
        assert!(!format!("{client:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport() {
        // Nothing listens on port 1.
        let client = OpenAiClient::new("sk-test", DEFAULT_MODEL, "http://127.0.0.1:1");
        let request = ModelRequest::new(crate::ContentKind::Synopsis, "sys", "ctx");

        let err = client.complete(&request).await.unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::Transport);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_malformed_url_is_unknown() {
        let err: ModelError = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.kind, ModelErrorKind::Unknown);
    }
}
