//! Pipeline configuration.
//!
//! Every option can be set from the environment. A key is looked up as
//! `QUIRE_{KEY}` first and then as the bare `{KEY}`, so a deployment can keep
//! the historical names (`MAX_TOKENS_PER_CHUNK`, `SUMMARY_MAX_LENGTH`, ...)
//! or namespace them.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::budget::TokenBudget;
use crate::error::{Error, Result};

const ENV_PREFIX: &str = "QUIRE";

/// Load a `.env` file if present (silently ignores a missing file).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    let prefixed = format!("{ENV_PREFIX}_{key}");
    env::var(&prefixed)
        .ok()
        .or_else(|| env::var(key).ok())
        .filter(|s| !s.trim().is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Options consumed by the chunking, summary, and generation stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard token ceiling for every chunk.
    pub max_tokens_per_chunk: usize,

    /// Advisory token floor for chunks.
    pub min_tokens_per_chunk: usize,

    /// Tokens shared by adjacent sliding windows.
    pub overlap_tokens: usize,

    /// Character budget for the rolling summary.
    pub summary_max_length: usize,

    /// Total attempts per model call, including the first.
    pub max_retry_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    pub initial_retry_delay_ms: u64,

    /// Characters per token when no exact tokenizer is available.
    pub chars_per_token_fallback: usize,

    /// Token ceiling for the context text of a single model call.
    pub request_token_limit: usize,

    /// Token ceiling for all chunks processed by one per-chunk generation.
    pub max_tokens_for_request: usize,

    /// Entries kept by the truncation cache (0 disables it).
    pub truncation_cache_capacity: usize,

    /// Per-chunk model calls allowed in flight at once.
    pub max_concurrent_requests: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: 6000,
            min_tokens_per_chunk: 1000,
            overlap_tokens: 500,
            summary_max_length: 6000,
            max_retry_attempts: 3,
            initial_retry_delay_ms: 1000,
            chars_per_token_fallback: 4,
            request_token_limit: 8000,
            max_tokens_for_request: 120_000,
            truncation_cache_capacity: 100,
            max_concurrent_requests: 4,
        }
    }
}

impl PipelineConfig {
    /// Build config from environment variables (call [`load_dotenv`] first).
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_tokens_per_chunk: env_usize("MAX_TOKENS_PER_CHUNK", d.max_tokens_per_chunk),
            min_tokens_per_chunk: env_usize("MIN_TOKENS_PER_CHUNK", d.min_tokens_per_chunk),
            overlap_tokens: env_usize("OVERLAP_TOKENS", d.overlap_tokens),
            summary_max_length: env_usize("SUMMARY_MAX_LENGTH", d.summary_max_length),
            max_retry_attempts: env_u64("MAX_RETRY_ATTEMPTS", u64::from(d.max_retry_attempts))
                .try_into()
                .unwrap_or(d.max_retry_attempts),
            initial_retry_delay_ms: env_u64("INITIAL_RETRY_DELAY_MS", d.initial_retry_delay_ms),
            chars_per_token_fallback: env_usize(
                "CHARS_PER_TOKEN_FALLBACK",
                d.chars_per_token_fallback,
            ),
            request_token_limit: env_usize("REQUEST_TOKEN_LIMIT", d.request_token_limit),
            max_tokens_for_request: env_usize("MAX_TOKENS_FOR_REQUEST", d.max_tokens_for_request),
            truncation_cache_capacity: env_usize(
                "TRUNCATION_CACHE_CAPACITY",
                d.truncation_cache_capacity,
            ),
            max_concurrent_requests: env_usize(
                "MAX_CONCURRENT_REQUESTS",
                d.max_concurrent_requests,
            ),
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first bad option.
    pub fn validate(&self) -> Result<()> {
        self.token_budget()?;

        if self.summary_max_length == 0 {
            return Err(Error::invalid_config("summary_max_length must be > 0"));
        }
        if self.max_retry_attempts == 0 {
            return Err(Error::invalid_config("max_retry_attempts must be > 0"));
        }
        if self.chars_per_token_fallback == 0 {
            return Err(Error::invalid_config("chars_per_token_fallback must be > 0"));
        }
        if self.request_token_limit == 0 {
            return Err(Error::invalid_config("request_token_limit must be > 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::invalid_config("max_concurrent_requests must be > 0"));
        }

        Ok(())
    }

    /// The chunk token budget described by this config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if max/min/overlap are inconsistent.
    pub fn token_budget(&self) -> Result<TokenBudget> {
        Ok(TokenBudget::try_from_parts(
            self.max_tokens_per_chunk,
            self.min_tokens_per_chunk,
            self.overlap_tokens,
        )?)
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn initial_retry_delay(&self) -> Duration {
        Duration::from_millis(self.initial_retry_delay_ms)
    }
}
