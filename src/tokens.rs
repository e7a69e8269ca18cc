//! Token estimation and token-limit truncation.
//!
//! Token counts bound chunk and summary sizes. They are budgeting numbers, so
//! estimation never fails: when the exact tokenizer errors (or none is
//! configured) the count falls back to `ceil(chars / chars_per_token)`.
//!
//! ```text
//! exact:     "The quick brown fox" -> o200k_base -> 4 tokens
//! fallback:  "The quick brown fox" -> ceil(19 / 4) -> 5 tokens
//! ```
//!
//! The fallback is an explicit path with its own tests, and every use of it
//! is logged at `warn` so a broken tokenizer shows up in the logs instead of
//! silently skewing chunk boundaries.

use std::sync::Arc;

use crate::cache::{TruncationCache, TruncationKey};
use crate::chunk::Chunk;
use crate::config::PipelineConfig;

/// Error from an exact tokenizer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("tokenizer failed: {0}")]
pub struct TokenizerError(pub String);

/// An exact, model-specific tokenizer.
///
/// Implementations own whatever encoder state they need; it is released when
/// the tokenizer is dropped.
pub trait Tokenizer: Send + Sync {
    /// Count the tokens in `text`.
    fn count(&self, text: &str) -> Result<usize, TokenizerError>;

    /// The longest prefix of `text` that is at most `max_tokens` tokens.
    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String, TokenizerError>;
}

/// `o200k_base` BPE, the encoding used by gpt-4o-mini.
#[cfg(feature = "tiktoken")]
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl TiktokenTokenizer {
    /// Load the `o200k_base` encoder.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError`] if the encoder tables fail to load.
    pub fn o200k() -> Result<Self, TokenizerError> {
        tiktoken_rs::o200k_base()
            .map(|bpe| Self { bpe })
            .map_err(|e| TokenizerError(e.to_string()))
    }
}

#[cfg(feature = "tiktoken")]
impl Tokenizer for TiktokenTokenizer {
    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> Result<String, TokenizerError> {
        let tokens = self.bpe.encode_with_special_tokens(text);
        if tokens.len() <= max_tokens {
            return Ok(text.to_string());
        }
        self.bpe
            .decode(tokens[..max_tokens].to_vec())
            .map_err(|e| TokenizerError(e.to_string()))
    }
}

#[cfg(feature = "tiktoken")]
impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TiktokenTokenizer(o200k_base)")
    }
}

/// Maps text to token counts, exact when possible, heuristic otherwise.
#[derive(Clone)]
pub struct TokenEstimator {
    tokenizer: Option<Arc<dyn Tokenizer>>,
    chars_per_token: usize,
    cache: Option<Arc<TruncationCache>>,
}

impl TokenEstimator {
    /// An estimator that only uses the character heuristic.
    #[must_use]
    pub fn heuristic(chars_per_token: usize) -> Self {
        Self {
            tokenizer: None,
            chars_per_token: chars_per_token.max(1),
            cache: None,
        }
    }

    /// Use `tokenizer` for exact counts.
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Memoize truncations in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<TruncationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the estimator a config asks for.
    ///
    /// With the `tiktoken` feature the exact tokenizer is loaded; if loading
    /// fails the estimator runs on the heuristic alone.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let estimator = Self::heuristic(config.chars_per_token_fallback).load_exact();
        match TruncationCache::with_capacity(config.truncation_cache_capacity) {
            Some(cache) => estimator.with_cache(Arc::new(cache)),
            None => estimator,
        }
    }

    #[cfg(feature = "tiktoken")]
    fn load_exact(self) -> Self {
        match TiktokenTokenizer::o200k() {
            Ok(tokenizer) => self.with_tokenizer(Arc::new(tokenizer)),
            Err(err) => {
                tracing::warn!(error = %err, "exact tokenizer unavailable, using heuristic");
                self
            }
        }
    }

    #[cfg(not(feature = "tiktoken"))]
    fn load_exact(self) -> Self {
        self
    }

    /// Whether an exact tokenizer is configured.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.tokenizer.is_some()
    }

    /// Characters per token used by the heuristic.
    #[must_use]
    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// The attached truncation cache, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&TruncationCache> {
        self.cache.as_deref()
    }

    /// Estimate the tokens in `text`. Never fails.
    pub fn estimate(&self, text: &str) -> usize {
        match &self.tokenizer {
            Some(tokenizer) => tokenizer.count(text).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "token count failed, using heuristic");
                self.fallback_estimate(text)
            }),
            None => self.fallback_estimate(text),
        }
    }

    /// `ceil(chars / chars_per_token)`.
    #[must_use]
    pub fn fallback_estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    /// Truncate `text` to at most `max_tokens` tokens.
    ///
    /// `kind` names the content the text is for; it only separates cache
    /// entries and labels log lines.
    pub fn truncate(&self, text: &str, max_tokens: usize, kind: &str) -> String {
        let key = self
            .cache
            .as_ref()
            .map(|_| TruncationKey::new(text, max_tokens, kind));

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                tracing::debug!(kind, "using cached truncation");
                return hit;
            }
        }

        let result = match &self.tokenizer {
            Some(tokenizer) => tokenizer.truncate(text, max_tokens).unwrap_or_else(|err| {
                tracing::warn!(kind, error = %err, "truncation failed, cutting by characters");
                self.fallback_truncate(text, max_tokens)
            }),
            None => self.fallback_truncate(text, max_tokens),
        };

        if result.len() < text.len() {
            tracing::debug!(
                kind,
                max_tokens,
                original_bytes = text.len(),
                truncated_bytes = result.len(),
                "truncated context to token limit"
            );
        }

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, result.clone());
        }
        result
    }

    fn fallback_truncate(&self, text: &str, max_tokens: usize) -> String {
        let max_chars = max_tokens.saturating_mul(self.chars_per_token);
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.to_string(),
        }
    }

    /// The longest prefix of `chunks` whose token counts sum to at most
    /// `max_tokens`. A non-empty input always yields at least one chunk.
    #[must_use]
    pub fn take_within_budget<'a>(&self, chunks: &'a [Chunk], max_tokens: usize) -> &'a [Chunk] {
        let mut total = 0usize;
        let mut taken = 0usize;
        for chunk in chunks {
            if total + chunk.token_count > max_tokens {
                tracing::debug!(total, max_tokens, "reached request token limit");
                break;
            }
            total += chunk.token_count;
            taken += 1;
        }
        &chunks[..taken.max(chunks.len().min(1))]
    }
}

impl std::fmt::Debug for TokenEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("exact", &self.is_exact())
            .field("chars_per_token", &self.chars_per_token)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Tokenizer for Broken {
        fn count(&self, _: &str) -> Result<usize, TokenizerError> {
            Err(TokenizerError("no tables".into()))
        }
        fn truncate(&self, _: &str, _: usize) -> Result<String, TokenizerError> {
            Err(TokenizerError("no tables".into()))
        }
    }

    /// One token per whitespace-separated word.
    struct Words;

    impl Tokenizer for Words {
        fn count(&self, text: &str) -> Result<usize, TokenizerError> {
            Ok(text.split_whitespace().count())
        }
        fn truncate(&self, text: &str, max_tokens: usize) -> Result<String, TokenizerError> {
            Ok(text
                .split_whitespace()
                .take(max_tokens)
                .collect::<Vec<_>>()
                .join(" "))
        }
    }

    #[test]
    fn test_heuristic_rounds_up() {
        let est = TokenEstimator::heuristic(4);
        assert_eq!(est.estimate(""), 0);
        assert_eq!(est.estimate("abcd"), 1);
        assert_eq!(est.estimate("abcde"), 2);
        // Counts chars, not bytes.
        assert_eq!(est.estimate("日本語日"), 1);
    }

    #[test]
    fn test_broken_tokenizer_falls_back() {
        let est = TokenEstimator::heuristic(4).with_tokenizer(Arc::new(Broken));
        assert!(est.is_exact());
        assert_eq!(est.estimate("abcdefgh"), 2);
        assert_eq!(est.truncate("abcdefghij", 2, "test"), "abcdefgh");
    }

    #[test]
    fn test_exact_tokenizer_used() {
        let est = TokenEstimator::heuristic(4).with_tokenizer(Arc::new(Words));
        assert_eq!(est.estimate("one two three"), 3);
        assert_eq!(est.truncate("one two three", 2, "test"), "one two");
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let est = TokenEstimator::heuristic(4);
        assert_eq!(est.truncate("short", 100, "test"), "short");
    }

    #[test]
    fn test_truncation_is_cached() {
        let cache = Arc::new(TruncationCache::with_capacity(4).unwrap());
        let est = TokenEstimator::heuristic(1).with_cache(Arc::clone(&cache));

        assert_eq!(est.truncate("abcdef", 3, "keywords"), "abc");
        assert_eq!(est.truncate("abcdef", 3, "keywords"), "abc");
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_take_within_budget() {
        let est = TokenEstimator::heuristic(4);
        let chunks: Vec<Chunk> = [40, 30, 50, 10]
            .iter()
            .map(|&t| Chunk::from_text("x", t))
            .collect();

        assert_eq!(est.take_within_budget(&chunks, 75).len(), 2);
        assert_eq!(est.take_within_budget(&chunks, 1000).len(), 4);
        // The first chunk is always processed.
        assert_eq!(est.take_within_budget(&chunks, 5).len(), 1);
        assert!(est.take_within_budget(&[], 5).is_empty());
    }

    #[cfg(feature = "tiktoken")]
    #[test]
    fn test_tiktoken_counts_fewer_than_chars() {
        let tokenizer = TiktokenTokenizer::o200k().unwrap();
        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = tokenizer.count(text).unwrap();
        assert!(tokens > 0 && tokens < text.len());

        let cut = tokenizer.truncate(text, 3).unwrap();
        assert!(text.starts_with(&cut));
        assert!(cut.len() < text.len());
    }
}
