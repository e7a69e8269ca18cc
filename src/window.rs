//! Sliding-window chunking with token overlap.
//!
//! The fallback when a text has no chapter or section markers, and the way an
//! oversized chapter or section is subdivided.
//!
//! ## How It Works
//!
//! Window sizes are derived from the token budget with a fixed
//! characters-per-token ratio:
//!
//! ```text
//! max = 6000 tokens, overlap = 500 tokens, 4 chars/token
//!
//! window = 6000 * 4 = 24000 chars
//! step   = (6000 - 500) * 4 = 22000 chars
//!
//! Chunk 0: [0..24000]
//! Chunk 1: [22000..46000]    <- shares 2000 chars with chunk 0
//! Chunk 2: [44000..50000]    <- final chunk may be shorter
//! ```
//!
//! ## Exact Tokenizers
//!
//! The ratio is only a heuristic. When an exact tokenizer counts more than
//! `max` tokens in a window (dense text, non-Latin scripts), the window is
//! shrunk proportionally until it fits, and the next window starts `overlap`
//! characters before the shrunk end. Windows therefore never leave a gap, and
//! never exceed the ceiling unless a single character already does. A window
//! is never shrunk below one character; such a window is kept and logged at
//! `warn`, so budgets must be at least as large as the densest character.

use crate::budget::TokenBudget;
use crate::chunk::Chunk;
use crate::tokens::TokenEstimator;

/// Sliding-window chunker bounded by a [`TokenBudget`].
///
/// ## Example
///
/// ```rust
/// use quire::{TokenBudget, TokenEstimator, WindowChunker};
///
/// let budget = TokenBudget::new(25).with_overlap(5).unwrap();
/// let chunker = WindowChunker::new(budget, TokenEstimator::heuristic(4));
///
/// let text = "A".repeat(250);
/// let chunks = chunker.chunk(&text);
///
/// assert_eq!(chunks[0].len(), 100);           // 25 tokens * 4 chars
/// assert_eq!(chunks[1].start_offset, Some(80)); // (25 - 5) * 4
/// assert!(chunks.iter().all(|c| c.token_count <= 25));
/// ```
#[derive(Debug, Clone)]
pub struct WindowChunker {
    budget: TokenBudget,
    estimator: TokenEstimator,
}

impl WindowChunker {
    /// Create a window chunker.
    #[must_use]
    pub fn new(budget: TokenBudget, estimator: TokenEstimator) -> Self {
        Self { budget, estimator }
    }

    /// Characters in a full window.
    #[must_use]
    fn window_chars(&self) -> usize {
        self.budget.max() * self.estimator.chars_per_token()
    }

    /// Characters shared by adjacent full windows.
    #[must_use]
    fn overlap_chars(&self) -> usize {
        self.budget.overlap() * self.estimator.chars_per_token()
    }

    /// Split `text` into overlapping windows with offsets relative to `text`.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.chunk_at(text, 0)
    }

    /// Split `text`, a slice starting at byte `base` of its document, into
    /// overlapping windows with document-relative offsets.
    pub fn chunk_at(&self, text: &str, base: usize) -> Vec<Chunk> {
        if text.is_empty() {
            return vec![];
        }

        // Byte offset of every char, plus the end of text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n_chars = bounds.len() - 1;

        let window = self.window_chars().max(1);
        let overlap = self.overlap_chars();

        let mut chunks = Vec::with_capacity(self.estimate_chunks(n_chars));
        let mut start = 0;

        while start < n_chars {
            let mut end = (start + window).min(n_chars);
            let mut tokens = self.estimator.estimate(&text[bounds[start]..bounds[end]]);

            while self.budget.exceeds(tokens) && end - start > 1 {
                let len = end - start;
                let shrunk = (len * self.budget.max() / tokens).clamp(1, len - 1);
                end = start + shrunk;
                tokens = self.estimator.estimate(&text[bounds[start]..bounds[end]]);
            }
            if self.budget.exceeds(tokens) {
                tracing::warn!(
                    start = base + bounds[start],
                    tokens,
                    max = self.budget.max(),
                    "single character exceeds token ceiling"
                );
            } else if end - start < window && end < n_chars {
                tracing::debug!(
                    start = base + bounds[start],
                    chars = end - start,
                    tokens,
                    "shrunk window to token ceiling"
                );
            }

            chunks.push(Chunk::new(
                &text[bounds[start]..bounds[end]],
                tokens,
                base + bounds[start],
                base + bounds[end],
            ));

            if end == n_chars {
                break;
            }
            start += (end - start).saturating_sub(overlap).max(1);
        }

        chunks
    }

    /// Estimate the number of windows for a text of `n_chars` characters.
    #[must_use]
    pub fn estimate_chunks(&self, n_chars: usize) -> usize {
        if n_chars == 0 {
            return 0;
        }
        let step = self.budget.step() * self.estimator.chars_per_token();
        n_chars.div_ceil(step.max(1))
    }
}
