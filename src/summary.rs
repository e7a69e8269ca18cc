//! Rolling summary: one bounded digest of every chunk, used as shared context.
//!
//! ## Head + Tail
//!
//! The chunks are joined in document order with a blank line between them.
//! If that fits the character budget it is the summary. Otherwise the first
//! and last thirds of the budget are kept around an elision marker:
//!
//! ```text
//! budget = 6000 chars
//!
//! [ first ≤2000 chars ]\n...[middle content omitted]...\n[ last ≤2000 chars ]
//! ```
//!
//! Openings and endings carry most of what a blurb or a category needs: the
//! premise and the resolution. Cuts are moved back to the nearest word
//! boundary so neither side ends in half a word, unless that would throw
//! away more than half of the side.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::chunk::Chunk;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::tokens::TokenEstimator;

/// Inserted between the kept head and tail.
pub const ELISION_MARKER: &str = "\n...[middle content omitted]...\n";

const CHUNK_SEPARATOR: &str = "\n\n";

/// A length-bounded digest of a chunk sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollingSummary {
    /// The digest. Non-empty, at most the configured number of chars.
    pub summary_text: String,
    /// Number of chunks the digest was built from.
    pub processed_chunk_count: usize,
    /// Estimated tokens in `summary_text`. Informational only.
    pub estimated_token_count: usize,
}

/// Builds [`RollingSummary`] values.
///
/// ```rust
/// use quire::{Chunk, RollingSummarizer, TokenEstimator};
///
/// let chunks = vec![Chunk::from_text("Once upon a time.", 5), Chunk::from_text("The end.", 3)];
/// let summary = RollingSummarizer::new(100, TokenEstimator::heuristic(4))
///     .summarize(&chunks)
///     .unwrap();
///
/// assert_eq!(summary.summary_text, "Once upon a time.\n\nThe end.");
/// assert_eq!(summary.processed_chunk_count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct RollingSummarizer {
    max_length: usize,
    estimator: TokenEstimator,
}

impl RollingSummarizer {
    /// Create a summarizer with a budget of `max_length` characters.
    #[must_use]
    pub fn new(max_length: usize, estimator: TokenEstimator) -> Self {
        Self {
            max_length: max_length.max(1),
            estimator,
        }
    }

    /// Create a summarizer from config.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, estimator: TokenEstimator) -> Self {
        Self::new(config.summary_max_length, estimator)
    }

    /// The character budget.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Reduce `chunks` to one bounded summary.
    ///
    /// Deterministic: the same chunks and budget always give the same text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `chunks` is empty or holds only
    /// blank text.
    pub fn summarize(&self, chunks: &[Chunk]) -> Result<RollingSummary> {
        if chunks.is_empty() {
            return Err(Error::invalid_input(
                "chunks are required for the rolling summary",
            ));
        }

        let joined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        if joined.trim().is_empty() {
            return Err(Error::invalid_input(
                "chunks hold no text for the rolling summary",
            ));
        }
        let original_chars = joined.chars().count();

        let summary_text = if original_chars <= self.max_length {
            joined
        } else {
            self.elide(&joined, original_chars)
        };

        let estimated_token_count = self.estimator.estimate(&summary_text);
        tracing::info!(
            chunks = chunks.len(),
            original_chars,
            final_chars = summary_text.chars().count(),
            estimated_token_count,
            "built rolling summary"
        );

        Ok(RollingSummary {
            summary_text,
            processed_chunk_count: chunks.len(),
            estimated_token_count,
        })
    }

    fn elide(&self, joined: &str, total_chars: usize) -> String {
        let marker_chars = ELISION_MARKER.chars().count();
        let part = (self.max_length / 3).min(self.max_length.saturating_sub(marker_chars) / 2);

        if part == 0 {
            // Budget too small for head + marker + tail.
            return joined.chars().take(self.max_length).collect();
        }

        let head_end = byte_at_char(joined, part);
        let tail_start = byte_at_char(joined, total_chars - part);

        let head = snap_head(joined, head_end);
        let tail = snap_tail(joined, tail_start);

        let mut out = String::with_capacity(head.len() + ELISION_MARKER.len() + tail.len());
        out.push_str(head.trim_end());
        out.push_str(ELISION_MARKER);
        out.push_str(tail.trim_start());
        out
    }
}

fn byte_at_char(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(i, _)| i)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// Whether a cut at byte `at` would split a word.
fn splits_word(text: &str, at: usize) -> bool {
    let before = text[..at].chars().next_back();
    let after = text[at..].chars().next();
    matches!((before, after), (Some(b), Some(a)) if is_word_char(b) && is_word_char(a))
}

/// `text[..end]`, moved back to the start of a word cut in half.
fn snap_head(text: &str, end: usize) -> &str {
    let head = &text[..end];
    if !splits_word(text, end) {
        return head;
    }
    match head.split_word_bound_indices().next_back() {
        Some((start, _)) if start >= end / 2 => &head[..start],
        _ => head,
    }
}

/// `text[start..]`, moved forward past a word cut in half.
fn snap_tail(text: &str, start: usize) -> &str {
    let tail = &text[start..];
    if !splits_word(text, start) {
        return tail;
    }
    match tail.split_word_bound_indices().next() {
        Some((_, word)) if word.len() <= tail.len() / 2 => &tail[word.len()..],
        _ => tail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summarizer(max: usize) -> RollingSummarizer {
        RollingSummarizer::new(max, TokenEstimator::heuristic(4))
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts.iter().map(|t| Chunk::from_text(*t, 1)).collect()
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            summarizer(100).summarize(&[]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_blank_chunks_rejected() {
        let blank = [Chunk::from_text("", 0), Chunk::from_text("  \n", 0)];
        assert!(matches!(
            summarizer(100).summarize(&blank),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_short_input_joined_verbatim() {
        let s = summarizer(100).summarize(&chunks(&["a", "b", "c"])).unwrap();
        assert_eq!(s.summary_text, "a\n\nb\n\nc");
        assert_eq!(s.processed_chunk_count, 3);
        assert_eq!(s.estimated_token_count, 2);
    }

    #[test]
    fn test_long_input_keeps_head_and_tail() {
        let head = "Beginning ".repeat(30);
        let tail = "Ending ".repeat(30);
        let middle = "middle ".repeat(200);
        let s = summarizer(300)
            .summarize(&chunks(&[&head, &middle, &tail]))
            .unwrap();

        assert!(s.summary_text.chars().count() <= 300);
        assert!(s.summary_text.starts_with("Beginning Beginning"));
        assert!(s.summary_text.trim_end().ends_with("Ending"));
        assert!(s.summary_text.contains(ELISION_MARKER));
        assert!(!s.summary_text.contains("middle middle"));
        assert!(!s.summary_text.replace(ELISION_MARKER, "").contains("middle"));
    }

    #[test]
    fn test_cuts_avoid_half_words() {
        let text = "alpha beta gamma delta ".repeat(40);
        let s = summarizer(90).summarize(&chunks(&[&text])).unwrap();
        let (head, tail) = s.summary_text.split_once(ELISION_MARKER).unwrap();

        for word in head.split_whitespace().chain(tail.split_whitespace()) {
            assert!(
                ["alpha", "beta", "gamma", "delta"].contains(&word),
                "half word {word:?} in {:?}",
                s.summary_text
            );
        }
    }

    #[test]
    fn test_unbreakable_text_still_bounded() {
        let text = "x".repeat(1000);
        let s = summarizer(120).summarize(&chunks(&[&text])).unwrap();
        assert!(s.summary_text.chars().count() <= 120);
        assert!(s.summary_text.starts_with("xxxx"));
        assert!(s.summary_text.ends_with("xxxx"));
    }

    #[test]
    fn test_tiny_budget() {
        let s = summarizer(10).summarize(&chunks(&["abcdefghijklmnop"])).unwrap();
        assert_eq!(s.summary_text, "abcdefghij");
    }

    #[test]
    fn test_deterministic() {
        let text = "word ".repeat(500);
        let a = summarizer(200).summarize(&chunks(&[&text, "end"])).unwrap();
        let b = summarizer(200).summarize(&chunks(&[&text, "end"])).unwrap();
        assert_eq!(a, b);
    }
}
