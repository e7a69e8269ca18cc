//! Structure-aware chunk building.
//!
//! ## Priority
//!
//! ```text
//! 1. Chapters found?  -> one chunk per chapter
//! 2. Sections found?  -> one chunk per section
//! 3. Neither          -> sliding windows over the whole text
//! ```
//!
//! A chapter (or section) runs from its marker to the next marker, or to the
//! end of the text for the last one. Any chapter whose token count exceeds
//! the ceiling is split with the sliding window, and every piece keeps the
//! chapter title:
//!
//! ```text
//! |front matter|Chapter 1 .......|Chapter 2 ...........................|
//!  untitled      one chunk          too big: windows, sub 0, 1, 2
//! ```
//!
//! Text before the first marker (title page, dedication, contents) becomes an
//! untitled leading chunk unless it is blank.

use std::cmp::Ordering;
use std::ops::Range;

use crate::budget::TokenBudget;
use crate::chunk::Chunk;
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::structure::{Marker, StructureDescriptor};
use crate::tokens::TokenEstimator;
use crate::window::WindowChunker;

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Chapter,
    Section,
}

impl Boundary {
    fn label(self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Section => "section",
        }
    }

    fn tag(self, mut chunk: Chunk, title: Option<&str>) -> Chunk {
        let title = title.map(str::to_string);
        match self {
            Self::Chapter => chunk.chapter_title = title,
            Self::Section => chunk.section_title = title,
        }
        chunk
    }
}

/// Partitions a document into bounded chunks, preferring structural cuts.
///
/// ## Example
///
/// ```rust
/// use quire::{detect_structure, ChunkBuilder, TokenBudget, TokenEstimator};
///
/// let text = "Chapter 1\nThe storm.\n\nChapter 2\nThe calm.";
/// let structure = detect_structure(text).unwrap();
///
/// let builder = ChunkBuilder::new(TokenBudget::default(), TokenEstimator::heuristic(4));
/// let chunks = builder.build(text, &structure).unwrap();
///
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].chapter_title.as_deref(), Some("Chapter 2"));
/// assert_eq!(chunks[1].text, "Chapter 2\nThe calm.");
/// ```
#[derive(Debug, Clone)]
pub struct ChunkBuilder {
    budget: TokenBudget,
    estimator: TokenEstimator,
    window: WindowChunker,
}

impl ChunkBuilder {
    /// Create a builder.
    #[must_use]
    pub fn new(budget: TokenBudget, estimator: TokenEstimator) -> Self {
        Self {
            budget,
            window: WindowChunker::new(budget, estimator.clone()),
            estimator,
        }
    }

    /// Create a builder from config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the token budget is inconsistent.
    pub fn from_config(config: &PipelineConfig, estimator: TokenEstimator) -> Result<Self> {
        Ok(Self::new(config.token_budget()?, estimator))
    }

    /// The budget every chunk respects.
    #[must_use]
    pub fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Split `text` into ordered chunks using `structure`.
    ///
    /// `structure` must have been detected on this exact `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `text` is empty or the structure's
    /// offsets do not fit the text.
    pub fn build(&self, text: &str, structure: &StructureDescriptor) -> Result<Vec<Chunk>> {
        if text.is_empty() {
            return Err(Error::invalid_input("text is required for chunking"));
        }

        let (strategy, chunks) = if structure.has_chapters {
            structure.check_against(text)?;
            let chunks = self.by_markers(text, &structure.chapter_matches, Boundary::Chapter);
            ("chapter", chunks)
        } else if structure.has_sections {
            structure.check_against(text)?;
            let chunks = self.by_markers(text, &structure.section_matches, Boundary::Section);
            ("section", chunks)
        } else {
            ("window", self.window.chunk(text))
        };

        tracing::debug!(
            strategy,
            chunks = chunks.len(),
            sub_chunks = chunks.iter().filter(|c| c.is_sub_chunk).count(),
            below_min = self.below_minimum(&chunks).count(),
            "built chunks"
        );

        Ok(chunks)
    }

    /// Chunks under the budget's advisory minimum. They are kept as is.
    pub fn below_minimum<'a>(&self, chunks: &'a [Chunk]) -> impl Iterator<Item = &'a Chunk> {
        let budget = self.budget;
        chunks
            .iter()
            .filter(move |c| budget.fits(c.token_count) == Ordering::Less)
    }

    fn by_markers(&self, text: &str, markers: &[Marker], boundary: Boundary) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(markers.len() + 1);

        let first = markers.first().map_or(text.len(), |m| m.offset);
        if !text[..first].trim().is_empty() {
            self.push_segment(&mut chunks, text, 0..first, None, boundary);
        }

        for (i, marker) in markers.iter().enumerate() {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.offset);
            self.push_segment(
                &mut chunks,
                text,
                marker.offset..end,
                Some(&marker.title),
                boundary,
            );
        }

        chunks
    }

    fn push_segment(
        &self,
        chunks: &mut Vec<Chunk>,
        text: &str,
        range: Range<usize>,
        title: Option<&str>,
        boundary: Boundary,
    ) {
        let segment = &text[range.clone()];
        let tokens = self.estimator.estimate(segment);

        if !self.budget.exceeds(tokens) {
            let chunk = Chunk::new(segment, tokens, range.start, range.end);
            chunks.push(boundary.tag(chunk, title));
            return;
        }

        let pieces = self.window.chunk_at(segment, range.start);
        tracing::debug!(
            kind = boundary.label(),
            title,
            tokens,
            pieces = pieces.len(),
            "subdividing oversized segment"
        );
        chunks.extend(
            pieces
                .into_iter()
                .enumerate()
                .map(|(i, piece)| boundary.tag(piece.into_sub_chunk(i), title)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::detect_structure;

    fn builder(max: usize, overlap: usize) -> ChunkBuilder {
        let budget = TokenBudget::new(max).with_overlap(overlap).unwrap();
        ChunkBuilder::new(budget, TokenEstimator::heuristic(1))
    }

    #[test]
    fn test_empty_text_rejected() {
        let result = builder(10, 2).build("", &StructureDescriptor::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_chapter_segments() {
        let text = "Chapter 1 aaa Chapter 2 bbb";
        let structure = detect_structure(text).unwrap();
        let chunks = builder(100, 10).build(text, &structure).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Chapter 1 aaa ");
        assert_eq!(chunks[0].span(), Some(0..14));
        assert_eq!(chunks[1].chapter_title.as_deref(), Some("Chapter 2"));
        assert!(chunks.iter().all(|c| !c.is_sub_chunk));
    }

    #[test]
    fn test_short_chapters_reported_below_minimum() {
        let budget = TokenBudget::new(100).with_min(15).unwrap();
        let builder = ChunkBuilder::new(budget, TokenEstimator::heuristic(1));
        let text = "Chapter 1 a\nChapter 2 long enough body";
        let structure = detect_structure(text).unwrap();
        let chunks = builder.build(text, &structure).unwrap();

        assert_eq!(chunks.len(), 2);
        let short: Vec<_> = builder.below_minimum(&chunks).collect();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].chapter_title.as_deref(), Some("Chapter 1"));
    }

    #[test]
    fn test_front_matter_kept() {
        let text = "My Book\nby Someone\nChapter 1 start";
        let structure = detect_structure(text).unwrap();
        let chunks = builder(100, 10).build(text, &structure).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "My Book\nby Someone\n");
        assert!(chunks[0].title().is_none());
    }

    #[test]
    fn test_blank_front_matter_dropped() {
        let text = "\n\n  Chapter 1 start";
        let structure = detect_structure(text).unwrap();
        let chunks = builder(100, 10).build(text, &structure).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_oversized_chapter_is_subdivided() {
        let text = format!("Chapter 1 {}Chapter 2 short", "x".repeat(50));
        let structure = detect_structure(&text).unwrap();
        let chunks = builder(20, 5).build(&text, &structure).unwrap();

        let subs: Vec<&Chunk> = chunks.iter().filter(|c| c.is_sub_chunk).collect();
        assert!(subs.len() >= 3);
        for (i, sub) in subs.iter().enumerate() {
            assert_eq!(sub.sub_chunk_index, Some(i));
            assert_eq!(sub.chapter_title.as_deref(), Some("Chapter 1"));
        }
        assert!(chunks.iter().all(|c| c.token_count <= 20));

        let last = chunks.last().unwrap();
        assert_eq!(last.text, "Chapter 2 short");
        assert!(!last.is_sub_chunk);
    }

    #[test]
    fn test_sections_used_without_chapters() {
        let text = "Intro\n§ 1 first\n§ 2 second";
        let structure = detect_structure(text).unwrap();
        let chunks = builder(100, 10).build(text, &structure).unwrap();

        let titles: Vec<Option<&str>> =
            chunks.iter().map(|c| c.section_title.as_deref()).collect();
        assert_eq!(titles, [None, Some("§ 1"), Some("§ 2")]);
        assert!(chunks.iter().all(|c| c.chapter_title.is_none()));
    }

    #[test]
    fn test_plain_text_uses_windows() {
        let text = "y".repeat(45);
        let structure = detect_structure(&text).unwrap();
        let chunks = builder(20, 5).build(&text, &structure).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].span(), Some(15..35));
        assert!(chunks.iter().all(|c| !c.is_sub_chunk && c.title().is_none()));
    }

    #[test]
    fn test_mismatched_structure_rejected() {
        let structure = detect_structure("Chapter 1 ... Chapter 2 ...").unwrap();
        let result = builder(100, 10).build("short text", &structure);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
