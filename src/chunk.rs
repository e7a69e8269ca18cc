//! The Chunk type: a bounded piece of a manuscript plus where it came from.

use serde::{Deserialize, Serialize};

/// A bounded-size segment of a document, prepared as model input.
///
/// A document is represented by an ordered `Vec<Chunk>`. Order is document
/// order and is preserved through summarization and aggregation.
///
/// ## Offsets
///
/// Chunks produced by [`crate::ChunkBuilder`] carry byte offsets into the
/// document they were cut from, whether the cut was at a chapter marker or
/// by the sliding window:
///
/// ```rust
/// use quire::Chunk;
///
/// let text = "Chapter 1\nIt was a dark night.";
/// let chunk = Chunk::new(&text[10..], 5, 10, text.len());
///
/// assert_eq!(chunk.span(), Some(10..text.len()));
/// assert!(!chunk.is_sub_chunk);
/// ```
///
/// Offsets are optional so chunks persisted without them still load.
///
/// ## Sub-Chunks
///
/// When a chapter is too large for one chunk, its windows are tagged with
/// the chapter title, `is_sub_chunk = true`, and a zero-based
/// `sub_chunk_index`:
///
/// ```text
/// "Chapter 7" (14000 tokens)
///   -> Chunk { chapter_title: "Chapter 7", sub_chunk_index: Some(0), .. }
///   -> Chunk { chapter_title: "Chapter 7", sub_chunk_index: Some(1), .. }
///   -> Chunk { chapter_title: "Chapter 7", sub_chunk_index: Some(2), .. }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// The chunk text. Never empty.
    pub text: String,
    /// Estimated (or exact) token count; never above the configured ceiling.
    pub token_count: usize,
    /// Chapter marker this chunk belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,
    /// Section marker this chunk belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,
    /// Byte offset where the chunk starts in its document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    /// Byte offset where the chunk ends (exclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
    /// Whether this chunk came from subdividing an oversized segment.
    #[serde(default)]
    pub is_sub_chunk: bool,
    /// Position among the sub-chunks of the same segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_chunk_index: Option<usize>,
}

impl Chunk {
    /// A chunk covering bytes `start..end` of its document.
    #[must_use]
    pub fn new(text: impl Into<String>, token_count: usize, start: usize, end: usize) -> Self {
        Self {
            start_offset: Some(start),
            end_offset: Some(end),
            ..Self::from_text(text, token_count)
        }
    }

    /// A chunk with no known position.
    #[must_use]
    pub fn from_text(text: impl Into<String>, token_count: usize) -> Self {
        Self {
            text: text.into(),
            token_count,
            chapter_title: None,
            section_title: None,
            start_offset: None,
            end_offset: None,
            is_sub_chunk: false,
            sub_chunk_index: None,
        }
    }

    /// Mark this chunk as the `index`-th piece of an oversized segment.
    #[must_use]
    pub fn into_sub_chunk(self, index: usize) -> Self {
        Self {
            is_sub_chunk: true,
            sub_chunk_index: Some(index),
            ..self
        }
    }

    /// The length of this chunk in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether this chunk is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The byte span of this chunk in its document, when known.
    #[must_use]
    pub fn span(&self) -> Option<std::ops::Range<usize>> {
        match (self.start_offset, self.end_offset) {
            (Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }

    /// The chapter or section title, whichever is set.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.chapter_title
            .as_deref()
            .or(self.section_title.as_deref())
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chunk {{ tokens: {}, len: {}", self.token_count, self.len())?;
        if let Some(title) = self.title() {
            write!(f, ", title: {title:?}")?;
        }
        if let Some(span) = self.span() {
            write!(f, ", span: {}..{}", span.start, span.end)?;
        }
        if let Some(index) = self.sub_chunk_index {
            write!(f, ", sub: {index}")?;
        }
        write!(f, " }}")
    }
}
