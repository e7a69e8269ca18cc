//! Structure detection: chapter markers, section markers, paragraph breaks.
//!
//! Three independent scans over the full text:
//!
//! ```text
//! Chapter:   "Chapter 12", "Capitolo 3"             (case-insensitive)
//! Section:   "\n§ 4", "\nSezione 2", "\nSection 9"  (must start a line)
//! Paragraph: "\n\n", "\n   \n"                      (blank line)
//! ```
//!
//! Offsets are byte offsets of the match start, so a section offset points
//! at the newline that precedes the marker. Titles are the matched text with
//! surrounding whitespace trimmed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static CHAPTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)chapter \d+|capitolo \d+").expect("valid chapter regex"));

static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\n\s*§\s*\d+|\n\s*sezione\s+\d+|\n\s*section\s+\d+")
        .expect("valid section regex")
});

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph regex"));

/// One detected marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Byte offset of the match in the source text.
    pub offset: usize,
    /// The matched marker text, trimmed.
    pub title: String,
}

/// Natural boundaries found in one document text.
///
/// Only valid together with the exact text it was computed from; see
/// [`StructureDescriptor::check_against`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDescriptor {
    /// At least one chapter marker was found.
    pub has_chapters: bool,
    /// At least one section marker was found.
    pub has_sections: bool,
    /// Number of blank-line paragraph breaks.
    pub total_paragraphs: usize,
    /// Chapter markers in document order.
    pub chapter_matches: Vec<Marker>,
    /// Section markers in document order.
    pub section_matches: Vec<Marker>,
}

/// Scan `text` for chapter, section, and paragraph boundaries.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `text` is empty.
///
/// # Examples
///
/// ```rust
/// use quire::detect_structure;
///
/// let text = "Chapter 1\nA beginning.\n\nChapter 2\nAn end.";
/// let structure = detect_structure(text).unwrap();
///
/// assert!(structure.has_chapters);
/// assert_eq!(structure.chapter_matches[1].offset, 24);
/// assert_eq!(structure.total_paragraphs, 1);
/// ```
pub fn detect_structure(text: &str) -> Result<StructureDescriptor> {
    if text.is_empty() {
        return Err(Error::invalid_input(
            "text is required for structure identification",
        ));
    }

    let chapter_matches = scan(&CHAPTER, text);
    let section_matches = scan(&SECTION, text);
    let total_paragraphs = PARAGRAPH.find_iter(text).count();

    tracing::debug!(
        chapters = chapter_matches.len(),
        sections = section_matches.len(),
        paragraphs = total_paragraphs,
        "detected text structure"
    );

    Ok(StructureDescriptor {
        has_chapters: !chapter_matches.is_empty(),
        has_sections: !section_matches.is_empty(),
        total_paragraphs,
        chapter_matches,
        section_matches,
    })
}

fn scan(pattern: &Regex, text: &str) -> Vec<Marker> {
    pattern
        .find_iter(text)
        .map(|m| Marker {
            offset: m.start(),
            title: m.as_str().trim().to_string(),
        })
        .collect()
}

impl StructureDescriptor {
    /// Check that this descriptor could have been computed from `text`.
    ///
    /// Offsets must be strictly increasing, inside the text, and on char
    /// boundaries. This catches a descriptor paired with the wrong document;
    /// it cannot prove the pairing is right.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first bad offset.
    pub fn check_against(&self, text: &str) -> Result<()> {
        check_markers("chapter", &self.chapter_matches, text)?;
        check_markers("section", &self.section_matches, text)
    }
}

fn check_markers(label: &str, markers: &[Marker], text: &str) -> Result<()> {
    let mut previous: Option<usize> = None;
    for marker in markers {
        if marker.offset >= text.len() || !text.is_char_boundary(marker.offset) {
            return Err(Error::invalid_input(format!(
                "{label} offset {} does not index into a text of {} bytes",
                marker.offset,
                text.len()
            )));
        }
        if previous.is_some_and(|p| p >= marker.offset) {
            return Err(Error::invalid_input(format!(
                "{label} offsets are not strictly increasing at {}",
                marker.offset
            )));
        }
        previous = Some(marker.offset);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_rejected() {
        assert!(matches!(detect_structure(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_chapters_case_insensitive() {
        let text = "CHAPTER 1 start. chapter 2 middle. Capitolo 3 fine.";
        let s = detect_structure(text).unwrap();
        let titles: Vec<&str> = s.chapter_matches.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["CHAPTER 1", "chapter 2", "Capitolo 3"]);
        assert_eq!(s.chapter_matches[0].offset, 0);
    }

    #[test]
    fn test_sections_must_start_a_line() {
        let text = "Intro\n§ 1\nBody\n  Sezione 2\nMore. See § 3 inline.";
        let s = detect_structure(text).unwrap();
        assert!(s.has_sections);
        assert!(!s.has_chapters);
        assert_eq!(s.section_matches.len(), 2);
        assert_eq!(s.section_matches[0].offset, 5);
        assert_eq!(s.section_matches[0].title, "§ 1");
        assert_eq!(s.section_matches[1].title, "Sezione 2");
    }

    #[test]
    fn test_paragraph_count() {
        let s = detect_structure("a\n\nb\n \nc\nd").unwrap();
        assert_eq!(s.total_paragraphs, 2);
    }

    #[test]
    fn test_plain_text_has_no_structure() {
        let s = detect_structure("Just one line of prose.").unwrap();
        assert!(!s.has_chapters);
        assert!(!s.has_sections);
        assert!(s.chapter_matches.is_empty());
    }

    #[test]
    fn test_check_against_rejects_foreign_text() {
        let s = detect_structure("Chapter 1 aaaa Chapter 2 bbbb").unwrap();
        assert!(s.check_against("Chapter 1 aaaa Chapter 2 bbbb").is_ok());
        assert!(s.check_against("short").is_err());
    }

    #[test]
    fn test_check_against_rejects_unordered_offsets() {
        let s = StructureDescriptor {
            has_chapters: true,
            chapter_matches: vec![
                Marker {
                    offset: 5,
                    title: "b".into(),
                },
                Marker {
                    offset: 2,
                    title: "a".into(),
                },
            ],
            ..Default::default()
        };
        assert!(s.check_against("0123456789").is_err());
    }
}
