//! Coverage and boundary tests for manuscript chunking.
//!
//! These tests verify that chunks land on chapter and section markers,
//! that oversized chapters are fully covered by their sub-chunks, and that
//! preparation wires detection, chunking, and summarizing together.

use quire::{
    detect_structure, ChunkBuilder, Pipeline, PipelineConfig, TokenBudget, TokenEstimator,
    ELISION_MARKER,
};

/// `len` bytes of ASCII prose with no digits and no newlines.
fn filler(len: usize) -> String {
    "the river bends past the old mill and on toward the sea "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

/// A chapter starting with `Chapter {n}` that is exactly `len` bytes long.
fn chapter(n: usize, len: usize) -> String {
    let heading = format!("Chapter {n}\n");
    format!("{heading}{}", filler(len - heading.len()))
}

// =============================================================================
// Chapters
// =============================================================================

#[test]
fn three_chapters_at_known_offsets() {
    let text = [chapter(1, 15_000), chapter(2, 20_000), chapter(3, 15_000)].concat();
    assert_eq!(text.len(), 50_000);

    let structure = detect_structure(&text).unwrap();
    assert!(structure.has_chapters);
    let offsets: Vec<usize> = structure.chapter_matches.iter().map(|m| m.offset).collect();
    assert_eq!(offsets, [0, 15_000, 35_000]);

    let chunks = ChunkBuilder::new(TokenBudget::default(), TokenEstimator::heuristic(4))
        .build(&text, &structure)
        .unwrap();

    assert_eq!(chunks.len(), 3);
    let spans: Vec<_> = chunks.iter().map(|c| c.span().unwrap()).collect();
    assert_eq!(spans, [0..15_000, 15_000..35_000, 35_000..50_000]);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chapter_title, Some(format!("Chapter {}", i + 1)));
        assert!(!chunk.is_sub_chunk);
        assert!(chunk.token_count <= 6000);
    }
}

#[test]
fn oversized_chapter_sub_chunks_cover_it() {
    let text = [chapter(1, 2_000), chapter(2, 30_000), chapter(3, 1_000)].concat();
    let structure = detect_structure(&text).unwrap();

    let budget = TokenBudget::new(1000).with_overlap(100).unwrap();
    let chunks = ChunkBuilder::new(budget, TokenEstimator::heuristic(4))
        .build(&text, &structure)
        .unwrap();

    let subs: Vec<_> = chunks
        .iter()
        .filter(|c| c.chapter_title.as_deref() == Some("Chapter 2"))
        .collect();
    assert!(subs.len() > 1);
    assert!(subs.iter().all(|c| c.is_sub_chunk && c.token_count <= 1000));

    // Sub-chunks start at the chapter, end at the next one, and overlap.
    assert_eq!(subs[0].start_offset, Some(2_000));
    assert_eq!(subs.last().unwrap().end_offset, Some(32_000));
    for pair in subs.windows(2) {
        assert!(pair[1].start_offset < pair[0].end_offset);
    }

    // Chapters 1 and 3 fit and stay whole.
    assert_eq!(chunks[0].span(), Some(0..2_000));
    assert_eq!(chunks.last().unwrap().span(), Some(32_000..33_000));
}

#[test]
fn italian_chapter_markers() {
    let text = format!(
        "Capitolo 1\n{}\nCapitolo 2\n{}",
        filler(300),
        filler(300)
    );
    let structure = detect_structure(&text).unwrap();
    let titles: Vec<&str> = structure
        .chapter_matches
        .iter()
        .map(|m| m.title.as_str())
        .collect();
    assert_eq!(titles, ["Capitolo 1", "Capitolo 2"]);
}

// =============================================================================
// Sections and windows
// =============================================================================

#[test]
fn sections_without_chapters() {
    let text = format!(
        "Preface text\n§ 1\n{}\nSezione 2\n{}\nSection 3\n{}",
        filler(200),
        filler(200),
        filler(200)
    );
    let structure = detect_structure(&text).unwrap();
    assert!(!structure.has_chapters);
    assert_eq!(structure.section_matches.len(), 3);

    let chunks = ChunkBuilder::new(TokenBudget::default(), TokenEstimator::heuristic(4))
        .build(&text, &structure)
        .unwrap();
    let titles: Vec<Option<&str>> = chunks.iter().map(|c| c.section_title.as_deref()).collect();
    assert_eq!(titles, [None, Some("§ 1"), Some("Sezione 2"), Some("Section 3")]);

    // Contiguous, no overlap, full coverage.
    assert_eq!(chunks[0].start_offset, Some(0));
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end_offset, pair[1].start_offset);
    }
    assert_eq!(chunks.last().unwrap().end_offset, Some(text.len()));
}

#[test]
fn unstructured_text_uses_overlapping_windows() {
    let text = filler(50_000);
    let structure = detect_structure(&text).unwrap();

    let chunks = ChunkBuilder::new(TokenBudget::default(), TokenEstimator::heuristic(4))
        .build(&text, &structure)
        .unwrap();

    let spans: Vec<_> = chunks.iter().map(|c| c.span().unwrap()).collect();
    assert_eq!(spans, [0..24_000, 22_000..46_000, 44_000..50_000]);
}

// =============================================================================
// Preparation
// =============================================================================

#[test]
fn prepare_long_manuscript() {
    let text = (1..=12).map(|n| chapter(n, 5_000)).collect::<String>();
    let config = PipelineConfig {
        summary_max_length: 3000,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::with_estimator(config, TokenEstimator::heuristic(4)).unwrap();

    let doc = pipeline.prepare(&text).unwrap();

    assert_eq!(doc.chunks.len(), 12);
    assert_eq!(doc.summary.processed_chunk_count, 12);
    let summary = &doc.summary.summary_text;
    assert!(summary.chars().count() <= 3000);
    assert!(summary.starts_with("Chapter 1\n"));
    assert!(summary.contains(ELISION_MARKER));
    assert!(!summary.contains("Chapter 6"));
}
