//! Folding per-chunk answers into one.
//!
//! Both aggregations are weighted frequency tallies. Entries are ranked by
//! total weight, and entries with equal weight keep the order in which they
//! were first seen. Inputs arrive in chunk order, so ties always resolve to
//! the earliest chunk no matter when its model call finished.
//!
//! ```text
//! chunk 0: main A, secondary [B, C]    A=2 B=1 C=1
//! chunk 1: main A, secondary [B, D]    A=4 B=2 C=1 D=1
//!
//! -> main A, secondary [B, C]          (C seen before D)
//! ```

use std::collections::HashMap;

use crate::content::{Categories, ContentKind, Keywords, KEYWORD_COUNT};
use crate::error::{Error, Result};

const MAIN_WEIGHT: usize = 2;
const SECONDARY_WEIGHT: usize = 1;

/// Weighted counts in first-seen order.
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn add(&mut self, label: &str, weight: usize) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        match self.index.get(label) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(label.to_string(), self.entries.len());
                self.entries.push((label.to_string(), weight));
            }
        }
    }

    /// Labels by descending weight. `sort_by` is stable, so ties stay in
    /// first-seen order.
    fn ranked(mut self) -> Vec<String> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.into_iter().map(|(label, _)| label).collect()
    }
}

/// Combine per-chunk category answers into one.
///
/// # Errors
///
/// Returns [`Error::GenerationValidation`] if fewer than three distinct
/// categories were suggested across all answers.
pub fn aggregate_categories(results: &[Categories]) -> Result<Categories> {
    let mut tally = Tally::default();
    for result in results {
        tally.add(&result.main_category, MAIN_WEIGHT);
        for secondary in &result.secondary_categories {
            tally.add(secondary, SECONDARY_WEIGHT);
        }
    }

    let mut ranked = tally.ranked().into_iter();
    match (ranked.next(), ranked.next(), ranked.next()) {
        (Some(main), Some(second), Some(third)) => Ok(Categories {
            main_category: main,
            secondary_categories: vec![second, third],
        }),
        _ => Err(Error::validation(
            ContentKind::Categories,
            format!(
                "need 3 distinct categories across {} answers",
                results.len()
            ),
        )),
    }
}

/// Combine per-chunk keyword answers into the seven most frequent.
///
/// # Errors
///
/// Returns [`Error::GenerationValidation`] if fewer than seven distinct
/// keywords were suggested across all answers.
pub fn aggregate_keywords(results: &[Keywords]) -> Result<Keywords> {
    let mut tally = Tally::default();
    for keyword in results.iter().flat_map(|r| &r.keywords) {
        tally.add(keyword, 1);
    }

    let ranked = tally.ranked();
    if ranked.len() < KEYWORD_COUNT {
        return Err(Error::validation(
            ContentKind::Keywords,
            format!(
                "need {KEYWORD_COUNT} distinct keywords, got {}",
                ranked.len()
            ),
        ));
    }

    Ok(Keywords {
        keywords: ranked.into_iter().take(KEYWORD_COUNT).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cats(main: &str, a: &str, b: &str) -> Categories {
        Categories {
            main_category: main.into(),
            secondary_categories: vec![a.into(), b.into()],
        }
    }

    fn kws(words: &[&str]) -> Keywords {
        Keywords {
            keywords: words.iter().map(|w| (*w).to_string()).collect(),
        }
    }

    #[test]
    fn test_main_weight_dominates() {
        let result = aggregate_categories(&[cats("A", "B", "C"), cats("A", "B", "D")]).unwrap();
        assert_eq!(result.main_category, "A");
        assert_eq!(result.secondary_categories, ["B", "C"]);
    }

    #[test]
    fn test_ties_follow_first_seen() {
        let result = aggregate_categories(&[cats("X", "Y", "Z"), cats("Y", "X", "W")]).unwrap();
        // X = 3, Y = 3, Z = 1, W = 1
        assert_eq!(result.main_category, "X");
        assert_eq!(result.secondary_categories, ["Y", "Z"]);
    }

    #[test]
    fn test_labels_are_trimmed() {
        let result = aggregate_categories(&[
            cats("Fantasy ", "Epic", "Young"),
            cats(" Fantasy", "Epic", "Old"),
        ])
        .unwrap();
        assert_eq!(result.main_category, "Fantasy");
        assert_eq!(result.secondary_categories, ["Epic", "Young"]);
    }

    #[test]
    fn test_single_answer_passes_through() {
        let result = aggregate_categories(&[cats("A", "B", "C")]).unwrap();
        assert_eq!(result, cats("A", "B", "C"));
    }

    #[test]
    fn test_too_few_categories() {
        assert!(aggregate_categories(&[cats("A", "A", "B")]).is_err());
        assert!(aggregate_categories(&[]).is_err());
    }

    #[test]
    fn test_shared_keyword_survives() {
        let results = [
            kws(&["Forest", "a1", "a2", "a3", "a4", "a5", "a6"]),
            kws(&["b1", "b2", "b3", "Forest", "b4", "b5", "b6"]),
            kws(&["c1", "c2", "c3", "c4", "c5", "c6", "Forest"]),
        ];
        let result = aggregate_keywords(&results).unwrap();
        assert_eq!(result.keywords.len(), 7);
        assert_eq!(result.keywords[0], "Forest");
        // The rest are ties, taken in chunk order.
        assert_eq!(result.keywords[1..], ["a1", "a2", "a3", "a4", "a5", "a6"]);
    }

    #[test]
    fn test_too_few_keywords() {
        let results = [kws(&["a", "b", "c", "d", "e", "f", "a"])];
        let err = aggregate_keywords(&results).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid keywords generated: need 7 distinct keywords, got 6"
        );
    }
}
