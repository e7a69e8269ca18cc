//! Token budget for chunks.
//!
//! ## The Problem
//!
//! A model call has a context window. A chunk has to fit in it together with
//! the rolling summary and the instructions, so every chunk gets a hard token
//! ceiling. At the same time, chunks that are tiny waste calls:
//!
//! ```text
//! max = 6000, min = 1000, overlap = 500
//!
//! Chapter 1: 4200 tokens   -> one chunk, fits
//! Chapter 2: 9100 tokens   -> exceeds max, split into windows
//!                             [0..6000] [5500..9100]
//!                                  ↑ 500 tokens shared
//! Chapter 3:  300 tokens   -> below min (advisory only), kept as is
//! ```
//!
//! ## Max vs Min vs Overlap
//!
//! - `max`: The absolute ceiling. Never exceeded by any chunk.
//! - `min`: Advisory. Reported by [`TokenBudget::fits`] and counted by
//!   `ChunkBuilder::build`, never enforced.
//! - `overlap`: Tokens shared by adjacent sliding windows, so meaning at an
//!   arbitrary cut point survives in at least one window.

use std::cmp::Ordering;

/// Token limits for chunks: hard ceiling, advisory floor, window overlap.
///
/// # Examples
///
/// ```rust
/// use quire::TokenBudget;
///
/// let budget = TokenBudget::new(6000).with_overlap(500).unwrap();
/// assert_eq!(budget.max(), 6000);
/// assert_eq!(budget.step(), 5500);
/// assert!(budget.exceeds(6001));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    min: usize,
    max: usize,
    overlap: usize,
}

impl TokenBudget {
    /// Create a budget with the given ceiling, no floor, and no overlap.
    #[must_use]
    pub const fn new(max: usize) -> Self {
        Self {
            min: 0,
            max,
            overlap: 0,
        }
    }

    /// The advisory minimum chunk size.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// The hard maximum chunk size.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Tokens shared by adjacent sliding windows.
    #[must_use]
    pub const fn overlap(&self) -> usize {
        self.overlap
    }

    /// Tokens between the starts of adjacent sliding windows.
    #[must_use]
    pub const fn step(&self) -> usize {
        self.max - self.overlap
    }

    /// Set the advisory minimum.
    ///
    /// # Errors
    ///
    /// Returns an error if `min > max`.
    pub fn with_min(self, min: usize) -> Result<Self, TokenBudgetError> {
        if min > self.max {
            Err(TokenBudgetError::MinExceedsMax { min, max: self.max })
        } else {
            Ok(Self { min, ..self })
        }
    }

    /// Set the window overlap.
    ///
    /// # Errors
    ///
    /// Returns an error if `overlap >= max`.
    pub fn with_overlap(self, overlap: usize) -> Result<Self, TokenBudgetError> {
        if overlap >= self.max {
            Err(TokenBudgetError::OverlapExceedsMax {
                overlap,
                max: self.max,
            })
        } else {
            Ok(Self { overlap, ..self })
        }
    }

    /// Where a chunk of `tokens` sits relative to the budget.
    ///
    /// Returns:
    /// - `Ordering::Less`: below the advisory minimum
    /// - `Ordering::Equal`: within `min..=max`
    /// - `Ordering::Greater`: over the ceiling, must split
    #[must_use]
    pub fn fits(&self, tokens: usize) -> Ordering {
        if tokens < self.min {
            Ordering::Less
        } else if tokens > self.max {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Whether `tokens` is over the hard ceiling.
    #[must_use]
    pub fn exceeds(&self, tokens: usize) -> bool {
        tokens > self.max
    }
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            min: 1000,
            max: 6000,
            overlap: 500,
        }
    }
}

/// Error when configuring a token budget.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenBudgetError {
    /// The maximum must be positive.
    #[error("max tokens per chunk must be > 0")]
    ZeroMax,

    /// Min size must be <= max size.
    #[error("min ({min}) must be <= max ({max})")]
    MinExceedsMax {
        /// The requested minimum.
        min: usize,
        /// The ceiling it exceeded.
        max: usize,
    },

    /// Overlap must leave room for the window to advance.
    #[error("overlap ({overlap}) must be < max ({max})")]
    OverlapExceedsMax {
        /// The requested overlap.
        overlap: usize,
        /// The ceiling it reached.
        max: usize,
    },
}

impl TokenBudget {
    /// Build a budget from raw values, checking every constraint.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn try_from_parts(
        max: usize,
        min: usize,
        overlap: usize,
    ) -> Result<Self, TokenBudgetError> {
        if max == 0 {
            return Err(TokenBudgetError::ZeroMax);
        }
        Self::new(max).with_min(min)?.with_overlap(overlap)
    }
}

impl From<TokenBudgetError> for crate::Error {
    fn from(err: TokenBudgetError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
