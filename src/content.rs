//! Generated content types and their shape checks.
//!
//! Model responses are JSON, sometimes wrapped in markdown code fences.
//! [`parse_response`] strips the fences, deserializes into the kind's type,
//! and runs its [`Generated::validate`] check. Every failure, including a JSON
//! syntax error, is a [`Error::GenerationValidation`] and is never retried.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The seven kinds of book metadata the pipeline can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    /// Main + two secondary BISAC-style categories.
    Categories,
    /// Seven search keywords.
    Keywords,
    /// Three candidate cover scenes.
    Scenes,
    /// Back-cover copy.
    BackCover,
    /// Preface.
    Preface,
    /// Online store description.
    StoreDescription,
    /// Synopsis.
    Synopsis,
}

impl ContentKind {
    /// Every kind, in generation order.
    pub const ALL: [Self; 7] = [
        Self::Categories,
        Self::Keywords,
        Self::Scenes,
        Self::BackCover,
        Self::Preface,
        Self::StoreDescription,
        Self::Synopsis,
    ];

    /// The camelCase identifier used in JSON and cache keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Keywords => "keywords",
            Self::Scenes => "scenes",
            Self::BackCover => "backCover",
            Self::Preface => "preface",
            Self::StoreDescription => "storeDescription",
            Self::Synopsis => "synopsis",
        }
    }

    /// Whether this kind is generated once per chunk and then aggregated.
    #[must_use]
    pub fn is_per_chunk(self) -> bool {
        matches!(self, Self::Categories | Self::Keywords)
    }

    /// Sampling temperature for this kind.
    #[must_use]
    pub fn temperature(self) -> f32 {
        match self {
            Self::Keywords => 1.0,
            _ => 0.7,
        }
    }

    /// Completion token limit for this kind.
    #[must_use]
    pub fn max_tokens(self) -> u32 {
        match self {
            Self::Categories => 150,
            Self::Keywords => 250,
            Self::Preface => 1500,
            Self::Scenes | Self::BackCover | Self::StoreDescription | Self::Synopsis => 500,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Categories => "categories",
            Self::Keywords => "keywords",
            Self::Scenes => "scenes",
            Self::BackCover => "back cover",
            Self::Preface => "preface",
            Self::StoreDescription => "store description",
            Self::Synopsis => "synopsis",
        })
    }
}

/// A structured model answer with a fixed shape.
pub trait Generated: DeserializeOwned + Sized {
    /// The content kind this type answers.
    const KIND: ContentKind;

    /// Check the shape beyond what deserialization enforces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GenerationValidation`] describing the first defect.
    fn validate(&self) -> Result<()>;
}

fn require_text(kind: ContentKind, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(kind, format!("{field} is empty")));
    }
    Ok(())
}

/// Categories for a book (or one chunk of it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categories {
    /// The best-fitting category.
    pub main_category: String,
    /// Exactly two runner-up categories.
    pub secondary_categories: Vec<String>,
}

impl Generated for Categories {
    const KIND: ContentKind = ContentKind::Categories;

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "mainCategory", &self.main_category)?;
        if self.secondary_categories.len() != 2 {
            return Err(Error::validation(
                Self::KIND,
                format!(
                    "expected 2 secondary categories, got {}",
                    self.secondary_categories.len()
                ),
            ));
        }
        for category in &self.secondary_categories {
            require_text(Self::KIND, "secondary category", category)?;
        }
        Ok(())
    }
}

/// Number of keywords in a valid answer.
pub const KEYWORD_COUNT: usize = 7;

/// Search keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    /// Exactly seven non-empty keywords.
    pub keywords: Vec<String>,
}

impl Generated for Keywords {
    const KIND: ContentKind = ContentKind::Keywords;

    fn validate(&self) -> Result<()> {
        if self.keywords.len() != KEYWORD_COUNT {
            return Err(Error::validation(
                Self::KIND,
                format!(
                    "expected {KEYWORD_COUNT} keywords, got {}",
                    self.keywords.len()
                ),
            ));
        }
        for keyword in &self.keywords {
            require_text(Self::KIND, "keyword", keyword)?;
        }
        Ok(())
    }
}

/// One candidate cover scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Short title.
    pub title: String,
    /// Description detailed enough to illustrate.
    pub description: String,
}

/// Number of scenes in a valid answer.
pub const SCENE_COUNT: usize = 3;

/// Candidate cover scenes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenes {
    /// Exactly three scenes.
    pub scenes: Vec<Scene>,
}

impl Generated for Scenes {
    const KIND: ContentKind = ContentKind::Scenes;

    fn validate(&self) -> Result<()> {
        if self.scenes.len() != SCENE_COUNT {
            return Err(Error::validation(
                Self::KIND,
                format!("expected {SCENE_COUNT} scenes, got {}", self.scenes.len()),
            ));
        }
        for scene in &self.scenes {
            require_text(Self::KIND, "scene title", &scene.title)?;
            require_text(Self::KIND, "scene description", &scene.description)?;
        }
        Ok(())
    }
}

/// Back-cover copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackCover {
    /// The copy.
    pub back_cover: String,
}

impl Generated for BackCover {
    const KIND: ContentKind = ContentKind::BackCover;

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "backCover", &self.back_cover)
    }
}

/// A preface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preface {
    /// The preface text.
    pub preface: String,
}

impl Generated for Preface {
    const KIND: ContentKind = ContentKind::Preface;

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "preface", &self.preface)
    }
}

/// Online store description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDescription {
    /// The description.
    pub store_description: String,
}

impl Generated for StoreDescription {
    const KIND: ContentKind = ContentKind::StoreDescription;

    fn validate(&self) -> Result<()> {
        require_text(Self::KIND, "storeDescription", &self.store_description)
    }
}

/// Shortest synopsis accepted, in characters.
pub const MIN_SYNOPSIS_CHARS: usize = 100;

/// A synopsis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synopsis {
    /// The synopsis text.
    pub synopsis: String,
}

impl Generated for Synopsis {
    const KIND: ContentKind = ContentKind::Synopsis;

    fn validate(&self) -> Result<()> {
        let chars = self.synopsis.chars().count();
        if chars < MIN_SYNOPSIS_CHARS {
            return Err(Error::validation(
                Self::KIND,
                format!("synopsis has {chars} chars, need at least {MIN_SYNOPSIS_CHARS}"),
            ));
        }
        Ok(())
    }
}

/// Remove markdown code-fence delimiters (```` ```json ```` and ```` ``` ````).
#[must_use]
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the info string (`json`, `JSON`, ...) on the opening line.
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    }
    text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Parse a raw model response as `T` and validate it.
///
/// # Errors
///
/// Returns [`Error::GenerationValidation`] if the response is not JSON, does
/// not have `T`'s fields, or fails `T`'s shape check.
pub fn parse_response<T: Generated>(raw: &str) -> Result<T> {
    let value: T = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| Error::validation(T::KIND, format!("unparseable response: {e}")))?;
    value.validate()?;
    Ok(value)
}
