//! # quire
//!
//! Manuscript chunking, rolling summaries, and LLM metadata generation for
//! books.
//!
//! ## The Problem
//!
//! A novel is 300,000 characters. A model request fits a fraction of that.
//! To get categories, keywords, a blurb, or a synopsis out of a model, the
//! manuscript has to be split into pieces the model can read, and the
//! answers for those pieces have to be folded back into one.
//!
//! Splitting every N characters works, but books have structure: a chapter
//! is a natural unit of meaning, and cutting one in half loses context. And
//! no single piece knows what the whole book is about.
//!
//! ## The Pipeline
//!
//! ```text
//! raw text
//!    │
//!    ▼
//! detect_structure ──> StructureDescriptor   (chapter / section markers)
//!    │
//!    ▼
//! ChunkBuilder     ──> Vec<Chunk>            (chapters, sections, or windows)
//!    │
//!    ▼
//! RollingSummarizer ─> RollingSummary        (head + marker + tail)
//!    │
//!    ▼
//! Generator        ──> validated metadata    (one call, or per chunk + vote)
//! ```
//!
//! ### Structure First
//!
//! `Chapter 3`, `Capitolo 3`, `§ 2`, `Sezione 2`, `Section 2`: if chapter
//! markers exist, each chapter is a chunk. Otherwise sections. Otherwise a
//! sliding window with overlap. Any chapter over the token ceiling is
//! subdivided with the same window, so no chunk ever exceeds it.
//!
//! ### One Summary, Shared
//!
//! Every model call sees the rolling summary, a bounded digest that keeps
//! the opening and the ending of the book. Holistic outputs (scenes, back
//! cover, preface, store description, synopsis) use the summary alone.
//! Categories and keywords are asked per chunk with the summary as shared
//! context, then tallied:
//!
//! ```text
//! categories: main = 2 points, secondary = 1 point, top 3 win
//! keywords:   1 point per mention, top 7 win
//! ties:       earliest chunk wins
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use quire::{detect_structure, ChunkBuilder, RollingSummarizer, TokenBudget, TokenEstimator};
//!
//! let text = "Chapter 1\nThe ship left port.\n\nChapter 2\nThe storm hit.";
//! let estimator = TokenEstimator::heuristic(4);
//!
//! let structure = detect_structure(text).unwrap();
//! let chunks = ChunkBuilder::new(TokenBudget::default(), estimator.clone())
//!     .build(text, &structure)
//!     .unwrap();
//! let summary = RollingSummarizer::new(6000, estimator).summarize(&chunks).unwrap();
//!
//! assert_eq!(chunks.len(), 2);
//! assert!(summary.summary_text.contains("The storm hit."));
//! ```
//!
//! ## Generation
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quire::{ContentKind, OpenAiClient, Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::from_env())?
//!     .with_client(Arc::new(OpenAiClient::from_env()?));
//! let doc = pipeline.prepare(&manuscript)?;
//! let keywords = pipeline.generate(ContentKind::Keywords, &doc).await?;
//! ```
//!
//! Model calls are retried on transport failures (with doubling delays on
//! rate limits) and never on content-policy refusals or malformed answers.
//!
//! ## Features
//!
//! | Feature | Default | Adds |
//! |---------|---------|------|
//! | `tiktoken` | yes | exact `o200k_base` token counts |
//! | `openai` | no | [`OpenAiClient`] over `reqwest` |

mod aggregate;
mod budget;
mod builder;
mod cache;
mod chunk;
mod config;
mod content;
mod error;
mod generate;
mod model;
mod pipeline;
mod prompts;
mod retry;
mod structure;
mod summary;
mod tokens;
mod window;

#[cfg(feature = "openai")]
mod openai;

pub use aggregate::{aggregate_categories, aggregate_keywords};
pub use budget::{TokenBudget, TokenBudgetError};
pub use builder::ChunkBuilder;
pub use cache::{TruncationCache, TruncationKey};
pub use chunk::Chunk;
pub use config::{load_dotenv, PipelineConfig};
pub use content::{
    parse_response, strip_code_fences, BackCover, Categories, ContentKind, Generated, Keywords,
    Preface, Scene, Scenes, StoreDescription, Synopsis, KEYWORD_COUNT, MIN_SYNOPSIS_CHARS,
    SCENE_COUNT,
};
pub use error::{Error, Result, RetryClass, TransportClass};
pub use generate::{GeneratedMetadata, Generator};
pub use model::{ModelClient, ModelError, ModelErrorKind, ModelRequest, CONTENT_POLICY_MESSAGE};
pub use pipeline::{Pipeline, PreparedDocument};
pub use prompts::system_instructions;
pub use retry::RetryPolicy;
pub use structure::{detect_structure, Marker, StructureDescriptor};
pub use summary::{RollingSummarizer, RollingSummary, ELISION_MARKER};
pub use tokens::{TokenEstimator, Tokenizer, TokenizerError};
pub use window::WindowChunker;

#[cfg(feature = "tiktoken")]
pub use tokens::TiktokenTokenizer;

#[cfg(feature = "openai")]
pub use openai::{OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
