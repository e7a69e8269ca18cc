//! Generation orchestration.
//!
//! Two call patterns:
//!
//! ```text
//! whole-context (scenes, back cover, preface, store description, synopsis)
//!     summary ───────────────> 1 model call ──> parse + validate
//!
//! per-chunk (categories, keywords)
//!     summary + chunk 0 ──┐
//!     summary + chunk 1 ──┼──> N model calls ──> parse + validate each
//!     summary + chunk 2 ──┘                       └──> aggregate ──> validate
//! ```
//!
//! Per-chunk calls run up to `max_concurrent_requests` at a time but their
//! answers are collected in chunk order, so aggregation is deterministic.
//! Only the model call is retried; a response that fails to parse or
//! validate fails the whole generation immediately.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate_categories, aggregate_keywords};
use crate::chunk::Chunk;
use crate::config::PipelineConfig;
use crate::content::{
    parse_response, BackCover, Categories, ContentKind, Generated, Keywords, Preface, Scenes,
    StoreDescription, Synopsis,
};
use crate::error::{Error, Result};
use crate::model::{ModelClient, ModelRequest};
use crate::prompts;
use crate::retry::RetryPolicy;
use crate::summary::RollingSummary;
use crate::tokens::TokenEstimator;

/// A validated result of any content kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum GeneratedMetadata {
    /// Aggregated categories.
    Categories(Categories),
    /// Aggregated keywords.
    Keywords(Keywords),
    /// Cover scenes.
    Scenes(Scenes),
    /// Back-cover copy.
    BackCover(BackCover),
    /// Preface.
    Preface(Preface),
    /// Store description.
    StoreDescription(StoreDescription),
    /// Synopsis.
    Synopsis(Synopsis),
}

impl GeneratedMetadata {
    /// The kind of content held.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Categories(_) => ContentKind::Categories,
            Self::Keywords(_) => ContentKind::Keywords,
            Self::Scenes(_) => ContentKind::Scenes,
            Self::BackCover(_) => ContentKind::BackCover,
            Self::Preface(_) => ContentKind::Preface,
            Self::StoreDescription(_) => ContentKind::StoreDescription,
            Self::Synopsis(_) => ContentKind::Synopsis,
        }
    }
}

/// Issues model calls and turns the answers into validated metadata.
#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn ModelClient>,
    retry: RetryPolicy,
    estimator: TokenEstimator,
    request_token_limit: usize,
    max_tokens_for_request: usize,
    concurrency: usize,
}

impl Generator {
    /// Create a generator over `client`.
    #[must_use]
    pub fn new(
        client: Arc<dyn ModelClient>,
        estimator: TokenEstimator,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            client,
            retry: RetryPolicy::from_config(config),
            estimator,
            request_token_limit: config.request_token_limit,
            max_tokens_for_request: config.max_tokens_for_request,
            concurrency: config.max_concurrent_requests.max(1),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Generate any content kind.
    ///
    /// `chunks` are only read for per-chunk kinds.
    ///
    /// # Errors
    ///
    /// See the kind-specific methods.
    pub async fn generate(
        &self,
        kind: ContentKind,
        chunks: &[Chunk],
        summary: &RollingSummary,
    ) -> Result<GeneratedMetadata> {
        Ok(match kind {
            ContentKind::Categories => {
                GeneratedMetadata::Categories(self.generate_categories(chunks, summary).await?)
            }
            ContentKind::Keywords => {
                GeneratedMetadata::Keywords(self.generate_keywords(chunks, summary).await?)
            }
            ContentKind::Scenes => GeneratedMetadata::Scenes(self.generate_scenes(summary).await?),
            ContentKind::BackCover => {
                GeneratedMetadata::BackCover(self.generate_back_cover(summary).await?)
            }
            ContentKind::Preface => {
                GeneratedMetadata::Preface(self.generate_preface(summary).await?)
            }
            ContentKind::StoreDescription => GeneratedMetadata::StoreDescription(
                self.generate_store_description(summary).await?,
            ),
            ContentKind::Synopsis => {
                GeneratedMetadata::Synopsis(self.generate_synopsis(summary).await?)
            }
        })
    }

    /// One categories call per chunk, aggregated by weighted vote.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for no chunks, [`Error::GenerationValidation`]
    /// for a bad answer or too few distinct categories, or the model error
    /// that exhausted the retries.
    pub async fn generate_categories(
        &self,
        chunks: &[Chunk],
        summary: &RollingSummary,
    ) -> Result<Categories> {
        let answers: Vec<Categories> = self.per_chunk(chunks, summary).await?;
        let result = aggregate_categories(&answers)?;
        tracing::info!(
            answers = answers.len(),
            main = %result.main_category,
            "aggregated categories"
        );
        Ok(result)
    }

    /// One keywords call per chunk, aggregated by frequency.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for no chunks, [`Error::GenerationValidation`]
    /// for a bad answer or fewer than seven distinct keywords, or the model
    /// error that exhausted the retries.
    pub async fn generate_keywords(
        &self,
        chunks: &[Chunk],
        summary: &RollingSummary,
    ) -> Result<Keywords> {
        let answers: Vec<Keywords> = self.per_chunk(chunks, summary).await?;
        let result = aggregate_keywords(&answers)?;
        tracing::info!(answers = answers.len(), "aggregated keywords");
        Ok(result)
    }

    /// Three cover scenes from the summary.
    ///
    /// # Errors
    ///
    /// [`Error::GenerationValidation`] unless exactly three complete scenes
    /// come back, or the model error that exhausted the retries.
    pub async fn generate_scenes(&self, summary: &RollingSummary) -> Result<Scenes> {
        self.whole(summary).await
    }

    /// Back-cover copy from the summary.
    ///
    /// # Errors
    ///
    /// As [`Generator::generate_scenes`].
    pub async fn generate_back_cover(&self, summary: &RollingSummary) -> Result<BackCover> {
        self.whole(summary).await
    }

    /// Preface from the summary.
    ///
    /// # Errors
    ///
    /// As [`Generator::generate_scenes`].
    pub async fn generate_preface(&self, summary: &RollingSummary) -> Result<Preface> {
        self.whole(summary).await
    }

    /// Store description from the summary.
    ///
    /// # Errors
    ///
    /// As [`Generator::generate_scenes`].
    pub async fn generate_store_description(
        &self,
        summary: &RollingSummary,
    ) -> Result<StoreDescription> {
        self.whole(summary).await
    }

    /// Synopsis from the summary.
    ///
    /// # Errors
    ///
    /// As [`Generator::generate_scenes`].
    pub async fn generate_synopsis(&self, summary: &RollingSummary) -> Result<Synopsis> {
        self.whole(summary).await
    }

    async fn whole<T: Generated>(&self, summary: &RollingSummary) -> Result<T> {
        let kind = T::KIND;
        let result = self.request(summary.summary_text.clone()).await?;
        tracing::info!(%kind, "generated content");
        Ok(result)
    }

    async fn per_chunk<T: Generated>(
        &self,
        chunks: &[Chunk],
        summary: &RollingSummary,
    ) -> Result<Vec<T>> {
        let kind = T::KIND;
        if chunks.is_empty() {
            return Err(Error::invalid_input(format!(
                "chunks are required to generate {kind}"
            )));
        }

        let selected = self
            .estimator
            .take_within_budget(chunks, self.max_tokens_for_request);
        tracing::debug!(
            %kind,
            chunks = chunks.len(),
            selected = selected.len(),
            concurrency = self.concurrency,
            "starting per-chunk generation"
        );

        stream::iter(selected)
            .map(|chunk| self.request::<T>(chunk_context(summary, chunk)))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn request<T: Generated>(&self, context: String) -> Result<T> {
        let kind = T::KIND;
        let context = self
            .estimator
            .truncate(&context, self.request_token_limit, kind.as_str());
        let request = ModelRequest::new(kind, prompts::system_instructions(kind), context);

        let client = &self.client;
        let request = &request;
        let raw = self
            .retry
            .run(move || async move { client.complete(request).await.map_err(Error::from) })
            .await?;

        parse_response(&raw)
    }
}

fn chunk_context(summary: &RollingSummary, chunk: &Chunk) -> String {
    let heading = match chunk.title() {
        Some(title) => format!("Excerpt ({title})"),
        None => "Excerpt".to_string(),
    };
    format!(
        "Summary of the whole book:\n{}\n\n{heading}:\n{}",
        summary.summary_text, chunk.text
    )
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("retry", &self.retry)
            .field("estimator", &self.estimator)
            .field("request_token_limit", &self.request_token_limit)
            .field("max_tokens_for_request", &self.max_tokens_for_request)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
