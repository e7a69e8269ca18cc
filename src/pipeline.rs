//! The end-to-end flow: detect, chunk, summarize, generate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::ChunkBuilder;
use crate::chunk::Chunk;
use crate::config::PipelineConfig;
use crate::content::ContentKind;
use crate::error::{Error, Result};
use crate::generate::{GeneratedMetadata, Generator};
use crate::model::ModelClient;
use crate::structure::{detect_structure, StructureDescriptor};
use crate::summary::{RollingSummarizer, RollingSummary};
use crate::tokens::TokenEstimator;

/// Everything derived from a manuscript at upload time.
///
/// The caller persists this next to the document; generation only needs
/// the chunks and the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedDocument {
    /// Detected chapter and section markers.
    pub structure: StructureDescriptor,
    /// Chunks in document order.
    pub chunks: Vec<Chunk>,
    /// Rolling summary of `chunks`.
    pub summary: RollingSummary,
}

/// A configured pipeline.
///
/// ```rust
/// use quire::{Pipeline, PipelineConfig};
///
/// let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
/// let doc = pipeline
///     .prepare("Chapter 1\nA beginning.\n\nChapter 2\nAn end.")
///     .unwrap();
///
/// assert!(doc.structure.has_chapters);
/// assert_eq!(doc.chunks.len(), 2);
/// assert_eq!(doc.summary.processed_chunk_count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    estimator: TokenEstimator,
    builder: ChunkBuilder,
    summarizer: RollingSummarizer,
    generator: Option<Generator>,
}

impl Pipeline {
    /// Build a pipeline without a model client (preparation only).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let estimator = TokenEstimator::from_config(&config);
        Self::with_estimator(config, estimator)
    }

    /// Build a pipeline around a specific estimator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn with_estimator(config: PipelineConfig, estimator: TokenEstimator) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: ChunkBuilder::from_config(&config, estimator.clone())?,
            summarizer: RollingSummarizer::from_config(&config, estimator.clone()),
            estimator,
            config,
            generator: None,
        })
    }

    /// Attach a model client for [`Pipeline::generate`].
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.generator = Some(Generator::new(client, self.estimator.clone(), &self.config));
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The token estimator in use.
    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// The generator, if a client is attached.
    pub fn generator(&self) -> Option<&Generator> {
        self.generator.as_ref()
    }

    /// Detect structure, chunk, and summarize `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `text` is empty.
    pub fn prepare(&self, text: &str) -> Result<PreparedDocument> {
        let structure = detect_structure(text)?;
        let chunks = self.builder.build(text, &structure)?;
        let summary = self.summarizer.summarize(&chunks)?;
        Ok(PreparedDocument {
            structure,
            chunks,
            summary,
        })
    }

    /// Generate one kind of metadata for a prepared document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no client is attached, otherwise
    /// whatever the generation of `kind` returns.
    pub async fn generate(
        &self,
        kind: ContentKind,
        document: &PreparedDocument,
    ) -> Result<GeneratedMetadata> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| Error::invalid_config("no model client attached to the pipeline"))?;
        generator
            .generate(kind, &document.chunks, &document.summary)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::with_estimator(PipelineConfig::default(), TokenEstimator::heuristic(4)).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            overlap_tokens: 10_000,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_prepare_empty_text() {
        assert!(matches!(
            pipeline().prepare(""),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prepared_document_round_trips_through_json() {
        let doc = pipeline().prepare("Chapter 1 a\n\nChapter 2 b").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let back: PreparedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert!(json.contains("\"processedChunkCount\":2"));
    }

    #[tokio::test]
    async fn test_generate_without_client() {
        let p = pipeline();
        let doc = p.prepare("some text").unwrap();
        let err = p.generate(ContentKind::Synopsis, &doc).await.unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
