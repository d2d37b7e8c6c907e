//! Embedding provider: uniform `embed(texts) -> matrix` over any model.
//!
//! Resolves the output dimension once at initialization (declared or probed)
//! and enforces it on every vector produced afterwards. Single-call models
//! are driven with bounded concurrency; batch models get the whole slice.

use std::slice;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, instrument};

use crate::adapters::embeddings::create_embedding_model;
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{EmbeddingConfig, EmbeddingMatrix, EmbeddingVector};
use crate::domain::ports::EmbeddingModel;
use crate::infrastructure::http::HttpContext;

const DIMENSION_PROBE: &str = "dimension probe";

/// A model paired with its resolved output dimension.
#[derive(Clone)]
pub struct EmbeddingProvider {
    model: Arc<dyn EmbeddingModel>,
    dimension: usize,
    max_concurrency: usize,
}

impl EmbeddingProvider {
    /// Wrap `model`, resolving its dimension.
    ///
    /// Models that do not declare a dimension are probed with one call.
    /// A failed probe or a zero width is an `EmbeddingError`.
    #[instrument(skip_all, fields(provider = model.provider(), model = model.model_name()))]
    pub async fn initialize(
        model: Arc<dyn EmbeddingModel>,
        max_concurrency: usize,
    ) -> RagResult<Self> {
        let dimension = match model.declared_dimension() {
            Some(dimension) => dimension,
            None => {
                let rows = model
                    .embed_raw(&[DIMENSION_PROBE.to_string()])
                    .await
                    .map_err(|e| {
                        RagError::Embedding(format!(
                            "could not determine dimension of {} model '{}': {e}",
                            model.provider(),
                            model.model_name()
                        ))
                    })?
                    .into_rows();
                rows.first().map_or(0, Vec::len)
            }
        };

        if dimension == 0 {
            return Err(RagError::Embedding(format!(
                "{} model '{}' reported no embedding dimension",
                model.provider(),
                model.model_name()
            )));
        }
        debug!(dimension, "embedding provider ready");

        Ok(Self {
            model,
            dimension,
            max_concurrency: max_concurrency.max(1),
        })
    }

    /// Build the configured model and initialize it.
    pub async fn from_config(config: &EmbeddingConfig, http: &HttpContext) -> RagResult<Self> {
        let model = create_embedding_model(config, http)?;
        Self::initialize(model, config.max_concurrency).await
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn is_single_call(&self) -> bool {
        self.model.is_single_call()
    }

    pub fn provider_name(&self) -> &'static str {
        self.model.provider()
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Embed `texts` into an `n x dimension` matrix, in input order.
    pub async fn embed(&self, texts: &[String]) -> RagResult<EmbeddingMatrix> {
        if texts.is_empty() {
            return Ok(EmbeddingMatrix::new(self.dimension));
        }
        let rows = if self.model.is_single_call() {
            stream::iter(texts.iter().cloned())
                .map(|text| self.call_single(text))
                .buffered(self.max_concurrency)
                .try_collect::<Vec<_>>()
                .await?
        } else {
            let rows = self.model.embed_raw(texts).await?.into_rows();
            if rows.len() != texts.len() {
                return Err(RagError::Embedding(format!(
                    "model returned {} vectors for {} texts",
                    rows.len(),
                    texts.len()
                )));
            }
            rows
        };
        EmbeddingMatrix::from_rows(self.dimension, rows)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> RagResult<EmbeddingVector> {
        let row = self.call_single(text.to_string()).await?;
        self.check_width(&row)?;
        Ok(row)
    }

    /// Embed each text independently so one failure does not sink the rest.
    pub async fn embed_each(&self, texts: &[String]) -> Vec<RagResult<EmbeddingVector>> {
        stream::iter(texts.iter().cloned())
            .map(|text| async move {
                let row = self.call_single(text).await?;
                self.check_width(&row)?;
                Ok(row)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    async fn call_single(&self, text: String) -> RagResult<EmbeddingVector> {
        let mut rows = self
            .model
            .embed_raw(slice::from_ref(&text))
            .await?
            .into_rows();
        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(RagError::Embedding(format!(
                "model returned {n} vectors for one text"
            ))),
        }
    }

    fn check_width(&self, row: &[f32]) -> RagResult<()> {
        if row.len() == self.dimension {
            Ok(())
        } else {
            Err(RagError::Embedding(format!(
                "vector has {} dimensions, expected {}",
                row.len(),
                self.dimension
            )))
        }
    }
}
