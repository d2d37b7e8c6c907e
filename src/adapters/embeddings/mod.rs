//! Embedding model adapters.

pub mod local;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingModel;
use crate::infrastructure::http::HttpContext;

pub use local::LocalEncoder;
pub use ollama::OllamaEmbeddingModel;
pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingModel};

/// Resolve a provider identifier and model name to a model instance.
///
/// `config.api_key` is the credential for hosted providers; each provider
/// falls back to its own environment variable.
pub fn create_embedding_model(
    config: &EmbeddingConfig,
    http: &HttpContext,
) -> RagResult<Arc<dyn EmbeddingModel>> {
    match config.provider.to_lowercase().as_str() {
        "local" | "sentence-transformers" => Ok(Arc::new(LocalEncoder::new(&config.model))),
        "openai" => {
            let defaults = OpenAiEmbeddingConfig::default();
            let model = OpenAiEmbeddingModel::new(
                OpenAiEmbeddingConfig {
                    api_key: config.api_key.clone(),
                    base_url: config.base_url.clone().unwrap_or(defaults.base_url),
                    model: config.model.clone(),
                },
                http.clone(),
            )?;
            Ok(Arc::new(model))
        }
        "ollama" => Ok(Arc::new(OllamaEmbeddingModel::new(
            config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_OLLAMA_URL.to_string()),
            &config.model,
            http.clone(),
        ))),
        other => Err(RagError::Configuration(format!(
            "Unsupported embedding provider: {other}"
        ))),
    }
}
