//! CLI command implementations.

pub mod backends;
pub mod ingest;
pub mod init;
pub mod query;
pub mod summarize;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::adapters::charts::JsonChartExtractor;
use crate::adapters::generation::GenerationRouter;
use crate::adapters::vector_stores::VectorStoreFactory;
use crate::domain::models::{parse_overrides, BackendOptions, Config, IndexTarget};
use crate::infrastructure::http::HttpContext;
use crate::services::{EmbeddingProvider, IndexService, RetrievalPipeline};

/// Backend selection flags shared by the data commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Vector store backend (faiss, milvus, pinecone, qdrant, weaviate)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// JSON object of backend options overriding the configured defaults
    #[arg(long = "db-config")]
    pub db_config: Option<String>,
}

impl TargetArgs {
    pub fn to_target(&self, config: &Config) -> Result<IndexTarget> {
        let backend = self
            .backend
            .clone()
            .unwrap_or_else(|| config.retrieval.backend.clone());
        let overrides = match &self.db_config {
            Some(raw) => parse_overrides(raw).context("Invalid --db-config")?,
            None => BackendOptions::new(),
        };
        Ok(IndexTarget::new(backend).with_overrides(overrides))
    }
}

/// Services wired from configuration, shared by the data commands.
pub struct AppContext {
    pub config: Config,
    pub http: HttpContext,
    pub index_service: Arc<IndexService>,
    pub pipeline: RetrievalPipeline,
}

impl AppContext {
    pub fn build(config: Config) -> Result<Self> {
        let http = HttpContext::from_config(&config.http)?;
        let factory = VectorStoreFactory::new(config.vector_databases.clone(), http.clone());
        let index_service = Arc::new(IndexService::new(&config.data_dir, factory));
        let generator = Arc::new(GenerationRouter::from_config(&config.generation, &http));
        let charts = Arc::new(JsonChartExtractor::new(&config.charts_dir));
        let pipeline = RetrievalPipeline::new(Arc::clone(&index_service), generator, charts);

        Ok(Self {
            config,
            http,
            index_service,
            pipeline,
        })
    }

    /// Initialize the configured embedding model.
    pub async fn embedding_provider(&self) -> Result<EmbeddingProvider> {
        EmbeddingProvider::from_config(&self.config.embedding, &self.http)
            .await
            .context("Failed to initialize embedding model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_defaults_to_configured_backend() {
        let target = TargetArgs::default().to_target(&Config::default()).unwrap();
        assert_eq!(target.backend, "faiss");
        assert!(target.overrides.is_empty());
    }

    #[test]
    fn test_target_parses_db_config() {
        let args = TargetArgs {
            backend: Some("qdrant".to_string()),
            db_config: Some(r#"{"host": "qdrant.internal"}"#.to_string()),
        };
        let target = args.to_target(&Config::default()).unwrap();
        assert_eq!(target.backend, "qdrant");
        assert_eq!(target.overrides.get("host"), Some(&json!("qdrant.internal")));
    }

    #[test]
    fn test_invalid_db_config() {
        let args = TargetArgs {
            backend: None,
            db_config: Some("{oops".to_string()),
        };
        assert!(args.to_target(&Config::default()).is_err());
    }
}
