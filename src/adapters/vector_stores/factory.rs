//! Backend selection: defaults + overrides -> typed config -> adapter.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use super::{FlatIndexStore, MilvusStore, PineconeStore, QdrantStore, WeaviateStore};
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{BackendConfig, BackendKind, BackendOptions, CollectionName};
use crate::domain::ports::VectorStore;
use crate::infrastructure::http::HttpContext;

/// Builds vector-store adapters from a backend type name.
///
/// Holds the static per-backend defaults and the shared HTTP context that
/// every remote adapter is given.
#[derive(Clone)]
pub struct VectorStoreFactory {
    defaults: BTreeMap<String, BackendOptions>,
    http: HttpContext,
}

impl VectorStoreFactory {
    pub fn new(defaults: BTreeMap<String, BackendOptions>, http: HttpContext) -> Self {
        Self { defaults, http }
    }

    /// Defaults for `kind`, or an empty map when none are configured.
    pub fn defaults_for(&self, kind: BackendKind) -> BackendOptions {
        self.defaults.get(kind.as_str()).cloned().unwrap_or_default()
    }

    /// Resolve the typed configuration without connecting to anything.
    ///
    /// Overrides win key-by-key over defaults. When `source_path` is given,
    /// the collection name derived from it is written under the backend's
    /// naming key, replacing any default or override.
    pub fn resolve(
        &self,
        backend_type: &str,
        overrides: &BackendOptions,
        source_path: Option<&Path>,
    ) -> RagResult<BackendConfig> {
        let kind: BackendKind = backend_type.parse()?;

        let mut options = self.defaults_for(kind);
        options.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let (Some(path), Some(key)) = (source_path, kind.naming_key()) {
            let name = CollectionName::from_path(path)?;
            options.insert(key.to_string(), Value::String(name.as_str().to_string()));
        }

        BackendConfig::from_options(kind, &options)
    }

    /// Create a connected adapter for `backend_type` storing `dimension`-wide vectors.
    #[instrument(skip(self, overrides))]
    pub async fn create(
        &self,
        backend_type: &str,
        overrides: &BackendOptions,
        dimension: usize,
        source_path: Option<&Path>,
    ) -> RagResult<Arc<dyn VectorStore>> {
        let config = self.resolve(backend_type, overrides, source_path)?;
        if dimension == 0 {
            return Err(RagError::Configuration(
                "vector dimension must be greater than zero".to_string(),
            ));
        }
        debug!(backend = %config.kind(), "creating vector store");

        let http = self.http.clone();
        let store: Arc<dyn VectorStore> = match &config {
            BackendConfig::Faiss(c) => Arc::new(FlatIndexStore::new(dimension, c)),
            BackendConfig::Milvus(c) => Arc::new(MilvusStore::connect(c, dimension, http).await?),
            BackendConfig::Pinecone(c) => {
                Arc::new(PineconeStore::connect(c, dimension, http).await?)
            }
            BackendConfig::Qdrant(c) => Arc::new(QdrantStore::connect(c, dimension, http).await?),
            BackendConfig::Weaviate(c) => {
                Arc::new(WeaviateStore::connect(c, dimension, http).await?)
            }
        };
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::default_backend_options;
    use serde_json::json;

    fn factory() -> VectorStoreFactory {
        VectorStoreFactory::new(
            default_backend_options(),
            HttpContext::without_retries(reqwest::Client::new()),
        )
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let mut overrides = BackendOptions::new();
        overrides.insert("host".to_string(), json!("milvus.internal"));
        let config = factory().resolve("milvus", &overrides, None).unwrap();
        match config {
            BackendConfig::Milvus(c) => {
                assert_eq!(c.host, "milvus.internal");
                assert_eq!(c.port, 19530);
            }
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_source_path_names_the_collection() {
        let mut overrides = BackendOptions::new();
        overrides.insert("collection_name".to_string(), json!("ignored"));
        let config = factory()
            .resolve(
                "milvus",
                &overrides,
                Some(Path::new("/srv/dbs/vector_db_report.index")),
            )
            .unwrap();
        match config {
            BackendConfig::Milvus(c) => assert_eq!(c.collection_name, "vector_db_report"),
            other => panic!("unexpected config {other:?}"),
        }
    }

    #[test]
    fn test_source_path_ignored_without_naming_key() {
        let config = factory()
            .resolve("weaviate", &BackendOptions::new(), Some(Path::new("x/report.index")))
            .unwrap();
        assert_eq!(config.kind(), BackendKind::Weaviate);
    }

    #[test]
    fn test_unrecognized_backend() {
        let err = factory()
            .resolve("chroma", &BackendOptions::new(), None)
            .unwrap_err();
        assert!(matches!(err, RagError::Configuration(msg) if msg.contains("Unsupported database type")));
    }

    #[tokio::test]
    async fn test_zero_dimension_rejected() {
        let result = factory()
            .create("faiss", &BackendOptions::new(), 0, None)
            .await;
        assert!(matches!(result, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_faiss_needs_no_network() {
        let store = factory()
            .create("FAISS", &BackendOptions::new(), 4, None)
            .await
            .unwrap();
        assert_eq!(store.kind(), BackendKind::Faiss);
        assert_eq!(store.dimension(), 4);
    }
}
