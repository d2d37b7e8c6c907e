//! Registry of per-document collections.
//!
//! Maps an uploaded filename to its collection identity and index path,
//! re-opens existing collections for queries, and serializes writes to the
//! same collection within this process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::adapters::vector_stores::VectorStoreFactory;
use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{index_path_for, BackendKind, CollectionName, IndexTarget};
use crate::domain::ports::PersistOutcome;
use crate::services::embedding_service::EmbeddingProvider;
use crate::services::vector_index::{AddReport, SecondaryEmbedding, VectorIndex};

/// Outcome of one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub collection: CollectionName,
    pub backend: BackendKind,
    pub added: usize,
    pub skipped: usize,
    pub secondary_added: usize,
    pub persistence: PersistOutcome,
}

pub struct IndexService {
    data_dir: PathBuf,
    factory: VectorStoreFactory,
    locks: Mutex<HashMap<CollectionName, Arc<Mutex<()>>>>,
}

impl IndexService {
    pub fn new(data_dir: impl Into<PathBuf>, factory: VectorStoreFactory) -> Self {
        Self {
            data_dir: data_dir.into(),
            factory,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn factory(&self) -> &VectorStoreFactory {
        &self.factory
    }

    /// Local index file for `filename`.
    pub fn index_path(&self, filename: &str) -> PathBuf {
        index_path_for(&self.data_dir, filename)
    }

    async fn collection_lock(&self, name: &CollectionName) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(name.clone()).or_default())
    }

    /// Forget the lock for `name` once no other ingestion holds or awaits it.
    async fn release_collection_lock(&self, name: &CollectionName, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // The map and `lock` are the only references left.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
    }

    async fn open(
        &self,
        provider: &EmbeddingProvider,
        target: &IndexTarget,
        index_path: &Path,
    ) -> RagResult<VectorIndex> {
        let store = self
            .factory
            .create(
                &target.backend,
                &target.overrides,
                provider.dimension(),
                Some(index_path),
            )
            .await?;
        VectorIndex::new(provider.clone(), store)
    }

    /// Re-open the collection behind `filename` for reading.
    ///
    /// For the local backend a missing index file means the document was
    /// never ingested.
    #[instrument(skip(self, provider, target), fields(backend = %target.backend))]
    pub async fn open_for_query(
        &self,
        provider: &EmbeddingProvider,
        target: &IndexTarget,
        filename: &str,
    ) -> RagResult<VectorIndex> {
        let kind: BackendKind = target.backend.parse()?;
        let path = self.index_path(filename);

        if kind.is_local() && !tokio::fs::try_exists(&path).await? {
            return Err(RagError::CollectionNotFound(format!(
                "no index for '{filename}' at {}",
                path.display()
            )));
        }

        let index = self.open(provider, target, &path).await?;
        index.load(&path).await?;
        debug!(path = %path.display(), "collection opened");
        Ok(index)
    }

    /// Add `passages` (and any `secondary` vectors) to the collection for `filename`.
    ///
    /// Holds the collection's lock across restore, add and save so two
    /// ingestions of the same document in this process cannot drop each
    /// other's records.
    #[instrument(skip(self, provider, target, passages, secondary), fields(backend = %target.backend, passages = passages.len()))]
    pub async fn ingest(
        &self,
        provider: &EmbeddingProvider,
        target: &IndexTarget,
        filename: &str,
        passages: &[String],
        secondary: &[SecondaryEmbedding],
        batch_size: usize,
    ) -> RagResult<IngestReport> {
        let path = self.index_path(filename);
        let collection = CollectionName::from_path(&path)?;

        let lock = self.collection_lock(&collection).await;
        let result = {
            let _guard = lock.lock().await;
            self.ingest_locked(provider, target, &path, passages, secondary, batch_size)
                .await
        };
        self.release_collection_lock(&collection, lock).await;
        let (backend, added, persistence) = result?;

        info!(
            collection = %collection,
            added = added.added,
            skipped = added.skipped,
            "ingestion complete"
        );
        Ok(IngestReport {
            collection,
            backend,
            added: added.added,
            skipped: added.skipped,
            secondary_added: added.secondary_added,
            persistence,
        })
    }

    async fn ingest_locked(
        &self,
        provider: &EmbeddingProvider,
        target: &IndexTarget,
        path: &Path,
        passages: &[String],
        secondary: &[SecondaryEmbedding],
        batch_size: usize,
    ) -> RagResult<(BackendKind, AddReport, PersistOutcome)> {
        let index = self.open(provider, target, path).await?;
        if index.backend().is_local() && tokio::fs::try_exists(path).await? {
            index.load(path).await?;
        }

        let added = index.add(passages, None, secondary, batch_size).await?;
        let persistence = index.save(path).await?;
        Ok((index.backend(), added, persistence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::embeddings::LocalEncoder;
    use crate::domain::models::default_backend_options;
    use crate::infrastructure::http::HttpContext;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<IndexService>, EmbeddingProvider) {
        let dir = TempDir::new().unwrap();
        let factory = VectorStoreFactory::new(
            default_backend_options(),
            HttpContext::without_retries(reqwest::Client::new()),
        );
        let service = Arc::new(IndexService::new(dir.path(), factory));
        let provider = EmbeddingProvider::initialize(Arc::new(LocalEncoder::new("all-MiniLM-L6-v2")), 2)
            .await
            .unwrap();
        (dir, service, provider)
    }

    fn passages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_index_path_naming() {
        let (dir, service, _) = setup().await;
        assert_eq!(
            service.index_path("Annual Report.pdf"),
            dir.path().join("vector_db_Annual_Report.index")
        );
    }

    #[tokio::test]
    async fn test_query_before_ingest_is_not_found() {
        let (_dir, service, provider) = setup().await;
        let err = service
            .open_for_query(&provider, &IndexTarget::new("faiss"), "never.pdf")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RagError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn test_repeat_ingestion_appends() {
        let (_dir, service, provider) = setup().await;
        let target = IndexTarget::new("faiss");

        let first = service
            .ingest(&provider, &target, "doc.txt", &passages(&["alpha"]), &[], 8)
            .await
            .unwrap();
        assert_eq!(first.collection.as_str(), "vector_db_doc");
        assert!(matches!(first.persistence, PersistOutcome::Saved { records: 1, .. }));

        service
            .ingest(&provider, &target, "doc.txt", &passages(&["beta"]), &[], 8)
            .await
            .unwrap();

        let index = service
            .open_for_query(&provider, &target, "doc.txt")
            .await
            .unwrap();
        assert_eq!(index.get_all().await.unwrap(), passages(&["alpha", "beta"]));
    }

    #[tokio::test]
    async fn test_concurrent_ingestions_keep_all_records() {
        let (_dir, service, provider) = setup().await;
        let target = IndexTarget::new("faiss");

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let service = Arc::clone(&service);
                let provider = provider.clone();
                let target = target.clone();
                tokio::spawn(async move {
                    service
                        .ingest(&provider, &target, "shared.txt", &[format!("passage {i}")], &[], 8)
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let index = service
            .open_for_query(&provider, &target, "shared.txt")
            .await
            .unwrap();
        assert_eq!(index.get_all().await.unwrap().len(), 4);
        assert!(service.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_released_after_failed_ingestion() {
        let (_dir, service, provider) = setup().await;

        let err = service
            .ingest(&provider, &IndexTarget::new("chroma"), "doc.txt", &passages(&["alpha"]), &[], 8)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(service.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_data_dir_is_a_persistence_error() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, "x").unwrap();
        let factory = VectorStoreFactory::new(
            default_backend_options(),
            HttpContext::without_retries(reqwest::Client::new()),
        );
        let service = IndexService::new(&not_a_dir, factory);
        let provider = EmbeddingProvider::initialize(Arc::new(LocalEncoder::new("all-MiniLM-L6-v2")), 2)
            .await
            .unwrap();

        let err = service
            .open_for_query(&provider, &IndexTarget::new("faiss"), "doc.txt")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RagError::Persistence(_)));
    }
}
