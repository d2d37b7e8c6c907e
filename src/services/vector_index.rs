//! One embedding provider bound to one vector store.
//!
//! The dimension is fixed when the index is built. Ingestion embeds in
//! batches and skips individual texts the model cannot embed; cross-modal
//! vectors are aligned to the text dimension and appended after the text
//! records.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    align_to_dimension, BackendKind, EmbeddingMatrix, EmbeddingVector, Metadata, MetadataValue,
    SearchHit,
};
use crate::domain::ports::{PersistOutcome, VectorStore};
use crate::services::embedding_service::EmbeddingProvider;

/// A vector from another modality (e.g. an image) to store next to the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryEmbedding {
    #[serde(default)]
    pub label: Option<String>,
    pub vector: EmbeddingVector,
}

/// Counts from one `add` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AddReport {
    pub added: usize,
    /// Texts dropped because the model could not embed them.
    pub skipped: usize,
    pub secondary_added: usize,
}

/// Placeholder text stored for a secondary vector.
fn secondary_text(index: usize, label: Option<&str>) -> String {
    match label {
        Some(label) if !label.trim().is_empty() => format!("[image {index}] {}", label.trim()),
        _ => format!("[image {index}]"),
    }
}

#[derive(Clone)]
pub struct VectorIndex {
    provider: EmbeddingProvider,
    store: Arc<dyn VectorStore>,
}

impl VectorIndex {
    /// Bind `provider` to `store`. Their dimensions must agree.
    pub fn new(provider: EmbeddingProvider, store: Arc<dyn VectorStore>) -> RagResult<Self> {
        if provider.dimension() != store.dimension() {
            return Err(RagError::Configuration(format!(
                "embedding dimension {} does not match {} store dimension {}",
                provider.dimension(),
                store.kind(),
                store.dimension()
            )));
        }
        Ok(Self { provider, store })
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Store `texts`, then any `secondary` vectors, in that order.
    ///
    /// With `embeddings` the vectors are taken as given and must match the
    /// texts one to one. Without, texts are embedded `batch_size` at a time;
    /// a failing batch is retried text by text and texts that still fail are
    /// skipped with a warning.
    #[instrument(skip_all, fields(backend = %self.backend(), texts = texts.len(), secondary = secondary.len()))]
    pub async fn add(
        &self,
        texts: &[String],
        embeddings: Option<EmbeddingMatrix>,
        secondary: &[SecondaryEmbedding],
        batch_size: usize,
    ) -> RagResult<AddReport> {
        let batch_size = batch_size.max(1);
        let mut report = AddReport::default();

        match embeddings {
            Some(matrix) => {
                if matrix.dimension() != self.dimension() || matrix.len() != texts.len() {
                    return Err(RagError::Embedding(format!(
                        "supplied embeddings are {}x{}, expected {}x{}",
                        matrix.len(),
                        matrix.dimension(),
                        texts.len(),
                        self.dimension()
                    )));
                }
                for start in (0..texts.len()).step_by(batch_size) {
                    let end = (start + batch_size).min(texts.len());
                    let ids = self
                        .store
                        .add(&matrix.slice_rows(start, end), &texts[start..end], None)
                        .await?;
                    report.added += ids.len();
                }
            }
            None => {
                for chunk in texts.chunks(batch_size) {
                    let (matrix, kept) = self.embed_chunk(chunk, &mut report.skipped).await?;
                    if kept.is_empty() {
                        continue;
                    }
                    let ids = self.store.add(&matrix, &kept, None).await?;
                    report.added += ids.len();
                }
            }
        }

        if !secondary.is_empty() {
            let mut matrix = EmbeddingMatrix::new(self.dimension());
            let mut labels = Vec::with_capacity(secondary.len());
            let mut metadata = Vec::with_capacity(secondary.len());
            for (i, item) in secondary.iter().enumerate() {
                if item.vector.len() != self.dimension() {
                    info!(
                        from = item.vector.len(),
                        to = self.dimension(),
                        "aligning secondary embedding (approximate)"
                    );
                }
                matrix.push_row(&align_to_dimension(&item.vector, self.dimension()))?;
                labels.push(secondary_text(i, item.label.as_deref()));
                let mut meta = Metadata::new();
                meta.insert("modality".to_string(), MetadataValue::from("image"));
                if let Some(label) = &item.label {
                    meta.insert("label".to_string(), MetadataValue::from(label.as_str()));
                }
                metadata.push(meta);
            }
            let ids = self.store.add(&matrix, &labels, Some(&metadata)).await?;
            report.secondary_added = ids.len();
        }

        info!(
            added = report.added,
            skipped = report.skipped,
            secondary_added = report.secondary_added,
            "records added"
        );
        Ok(report)
    }

    async fn embed_chunk(
        &self,
        chunk: &[String],
        skipped: &mut usize,
    ) -> RagResult<(EmbeddingMatrix, Vec<String>)> {
        match self.provider.embed(chunk).await {
            Ok(matrix) => Ok((matrix, chunk.to_vec())),
            Err(err) => {
                warn!(error = %err, size = chunk.len(), "batch embedding failed, embedding texts one by one");
                let mut matrix = EmbeddingMatrix::new(self.dimension());
                let mut kept = Vec::with_capacity(chunk.len());
                for (text, result) in chunk.iter().zip(self.provider.embed_each(chunk).await) {
                    match result {
                        Ok(vector) => {
                            matrix.push_row(&vector)?;
                            kept.push(text.clone());
                        }
                        Err(err) => {
                            *skipped += 1;
                            warn!(error = %err, chars = text.len(), "skipping text that could not be embedded");
                        }
                    }
                }
                Ok((matrix, kept))
            }
        }
    }

    /// Embed `query` and return up to `top_k` nearest records.
    pub async fn search(&self, query: &str, top_k: usize) -> RagResult<Vec<SearchHit>> {
        let vector = self.provider.embed_one(query).await?;
        self.store.search(&vector, top_k).await
    }

    pub async fn get_all(&self) -> RagResult<Vec<String>> {
        self.store.get_all().await
    }

    /// Persist through the store. Remote stores report `BackendManaged`.
    pub async fn save(&self, path: &Path) -> RagResult<PersistOutcome> {
        let outcome = self.store.persist(path).await?;
        if outcome == PersistOutcome::BackendManaged {
            info!(backend = %self.backend(), "save skipped: backend manages its own persistence");
        }
        Ok(outcome)
    }

    pub async fn load(&self, path: &Path) -> RagResult<PersistOutcome> {
        let outcome = self.store.restore(path).await?;
        if outcome == PersistOutcome::BackendManaged {
            info!(backend = %self.backend(), "load skipped: backend manages its own persistence");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::vector_stores::FlatIndexStore;
    use crate::domain::models::FaissConfig;
    use crate::domain::ports::{EmbeddingModel, RawEmbedding};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Two-dimensional model: `[len, 1]`, failing on texts containing "bad".
    struct LengthModel;

    #[async_trait]
    impl EmbeddingModel for LengthModel {
        fn provider(&self) -> &'static str {
            "length"
        }

        fn model_name(&self) -> &str {
            "length-2"
        }

        fn declared_dimension(&self) -> Option<usize> {
            Some(2)
        }

        fn is_single_call(&self) -> bool {
            false
        }

        async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding> {
            if texts.iter().any(|t| t.contains("bad")) {
                return Err(RagError::Embedding("malformed chunk".to_string()));
            }
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect::<Vec<_>>()
                .into())
        }
    }

    async fn index() -> VectorIndex {
        let provider = EmbeddingProvider::initialize(Arc::new(LengthModel), 1)
            .await
            .unwrap();
        let store = Arc::new(FlatIndexStore::new(2, &FaissConfig { use_gpu: false }));
        VectorIndex::new(provider, store).unwrap()
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_dimension_mismatch_at_construction() {
        let provider = EmbeddingProvider::initialize(Arc::new(LengthModel), 1)
            .await
            .unwrap();
        let store = Arc::new(FlatIndexStore::new(3, &FaissConfig { use_gpu: false }));
        assert!(matches!(
            VectorIndex::new(provider, store),
            Err(RagError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_record_is_skipped() {
        let index = index().await;
        let report = index
            .add(&texts(&["a", "bad one", "ccc"]), None, &[], 8)
            .await
            .unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(index.get_all().await.unwrap(), texts(&["a", "ccc"]));
    }

    #[tokio::test]
    async fn test_secondary_vectors_follow_primary() {
        let index = index().await;
        let secondary = vec![
            SecondaryEmbedding {
                label: Some("diagram".to_string()),
                vector: vec![0.5, 0.5, 0.5],
            },
            SecondaryEmbedding {
                label: None,
                vector: vec![0.1],
            },
        ];
        let report = index
            .add(&texts(&["x", "yy"]), None, &secondary, 1)
            .await
            .unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(report.secondary_added, 2);
        assert_eq!(
            index.get_all().await.unwrap(),
            texts(&["x", "yy", "[image 0] diagram", "[image 1]"])
        );
    }

    #[tokio::test]
    async fn test_supplied_embeddings_must_match_texts() {
        let index = index().await;
        let matrix = EmbeddingMatrix::from_rows(2, vec![vec![1.0, 1.0]]).unwrap();
        let err = index
            .add(&texts(&["a", "b"]), Some(matrix), &[], 4)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_search_embeds_query() {
        let index = index().await;
        index
            .add(&texts(&["aa", "bbbbbb"]), None, &[], 4)
            .await
            .unwrap();
        let hits = index.search("ccccc", 1).await.unwrap();
        assert_eq!(hits[0].text, "bbbbbb");
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vector_db_doc.index");
        let index = index().await;
        index.add(&texts(&["one", "three"]), None, &[], 4).await.unwrap();
        assert!(matches!(
            index.save(&path).await.unwrap(),
            PersistOutcome::Saved { records: 2, .. }
        ));

        let fresh = self::index().await;
        assert_eq!(
            fresh.load(&path).await.unwrap(),
            PersistOutcome::Restored { records: 2 }
        );
        assert_eq!(fresh.get_all().await.unwrap(), texts(&["one", "three"]));
    }
}
