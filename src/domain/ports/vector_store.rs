//! Vector-store port implemented by every backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{BackendKind, EmbeddingMatrix, Metadata, RecordId, SearchHit};

/// What a persist or restore call actually did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// Index and id map written to disk.
    Saved {
        index_path: PathBuf,
        map_path: PathBuf,
        records: usize,
    },
    /// Index and id map read back from disk.
    Restored { records: usize },
    /// The backend keeps its own state; nothing was written or read.
    BackendManaged,
}

/// Fixed-dimension vector storage with text payloads.
///
/// Callers never need to know which backend they hold; only construction
/// differs between implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn dimension(&self) -> usize;

    /// Append records and return the identifiers assigned to them.
    async fn add(
        &self,
        vectors: &EmbeddingMatrix,
        texts: &[String],
        metadata: Option<&[Metadata]>,
    ) -> RagResult<Vec<RecordId>>;

    /// Up to `top_k` nearest records, best first. Empty when the store is.
    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>>;

    /// Every stored text, in storage order.
    async fn get_all(&self) -> RagResult<Vec<String>> {
        Err(RagError::UnsupportedOperation {
            backend: self.kind(),
            operation: "get_all",
        })
    }

    async fn persist(&self, _path: &Path) -> RagResult<PersistOutcome> {
        Ok(PersistOutcome::BackendManaged)
    }

    async fn restore(&self, _path: &Path) -> RagResult<PersistOutcome> {
        Ok(PersistOutcome::BackendManaged)
    }
}

/// Reject a batch whose shape does not match the store before any write.
pub fn check_batch(
    kind: BackendKind,
    dimension: usize,
    vectors: &EmbeddingMatrix,
    texts: &[String],
    metadata: Option<&[Metadata]>,
) -> RagResult<()> {
    if vectors.dimension() != dimension {
        return Err(RagError::write(
            kind,
            format!(
                "dimension mismatch: store expects {dimension}, batch has {}",
                vectors.dimension()
            ),
        ));
    }
    if vectors.len() != texts.len() {
        return Err(RagError::write(
            kind,
            format!("{} vectors but {} texts", vectors.len(), texts.len()),
        ));
    }
    if let Some(metadata) = metadata {
        if metadata.len() != texts.len() {
            return Err(RagError::write(
                kind,
                format!("{} metadata entries but {} texts", metadata.len(), texts.len()),
            ));
        }
    }
    Ok(())
}

/// Reject a query vector of the wrong width.
pub fn check_query(kind: BackendKind, dimension: usize, query: &[f32]) -> RagResult<()> {
    if query.len() == dimension {
        Ok(())
    } else {
        Err(RagError::search(
            kind,
            format!(
                "query has {} dimensions, store expects {dimension}",
                query.len()
            ),
        ))
    }
}
