//! In-process flat L2 index (the `faiss` backend).
//!
//! Vectors live in one contiguous `f32` buffer and search is an exact scan
//! returning squared Euclidean distances. Records get sequential ids in
//! insertion order. Persistence writes two artifacts next to each other:
//!
//! - `<path>`: binary index (magic, version, dimension, count, then
//!   little-endian `f32` rows)
//! - `<path>` with extension `idmap.json`: id to text/metadata map

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::{
    BackendKind, EmbeddingMatrix, FaissConfig, Metadata, RecordId, SearchHit,
};
use crate::domain::ports::{check_batch, check_query, PersistOutcome, VectorStore};

const MAGIC: &[u8; 4] = b"RFIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8 + 8;

/// Path of the id map stored alongside an index file.
pub fn id_map_path(index_path: &Path) -> PathBuf {
    index_path.with_extension("idmap.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredEntry {
    text: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    metadata: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct IdMapFile {
    dimension: usize,
    entries: BTreeMap<u64, StoredEntry>,
}

#[derive(Debug, Default)]
struct FlatState {
    vectors: Vec<f32>,
    entries: Vec<StoredEntry>,
}

/// Exact nearest-neighbour index held in memory.
pub struct FlatIndexStore {
    dimension: usize,
    state: RwLock<FlatState>,
}

impl FlatIndexStore {
    pub fn new(dimension: usize, config: &FaissConfig) -> Self {
        if config.use_gpu {
            warn!("GPU search is not available for the local index; using CPU");
        }
        Self {
            dimension,
            state: RwLock::new(FlatState::default()),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn encode_index(&self, vectors: &[f32], count: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u64).to_le_bytes());
        bytes.extend_from_slice(&(count as u64).to_le_bytes());
        for value in vectors {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    fn decode_index(&self, bytes: &[u8], path: &Path) -> RagResult<(usize, Vec<f32>)> {
        let corrupt =
            |reason: &str| RagError::Persistence(format!("{}: {reason}", path.display()));

        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(corrupt("not a ragforge index file"));
        }
        let read_u32 = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let read_u64 = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[at..at + 8]);
            u64::from_le_bytes(buf)
        };

        let version = read_u32(4);
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported format version {version}")));
        }
        let dimension = usize::try_from(read_u64(8)).map_err(|_| corrupt("dimension overflow"))?;
        let count = usize::try_from(read_u64(16)).map_err(|_| corrupt("count overflow"))?;
        if dimension != self.dimension {
            return Err(RagError::Configuration(format!(
                "index {} was built with dimension {dimension}, but the embedding model produces {}",
                path.display(),
                self.dimension
            )));
        }

        let body = &bytes[HEADER_LEN..];
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("size overflow"))?;
        if body.len() != expected {
            return Err(corrupt(&format!(
                "expected {expected} bytes of vectors, found {}",
                body.len()
            )));
        }
        let vectors = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok((count, vectors))
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> RagResult<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| RagError::Persistence(format!("write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| RagError::Persistence(format!("rename to {}: {e}", path.display())))
}

#[async_trait]
impl VectorStore for FlatIndexStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Faiss
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn add(
        &self,
        vectors: &EmbeddingMatrix,
        texts: &[String],
        metadata: Option<&[Metadata]>,
    ) -> RagResult<Vec<RecordId>> {
        check_batch(self.kind(), self.dimension, vectors, texts, metadata)?;

        let mut state = self.state.write().await;
        let start = state.entries.len() as u64;
        state.vectors.extend_from_slice(vectors.as_slice());
        for (i, text) in texts.iter().enumerate() {
            state.entries.push(StoredEntry {
                text: text.clone(),
                metadata: metadata.map(|m| m[i].clone()).unwrap_or_default(),
            });
        }
        let ids = (start..start + texts.len() as u64)
            .map(RecordId::Sequential)
            .collect();
        debug!(added = texts.len(), total = state.entries.len(), "flat index updated");
        Ok(ids)
    }

    async fn search(&self, query: &[f32], top_k: usize) -> RagResult<Vec<SearchHit>> {
        check_query(self.kind(), self.dimension, query)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let mut scored: Vec<(f32, usize)> = state
            .vectors
            .chunks_exact(self.dimension.max(1))
            .enumerate()
            .map(|(id, row)| (squared_l2(query, row), id))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(distance, id)| {
                let entry = &state.entries[id];
                SearchHit::new(entry.text.clone(), Some(distance))
                    .with_id(RecordId::Sequential(id as u64))
                    .with_metadata(entry.metadata.clone())
            })
            .collect())
    }

    async fn get_all(&self) -> RagResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.entries.iter().map(|e| e.text.clone()).collect())
    }

    async fn persist(&self, path: &Path) -> RagResult<PersistOutcome> {
        let (index_bytes, map_bytes, records) = {
            let state = self.state.read().await;
            let id_map = IdMapFile {
                dimension: self.dimension,
                entries: state
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(id, entry)| (id as u64, entry.clone()))
                    .collect(),
            };
            let map_bytes = serde_json::to_vec_pretty(&id_map)
                .map_err(|e| RagError::Persistence(format!("encode id map: {e}")))?;
            (
                self.encode_index(&state.vectors, state.entries.len()),
                map_bytes,
                state.entries.len(),
            )
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let map_path = id_map_path(path);
        write_atomically(path, &index_bytes).await?;
        write_atomically(&map_path, &map_bytes).await?;

        info!(path = %path.display(), records, "local index saved");
        Ok(PersistOutcome::Saved {
            index_path: path.to_path_buf(),
            map_path,
            records,
        })
    }

    async fn restore(&self, path: &Path) -> RagResult<PersistOutcome> {
        let map_path = id_map_path(path);
        let index_bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::Persistence(format!("read {}: {e}", path.display())))?;
        let map_bytes = tokio::fs::read(&map_path)
            .await
            .map_err(|e| RagError::Persistence(format!("read {}: {e}", map_path.display())))?;

        let (count, vectors) = self.decode_index(&index_bytes, path)?;
        let id_map: IdMapFile = serde_json::from_slice(&map_bytes)
            .map_err(|e| RagError::Persistence(format!("decode {}: {e}", map_path.display())))?;

        let ids_contiguous = id_map.entries.keys().copied().eq(0..count as u64);
        if id_map.dimension != self.dimension || !ids_contiguous {
            return Err(RagError::Persistence(format!(
                "{} does not match {} ({} entries for {count} vectors)",
                map_path.display(),
                path.display(),
                id_map.entries.len()
            )));
        }

        let mut state = self.state.write().await;
        state.vectors = vectors;
        state.entries = id_map.entries.into_values().collect();
        info!(path = %path.display(), records = count, "local index restored");
        Ok(PersistOutcome::Restored { records: count })
    }
}
