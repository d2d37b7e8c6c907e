//! Embedding vectors and row-major embedding matrices.

use serde::{Deserialize, Serialize};

use crate::domain::errors::{RagError, RagResult};

/// One embedding: a fixed-length sequence of 32-bit floats.
pub type EmbeddingVector = Vec<f32>;

/// `n x dimension` matrix stored as one flat row-major `f32` buffer.
///
/// This is the only representation exchanged between components; adapters
/// convert to whatever their backend expects internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMatrix {
    dimension: usize,
    values: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Empty matrix with a fixed row width.
    pub const fn new(dimension: usize) -> Self {
        Self {
            dimension,
            values: Vec::new(),
        }
    }

    /// Build from rows, failing if any row has the wrong width.
    pub fn from_rows<I>(dimension: usize, rows: I) -> RagResult<Self>
    where
        I: IntoIterator<Item = EmbeddingVector>,
    {
        let mut matrix = Self::new(dimension);
        for row in rows {
            matrix.push_row(&row)?;
        }
        Ok(matrix)
    }

    /// Append one row. A width mismatch is an error and nothing is appended.
    pub fn push_row(&mut self, row: &[f32]) -> RagResult<()> {
        if row.len() != self.dimension {
            return Err(RagError::Embedding(format!(
                "vector has {} dimensions, expected {}",
                row.len(),
                self.dimension
            )));
        }
        self.values.extend_from_slice(row);
        Ok(())
    }

    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.values.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dimension)?;
        self.values.get(start..start + self.dimension)
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.values.chunks_exact(self.dimension.max(1))
    }

    /// Copy of rows `start..end`, clamped to the matrix.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.len());
        let start = start.min(end);
        Self {
            dimension: self.dimension,
            values: self.values[start * self.dimension..end * self.dimension].to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Reshape a vector from another embedding space to `dimension`.
///
/// Shorter vectors are zero-filled on the right and longer ones lose their
/// trailing elements. This is an approximation: the result shares a width
/// with the text embeddings but not their geometry, so distances between
/// aligned and native vectors are only loosely meaningful.
pub fn align_to_dimension(vector: &[f32], dimension: usize) -> EmbeddingVector {
    let mut aligned: EmbeddingVector = vector.iter().copied().take(dimension).collect();
    aligned.resize(dimension, 0.0);
    aligned
}
