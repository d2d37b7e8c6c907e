//! In-process sentence encoder.
//!
//! Produces deterministic embeddings by hashing word unigrams and bigrams
//! into signed buckets and L2-normalizing the result. Texts that share
//! vocabulary land close together, which is enough for lexical retrieval
//! without shipping model weights.

use async_trait::async_trait;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::EmbeddingVector;
use crate::domain::ports::{EmbeddingModel, RawEmbedding};

/// Known local models and their output widths.
const KNOWN_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("all-mpnet-base-v2", 768),
    ("paraphrase-MiniLM-L3-v2", 384),
];

/// Resolve a model name to its dimension, ignoring an organization prefix
/// such as `sentence-transformers/`.
pub fn known_dimension(model_name: &str) -> Option<usize> {
    let bare = model_name.rsplit('/').next().unwrap_or(model_name);
    KNOWN_MODELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(bare))
        .map(|(_, dimension)| *dimension)
}

/// Local batch encoder.
pub struct LocalEncoder {
    model_name: String,
    dimension: Option<usize>,
}

impl LocalEncoder {
    pub fn new(model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        let dimension = known_dimension(&model_name);
        Self {
            model_name,
            dimension,
        }
    }

    /// Encode one text into a unit vector of `dimension` floats.
    pub fn encode(text: &str, dimension: usize) -> EmbeddingVector {
        let mut embedding = vec![0.0f32; dimension];
        if dimension == 0 {
            return embedding;
        }

        let tokens: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        for token in &tokens {
            add_feature(&mut embedding, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            add_feature(&mut embedding, bigram.as_bytes(), 0.5);
        }

        let magnitude = embedding
            .iter()
            .map(|x| f64::from(*x) * f64::from(*x))
            .sum::<f64>()
            .sqrt();
        if magnitude > 1e-10 {
            for value in &mut embedding {
                *value = (f64::from(*value) / magnitude) as f32;
            }
        } else {
            // Texts without any word characters share one fixed direction.
            let uniform = 1.0 / (dimension as f32).sqrt();
            embedding.fill(uniform);
        }
        embedding
    }
}

fn add_feature(embedding: &mut [f32], feature: &[u8], weight: f32) {
    let hash = fnv1a(feature);
    let bucket = (hash % embedding.len() as u64) as usize;
    let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
    embedding[bucket] += sign * weight;
}

/// 64-bit FNV-1a; stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

#[async_trait]
impl EmbeddingModel for LocalEncoder {
    fn provider(&self) -> &'static str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn declared_dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn is_single_call(&self) -> bool {
        false
    }

    async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding> {
        let dimension = self.dimension.ok_or_else(|| {
            RagError::Embedding(format!(
                "unknown local model '{}'; cannot determine its dimension",
                self.model_name
            ))
        })?;
        let rows: Vec<EmbeddingVector> = texts
            .iter()
            .map(|text| Self::encode(text, dimension))
            .collect();
        Ok(rows.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    #[test]
    fn test_known_dimension_strips_prefix() {
        assert_eq!(known_dimension("sentence-transformers/all-MiniLM-L6-v2"), Some(384));
        assert_eq!(known_dimension("all-mpnet-base-v2"), Some(768));
        assert_eq!(known_dimension("mystery-model"), None);
    }

    #[test]
    fn test_encode_is_deterministic_and_normalized() {
        let a = LocalEncoder::encode("Quarterly revenue grew", 384);
        let b = LocalEncoder::encode("Quarterly revenue grew", 384);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let query = LocalEncoder::encode("revenue growth", 384);
        let related = LocalEncoder::encode("the revenue growth was strong", 384);
        let unrelated = LocalEncoder::encode("parking garage opening hours", 384);
        assert!(l2(&query, &related) < l2(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_has_unit_norm() {
        let v = LocalEncoder::encode("  ...  ", 16);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_embed_raw_batches() {
        let encoder = LocalEncoder::new("all-MiniLM-L6-v2");
        let rows = encoder
            .embed_raw(&["a".to_string(), "b".to_string()])
            .await
            .unwrap()
            .into_rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.len() == 384));
    }

    #[tokio::test]
    async fn test_unknown_model_fails() {
        let encoder = LocalEncoder::new("mystery-model");
        assert!(matches!(
            encoder.embed_raw(&["a".to_string()]).await,
            Err(RagError::Embedding(_))
        ));
    }
}
