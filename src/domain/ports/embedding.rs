//! Embedding model port.
//!
//! Models return whatever shape their backend produces; [`RawEmbedding`]
//! captures the known shapes so the embedding service can normalize them
//! into one flat vector per input text.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::errors::RagResult;
use crate::domain::models::EmbeddingVector;

/// Embedding output as returned by a model, before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawEmbedding {
    /// A single flat vector.
    Flat(EmbeddingVector),
    /// `{"embedding": [...]}`
    Wrapped { embedding: EmbeddingVector },
    /// `{"embeddings": [[...], ...]}`
    Embeddings { embeddings: Vec<EmbeddingVector> },
    /// `{"data": [...]}` where each item is itself any known shape.
    Envelope { data: Vec<RawEmbedding> },
    /// A list of any known shapes.
    List(Vec<RawEmbedding>),
}

impl RawEmbedding {
    /// Flatten into one vector per input text, preserving order.
    pub fn into_rows(self) -> Vec<EmbeddingVector> {
        match self {
            Self::Flat(vector) | Self::Wrapped { embedding: vector } => vec![vector],
            Self::Embeddings { embeddings } => embeddings,
            Self::Envelope { data: items } | Self::List(items) => {
                items.into_iter().flat_map(Self::into_rows).collect()
            }
        }
    }
}

impl From<Vec<EmbeddingVector>> for RawEmbedding {
    fn from(rows: Vec<EmbeddingVector>) -> Self {
        Self::List(rows.into_iter().map(Self::Flat).collect())
    }
}

/// A text embedding model, local or hosted.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Provider identifier (e.g. "local", "openai").
    fn provider(&self) -> &'static str;

    fn model_name(&self) -> &str;

    /// Output width if known without calling the model.
    fn declared_dimension(&self) -> Option<usize>;

    /// Whether the model takes one text per call rather than a batch.
    fn is_single_call(&self) -> bool;

    /// Embed `texts`. Single-call models receive exactly one text.
    async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(json: &str) -> Vec<EmbeddingVector> {
        serde_json::from_str::<RawEmbedding>(json).unwrap().into_rows()
    }

    #[test]
    fn test_flat_vector() {
        assert_eq!(parse("[0.1, 0.2]"), vec![vec![0.1, 0.2]]);
    }

    #[test]
    fn test_wrapped_vector() {
        assert_eq!(parse(r#"{"embedding": [1.0, 2.0]}"#), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_openai_envelope() {
        let json = r#"{"object":"list","data":[{"embedding":[1.0],"index":0},{"embedding":[2.0],"index":1}]}"#;
        assert_eq!(parse(json), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_embeddings_key() {
        assert_eq!(
            parse(r#"{"embeddings": [[1.0, 0.0], [0.0, 1.0]]}"#),
            vec![vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn test_list_of_mixed_shapes() {
        assert_eq!(
            parse(r#"[[1.0], {"embedding": [2.0]}]"#),
            vec![vec![1.0], vec![2.0]]
        );
    }

    proptest! {
        #[test]
        fn prop_nested_matrix_normalizes_to_rows(
            rows in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 1..8)
        ) {
            let json = serde_json::to_string(&rows).unwrap();
            prop_assert_eq!(parse(&json), rows.clone());

            let wrapped: Vec<_> = rows.iter().map(|r| serde_json::json!({"embedding": r})).collect();
            let json = serde_json::json!({"data": wrapped}).to_string();
            prop_assert_eq!(parse(&json), rows);
        }
    }
}
