//! Ollama embedding model adapter (`/api/embeddings`, one prompt per call).

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::ports::{EmbeddingModel, RawEmbedding};
use crate::infrastructure::http::{send_with_retry, trim_base, HttpContext};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Embedding model served by an Ollama instance. Its width is discovered
/// by probing.
pub struct OllamaEmbeddingModel {
    base_url: String,
    model: String,
    http: HttpContext,
}

impl OllamaEmbeddingModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, http: HttpContext) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            http,
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[async_trait]
impl EmbeddingModel for OllamaEmbeddingModel {
    fn provider(&self) -> &'static str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn declared_dimension(&self) -> Option<usize> {
        None
    }

    fn is_single_call(&self) -> bool {
        true
    }

    async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding> {
        let [text] = texts else {
            return Err(RagError::Embedding(format!(
                "ollama embeds one text per call, got {}",
                texts.len()
            )));
        };
        let url = format!("{}/api/embeddings", trim_base(&self.base_url));
        let body = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = send_with_retry(&self.http.retry, || self.http.client.post(&url).json(&body))
            .await
            .map_err(|e| RagError::Embedding(format!("Ollama embedding request failed: {e}")))?;

        response
            .json::<RawEmbedding>()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse Ollama embedding: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_single_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"model": "nomic-embed-text", "prompt": "hello"}),
            ))
            .with_status(200)
            .with_body(r#"{"embedding":[0.5,0.25,0.125]}"#)
            .create_async()
            .await;

        let model = OllamaEmbeddingModel::new(
            server.url(),
            "nomic-embed-text",
            HttpContext::without_retries(reqwest::Client::new()),
        );
        let rows = model
            .embed_raw(&["hello".to_string()])
            .await
            .unwrap()
            .into_rows();
        assert_eq!(rows, vec![vec![0.5, 0.25, 0.125]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejects_batches() {
        let model = OllamaEmbeddingModel::new(
            DEFAULT_OLLAMA_URL,
            "nomic-embed-text",
            HttpContext::without_retries(reqwest::Client::new()),
        );
        let err = model
            .embed_raw(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
    }
}
