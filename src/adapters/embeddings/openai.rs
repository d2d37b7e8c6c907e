//! OpenAI embedding model adapter.
//!
//! Calls the `/embeddings` endpoint one text at a time. Works with any
//! OpenAI-compatible embedding API (Azure OpenAI, local gateways).

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::ports::{EmbeddingModel, RawEmbedding};
use crate::infrastructure::http::{send_with_retry, trim_base, HttpContext};

/// Configuration for the OpenAI embedding adapter.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Base URL for the API. Default: `https://api.openai.com/v1`.
    pub base_url: String,
    /// Embedding model. Default: `text-embedding-3-small`.
    pub model: String,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

impl OpenAiEmbeddingConfig {
    fn resolve_api_key(&self) -> RagResult<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                RagError::Configuration(
                    "OpenAI API key not set. Set OPENAI_API_KEY env var or configure embedding.api_key."
                        .to_string(),
                )
            })
    }
}

/// Output widths of the published embedding models.
fn known_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// OpenAI embedding model.
pub struct OpenAiEmbeddingModel {
    config: OpenAiEmbeddingConfig,
    api_key: String,
    http: HttpContext,
}

impl OpenAiEmbeddingModel {
    /// Fails with a configuration error when no API key is available.
    pub fn new(config: OpenAiEmbeddingConfig, http: HttpContext) -> RagResult<Self> {
        let api_key = config.resolve_api_key()?;
        Ok(Self {
            config,
            api_key,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbeddingModel {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn declared_dimension(&self) -> Option<usize> {
        known_dimension(&self.config.model)
    }

    fn is_single_call(&self) -> bool {
        true
    }

    async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding> {
        let url = format!("{}/embeddings", trim_base(&self.config.base_url));
        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = send_with_retry(&self.http.retry, || {
            self.http
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await
        .map_err(|e| RagError::Embedding(format!("Embedding API request failed: {e}")))?;

        let mut payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {e}")))?;

        // Restore input order before normalizing the envelope.
        if let Some(data) = payload.get_mut("data").and_then(|d| d.as_array_mut()) {
            data.sort_by_key(|item| item.get("index").and_then(serde_json::Value::as_u64));
        }
        serde_json::from_value(payload)
            .map_err(|e| RagError::Embedding(format!("Unexpected embedding response shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiEmbeddingConfig::default();
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(known_dimension(&config.model), Some(1536));
    }

    #[test]
    fn test_api_key_from_config() {
        let config = OpenAiEmbeddingConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_api_key_missing() {
        temp_env::with_var_unset("OPENAI_API_KEY", || {
            let config = OpenAiEmbeddingConfig::default();
            assert!(matches!(
                config.resolve_api_key(),
                Err(RagError::Configuration(_))
            ));
        });
    }

    #[tokio::test]
    async fn test_embed_raw_restores_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"embedding":[0.0,1.0],"index":1},{"embedding":[1.0,0.0],"index":0}]}"#,
            )
            .create_async()
            .await;

        let model = OpenAiEmbeddingModel::new(
            OpenAiEmbeddingConfig {
                api_key: Some("test-key".to_string()),
                base_url: format!("{}/v1", server.url()),
                model: "custom-embedder".to_string(),
            },
            HttpContext::without_retries(reqwest::Client::new()),
        )
        .unwrap();

        let rows = model
            .embed_raw(&["first".to_string(), "second".to_string()])
            .await
            .unwrap()
            .into_rows();
        assert_eq!(rows, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(model.declared_dimension(), None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_embedding_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(401)
            .with_body(r#"{"error":"bad key"}"#)
            .create_async()
            .await;

        let model = OpenAiEmbeddingModel::new(
            OpenAiEmbeddingConfig {
                api_key: Some("wrong".to_string()),
                base_url: server.url(),
                ..Default::default()
            },
            HttpContext::without_retries(reqwest::Client::new()),
        )
        .unwrap();

        let err = model.embed_raw(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, RagError::Embedding(msg) if msg.contains("401")));
    }
}
