//! Answer-generation adapters behind the `GenerationClient` port.

pub mod ollama;
pub mod openai_compatible;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::GenerationConfig;
use crate::domain::ports::GenerationClient;
use crate::infrastructure::http::HttpContext;

pub use ollama::OllamaChatClient;
pub use openai_compatible::{ChatMessage, OpenAiCompatibleClient};

const SYSTEM_PROMPT: &str = "You answer questions about a document using only the \
information supplied with the question. Keep the answer short and factual. If the \
information does not contain the answer, say so.";

/// Sends prompts to the provider named on each call.
pub struct GenerationRouter {
    openai: OpenAiCompatibleClient,
    groq: OpenAiCompatibleClient,
    ollama: OllamaChatClient,
}

impl GenerationRouter {
    pub fn from_config(config: &GenerationConfig, http: &HttpContext) -> Self {
        Self {
            openai: OpenAiCompatibleClient::new(
                "openai",
                config.openai.clone(),
                "OPENAI_API_KEY",
                config.max_tokens,
                http.clone(),
            ),
            groq: OpenAiCompatibleClient::new(
                "groq",
                config.groq.clone(),
                "GROQ_API_KEY",
                config.max_tokens,
                http.clone(),
            ),
            ollama: OllamaChatClient::new(
                config.ollama.base_url.clone(),
                config.max_tokens,
                http.clone(),
            ),
        }
    }
}

#[async_trait]
impl GenerationClient for GenerationRouter {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, model: &str, provider: &str) -> RagResult<String> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        let answer = match provider.to_lowercase().as_str() {
            "openai" => self.openai.complete(model, &messages).await?,
            "groq" => self.groq.complete(model, &messages).await?,
            "ollama" => self.ollama.complete(model, &messages).await?,
            other => {
                return Err(RagError::Generation(format!(
                    "Unsupported generation provider: {other}"
                )))
            }
        };
        debug!(answer_len = answer.len(), "generation complete");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EndpointConfig;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_routes_by_provider_name() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{"role": "system", "content": SYSTEM_PROMPT}, {"role": "user", "content": "prompt"}],
                "temperature": 0.3,
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"answer"}}]}"#)
            .create_async()
            .await;

        let config = GenerationConfig {
            openai: EndpointConfig {
                base_url: server.url(),
                api_key: Some("sk-test".to_string()),
                temperature: 0.3,
            },
            ..GenerationConfig::default()
        };
        let router = GenerationRouter::from_config(
            &config,
            &HttpContext::without_retries(reqwest::Client::new()),
        );
        let answer = router.generate("prompt", "gpt-4o-mini", "OpenAI").await.unwrap();
        assert_eq!(answer, "answer");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let router = GenerationRouter::from_config(
            &GenerationConfig::default(),
            &HttpContext::without_retries(reqwest::Client::new()),
        );
        let err = router.generate("p", "m", "anthropic").await.unwrap_err();
        assert!(matches!(err, RagError::Generation(msg) if msg.contains("anthropic")));
    }
}
