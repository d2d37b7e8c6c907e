//! Chat completions against OpenAI-compatible APIs (OpenAI, Groq).

use serde::{Deserialize, Serialize};

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::EndpointConfig;
use crate::infrastructure::http::{send_with_retry, trim_base, HttpContext};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// One OpenAI-style endpoint with its credential and sampling temperature.
pub struct OpenAiCompatibleClient {
    provider: &'static str,
    endpoint: EndpointConfig,
    key_env: &'static str,
    max_tokens: u32,
    http: HttpContext,
}

impl OpenAiCompatibleClient {
    pub fn new(
        provider: &'static str,
        endpoint: EndpointConfig,
        key_env: &'static str,
        max_tokens: u32,
        http: HttpContext,
    ) -> Self {
        Self {
            provider,
            endpoint,
            key_env,
            max_tokens,
            http,
        }
    }

    /// Keys are resolved per call so an unused provider needs no credential.
    fn api_key(&self) -> RagResult<String> {
        self.endpoint
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(self.key_env).ok())
            .ok_or_else(|| {
                RagError::Generation(format!(
                    "{} API key not set. Set {} or configure generation.{}.api_key",
                    self.provider, self.key_env, self.provider
                ))
            })
    }

    pub async fn complete(&self, model: &str, messages: &[ChatMessage]) -> RagResult<String> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", trim_base(&self.endpoint.base_url));
        let body = ChatRequest {
            model,
            messages,
            temperature: self.endpoint.temperature,
            max_tokens: self.max_tokens,
        };

        let response = send_with_retry(&self.http.retry, || {
            self.http.client.post(&url).bearer_auth(&api_key).json(&body)
        })
        .await
        .map_err(|e| RagError::Generation(format!("{} request failed: {e}", self.provider)))?;

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            RagError::Generation(format!("{} returned an unexpected response: {e}", self.provider))
        })?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Generation(format!("{} returned no choices", self.provider)))
    }
}
