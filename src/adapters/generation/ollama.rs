//! Chat against a local Ollama server.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::openai_compatible::ChatMessage;
use crate::domain::errors::{RagError, RagResult};
use crate::infrastructure::http::{send_with_retry, trim_base, HttpContext};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

pub struct OllamaChatClient {
    base_url: String,
    max_tokens: u32,
    http: HttpContext,
}

impl OllamaChatClient {
    pub fn new(base_url: impl Into<String>, max_tokens: u32, http: HttpContext) -> Self {
        Self {
            base_url: base_url.into(),
            max_tokens,
            http,
        }
    }

    pub async fn complete(&self, model: &str, messages: &[ChatMessage]) -> RagResult<String> {
        let url = format!("{}/api/chat", trim_base(&self.base_url));
        let body = OllamaChatRequest {
            model,
            messages,
            stream: false,
            options: json!({ "num_predict": self.max_tokens }),
        };

        let response = send_with_retry(&self.http.retry, || self.http.client.post(&url).json(&body))
            .await
            .map_err(|e| RagError::Generation(format!("ollama request failed: {e}")))?;
        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("ollama returned an unexpected response: {e}")))?;
        Ok(parsed.message.content)
    }
}
