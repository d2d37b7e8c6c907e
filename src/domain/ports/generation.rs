//! Ports for the answer-generation and chart-extraction collaborators.

use async_trait::async_trait;

use crate::domain::errors::RagResult;
use crate::domain::models::ChartArtifact;

/// Language-model client that turns a composed prompt into an answer.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Any failure surfaces as `RagError::Generation` wrapping the provider's message.
    async fn generate(&self, prompt: &str, model: &str, provider: &str) -> RagResult<String>;
}

/// Turns a chart-task answer into a chart descriptor, when it contains one.
#[async_trait]
pub trait ChartExtractor: Send + Sync {
    async fn extract(&self, answer: &str) -> Option<ChartArtifact>;
}
