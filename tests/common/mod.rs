//! Shared fixtures for integration tests.
//!
//! A four-dimensional keyword embedder with hand-placed vectors, a generator
//! that records every prompt, and an index service rooted in a temp dir.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use ragforge::adapters::vector_stores::VectorStoreFactory;
use ragforge::domain::models::{default_backend_options, IndexTarget};
use ragforge::domain::ports::{EmbeddingModel, GenerationClient, RawEmbedding};
use ragforge::infrastructure::http::HttpContext;
use ragforge::{EmbeddingProvider, IndexService, RagError, RagResult};

/// Embeds by keyword: "fruit" sits between "apple" and "orange", far from "car".
pub struct KeywordModel;

impl KeywordModel {
    pub fn vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        if lowered.contains("apple") {
            vec![1.0, 0.0, 0.0, 0.0]
        } else if lowered.contains("orange") {
            vec![0.8, 0.6, 0.0, 0.0]
        } else if lowered.contains("car") {
            vec![0.0, 0.0, 1.0, 0.0]
        } else if lowered.contains("fruit") {
            vec![0.95, 0.3, 0.0, 0.0]
        } else {
            vec![0.0, 0.0, 0.0, 1.0]
        }
    }
}

#[async_trait]
impl EmbeddingModel for KeywordModel {
    fn provider(&self) -> &'static str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-4"
    }

    fn declared_dimension(&self) -> Option<usize> {
        Some(4)
    }

    fn is_single_call(&self) -> bool {
        false
    }

    async fn embed_raw(&self, texts: &[String]) -> RagResult<RawEmbedding> {
        Ok(texts
            .iter()
            .map(|t| Self::vector(t))
            .collect::<Vec<_>>()
            .into())
    }
}

pub async fn keyword_provider() -> EmbeddingProvider {
    EmbeddingProvider::initialize(Arc::new(KeywordModel), 2)
        .await
        .unwrap()
}

/// One recorded generation request.
#[derive(Debug, Clone)]
pub struct GenerationCall {
    pub prompt: String,
    pub model: String,
    pub provider: String,
}

/// Returns a fixed reply and remembers what it was asked.
pub struct RecordingGenerator {
    reply: String,
    calls: Mutex<Vec<GenerationCall>>,
}

impl RecordingGenerator {
    pub fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for RecordingGenerator {
    async fn generate(&self, prompt: &str, model: &str, provider: &str) -> RagResult<String> {
        self.calls.lock().unwrap().push(GenerationCall {
            prompt: prompt.to_string(),
            model: model.to_string(),
            provider: provider.to_string(),
        });
        if provider == "broken" {
            return Err(RagError::Generation("provider unavailable".to_string()));
        }
        Ok(self.reply.clone())
    }
}

pub fn http() -> HttpContext {
    HttpContext::without_retries(reqwest::Client::new())
}

/// Index service over `{tmp}/vector_dbs` with built-in backend defaults.
pub fn index_service(dir: &TempDir) -> Arc<IndexService> {
    let factory = VectorStoreFactory::new(default_backend_options(), http());
    Arc::new(IndexService::new(dir.path().join("vector_dbs"), factory))
}

pub fn faiss() -> IndexTarget {
    IndexTarget::new("faiss")
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
