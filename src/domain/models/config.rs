use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::backend::{default_backend_options, BackendOptions};

/// Main configuration structure for Ragforge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory holding local index files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory receiving chart descriptors
    #[serde(default = "default_charts_dir")]
    pub charts_dir: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Embedding model selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Answer generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retrieval defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Outbound HTTP settings shared by every remote call
    #[serde(default)]
    pub http: HttpConfig,

    /// Per-backend option defaults, keyed by backend type name
    #[serde(default = "default_backend_options")]
    pub vector_databases: BTreeMap<String, BackendOptions>,
}

fn default_data_dir() -> String {
    ".ragforge/vector_dbs".to_string()
}

fn default_charts_dir() -> String {
    ".ragforge/charts".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            charts_dir: default_charts_dir(),
            logging: LoggingConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            retrieval: RetrievalConfig::default(),
            http: HttpConfig::default(),
            vector_databases: default_backend_options(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated JSON log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file logs (daily, hourly, never)
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Embedding model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider identifier (local, openai, ollama)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name understood by the provider
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Credential for hosted providers; falls back to the provider's env var
    #[serde(default)]
    pub api_key: Option<String>,

    /// Endpoint override for hosted or self-hosted providers
    #[serde(default)]
    pub base_url: Option<String>,

    /// Concurrent requests for providers that embed one text per call
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_embedding_provider() -> String {
    "local".to_string()
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

const fn default_max_concurrency() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            base_url: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Answer generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Default provider when a request names none
    #[serde(default = "default_generation_provider")]
    pub provider: String,

    /// Default model when a request names none
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_openai_endpoint")]
    pub openai: EndpointConfig,

    #[serde(default = "default_groq_endpoint")]
    pub groq: EndpointConfig,

    #[serde(default = "default_ollama_endpoint")]
    pub ollama: EndpointConfig,
}

fn default_generation_provider() -> String {
    "openai".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

const fn default_max_tokens() -> u32 {
    2000
}

fn default_openai_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        api_key: None,
        temperature: 0.3,
    }
}

fn default_groq_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.groq.com/openai/v1".to_string(),
        api_key: None,
        temperature: 0.1,
    }
}

fn default_ollama_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434".to_string(),
        api_key: None,
        temperature: 0.3,
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            openai: default_openai_endpoint(),
            groq: default_groq_endpoint(),
            ollama: default_ollama_endpoint(),
        }
    }
}

/// One generation provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EndpointConfig {
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

const fn default_temperature() -> f32 {
    0.3
}

/// Retrieval defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrievalConfig {
    /// Backend type used when a request names none
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Passages retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Texts embedded and written per batch during ingestion
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_backend() -> String {
    "faiss".to_string()
}

const fn default_top_k() -> usize {
    3
}

const fn default_batch_size() -> usize {
    32
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            top_k: default_top_k(),
            batch_size: default_batch_size(),
        }
    }
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_initial_backoff_ms() -> u64 {
    200
}

const fn default_max_backoff_ms() -> u64 {
    2000
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
