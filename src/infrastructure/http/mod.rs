//! Shared HTTP plumbing for remote backends and model providers.

pub mod retry;

use std::time::Duration;

use crate::domain::errors::{RagError, RagResult};
use crate::domain::models::HttpConfig;

pub use retry::{send_with_retry, HttpError, RetryPolicy};

/// Build the process-wide client. Every request inherits `timeout_secs`.
pub fn build_client(config: &HttpConfig) -> RagResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(concat!("ragforge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RagError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Remote endpoint context handed to adapters: a client plus retry policy.
#[derive(Clone)]
pub struct HttpContext {
    pub client: reqwest::Client,
    pub retry: RetryPolicy,
}

impl HttpContext {
    pub fn from_config(config: &HttpConfig) -> RagResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            retry: RetryPolicy::from(config),
        })
    }

    /// Context without retries, for tests against mock servers.
    pub fn without_retries(client: reqwest::Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::none(),
        }
    }
}

/// Strip a trailing slash so paths can be appended with `format!`.
pub fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}
