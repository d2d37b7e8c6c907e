//! Retry of transient HTTP failures with exponential backoff.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use reqwest::{RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::warn;

use crate::domain::models::HttpConfig;

/// How many times, and how patiently, to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(0),
            max_backoff: Duration::from_millis(0),
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

/// Failed HTTP exchange after retries were exhausted or ruled out.
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    /// The server answered with a non-success status; carries the body.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// No response: connection refused, timeout, TLS failure.
    #[error("request failed: {0}")]
    Transport(String),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Transport(_) => true,
        }
    }
}

async fn attempt(request: RequestBuilder) -> Result<Response, HttpError> {
    let response = request
        .send()
        .await
        .map_err(|e| HttpError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read response body".to_string());
    Err(HttpError::Status { status, body })
}

/// Send a request, retrying connection errors, timeouts, 429 and 5xx.
///
/// `build` is called once per attempt because a sent request cannot be
/// reused. Non-success responses become [`HttpError`] with the body as
/// message.
pub async fn send_with_retry<F>(policy: &RetryPolicy, mut build: F) -> Result<Response, HttpError>
where
    F: FnMut() -> RequestBuilder,
{
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_backoff)
        .with_max_interval(policy.max_backoff)
        .with_max_elapsed_time(None)
        .build();
    let max_retries = policy.max_retries;
    let mut attempts = 0u32;

    backoff::future::retry(backoff, || {
        attempts += 1;
        let current = attempts;
        let request = build();
        async move {
            match attempt(request).await {
                Ok(response) => Ok(response),
                Err(err) if err.is_transient() && current <= max_retries => {
                    warn!(attempt = current, error = %err, "transient HTTP failure, retrying");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_server_error_without_retries_fails_once() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let url = format!("{}/flaky", server.url());
        let client = reqwest::Client::new();

        let err = send_with_retry(&fast_policy(0), || client.get(&url))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_success_is_returned() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_body("fine")
            .create_async()
            .await;
        let url = format!("{}/ok", server.url());
        let client = reqwest::Client::new();

        let response = send_with_retry(&fast_policy(2), || client.get(&url))
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "fine");
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("no such collection")
            .expect(1)
            .create_async()
            .await;
        let url = format!("{}/missing", server.url());
        let client = reqwest::Client::new();

        let err = send_with_retry(&fast_policy(3), || client.get(&url))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "HTTP 404 Not Found: no such collection");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_last_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/busy")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;
        let url = format!("{}/busy", server.url());
        let client = reqwest::Client::new();

        let err = send_with_retry(&fast_policy(2), || client.post(&url))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        let client = reqwest::Client::new();

        let err = send_with_retry(&fast_policy(0), || client.get("http://127.0.0.1:1/unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)));
        assert_eq!(err.status(), None);
        assert!(err.to_string().starts_with("request failed: "));
    }
}
