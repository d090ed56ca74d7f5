//! Resilient JSON fetching from the source API
//!
//! [`ResilientFetcher`] performs a GET with a per-attempt timeout and retries every
//! transient failure according to [`RetryConfig`]. The paginator and enricher only see
//! the [`JsonSource`] trait, so any other JSON source can be plugged in.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{RetryConfig, SourceConfig};
use crate::error::{Error, FetchError, Result};
use crate::retry::{Exhausted, retry_with_backoff};

/// Longest response body excerpt kept in a [`FetchError::Status`]
const ERROR_BODY_LIMIT: usize = 512;

/// A source of JSON documents addressed by URL
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Fetch the JSON document at `url`
    ///
    /// Implementations handle their own retries; an error means the document is
    /// unavailable for this run.
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// HTTP GET with bounded retry and a fixed inter-attempt delay
pub struct ResilientFetcher {
    client: reqwest::Client,
    retry: RetryConfig,
    request_timeout: Duration,
    auth_header: Option<String>,
}

impl ResilientFetcher {
    /// Create a fetcher for the given source settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(source: &SourceConfig, retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(source.request_timeout)
            .user_agent(source.user_agent.as_str())
            .build()
            .map_err(|e| Error::config("source", format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            retry,
            request_timeout: source.request_timeout,
            auth_header: source.auth_header.clone(),
        })
    }

    /// Fetch a JSON document, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] with the last attempt's error once attempts are exhausted,
    /// or immediately for a non-retryable error such as an unparseable URL.
    pub async fn fetch(&self, url: &str) -> Result<Value> {
        tracing::debug!(url, "Fetching");
        retry_with_backoff(&self.retry, || self.attempt(url))
            .await
            .map_err(|Exhausted { error, attempts }| Error::Fetch {
                url: url.to_string(),
                attempts,
                source: error,
            })
    }

    /// One request attempt, no retries
    async fn attempt(&self, url: &str) -> std::result::Result<Value, FetchError> {
        let url = url::Url::parse(url)?;

        let mut request = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(auth) = &self.auth_header {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }

    fn classify(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.request_timeout)
        } else {
            FetchError::Transport(error)
        }
    }
}

#[async_trait]
impl JsonSource for ResilientFetcher {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.fetch(url).await
    }
}

/// Join a path onto the source base URL
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
