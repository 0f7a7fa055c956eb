//! Client-side disablement lookup for test runners.
//!
//! A runner asks once per (repository, project, branch, environment)
//! context which tests are disabled, caches the answer with a TTL, and
//! checks individual tests against the cached map. Server unavailability
//! is handled per the configured [`FailurePolicy`]; the default runs the
//! tests rather than blocking the suite.

mod cache;

pub use cache::DisablementCache;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DisabledTestsResponse, EvaluateDisabledRequest};

/// HTTP connect timeout for disablement fetches.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default HTTP total timeout for disablement fetches.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from a disablement fetch.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// What a cache lookup does when the server cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Treat every test as enabled (the suite runs).
    #[default]
    FailOpen,
    /// Surface the error to the caller.
    FailClosed,
}

/// The runtime context a runner evaluates disablement under.
///
/// One cache entry exists per distinct key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub repository: String,
    pub project_name: Option<String>,
    pub branch: Option<String>,
    pub base_url: Option<String>,
}

impl ContextKey {
    fn to_request(&self) -> EvaluateDisabledRequest {
        EvaluateDisabledRequest {
            repository: Some(self.repository.clone()),
            test_ids: None,
            project_name: self.project_name.clone(),
            branch: self.branch.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Source of disablement responses; the cache is generic over this so
/// tests can substitute a scripted fetcher.
#[async_trait]
pub trait DisablementFetcher: Send + Sync + 'static {
    async fn fetch_disabled(
        &self,
        context: &ContextKey,
    ) -> Result<DisabledTestsResponse, ClientError>;
}

/// Fetches disablement state from the server over HTTP.
pub struct HttpFetcher {
    server_url: String,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher against the given server base URL with the default
    /// 5 second request timeout.
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(server_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a fetcher with an explicit total request timeout.
    pub fn with_timeout(server_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl DisablementFetcher for HttpFetcher {
    async fn fetch_disabled(
        &self,
        context: &ContextKey,
    ) -> Result<DisabledTestsResponse, ClientError> {
        let url = format!("{}/api/v1/tests/disabled", self.server_url);

        let response = self
            .http_client
            .post(&url)
            .json(&context.to_request())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout
                } else {
                    ClientError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        response
            .json::<DisabledTestsResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_context() -> ContextKey {
        ContextKey {
            repository: "acme/web".to_string(),
            project_name: None,
            branch: Some("main".to_string()),
            base_url: None,
        }
    }

    #[test]
    fn test_server_url_is_normalized() {
        let fetcher = HttpFetcher::new("http://localhost:8080/").unwrap();
        assert_eq!(fetcher.server_url, "http://localhost:8080");
    }

    // A listener that accepts but never answers distinguishes the request
    // timeout from a connect failure.
    #[tokio::test]
    async fn test_custom_request_timeout_is_enforced() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let fetcher =
            HttpFetcher::with_timeout(&format!("http://{addr}"), Duration::from_millis(100))
                .unwrap();
        let err = fetcher.fetch_disabled(&any_context()).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
    }
}
