//! Fetch primitive used by the download cache.
//!
//! [`Fetcher`] is the seam between the cache and the network: one call, one
//! attempt, one timeout. [`HttpFetcher`] is the reqwest-backed implementation
//! used outside of tests.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::FetchError;
use crate::user_agent;

/// A single-attempt URL fetch.
///
/// Implementations must honour `timeout` for the whole attempt (connect,
/// headers and body) and return the complete body or an error; the cache
/// handles retries, staging and deduplication.
#[async_trait]
pub trait Fetcher: Send + Sync + Debug {
    /// Fetches the full body of `url` within `timeout`.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// HTTP(S) fetcher over a pooled reqwest client.
///
/// Create once and share; the underlying client pools connections.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Creates a fetcher with the default connect timeout (30 seconds).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::with_connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
    }

    /// Creates a fetcher with an explicit connect timeout.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self), fields(url = %url, timeout_ms = timeout.as_millis()))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        // Request timeout covers connect through the end of the body.
        let response = self
            .client
            .get(parsed)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_reqwest_error(url, timeout, e))?;
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "fetch complete");
        Ok(body)
    }
}

fn map_reqwest_error(url: &str, timeout: Duration, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url, timeout)
    } else {
        FetchError::network(url, error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/debian.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"version,codename".to_vec()))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/debian.csv", mock_server.uri());
        let body = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(body, b"version,codename");
    }

    #[tokio::test]
    async fn test_http_fetcher_maps_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/missing", mock_server.uri());
        match fetcher.fetch(&url, Duration::from_secs(5)).await {
            Err(FetchError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus(404), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out_slow_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"late".to_vec())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/slow", mock_server.uri());
        match fetcher.fetch(&url, Duration::from_millis(50)).await {
            Err(FetchError::Timeout { timeout, .. }) => {
                assert_eq!(timeout, Duration::from_millis(50));
            }
            other => panic!("Expected Timeout, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_invalid_url() {
        let fetcher = HttpFetcher::new();
        for url in ["not a url", "ftp://example.com/file"] {
            match fetcher.fetch(url, Duration::from_secs(1)).await {
                Err(FetchError::InvalidUrl { url: reported }) => assert_eq!(reported, url),
                other => panic!("Expected InvalidUrl for {url}, got: {other:?}"),
            }
        }
    }
}
