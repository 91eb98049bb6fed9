//! HTTP fetching with bounded transport retry.
//!
//! [`Fetch`] is the seam between the resolution engine and the network.
//! [`HttpFetcher`] is the reqwest-backed implementation: it retries
//! connection failures and timeouts with exponential backoff, and hands every
//! HTTP response back to the caller untouched, whatever its status. Deciding
//! whether a 403 or 429 is worth another go belongs to the caller.

pub mod mock;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

use crate::config::Config;
use crate::utils::{with_retry, HttpClient, RetryError, RetryPolicy, Retryable};

/// HTTP method of a [`FetchRequest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Add a header, replacing any earlier value with the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Look up a header value (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response of any status
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Builder-style setter for the Content-Type header
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.insert(CONTENT_TYPE, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Transport-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The target could not be turned into a request
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection refused, reset, DNS failure, broken body stream
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Every transport attempt failed
    #[error("Max retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded { attempts: u32, last: String },

    /// Non-2xx status where a success was required
    #[error("HTTP error: status {0}")]
    Http(u16),
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Connection(_) | FetchError::Timeout(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if err.is_builder() {
            FetchError::InvalidUrl(err.to_string())
        } else {
            FetchError::Connection(err.to_string())
        }
    }
}

/// Something that can perform HTTP requests
#[async_trait]
pub trait Fetch: Send + Sync + std::fmt::Debug {
    /// Perform a request. Non-2xx statuses are returned as responses.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;

    /// GET `url` and require a 2xx status
    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.fetch(&FetchRequest::get(url)).await?;
        if !response.is_success() {
            return Err(FetchError::Http(response.status));
        }
        Ok(response.body)
    }
}

/// reqwest-backed [`Fetch`] implementation
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: HttpClient,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Create a fetcher from configuration
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let client = HttpClient::new(&config.network)
            .map_err(|e| FetchError::Connection(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, config.fetch_retry_policy()))
    }

    /// Create with a custom HTTP client (for testing)
    pub fn with_client(client: HttpClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn send_once(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = url::Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.client().request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let result = with_retry(self.policy, |attempt| {
            tracing::trace!("Fetching {} (attempt {})", request.url, attempt);
            self.send_once(request)
        })
        .await;

        match result {
            Ok(response) => {
                tracing::debug!(
                    "{} -> {} ({} bytes)",
                    request.url,
                    response.status,
                    response.body.len()
                );
                Ok(response)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::warn!("Giving up on {} after {} attempts: {}", request.url, attempts, last);
                Err(FetchError::MaxRetriesExceeded {
                    attempts,
                    last: last.to_string(),
                })
            }
            Err(RetryError::Permanent(error)) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_fetcher(max_attempts: u32) -> HttpFetcher {
        HttpFetcher::with_client(
            HttpClient::with_user_agent("paperfetch-test").unwrap(),
            RetryPolicy::new(max_attempts, Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_request_header_replaces_existing() {
        let request = FetchRequest::get("https://example.org")
            .header("Accept", "text/html")
            .header("accept", "application/pdf");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header_value("ACCEPT"), Some("application/pdf"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Connection("refused".into()).is_retryable());
        assert!(FetchError::Timeout("30s".into()).is_retryable());
        assert!(!FetchError::InvalidUrl("x".into()).is_retryable());
        assert!(!FetchError::Http(503).is_retryable());
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not here")
            .expect(1)
            .create_async()
            .await;

        let fetcher = test_fetcher(3);
        let response = fetcher
            .fetch(&FetchRequest::get(format!("{}/missing", server.url())))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body, b"not here");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_requires_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/paper.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4 body")
            .create_async()
            .await;
        server
            .mock("GET", "/forbidden")
            .with_status(403)
            .create_async()
            .await;

        let fetcher = test_fetcher(3);
        let body = fetcher
            .download(&format!("{}/paper.pdf", server.url()))
            .await
            .unwrap();
        assert_eq!(body, b"%PDF-1.4 body");

        let err = fetcher
            .download(&format!("{}/forbidden", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Http(403));
    }

    #[tokio::test]
    async fn test_headers_and_post_body_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("accept", "application/pdf")
            .match_body("request=10.1038%2Fnature14539")
            .with_status(200)
            .create_async()
            .await;

        let fetcher = test_fetcher(1);
        let request = FetchRequest::post(format!("{}/", server.url()), "request=10.1038%2Fnature14539")
            .header("Accept", "application/pdf");
        let response = fetcher.fetch(&request).await.unwrap();

        assert_eq!(response.status, 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failures_exhaust_retries() {
        // Nothing listens on the discard port
        let fetcher = test_fetcher(3);
        let err = fetcher
            .fetch(&FetchRequest::get("http://127.0.0.1:9/paper"))
            .await
            .unwrap_err();

        match err {
            FetchError::MaxRetriesExceeded { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected MaxRetriesExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retried() {
        let fetcher = test_fetcher(3);
        let err = fetcher
            .fetch(&FetchRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
