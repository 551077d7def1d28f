//! HTTP access for pages and images, plus the direct-vs-browser strategy.
//!
//! Pages are read as text, images as raw bytes. Both follow redirects with the
//! desktop User-Agent. Any non-2xx status is an error here; [`FetchStrategy`]
//! decides whether that error means "try the browser".

pub mod canonical;
pub mod strategy;

use bytes::Bytes;
use reqwest::Url;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use canonical::{UrlError, canonicalize, resolve_reference};
pub use strategy::{FetchResult, FetchStrategy};

use url2md_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Chrome)
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: url2md_core::config::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 10,
        }
    }
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Response from a page fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL as requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Decoded response body
    pub body: String,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

/// Response from a binary download.
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
}

/// HTTP client shared by page fetches and image downloads.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }

    /// Fetch a page and decode its body as text.
    ///
    /// The charset from the Content-Type header is honoured when present.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .get(url.as_str())
            .header(header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let content_type = content_type(response.headers());

        let body = response
            .text()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, body, fetch_ms })
    }

    /// Download raw bytes, optionally sending a Referer header.
    pub async fn fetch_bytes(&self, url: &Url, referer: Option<&str>) -> Result<BinaryResponse, Error> {
        let response = self
            .http
            .get(url.as_str())
            .header(header::REFERER, referer.unwrap_or(""))
            .send()
            .await
            .map_err(|e| Error::HttpError(format!("network error: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::HttpError(format!("status {}", status.as_u16())));
        }

        let content_type = content_type(response.headers());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::HttpError(format!("failed to read response: {}", e)))?;

        Ok(BinaryResponse { content_type, bytes })
    }
}

fn content_type(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert!(config.user_agent.contains("Chrome/131.0.0.0"));
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 10);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app_config(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/page")
            .match_header("user-agent", "test-agent")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html><body>hello</body></html>")
            .create_async()
            .await;

        let client = FetchClient::new(FetchConfig { user_agent: "test-agent".into(), ..Default::default() }).unwrap();
        let url = Url::parse(&format!("{}/page", server.url())).unwrap();
        let response = client.fetch(&url).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "<html><body>hello</body></html>");
        assert_eq!(response.content_type.as_deref(), Some("text/html; charset=utf-8"));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/old")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;
        server.mock("GET", "/new").with_status(200).with_body("moved").create_async().await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/old", server.url())).unwrap();
        let response = client.fetch(&url).await.unwrap();

        assert_eq!(response.body, "moved");
        assert_eq!(response.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/missing").with_status(404).create_async().await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/missing", server.url())).unwrap();
        let result = client.fetch(&url).await;

        assert!(matches!(result, Err(Error::HttpError(msg)) if msg == "status 404"));
    }

    #[tokio::test]
    async fn test_fetch_bytes_with_referer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/img.png")
            .match_header("referer", "https://mp.weixin.qq.com/")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(vec![0u8; 256])
            .create_async()
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let url = Url::parse(&format!("{}/img.png", server.url())).unwrap();
        let response = client.fetch_bytes(&url, Some("https://mp.weixin.qq.com/")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.bytes.len(), 256);
        assert_eq!(response.content_type.as_deref(), Some("image/png"));
    }
}
