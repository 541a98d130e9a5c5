//! HTTP fetch collaborator
//!
//! Fetches a page, enforces a body size cap and hands back UTF-8 text.
//! The crawl core only sees the [`PageFetcher`] trait, so tests can swap in
//! an in-memory fetcher.

use anyhow::{Context, Result};
use async_trait::async_trait;
use encoding_rs::Encoding;
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT},
};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::charset::{decode_body, encoding_for_label};
use super::config::HttpConfig;

/// Why a page could not be fetched. Every variant is recoverable: the
/// caller skips the page or the enrichment and carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Unreadable body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request cancelled")]
    Cancelled,
}

/// A fetched page, already transcoded.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub encoding: &'static str,
}

/// Source of decoded HTML documents.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher with static headers and a cookie store
pub struct HttpClient {
    client: Client,
    fallback_encoding: &'static Encoding,
    max_body_bytes: usize,
    cancellation_token: CancellationToken,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let headers = Self::default_headers(config)?;

        let fallback_encoding = encoding_for_label(&config.fallback_encoding)
            .with_context(|| format!("Unknown fallback encoding: {}", config.fallback_encoding))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            fallback_encoding,
            max_body_bytes: config.max_body_bytes,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Abort in-flight requests when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    fn default_headers(config: &HttpConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let mut insert = |name: HeaderName, value: &str| -> Result<()> {
            let value = HeaderValue::from_str(value).with_context(|| format!("Invalid {name} header"))?;
            headers.insert(name, value);
            Ok(())
        };

        insert(USER_AGENT, &config.user_agent)?;
        insert(ACCEPT, &config.accept)?;
        insert(ACCEPT_LANGUAGE, &config.accept_language)?;
        if let Some(cookie) = &config.cookie {
            insert(COOKIE, cookie)?;
        }
        if let Some(referer) = &config.referer {
            insert(REFERER, referer)?;
        }

        Ok(headers)
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut response = self.client.get(url).send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let too_large = || FetchError::Body {
            url: url.to_string(),
            message: format!("body exceeds {} bytes", self.max_body_bytes),
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })? {
            if bytes.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }

        let (body, encoding) = decode_body(&bytes, content_type.as_deref(), self.fallback_encoding);
        debug!(url, status = status.as_u16(), bytes = bytes.len(), encoding = encoding.name(), "Fetched page");

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            body,
            encoding: encoding.name(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if self.cancellation_token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            result = self.fetch_inner(url) => result,
            () = self.cancellation_token.cancelled() => {
                warn!("HTTP request cancelled for URL: {}", url);
                Err(FetchError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_client_creation() {
        let config = HttpConfig {
            cookie: Some("PHPSESSID=abc123".into()),
            ..HttpConfig::default()
        };
        assert!(HttpClient::new(&config).is_ok());
    }

    #[test]
    fn invalid_header_is_rejected() {
        let config = HttpConfig {
            user_agent: "bad\nagent".into(),
            ..HttpConfig::default()
        };
        assert!(HttpClient::new(&config).is_err());
    }

    #[test]
    fn unknown_fallback_encoding_is_rejected() {
        let config = HttpConfig {
            fallback_encoding: "not-an-encoding".into(),
            ..HttpConfig::default()
        };
        assert!(HttpClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn cancelled_client_does_not_send() {
        let token = CancellationToken::new();
        token.cancel();
        let client = HttpClient::new(&HttpConfig::default()).unwrap().with_cancellation(token);
        assert_eq!(client.fetch("http://127.0.0.1:9/").await.unwrap_err(), FetchError::Cancelled);
    }

    #[test]
    fn fetch_errors_render_their_cause() {
        let error = FetchError::Status {
            status: 503,
            url: "https://smce2023.doae.go.th/x".into(),
        };
        assert_eq!(error.to_string(), "HTTP 503 from https://smce2023.doae.go.th/x");
    }
}
