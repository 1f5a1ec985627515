//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipelines, including:
//! - Building the shared HTTP client
//! - Sending GET requests with a fixed browser-like identity
//! - Reporting status and Content-Type without judging them
//! - Classifying transport failures
//!
//! HTTP error statuses and non-HTML content types are returned as ordinary
//! responses; deciding what to do with them is the caller's job.

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Transport-level failures: the request never produced a response
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Redirect failed: {0}")]
    Redirect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        let message = error.to_string();
        if error.is_timeout() {
            Self::Timeout(message)
        } else if error.is_connect() {
            Self::Connect(message)
        } else if error.is_redirect() {
            Self::Redirect(message)
        } else if error.is_body() || error.is_decode() {
            Self::Body(message)
        } else {
            Self::Request(message)
        }
    }
}

/// Identity headers and timeout sent with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchIdentity {
    pub user_agent: String,
    pub referrer: String,
    pub timeout: Duration,
}

impl FetchIdentity {
    /// Builds the identity described by the `[fetch]` config section
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            referrer: config.referrer.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Returns the same identity with a different referrer
    pub fn with_referrer(&self, referrer: &str) -> Self {
        Self {
            referrer: referrer.to_string(),
            ..self.clone()
        }
    }
}

/// A response, whatever its status or content type
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    /// URL after redirects
    pub final_url: Url,
}

impl FetchResponse {
    /// Returns true for a 200 response whose Content-Type starts with `text/html`
    pub fn is_html_ok(&self) -> bool {
        self.status == 200
            && self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("text/html"))
    }

    /// Describes why the response will not be parsed
    pub fn mismatch_message(&self) -> String {
        format!(
            "Non-HTML content or non-200 status: {}, Type: {}",
            self.status,
            self.content_type.as_deref().unwrap_or("")
        )
    }
}

/// Performs one GET request
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` with the given identity
    ///
    /// Any status code and any content type is a successful fetch; only
    /// transport problems produce a `FetchError`.
    async fn fetch(&self, url: &Url, identity: &FetchIdentity) -> Result<FetchResponse, FetchError>;
}

/// Builds the HTTP client shared by all requests
///
/// Redirects are followed with reqwest's default policy. Identity headers
/// and the timeout are set per request from a [`FetchIdentity`].
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, identity: &FetchIdentity) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &identity.user_agent)
            .header(REFERER, &identity.referrer)
            .timeout(identity.timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        tracing::trace!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(FetchResponse {
            status,
            content_type,
            body,
            final_url,
        })
    }
}
