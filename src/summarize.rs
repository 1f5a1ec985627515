//! Client for the external article summarization service
//!
//! The service takes `{"text": ...}` at `{endpoint}/api/v1/summarize` and
//! answers with a `responseCode`, a summary, and keywords. Only a
//! `responseCode` of 200 produces a filled [`Summary`]; every other outcome
//! is logged and yields an empty one.

use crate::config::SummarizerConfig;
use crate::storage::Storage;
use crate::QuarryError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SUMMARIZE_PATH: &str = "/api/v1/summarize";

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SummarizeResponse {
    #[serde(rename = "responseCode")]
    response_code: i64,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Summary and keywords for one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub summary: Option<String>,
    pub keywords: Vec<String>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.keywords.is_empty()
    }
}

/// HTTP client for the summarization service
#[derive(Debug, Clone)]
pub struct SummaryClient {
    client: Client,
    url: String,
    timeout: Duration,
}

impl SummaryClient {
    pub fn new(config: &SummarizerConfig) -> Result<Self, QuarryError> {
        Ok(Self::with_client(Client::builder().build()?, config))
    }

    pub fn with_client(client: Client, config: &SummarizerConfig) -> Self {
        Self {
            client,
            url: format!("{}{}", config.endpoint.trim_end_matches('/'), SUMMARIZE_PATH),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Summarizes `text`, returning an empty summary on any failure
    pub async fn summarize(&self, text: &str) -> Summary {
        match self.request(text).await {
            Ok(response) if response.response_code == 200 => Summary {
                summary: response.summary,
                keywords: response.keywords,
            },
            Ok(response) => {
                tracing::warn!(
                    "Summarization service answered with code {}",
                    response.response_code
                );
                Summary::default()
            }
            Err(e) => {
                tracing::error!("Summarization request to {} failed: {}", self.url, e);
                Summary::default()
            }
        }
    }

    async fn request(&self, text: &str) -> Result<SummarizeResponse, reqwest::Error> {
        self.client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&SummarizeRequest { text })
            .send()
            .await?
            .json()
            .await
    }
}

/// Summarizes the body of a stored article
pub async fn summarize_article<S: Storage>(
    client: &SummaryClient,
    storage: &S,
    article_id: i64,
) -> Result<Summary, QuarryError> {
    let article = storage
        .find_article_by_id(article_id)?
        .ok_or(QuarryError::ArticleNotFound(article_id))?;

    let Some(body) = article.body.filter(|b| !b.trim().is_empty()) else {
        tracing::warn!("Article {} has no body to summarize", article_id);
        return Ok(Summary::default());
    };

    tracing::info!("Summarizing article {} ({} chars)", article_id, body.chars().count());
    Ok(client.summarize(&body).await)
}
