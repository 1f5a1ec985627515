//! Canned-response fetcher shared by unit tests

use crate::crawler::fetcher::{FetchError, FetchIdentity, FetchResponse, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Serves canned responses and records which URLs were requested
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, (u16, &'static str, String)>,
    redirects: HashMap<String, String>,
    requested: Mutex<Vec<(String, String)>>,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages
            .insert(url.to_string(), (200, "text/html; charset=utf-8", body.to_string()));
        self
    }

    pub fn other(mut self, url: &str, status: u16, content_type: &'static str) -> Self {
        self.pages
            .insert(url.to_string(), (status, content_type, String::new()));
        self
    }

    /// Answers `from` with the page registered at `to`, as a followed redirect
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// URLs requested so far, in order
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Referrer sent with the request for `url`
    pub fn referrer_for(&self, url: &str) -> Option<String> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .find(|(requested, _)| requested == url)
            .map(|(_, referrer)| referrer.clone())
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url, identity: &FetchIdentity) -> Result<FetchResponse, FetchError> {
        self.requested
            .lock()
            .unwrap()
            .push((url.to_string(), identity.referrer.clone()));
        let final_url = match self.redirects.get(url.as_str()) {
            Some(target) => Url::parse(target).map_err(|e| FetchError::Connect(e.to_string()))?,
            None => url.clone(),
        };
        match self.pages.get(final_url.as_str()) {
            Some((status, content_type, body)) => Ok(FetchResponse {
                status: *status,
                content_type: Some(content_type.to_string()),
                body: body.clone(),
                final_url,
            }),
            None => Err(FetchError::Connect(format!("no route to {}", url))),
        }
    }
}

pub fn identity() -> FetchIdentity {
    FetchIdentity {
        user_agent: "Test/1.0".to_string(),
        referrer: "https://example.com/".to_string(),
        timeout: Duration::from_secs(1),
    }
}
