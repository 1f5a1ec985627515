//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the `Fetcher` trait
//! - HTML parsing and link extraction
//! - The breadth-first frontier and randomized throttling
//! - Overall crawl coordination

mod coordinator;
#[cfg(test)]
pub(crate) mod fake;
mod fetcher;
mod frontier;
mod parser;
mod throttle;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, FetchError, FetchIdentity, FetchResponse, Fetcher, HttpFetcher,
};
pub use frontier::{CrawlTask, Frontier, Rejection};
pub use parser::{parse_html, ExtractedLink, ParsedPage};
pub use throttle::{DelayRange, PauseOutcome, Throttle};
