use crate::storage::ArticleSource;
use serde::Deserialize;

/// Browser-like identity sent with every request unless overridden
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.75 Safari/537.36";

/// Referrer sent by the page and quote crawlers
pub const DEFAULT_REFERRER: &str = "https://www.naver.com";

/// Main configuration structure for Quarry
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    pub crawler: Option<CrawlerConfig>,
    pub quote: Option<QuoteConfig>,
    #[serde(default)]
    pub articles: Vec<ArticleSourceConfig>,
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// HTTP identity and timeout shared by all pipelines
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_referrer")]
    pub referrer: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referrer: default_referrer(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Generic page crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URL the breadth-first walk starts from
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Inclusive bound on task depth
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    #[serde(rename = "min-delay-ms", default = "default_crawl_min_delay")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_crawl_max_delay")]
    pub max_delay_ms: u64,

    /// Upper bound on pending tasks; links beyond it are not enqueued
    #[serde(rename = "max-queue-size")]
    pub max_queue_size: Option<usize>,
}

/// Financial quote crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    /// Quote page URL prefix; the instrument code is appended
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Instrument codes collected on each run
    pub codes: Vec<String>,

    #[serde(rename = "min-delay-ms", default = "default_crawl_min_delay")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_crawl_max_delay")]
    pub max_delay_ms: u64,
}

impl QuoteConfig {
    /// Builds the quote page URL for one instrument code
    pub fn url_for(&self, code: &str) -> String {
        format!("{}{}", self.base_url, code)
    }
}

/// One article source: its index pages and detail-fetch policy
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleSourceConfig {
    pub source: ArticleSource,

    /// Listing pages harvested for article links
    #[serde(rename = "index-urls")]
    pub index_urls: Vec<String>,

    /// Referrer sent with detail requests; the source default when absent
    pub referrer: Option<String>,

    /// Regex an absolute article URL must match; the source default when absent
    #[serde(rename = "url-pattern")]
    pub url_pattern: Option<String>,

    #[serde(rename = "min-delay-ms", default = "default_article_min_delay")]
    pub min_delay_ms: u64,

    #[serde(rename = "max-delay-ms", default = "default_article_max_delay")]
    pub max_delay_ms: u64,
}

/// Summarization service endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    /// Base URL; requests go to `{endpoint}/api/v1/summarize`
    pub endpoint: String,

    #[serde(rename = "timeout-ms", default = "default_summarizer_timeout")]
    pub timeout_ms: u64,
}

/// Periodic trigger intervals, one per pipeline kind
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    pub web: Option<IntervalConfig>,
    pub quote: Option<IntervalConfig>,
    pub articles: Option<IntervalConfig>,
}

/// Jittered interval between two scheduled runs (seconds)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IntervalConfig {
    #[serde(rename = "min-interval-secs")]
    pub min_interval_secs: u64,

    #[serde(rename = "max-interval-secs")]
    pub max_interval_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_referrer() -> String {
    DEFAULT_REFERRER.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_crawl_min_delay() -> u64 {
    1_000
}

fn default_crawl_max_delay() -> u64 {
    4_000
}

fn default_article_min_delay() -> u64 {
    30_000
}

fn default_article_max_delay() -> u64 {
    60_000
}

fn default_summarizer_timeout() -> u64 {
    30_000
}
