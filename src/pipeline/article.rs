//! Two-phase article pipeline
//!
//! Phase one fetches each index page and harvests article links from it.
//! Phase two visits every harvested article that is not already stored,
//! waiting a random delay before each detail request.

use crate::config::{ArticleSourceConfig, Config};
use crate::crawler::{DelayRange, FetchIdentity, Fetcher, HttpFetcher, PauseOutcome, Throttle};
use crate::extract::{extract_cnn_article, extract_naver_article, ArticleFields};
use crate::storage::{
    ArticleSource, NewArticle, RunKind, RunStatus, SqliteStorage, Storage, StorageResult,
};
use crate::url::{parse_http_url, resolve_link};
use crate::QuarryError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;
use tokio::sync::watch;
use url::Url;

static NAVER_INDEX_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a._NLOG_IMPRESSION").expect("valid selector"));
static CNN_INDEX_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.container__link.container__link--type-article[href]")
        .expect("valid selector")
});

static NAVER_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("valid regex"));
static CNN_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*cnn\.com/\d{4}/\d{2}/\d{2}/.*").expect("valid regex"));

/// A news site the article pipeline knows how to read
pub trait NewsSite: Send + Sync {
    fn source(&self) -> ArticleSource;

    /// Anchors on an index page that point at articles
    fn index_selector(&self) -> &Selector;

    /// Pattern an absolute article URL must match unless configured otherwise
    fn url_pattern(&self) -> &Regex;

    /// Referrer sent with detail requests unless configured otherwise
    fn referrer(&self) -> &'static str;

    /// Turns an index-page href into an article URL
    fn article_url(&self, href: &str, index_url: &Url) -> Option<Url> {
        resolve_link(href, index_url)
    }

    /// Reads the fields of one article page
    fn extract(&self, document: &Html, raw_html: &str) -> ArticleFields;
}

/// Naver News section pages
#[derive(Debug, Clone, Copy, Default)]
pub struct NaverNews;

impl NewsSite for NaverNews {
    fn source(&self) -> ArticleSource {
        ArticleSource::Naver
    }

    fn index_selector(&self) -> &Selector {
        &NAVER_INDEX_LINK
    }

    fn url_pattern(&self) -> &Regex {
        &NAVER_URL_PATTERN
    }

    fn referrer(&self) -> &'static str {
        "https://news.naver.com/"
    }

    /// Section pages link articles absolutely; relative hrefs are ads and widgets
    fn article_url(&self, href: &str, index_url: &Url) -> Option<Url> {
        if !href.trim_start().starts_with("http") {
            return None;
        }
        resolve_link(href, index_url)
    }

    fn extract(&self, document: &Html, raw_html: &str) -> ArticleFields {
        extract_naver_article(document, raw_html)
    }
}

/// CNN front and section pages
#[derive(Debug, Clone, Copy, Default)]
pub struct CnnNews;

impl NewsSite for CnnNews {
    fn source(&self) -> ArticleSource {
        ArticleSource::Cnn
    }

    fn index_selector(&self) -> &Selector {
        &CNN_INDEX_LINK
    }

    fn url_pattern(&self) -> &Regex {
        &CNN_URL_PATTERN
    }

    fn referrer(&self) -> &'static str {
        "https://edition.cnn.com/"
    }

    fn extract(&self, document: &Html, _raw_html: &str) -> ArticleFields {
        extract_cnn_article(document)
    }
}

/// Returns the site implementation for a source
pub fn news_site(source: ArticleSource) -> Box<dyn NewsSite> {
    match source {
        ArticleSource::Naver => Box::new(NaverNews),
        ArticleSource::Cnn => Box::new(CnnNews),
    }
}

/// Counters describing one article run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleReport {
    /// Index pages that returned a usable listing
    pub index_pages: u64,
    /// Distinct article URLs harvested
    pub links_found: u64,
    pub articles_saved: u64,
    pub skipped_stored: u64,
    /// Detail pages that were not a 200 HTML response
    pub skipped_mismatch: u64,
    /// Detail pages lost to a transport or storage error
    pub failed: u64,
    pub abandoned: usize,
    pub interrupted: bool,
}

/// Harvests and collects articles from one site
pub struct ArticlePipeline<F, S> {
    fetcher: F,
    storage: S,
    site: Box<dyn NewsSite>,
    index_identity: FetchIdentity,
    detail_identity: FetchIdentity,
    url_pattern: Option<Regex>,
    throttle: Throttle,
}

impl<F: Fetcher, S: Storage> ArticlePipeline<F, S> {
    /// Index pages are fetched with `identity`; detail pages with the
    /// same identity and the site's referrer.
    pub fn new(
        fetcher: F,
        storage: S,
        site: Box<dyn NewsSite>,
        identity: FetchIdentity,
        throttle: Throttle,
    ) -> Self {
        let detail_identity = identity.with_referrer(site.referrer());
        Self {
            fetcher,
            storage,
            site,
            index_identity: identity,
            detail_identity,
            url_pattern: None,
            throttle,
        }
    }

    /// Replaces the site's article URL pattern
    pub fn with_url_pattern(mut self, pattern: Regex) -> Self {
        self.url_pattern = Some(pattern);
        self
    }

    /// Replaces the site's detail referrer
    pub fn with_referrer(mut self, referrer: &str) -> Self {
        self.detail_identity = self.detail_identity.with_referrer(referrer);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn pattern(&self) -> &Regex {
        self.url_pattern.as_ref().unwrap_or_else(|| self.site.url_pattern())
    }

    /// Runs both phases over `index_urls`
    pub async fn run(&mut self, index_urls: &[Url]) -> ArticleReport {
        let mut report = ArticleReport::default();
        let source = self.site.source().to_db_string();
        tracing::info!("Starting {} article run over {} index pages", source, index_urls.len());

        let articles = self.harvest(index_urls, &mut report).await;
        self.collect(&articles, &mut report).await;

        tracing::info!(
            "{} article run finished: {} links, {} saved, {} already stored, {} failed",
            source,
            report.links_found,
            report.articles_saved,
            report.skipped_stored,
            report.failed
        );
        report
    }

    /// Phase one: fetches index pages and returns distinct article URLs in
    /// the order they were found
    pub async fn harvest(&mut self, index_urls: &[Url], report: &mut ArticleReport) -> Vec<Url> {
        let mut visited = HashSet::new();
        let mut articles = Vec::new();

        for index_url in index_urls {
            let response = match self.fetcher.fetch(index_url, &self.index_identity).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Failed to fetch index page {}: {}", index_url, e);
                    continue;
                }
            };
            if !response.is_html_ok() {
                tracing::warn!(
                    "Not parsing index page {}: {}",
                    index_url,
                    response.mismatch_message()
                );
                continue;
            }
            report.index_pages += 1;

            let found = self.article_links(&response.body, &response.final_url);
            tracing::debug!("Index page {} lists {} article links", index_url, found.len());

            for url in found {
                if visited.insert(url.as_str().to_string()) {
                    articles.push(url);
                }
            }
        }

        report.links_found = articles.len() as u64;
        articles
    }

    fn article_links(&self, body: &str, index_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(body);
        let pattern = self.pattern();

        document
            .select(self.site.index_selector())
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.site.article_url(href, index_url))
            .filter(|url| pattern.is_match(url.as_str()))
            .collect()
    }

    /// Phase two: fetches and stores each article not already in storage
    pub async fn collect(&mut self, articles: &[Url], report: &mut ArticleReport) {
        for (index, url) in articles.iter().enumerate() {
            match self.storage.find_article_by_url(url.as_str()) {
                Ok(Some(_)) => {
                    tracing::debug!("Skipping {}: already stored", url);
                    report.skipped_stored += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping {}: storage lookup failed: {}", url, e);
                    report.failed += 1;
                    continue;
                }
            }

            if self.throttle.pause().await == PauseOutcome::Interrupted {
                report.interrupted = true;
                report.abandoned = articles.len() - index;
                tracing::warn!("Article run interrupted, abandoning {} articles", report.abandoned);
                return;
            }

            match self.collect_one(url).await {
                Ok(true) => report.articles_saved += 1,
                Ok(false) => report.skipped_mismatch += 1,
                Err(e) => {
                    tracing::warn!("Error collecting article {}: {}", url, e);
                    report.failed += 1;
                }
            }
        }
    }

    /// Returns false when the page was not a 200 HTML response
    async fn collect_one(&mut self, url: &Url) -> Result<bool, QuarryError> {
        let response = self.fetcher.fetch(url, &self.detail_identity).await?;
        if !response.is_html_ok() {
            tracing::info!("Not parsing article {}: {}", url, response.mismatch_message());
            return Ok(false);
        }

        let fields = self
            .site
            .extract(&Html::parse_document(&response.body), &response.body);
        let id = self.save(url, fields, response.status)?;
        tracing::debug!("Saved article {} as {}", url, id);
        Ok(true)
    }

    fn save(&mut self, url: &Url, fields: ArticleFields, status: u16) -> StorageResult<i64> {
        let article = NewArticle {
            article_url: url.as_str().to_string(),
            source: self.site.source(),
            media: fields.media,
            category: fields.category,
            title: fields.title,
            body: fields.body,
            html_content: fields.html_content,
            author: fields.author,
            status_code: Some(status),
            error_message: None,
            published_at: fields.published_at,
        };
        Ok(self.storage.save_article(&article)?.id)
    }
}

fn index_urls(source: &ArticleSourceConfig) -> Result<Vec<Url>, QuarryError> {
    source
        .index_urls
        .iter()
        .map(|u| parse_http_url(u).map_err(QuarryError::from))
        .collect()
}

/// Runs the article pipeline for every configured source, or only those of
/// kind `only`, recorded as one `articles` run
///
/// Sources are processed in configuration order. An interrupt stops the
/// current source and skips the rest.
pub async fn run_articles(
    config: &Config,
    only: Option<ArticleSource>,
    config_hash: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<(ArticleSource, ArticleReport)>, QuarryError> {
    let selected: Vec<&ArticleSourceConfig> = config
        .articles
        .iter()
        .filter(|s| only.map_or(true, |kind| s.source == kind))
        .collect();

    let mut storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let run_id = storage.create_run(RunKind::Articles, config_hash)?;
    let fetcher = HttpFetcher::new()?;
    let identity = FetchIdentity::from_config(&config.fetch);

    let mut reports = Vec::new();
    let mut interrupted = false;

    for source in selected {
        let urls = index_urls(source)?;
        let throttle = Throttle::new(
            DelayRange::new(source.min_delay_ms, source.max_delay_ms),
            shutdown.clone(),
        );

        let mut pipeline = ArticlePipeline::new(
            fetcher.clone(),
            storage,
            news_site(source.source),
            identity.clone(),
            throttle,
        );
        if let Some(pattern) = &source.url_pattern {
            pipeline = pipeline.with_url_pattern(Regex::new(pattern).map_err(|e| {
                crate::ConfigError::InvalidPattern(format!("{}: {}", pattern, e))
            })?);
        }
        if let Some(referrer) = &source.referrer {
            pipeline = pipeline.with_referrer(referrer);
        }

        let report = pipeline.run(&urls).await;
        storage = pipeline.into_storage();
        interrupted = report.interrupted;
        reports.push((source.source, report));

        if interrupted {
            break;
        }
    }

    let status = if interrupted {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    storage.finish_run(run_id, status)?;

    Ok(reports)
}
