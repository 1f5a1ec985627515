//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the breadth-first crawl loop, including:
//! - Depth bounding and the two dedup checks (run-scoped and stored)
//! - Coordinating fetching, parsing, and link extraction
//! - Persisting every visit, successful or not
//! - The mandatory delay after each fetch, and interrupts during it

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchIdentity, Fetcher, HttpFetcher};
use crate::crawler::frontier::{CrawlTask, Frontier, Rejection};
use crate::crawler::parser::{parse_html, ExtractedLink};
use crate::crawler::throttle::{DelayRange, PauseOutcome, Throttle};
use crate::state::PageState;
use crate::storage::{NewLink, NewPage, PageRecord, RunKind, RunStatus, SqliteStorage, Storage};
use crate::url::{classify_link, extract_domain, parse_http_url, same_domain};
use crate::QuarryError;
use std::path::Path;
use std::time::Instant;
use tokio::sync::watch;

/// Counters describing one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Tasks that reached the fetch step
    pub pages_fetched: u64,
    pub pages_parsed: u64,
    pub pages_mismatched: u64,
    pub pages_failed: u64,
    /// Tasks whose processing hit a storage error
    pub task_errors: u64,
    /// Distinct link edges written
    pub links_saved: u64,
    pub skipped_depth: u64,
    pub skipped_stored: u64,
    /// Tasks left in the queue when the run was interrupted
    pub abandoned: usize,
    pub interrupted: bool,
}

/// Main crawler coordinator structure
///
/// One coordinator drives one sequential crawl: it never has more than one
/// request in flight.
pub struct Coordinator<F, S> {
    fetcher: F,
    storage: S,
    identity: FetchIdentity,
    throttle: Throttle,
    max_queue_size: Option<usize>,
}

impl<F: Fetcher, S: Storage> Coordinator<F, S> {
    pub fn new(fetcher: F, storage: S, identity: FetchIdentity, throttle: Throttle) -> Self {
        Self {
            fetcher,
            storage,
            identity,
            throttle,
            max_queue_size: None,
        }
    }

    /// Caps the number of pending tasks
    pub fn with_max_queue_size(mut self, max_queue_size: Option<usize>) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Runs the main crawl loop from `start_url`
    ///
    /// Tasks deeper than `max_depth` and URLs already in storage are skipped
    /// without a fetch or a delay. Every other task is fetched, persisted,
    /// and followed by a random delay. The run ends when the queue drains or
    /// a shutdown request interrupts a delay.
    pub async fn run(&mut self, start_url: &url::Url, max_depth: u32) -> Result<CrawlReport, QuarryError> {
        tracing::info!("Starting crawl of {} (max depth {})", start_url, max_depth);

        let mut frontier = Frontier::new(CrawlTask::root(start_url.clone()), self.max_queue_size);
        let mut report = CrawlReport::default();
        let start_time = Instant::now();

        while let Some(task) = frontier.pop() {
            if task.depth > max_depth {
                tracing::debug!("Skipping {}: depth {} > {}", task.url, task.depth, max_depth);
                report.skipped_depth += 1;
                continue;
            }

            let stored = self.storage.find_page_by_url(task.url.as_str());
            match stored {
                Ok(Some(_)) => {
                    tracing::debug!("Skipping {}: already stored", task.url);
                    report.skipped_stored += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Skipping {}: storage lookup failed: {}", task.url, e);
                    report.task_errors += 1;
                    continue;
                }
            }

            report.pages_fetched += 1;
            if let Err(e) = self
                .process_task(&task, max_depth, &mut frontier, &mut report)
                .await
            {
                tracing::warn!("Error processing {}: {}", task.url, e);
                report.task_errors += 1;
            }

            if report.pages_fetched % 10 == 0 {
                let elapsed = start_time.elapsed();
                let rate = report.pages_fetched as f64 / elapsed.as_secs_f64();
                tracing::info!(
                    "Progress: {} pages crawled, {} in queue, {:.2} pages/sec",
                    report.pages_fetched,
                    frontier.len(),
                    rate
                );
            }

            if self.throttle.pause().await == PauseOutcome::Interrupted {
                report.interrupted = true;
                report.abandoned = frontier.len();
                tracing::warn!(
                    "Crawl interrupted, abandoning {} queued tasks",
                    report.abandoned
                );
                break;
            }
        }

        tracing::info!(
            "Crawl finished: {} fetched ({} parsed, {} mismatched, {} failed), {} links in {:?}",
            report.pages_fetched,
            report.pages_parsed,
            report.pages_mismatched,
            report.pages_failed,
            report.links_saved,
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Fetches one task and persists the outcome
    async fn process_task(
        &mut self,
        task: &CrawlTask,
        max_depth: u32,
        frontier: &mut Frontier,
        report: &mut CrawlReport,
    ) -> Result<(), QuarryError> {
        let parent_id = match task.parent_id {
            Some(id) => self.storage.find_page_by_id(id)?.map(|parent| parent.id),
            None => None,
        };

        let mut page = NewPage {
            url: task.url.as_str().to_string(),
            domain: extract_domain(&task.url),
            state: PageState::Failed,
            html_content: None,
            title: None,
            meta_description: None,
            status_code: None,
            content_type: None,
            depth: task.depth,
            parent_id,
            error_message: None,
        };

        let fetched = self.fetcher.fetch(&task.url, &self.identity).await;
        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", task.url, e);
                page.error_message = Some(e.to_string());
                self.storage.save_page(&page)?;
                report.pages_failed += 1;
                return Ok(());
            }
        };

        page.status_code = Some(response.status);
        page.content_type = response.content_type.clone();

        if !response.is_html_ok() {
            let message = response.mismatch_message();
            tracing::info!("Not parsing {}: {}", task.url, message);
            page.state = PageState::ContentMismatch;
            page.error_message = Some(message);
            self.storage.save_page(&page)?;
            report.pages_mismatched += 1;
            return Ok(());
        }

        let parsed = parse_html(&response.body, &response.final_url);
        page.state = PageState::Parsed;
        page.title = parsed.title;
        page.meta_description = parsed.meta_description;
        page.html_content = Some(response.body);

        let record = self.storage.save_page(&page)?;
        report.pages_parsed += 1;
        tracing::debug!(
            "Parsed {} (depth {}, {} links)",
            task.url,
            task.depth,
            parsed.links.len()
        );

        report.links_saved += self.handle_links(
            task,
            &response.final_url,
            &record,
            &parsed.links,
            max_depth,
            frontier,
        )?;
        Ok(())
    }

    /// Saves the link edges of a page and enqueues crawlable targets
    ///
    /// A target is enqueued only if it is on the same domain, unseen this
    /// run, within the depth bound, and not already stored. Domains are taken
    /// from `base`, the URL the page was served from after redirects; the page
    /// itself stays stored under the requested URL.
    fn handle_links(
        &mut self,
        task: &CrawlTask,
        base: &url::Url,
        page: &PageRecord,
        links: &[ExtractedLink],
        max_depth: u32,
        frontier: &mut Frontier,
    ) -> Result<u64, QuarryError> {
        let mut saved = 0;
        let base_domain = extract_domain(base).unwrap_or_default();

        for link in links {
            let edge = NewLink {
                source_page_id: page.id,
                link_url: link.url.as_str().to_string(),
                link_text: link.text.clone(),
                link_type: classify_link(link.url.as_str(), &base_domain),
            };
            if self.storage.save_link(&edge)? {
                saved += 1;
            }

            if !same_domain(base, &link.url)
                || frontier.is_visited(&link.url)
                || task.depth + 1 > max_depth
            {
                continue;
            }

            if self.storage.find_page_by_url(link.url.as_str())?.is_some() {
                continue;
            }

            if let Err(Rejection::QueueFull) = frontier.push(task.child(link.url.clone(), page.id)) {
                tracing::debug!("Queue full, dropping {}", link.url);
            }
        }

        Ok(saved)
    }
}

/// Runs a complete generic crawl
///
/// This function:
/// 1. Opens the storage database
/// 2. Records a run of kind `web`
/// 3. Builds the HTTP fetcher and throttle
/// 4. Drains the crawl queue
/// 5. Marks the run completed, interrupted or failed
///
/// # Example
///
/// ```no_run
/// use quarry::config::load_config_with_hash;
/// use quarry::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("quarry.toml"))?;
/// let crawler = config.crawler.clone().unwrap();
/// let (_tx, shutdown) = tokio::sync::watch::channel(false);
/// run_crawl(&config, &crawler, &hash, shutdown).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    crawler: &CrawlerConfig,
    config_hash: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<CrawlReport, QuarryError> {
    let start_url = parse_http_url(&crawler.start_url)?;

    let mut storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let run_id = storage.create_run(RunKind::Web, config_hash)?;

    let throttle = Throttle::new(
        DelayRange::new(crawler.min_delay_ms, crawler.max_delay_ms),
        shutdown,
    );
    let mut coordinator = Coordinator::new(
        HttpFetcher::new()?,
        storage,
        FetchIdentity::from_config(&config.fetch),
        throttle,
    )
    .with_max_queue_size(crawler.max_queue_size);

    let result = coordinator.run(&start_url, crawler.max_depth).await;

    let status = match &result {
        Ok(report) if report.interrupted => RunStatus::Interrupted,
        Ok(_) => RunStatus::Completed,
        Err(_) => RunStatus::Failed,
    };
    coordinator.storage_mut().finish_run(run_id, status)?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::fake::{identity, FakeFetcher};
    use url::Url;

    fn coordinator(fetcher: FakeFetcher) -> Coordinator<FakeFetcher, SqliteStorage> {
        Coordinator::new(
            fetcher,
            SqliteStorage::open_in_memory().unwrap(),
            identity(),
            Throttle::uninterruptible(DelayRange::none()),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn site() -> FakeFetcher {
        FakeFetcher::default()
            .page(
                "https://example.com/",
                r#"<html><head><title>Home</title></head><body>
                    <a href="/a">A</a>
                    <a href="/b">B</a>
                    <a href="/a">A again</a>
                    <a href="https://other.com/x">Other</a>
                    <a href="/report.pdf">Report</a>
                </body></html>"#,
            )
            .page(
                "https://example.com/a",
                r#"<html><body><a href="/">Home</a><a href="/c">C</a></body></html>"#,
            )
            .page("https://example.com/b", "<html><body>B</body></html>")
            .page(
                "https://example.com/c",
                r#"<html><body><a href="/d">D</a></body></html>"#,
            )
            .page("https://example.com/d", "<html><body>D</body></html>")
            .other("https://example.com/report.pdf", 200, "application/pdf")
    }

    #[tokio::test]
    async fn test_crawl_respects_depth_bound() {
        let mut coordinator = coordinator(site());
        let report = coordinator.run(&url("https://example.com/"), 1).await.unwrap();

        let storage = coordinator.storage();
        assert_eq!(storage.count_total_pages().unwrap(), 4);
        assert!(storage.find_page_by_url("https://example.com/c").unwrap().is_none());
        assert!(storage.get_depth_breakdown().unwrap().keys().all(|d| *d <= 1));
        assert_eq!(report.pages_parsed, 3);
        assert_eq!(report.pages_mismatched, 1);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_crawl_records_parent_and_depth() {
        let mut coordinator = coordinator(site());
        coordinator.run(&url("https://example.com/"), 3).await.unwrap();

        let storage = coordinator.storage();
        let root = storage.find_page_by_url("https://example.com/").unwrap().unwrap();
        let a = storage.find_page_by_url("https://example.com/a").unwrap().unwrap();
        let c = storage.find_page_by_url("https://example.com/c").unwrap().unwrap();
        let d = storage.find_page_by_url("https://example.com/d").unwrap().unwrap();

        assert_eq!(root.depth, 0);
        assert_eq!(root.parent_id, None);
        assert_eq!(root.title, Some("Home".to_string()));
        assert_eq!(a.parent_id, Some(root.id));
        assert_eq!(c.depth, 2);
        assert_eq!(c.parent_id, Some(a.id));
        assert_eq!(d.depth, 3);
    }

    #[tokio::test]
    async fn test_links_are_unique_and_classified() {
        let mut coordinator = coordinator(site());
        coordinator.run(&url("https://example.com/"), 0).await.unwrap();

        let storage = coordinator.storage();
        let root = storage.find_page_by_url("https://example.com/").unwrap().unwrap();
        let links = storage.links_from(root.id).unwrap();

        let urls: Vec<&str> = links.iter().map(|l| l.link_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "https://other.com/x",
                "https://example.com/report.pdf"
            ]
        );
        assert_eq!(links[0].link_text, Some("A".to_string()));
        assert_eq!(links[2].link_type, crate::url::LinkType::External);
        assert_eq!(links[3].link_type, crate::url::LinkType::Internal);
    }

    #[tokio::test]
    async fn test_cross_domain_links_not_followed() {
        let mut coordinator = coordinator(site());
        coordinator.run(&url("https://example.com/"), 2).await.unwrap();

        let requested = coordinator.fetcher.requested();
        assert!(!requested.iter().any(|u| u.contains("other.com")));
        // Each URL is fetched once even though several pages link to it.
        let mut deduped = requested.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), requested.len());
    }

    #[tokio::test]
    async fn test_redirected_page_uses_final_domain() {
        let fetcher = FakeFetcher::default()
            .redirect("https://example.com/", "https://www.news.example.org/home")
            .page(
                "https://www.news.example.org/home",
                r#"<html><body>
                    <a href="/story">Story</a>
                    <a href="https://example.com/old">Old host</a>
                </body></html>"#,
            )
            .page("https://www.news.example.org/story", "<html><body>S</body></html>")
            .page("https://example.com/old", "<html><body>O</body></html>");

        let mut coordinator = coordinator(fetcher);
        coordinator.run(&url("https://example.com/"), 2).await.unwrap();

        let requested = coordinator.fetcher.requested();
        assert_eq!(
            requested,
            vec!["https://example.com/", "https://www.news.example.org/story"]
        );

        let storage = coordinator.storage();
        let root = storage
            .find_page_by_url("https://example.com/")
            .unwrap()
            .expect("root stored under the requested URL");
        let links = storage.links_from(root.id).unwrap();
        let story = links
            .iter()
            .find(|l| l.link_url == "https://www.news.example.org/story")
            .unwrap();
        assert_eq!(story.link_type, crate::url::LinkType::Internal);
    }

    #[tokio::test]
    async fn test_content_mismatch_is_persisted() {
        let mut coordinator = coordinator(site());
        coordinator.run(&url("https://example.com/"), 1).await.unwrap();

        let pdf = coordinator
            .storage()
            .find_page_by_url("https://example.com/report.pdf")
            .unwrap()
            .unwrap();
        assert_eq!(pdf.state, PageState::ContentMismatch);
        assert_eq!(pdf.status_code, Some(200));
        assert_eq!(pdf.content_type, Some("application/pdf".to_string()));
        assert_eq!(
            pdf.error_message,
            Some("Non-HTML content or non-200 status: 200, Type: application/pdf".to_string())
        );
        assert!(pdf.html_content.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_stop_crawl() {
        let fetcher = FakeFetcher::default().page(
            "https://example.com/",
            r#"<html><body><a href="/missing">Gone</a><a href="/ok">Ok</a></body></html>"#,
        )
        .page("https://example.com/ok", "<html><body>ok</body></html>");

        let mut coordinator = coordinator(fetcher);
        let report = coordinator.run(&url("https://example.com/"), 1).await.unwrap();

        let missing = coordinator
            .storage()
            .find_page_by_url("https://example.com/missing")
            .unwrap()
            .unwrap();
        assert_eq!(missing.state, PageState::Failed);
        assert!(missing.status_code.is_none());
        assert!(missing.error_message.unwrap().contains("no route"));
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.pages_parsed, 2);
    }

    #[tokio::test]
    async fn test_second_run_fetches_nothing_stored() {
        let mut coordinator = coordinator(site());
        coordinator.run(&url("https://example.com/"), 2).await.unwrap();
        let first_pages = coordinator.storage().count_total_pages().unwrap();
        let first_links = coordinator.storage().count_links().unwrap();

        let storage = coordinator.into_storage();
        let mut second = Coordinator::new(
            site(),
            storage,
            identity(),
            Throttle::uninterruptible(DelayRange::none()),
        );
        let report = second.run(&url("https://example.com/"), 2).await.unwrap();

        assert!(second.fetcher.requested().is_empty());
        assert_eq!(report.skipped_stored, 1);
        assert_eq!(second.storage().count_total_pages().unwrap(), first_pages);
        assert_eq!(second.storage().count_links().unwrap(), first_links);
    }

    #[tokio::test]
    async fn test_queue_cap_limits_enqueued_tasks() {
        let mut coordinator = coordinator(site()).with_max_queue_size(Some(1));
        coordinator.run(&url("https://example.com/"), 1).await.unwrap();

        // The root was popped before its links were seen, so one slot was free.
        assert_eq!(coordinator.storage().count_total_pages().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_interrupt_abandons_queue() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let mut coordinator = Coordinator::new(
            site(),
            SqliteStorage::open_in_memory().unwrap(),
            identity(),
            Throttle::new(DelayRange::new(1000, 1000), rx),
        );
        let report = coordinator.run(&url("https://example.com/"), 2).await.unwrap();

        assert!(report.interrupted);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.abandoned, 3);
        assert_eq!(coordinator.storage().count_total_pages().unwrap(), 1);
    }
}
