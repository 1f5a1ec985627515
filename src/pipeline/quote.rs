//! Quote pipeline: one fetch and one record per instrument page

use crate::config::{Config, QuoteConfig};
use crate::crawler::{DelayRange, FetchIdentity, Fetcher, HttpFetcher, PauseOutcome, Throttle};
use crate::extract::{extract_quote_fields, normalize_quote};
use crate::storage::{QuoteRecord, RunKind, RunStatus, SqliteStorage, Storage, StorageResult};
use crate::url::parse_http_url;
use crate::QuarryError;
use scraper::Html;
use std::path::Path;
use tokio::sync::watch;
use url::Url;

/// Counters describing one quote run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteReport {
    pub attempted: u64,
    pub succeeded: u64,
    /// Attempts persisted as failure records
    pub failed: u64,
    /// Attempts whose record could not be written
    pub task_errors: u64,
    /// Pages not attempted because the run was interrupted
    pub abandoned: usize,
    pub interrupted: bool,
}

/// Collects quote pages one at a time
pub struct QuotePipeline<F, S> {
    fetcher: F,
    storage: S,
    identity: FetchIdentity,
    throttle: Throttle,
}

impl<F: Fetcher, S: Storage> QuotePipeline<F, S> {
    pub fn new(fetcher: F, storage: S, identity: FetchIdentity, throttle: Throttle) -> Self {
        Self {
            fetcher,
            storage,
            identity,
            throttle,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Fetches one quote page and persists exactly one record for it
    ///
    /// A transport failure or a response that is not a 200 HTML page is
    /// recorded as a failure. Anything else is a success, however few
    /// fields the page yielded.
    pub async fn collect(&mut self, url: &Url) -> StorageResult<QuoteRecord> {
        let record = match self.fetcher.fetch(url, &self.identity).await {
            Err(e) => {
                tracing::warn!("Failed to fetch quote page {}: {}", url, e);
                QuoteRecord::failure(url.as_str(), None, e.to_string())
            }
            Ok(response) if !response.is_html_ok() => {
                let message = response.mismatch_message();
                tracing::warn!("Not parsing quote page {}: {}", url, message);
                QuoteRecord::failure(url.as_str(), Some(response.status), message)
            }
            Ok(response) => {
                let fields = extract_quote_fields(&Html::parse_document(&response.body));
                tracing::debug!("Extracted {} quote fields from {}", fields.len(), url);
                normalize_quote(url.as_str(), &fields)
            }
        };

        let id = self.storage.save_quote(&record)?;
        tracing::debug!("Saved quote record {} for {}", id, url);
        Ok(record)
    }

    /// Collects every page in order, pausing between consecutive pages
    pub async fn run(&mut self, urls: &[Url]) -> QuoteReport {
        let mut report = QuoteReport::default();

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && self.throttle.pause().await == PauseOutcome::Interrupted {
                report.interrupted = true;
                report.abandoned = urls.len() - index;
                tracing::warn!("Quote run interrupted, abandoning {} pages", report.abandoned);
                break;
            }

            report.attempted += 1;
            match self.collect(url).await {
                Ok(record) if record.is_success() => report.succeeded += 1,
                Ok(_) => report.failed += 1,
                Err(e) => {
                    tracing::warn!("Could not save quote record for {}: {}", url, e);
                    report.task_errors += 1;
                }
            }
        }

        tracing::info!(
            "Quote run finished: {} attempted, {} succeeded, {} failed",
            report.attempted,
            report.succeeded,
            report.failed
        );
        report
    }
}

/// Runs the quote pipeline for `codes`, recorded as a `quote` run
///
/// Every code is validated as part of a URL before any request is made.
pub async fn run_quotes(
    config: &Config,
    quote: &QuoteConfig,
    codes: &[String],
    config_hash: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<QuoteReport, QuarryError> {
    let urls = codes
        .iter()
        .map(|code| parse_http_url(&quote.url_for(code)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let run_id = storage.create_run(RunKind::Quote, config_hash)?;

    let throttle = Throttle::new(DelayRange::new(quote.min_delay_ms, quote.max_delay_ms), shutdown);
    let mut pipeline = QuotePipeline::new(
        HttpFetcher::new()?,
        storage,
        FetchIdentity::from_config(&config.fetch),
        throttle,
    );

    tracing::info!("Collecting {} quote pages", urls.len());
    let report = pipeline.run(&urls).await;

    let status = if report.interrupted {
        RunStatus::Interrupted
    } else {
        RunStatus::Completed
    };
    pipeline.storage_mut().finish_run(run_id, status)?;

    Ok(report)
}
