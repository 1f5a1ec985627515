//! Periodic triggers for the pipelines
//!
//! Each pipeline with a `[schedule.*]` section gets its own task that runs
//! the pipeline, then sleeps a random interval, forever. A failed run is
//! logged and the loop carries on. Shutdown cancels the sleep and ends the
//! loop; a run in progress finishes its current request first.

use crate::config::{Config, IntervalConfig};
use crate::crawler::{run_crawl, DelayRange, PauseOutcome, Throttle};
use crate::pipeline::{run_articles, run_quotes};
use crate::{ConfigError, QuarryError};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Pipeline kinds that can be scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Web,
    Quote,
    Articles,
}

impl Job {
    /// Name used in scheduler log lines
    pub fn scheduler_name(&self) -> &'static str {
        match self {
            Self::Web => "Web Crawler Scheduler",
            Self::Quote => "Quote Crawler Scheduler",
            Self::Articles => "Article Crawler Scheduler",
        }
    }

    fn method(&self) -> &'static str {
        match self {
            Self::Web => "run_crawl",
            Self::Quote => "run_quotes",
            Self::Articles => "run_articles",
        }
    }
}

/// Jobs that have both an interval and the pipeline section they trigger
pub fn scheduled_jobs(config: &Config) -> Vec<(Job, IntervalConfig)> {
    let schedule = &config.schedule;
    let mut jobs = Vec::new();

    if let (Some(interval), Some(_)) = (schedule.web, &config.crawler) {
        jobs.push((Job::Web, interval));
    }
    if let (Some(interval), Some(_)) = (schedule.quote, &config.quote) {
        jobs.push((Job::Quote, interval));
    }
    if let Some(interval) = schedule.articles {
        if !config.articles.is_empty() {
            jobs.push((Job::Articles, interval));
        }
    }

    jobs
}

/// Runs one job once and describes the outcome
pub async fn run_job(
    job: Job,
    config: &Config,
    config_hash: &str,
    shutdown: watch::Receiver<bool>,
) -> Result<String, QuarryError> {
    match job {
        Job::Web => {
            let crawler = config
                .crawler
                .as_ref()
                .ok_or_else(|| ConfigError::Validation("no [crawler] section".to_string()))?;
            let report = run_crawl(config, crawler, config_hash, shutdown).await?;
            Ok(format!(
                "{} pages fetched, {} links saved",
                report.pages_fetched, report.links_saved
            ))
        }
        Job::Quote => {
            let quote = config
                .quote
                .as_ref()
                .ok_or_else(|| ConfigError::Validation("no [quote] section".to_string()))?;
            let report = run_quotes(config, quote, &quote.codes, config_hash, shutdown).await?;
            Ok(format!(
                "{} quotes collected, {} failed",
                report.succeeded, report.failed
            ))
        }
        Job::Articles => {
            let reports = run_articles(config, None, config_hash, shutdown).await?;
            let saved: u64 = reports.iter().map(|(_, r)| r.articles_saved).sum();
            Ok(format!("{} articles saved from {} sources", saved, reports.len()))
        }
    }
}

/// Repeats `runner` with a jittered pause between runs until shutdown
///
/// Returns the number of runs started.
pub async fn run_job_loop<R, Fut>(
    job: Job,
    interval: IntervalConfig,
    shutdown: watch::Receiver<bool>,
    mut runner: R,
) -> u64
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<String, QuarryError>>,
{
    let range = DelayRange::new(
        interval.min_interval_secs.saturating_mul(1000),
        interval.max_interval_secs.saturating_mul(1000),
    );
    let mut throttle = Throttle::new(range, shutdown);
    let name = job.scheduler_name();
    let method = job.method();
    let mut runs = 0;

    while !throttle.is_interrupted() {
        runs += 1;
        tracing::info!("[SCHEDULER_START] {} - Method: {}", name, method);

        match runner().await {
            Ok(message) => tracing::info!(
                "[SCHEDULER_COMPLETION] {} - Method: {} - Result: {}",
                name,
                method,
                message
            ),
            Err(e) => tracing::error!(
                "[SCHEDULER_EXCEPTION] {} - Method: {} - Error: {}",
                name,
                method,
                e
            ),
        }

        if throttle.pause().await == PauseOutcome::Interrupted {
            break;
        }
    }

    tracing::info!("{} stopped after {} runs", name, runs);
    runs
}

/// Starts one loop per scheduled job and waits for all of them to stop
pub async fn run_schedule(
    config: Arc<Config>,
    config_hash: String,
    shutdown: watch::Receiver<bool>,
) -> Result<(), QuarryError> {
    let jobs = scheduled_jobs(&config);
    if jobs.is_empty() {
        return Err(ConfigError::Validation(
            "no [schedule.*] section matches a configured pipeline".to_string(),
        )
        .into());
    }

    let config_hash: Arc<str> = Arc::from(config_hash);
    let mut tasks = JoinSet::new();

    for (job, interval) in jobs {
        tracing::info!(
            "Scheduling {} every {}-{} s",
            job.scheduler_name(),
            interval.min_interval_secs,
            interval.max_interval_secs
        );

        let config = Arc::clone(&config);
        let config_hash = Arc::clone(&config_hash);
        let run_shutdown = shutdown.clone();
        let runner = move || {
            let config = Arc::clone(&config);
            let config_hash = Arc::clone(&config_hash);
            let shutdown = run_shutdown.clone();
            async move { run_job(job, &config, &config_hash, shutdown).await }
        };

        tasks.spawn(run_job_loop(job, interval, shutdown.clone(), runner));
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!("Scheduler task ended abnormally: {}", e);
        }
    }

    Ok(())
}
