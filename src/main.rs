//! Quarry main entry point
//!
//! This is the command-line interface for the Quarry crawler and extractor.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quarry::config::{load_config_with_hash, Config};
use quarry::crawler::run_crawl;
use quarry::output::{load_statistics, print_statistics};
use quarry::pipeline::{run_articles, run_quotes};
use quarry::schedule::{run_schedule, scheduled_jobs};
use quarry::storage::{open_storage, ArticleSource};
use quarry::summarize::{summarize_article, SummaryClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Quarry: a page-graph crawler and structured field extractor
///
/// Quarry walks same-domain link graphs, collects financial quote pages
/// into typed records, and harvests news articles from index pages. Every
/// visit is stored in SQLite and never fetched again by a later run.
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(version)]
#[command(about = "A page-graph crawler and structured field extractor", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the page graph from the configured start URL
    Web {
        /// Override the configured start URL
        #[arg(long)]
        start_url: Option<String>,

        /// Override the configured maximum depth
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Collect quote pages
    Quote {
        /// Instrument codes to collect instead of the configured ones
        #[arg(long = "code", value_name = "CODE")]
        codes: Vec<String>,
    },

    /// Harvest and collect news articles
    Articles {
        /// Only run sources of this kind
        #[arg(long, value_parser = parse_source)]
        source: Option<ArticleSource>,
    },

    /// Summarize a stored article
    Summarize {
        #[arg(long)]
        article_id: i64,
    },

    /// Show statistics from the database and exit
    Stats,

    /// Run every scheduled pipeline until interrupted
    Schedule,

    /// Validate the config and show what would run
    Check,
}

fn parse_source(value: &str) -> Result<ArticleSource, String> {
    ArticleSource::from_db_string(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown source '{}' (expected naver or cnn)", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Web {
            start_url,
            max_depth,
        } => handle_web(&config, &config_hash, start_url, max_depth).await,
        Command::Quote { codes } => handle_quote(&config, &config_hash, codes).await,
        Command::Articles { source } => handle_articles(&config, &config_hash, source).await,
        Command::Summarize { article_id } => handle_summarize(&config, article_id).await,
        Command::Stats => handle_stats(&config),
        Command::Schedule => handle_schedule(config, config_hash).await,
        Command::Check => handle_check(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("quarry=info,warn"),
            1 => EnvFilter::new("quarry=debug,info"),
            2 => EnvFilter::new("quarry=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Returns a receiver that flips to `true` on the first Ctrl-C
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn handle_web(
    config: &Config,
    config_hash: &str,
    start_url: Option<String>,
    max_depth: Option<u32>,
) -> anyhow::Result<()> {
    let Some(mut crawler) = config.crawler.clone() else {
        bail!("no [crawler] section in configuration");
    };
    if let Some(url) = start_url {
        crawler.start_url = url;
    }
    if let Some(depth) = max_depth {
        crawler.max_depth = depth;
    }

    let report = run_crawl(config, &crawler, config_hash, shutdown_signal())
        .await
        .context("crawl failed")?;

    println!(
        "Crawl {}: {} fetched ({} parsed, {} mismatched, {} failed), {} links saved",
        if report.interrupted { "interrupted" } else { "completed" },
        report.pages_fetched,
        report.pages_parsed,
        report.pages_mismatched,
        report.pages_failed,
        report.links_saved
    );
    Ok(())
}

async fn handle_quote(config: &Config, config_hash: &str, codes: Vec<String>) -> anyhow::Result<()> {
    let Some(quote) = &config.quote else {
        bail!("no [quote] section in configuration");
    };
    let codes = if codes.is_empty() {
        quote.codes.clone()
    } else {
        codes
    };

    let report = run_quotes(config, quote, &codes, config_hash, shutdown_signal())
        .await
        .context("quote run failed")?;

    println!(
        "Quotes: {} attempted, {} succeeded, {} failed",
        report.attempted, report.succeeded, report.failed
    );
    Ok(())
}

async fn handle_articles(
    config: &Config,
    config_hash: &str,
    source: Option<ArticleSource>,
) -> anyhow::Result<()> {
    if config.articles.is_empty() {
        bail!("no [[articles]] sections in configuration");
    }

    let reports = run_articles(config, source, config_hash, shutdown_signal())
        .await
        .context("article run failed")?;

    for (source, report) in reports {
        println!(
            "{}: {} links, {} saved, {} already stored, {} skipped, {} failed{}",
            source.to_db_string(),
            report.links_found,
            report.articles_saved,
            report.skipped_stored,
            report.skipped_mismatch,
            report.failed,
            if report.interrupted { " (interrupted)" } else { "" }
        );
    }
    Ok(())
}

async fn handle_summarize(config: &Config, article_id: i64) -> anyhow::Result<()> {
    let Some(summarizer) = &config.summarizer else {
        bail!("no [summarizer] section in configuration");
    };

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let client = SummaryClient::new(summarizer)?;
    let summary = summarize_article(&client, &storage, article_id).await?;

    match &summary.summary {
        Some(text) => println!("Summary:\n  {}", text),
        None => println!("No summary available"),
    }
    if !summary.keywords.is_empty() {
        println!("Keywords: {}", summary.keywords.join(", "));
    }
    Ok(())
}

/// Handles the stats command: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

async fn handle_schedule(config: Config, config_hash: String) -> anyhow::Result<()> {
    run_schedule(Arc::new(config), config_hash, shutdown_signal())
        .await
        .context("scheduler failed")?;
    tracing::info!("All schedulers stopped");
    Ok(())
}

/// Handles the check command: validates config and shows what would run
fn handle_check(config: &Config) -> anyhow::Result<()> {
    println!("=== Quarry Configuration Check ===\n");

    println!("Fetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Referrer: {}", config.fetch.referrer);
    println!("  Timeout: {}ms", config.fetch.timeout_ms);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    match &config.crawler {
        Some(crawler) => {
            println!("\nWeb crawl:");
            println!("  Start URL: {}", crawler.start_url);
            println!("  Max depth: {}", crawler.max_depth);
            println!("  Delay: {}-{}ms", crawler.min_delay_ms, crawler.max_delay_ms);
            if let Some(cap) = crawler.max_queue_size {
                println!("  Max queue size: {}", cap);
            }
        }
        None => println!("\nWeb crawl: not configured"),
    }

    match &config.quote {
        Some(quote) => {
            println!("\nQuotes ({} codes):", quote.codes.len());
            for code in &quote.codes {
                println!("  - {}", quote.url_for(code));
            }
        }
        None => println!("\nQuotes: not configured"),
    }

    println!("\nArticle sources ({}):", config.articles.len());
    for source in &config.articles {
        println!(
            "  - {} ({} index pages, delay {}-{}ms)",
            source.source.to_db_string(),
            source.index_urls.len(),
            source.min_delay_ms,
            source.max_delay_ms
        );
    }

    if let Some(summarizer) = &config.summarizer {
        println!("\nSummarizer: {}", summarizer.endpoint);
    }

    let jobs = scheduled_jobs(config);
    println!("\nScheduled jobs ({}):", jobs.len());
    for (job, interval) in jobs {
        println!(
            "  - {} every {}-{}s",
            job.scheduler_name(),
            interval.min_interval_secs,
            interval.max_interval_secs
        );
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
