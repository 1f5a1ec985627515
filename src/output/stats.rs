//! Statistics generation from the collection database
//!
//! This module provides functionality for extracting and displaying
//! statistics over everything the pipelines have stored.

use crate::state::PageState;
use crate::storage::{ArticleSource, RunRecord, Storage};
use crate::QuarryError;
use std::collections::HashMap;

/// Collection statistics summary
#[derive(Debug, Clone)]
pub struct CollectionStatistics {
    /// Total number of page visits stored
    pub total_pages: u64,

    /// Count of pages by state
    pub pages_by_state: HashMap<PageState, u64>,

    /// Number of unique domains visited
    pub unique_domains: u64,

    /// Total number of link edges stored
    pub total_links: u64,

    /// Pages per crawl depth
    pub depth_breakdown: HashMap<u32, u64>,

    /// Quote attempts, successful or not
    pub quotes_total: u64,

    pub quotes_succeeded: u64,

    /// Stored articles per source
    pub articles_by_source: HashMap<ArticleSource, u64>,

    /// Most recently started run of any kind
    pub latest_run: Option<RunRecord>,
}

impl CollectionStatistics {
    pub fn total_articles(&self) -> u64 {
        self.articles_by_source.values().sum()
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> Result<CollectionStatistics, QuarryError> {
    let mut pages_by_state = HashMap::new();
    for state in PageState::all_states() {
        let count = storage.count_pages_by_state(state)?;
        if count > 0 {
            pages_by_state.insert(state, count);
        }
    }

    let (quotes_total, quotes_succeeded) = storage.count_quotes()?;

    Ok(CollectionStatistics {
        total_pages: storage.count_total_pages()?,
        pages_by_state,
        unique_domains: storage.count_unique_domains()?,
        total_links: storage.count_links()?,
        depth_breakdown: storage.get_depth_breakdown()?,
        quotes_total,
        quotes_succeeded,
        articles_by_source: storage.count_articles_by_source()?,
        latest_run: storage.get_latest_run()?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CollectionStatistics) {
    println!("=== Collection Statistics ===\n");

    println!("Pages:");
    println!("  Total pages stored: {}", stats.total_pages);
    println!("  Unique domains: {}", stats.unique_domains);
    println!("  Total links found: {}", stats.total_links);
    println!();

    if !stats.pages_by_state.is_empty() {
        println!("Pages by State:");
        let mut state_counts: Vec<_> = stats.pages_by_state.iter().collect();
        state_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (state, count) in state_counts {
            println!(
                "  {}: {} ({:.1}%)",
                state.to_db_string(),
                count,
                percentage(*count, stats.total_pages)
            );
        }
        println!();
    }

    if !stats.depth_breakdown.is_empty() {
        println!("Pages by Depth:");
        let mut depths: Vec<_> = stats.depth_breakdown.iter().collect();
        depths.sort();
        for (depth, count) in depths {
            println!("  {}: {}", depth, count);
        }
        println!();
    }

    println!("Quotes:");
    println!(
        "  Attempts: {} ({} succeeded, {:.1}%)",
        stats.quotes_total,
        stats.quotes_succeeded,
        percentage(stats.quotes_succeeded, stats.quotes_total)
    );
    println!();

    println!("Articles: {}", stats.total_articles());
    let mut sources: Vec<_> = stats.articles_by_source.iter().collect();
    sources.sort_by_key(|(source, _)| source.to_db_string());
    for (source, count) in sources {
        println!("  {}: {}", source.to_db_string(), count);
    }
    println!();

    match &stats.latest_run {
        Some(run) => {
            let finished = run
                .finished_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "Latest run: #{} {} {} (started {}, finished {})",
                run.id,
                run.kind.to_db_string(),
                run.status.to_db_string(),
                run.started_at.to_rfc3339(),
                finished
            );
        }
        None => println!("Latest run: none"),
    }
}
