//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::PageState;
use crate::storage::{
    ArticleRecord, ArticleSource, LinkRecord, NewArticle, NewLink, NewPage, PageRecord,
    QuoteRecord, RunKind, RunRecord, RunStatus,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Lookups by key (`find_*`) return `Ok(None)` when nothing matches. Saves
/// return the stored record with its id; saving a URL that already exists
/// returns the existing row, so the first writer wins.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run of the given pipeline kind
    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Pages =====

    /// Finds a page by its URL
    fn find_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Finds a page by its ID
    fn find_page_by_id(&self, page_id: i64) -> StorageResult<Option<PageRecord>>;

    /// Saves a page visit, stamping it with the current time
    fn save_page(&mut self, page: &NewPage) -> StorageResult<PageRecord>;

    // ===== Links =====

    /// Saves a link edge
    ///
    /// Returns false when the `(source_page_id, link_url)` pair already exists.
    fn save_link(&mut self, link: &NewLink) -> StorageResult<bool>;

    /// Gets all link edges recorded for a page
    fn links_from(&self, page_id: i64) -> StorageResult<Vec<LinkRecord>>;

    // ===== Quotes =====

    /// Saves one quote collection attempt
    fn save_quote(&mut self, quote: &QuoteRecord) -> StorageResult<i64>;

    /// Gets the most recent attempt for a quote page
    fn latest_quote(&self, source_url: &str) -> StorageResult<Option<QuoteRecord>>;

    // ===== Articles =====

    /// Finds an article by its URL
    fn find_article_by_url(&self, article_url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Finds an article by its ID
    fn find_article_by_id(&self, article_id: i64) -> StorageResult<Option<ArticleRecord>>;

    /// Saves an article, stamping it with the current time
    fn save_article(&mut self, article: &NewArticle) -> StorageResult<ArticleRecord>;

    // ===== Statistics =====

    /// Gets total page count
    fn count_total_pages(&self) -> StorageResult<u64>;

    /// Counts pages by state
    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64>;

    /// Gets count of unique page domains
    fn count_unique_domains(&self) -> StorageResult<u64>;

    /// Gets page count breakdown by depth
    fn get_depth_breakdown(&self) -> StorageResult<HashMap<u32, u64>>;

    /// Counts the total number of link edges
    fn count_links(&self) -> StorageResult<u64>;

    /// Counts quote attempts as (total, successful)
    fn count_quotes(&self) -> StorageResult<(u64, u64)>;

    /// Counts articles per source
    fn count_articles_by_source(&self) -> StorageResult<HashMap<ArticleSource, u64>>;
}
