//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Page records and the link edges found on them
//! - Quote records (one per collection attempt)
//! - Article records keyed by article URL
//! - Run tracking for every pipeline invocation
//!
//! Records are created once and never updated; uniqueness constraints in the
//! schema are what make concurrent runs on the same database safe.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::PageState;
use crate::url::LinkType;
use crate::QuarryError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, QuarryError> {
    SqliteStorage::new(path)
}

/// A page visit ready to be persisted
#[derive(Debug, Clone)]
pub struct NewPage {
    pub url: String,
    pub domain: Option<String>,
    pub state: PageState,
    pub html_content: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub depth: u32,
    pub parent_id: Option<i64>,
    pub error_message: Option<String>,
}

/// Represents a page in the database
///
/// `parent_id` points at another row of the same table; it is a plain id and
/// deleting the parent leaves it dangling rather than cascading.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub url: String,
    pub domain: Option<String>,
    pub state: PageState,
    pub html_content: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub crawled_at: DateTime<Utc>,
    pub depth: u32,
    pub parent_id: Option<i64>,
    pub error_message: Option<String>,
}

/// A hyperlink found on a stored page
#[derive(Debug, Clone)]
pub struct NewLink {
    pub source_page_id: i64,
    pub link_url: String,
    pub link_text: Option<String>,
    pub link_type: LinkType,
}

/// Represents a link edge in the database
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub id: i64,
    pub source_page_id: i64,
    pub link_url: String,
    pub link_text: Option<String>,
    pub link_type: LinkType,
    pub crawled_at: DateTime<Utc>,
}

/// One collection attempt for a financial quote page
///
/// Successful attempts carry whatever fields were found; failed attempts
/// carry only the status and error message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteRecord {
    pub source_url: String,
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub current_price: Option<i32>,
    pub change_price: Option<String>,
    pub change_rate: Option<String>,
    pub sales_revenue: Option<i32>,
    pub oper_profit: Option<i32>,
    pub adjusted_oper_profit: Option<i32>,
    pub oper_profit_growth_rate: Option<String>,
    pub net_income: Option<i32>,
    pub earning_per_share: Option<String>,
    pub roe: Option<String>,
    pub opening_price: Option<i32>,
    pub high_price: Option<i32>,
    pub low_price: Option<i32>,
    pub ending_price: Option<i32>,
    pub market_cap: Option<String>,
    pub market_cap_rank: Option<String>,
    pub listed_shares_count: Option<i64>,
    pub par_value: Option<i32>,
    pub trading_unit: Option<i32>,
    pub investment_opinion: Option<String>,
    pub target_price: Option<i32>,
    pub fifty_two_week_high: Option<i32>,
    pub fifty_two_week_low: Option<i32>,
    pub current_per: Option<String>,
    pub current_eps: Option<i32>,
    pub pbr: Option<String>,
    pub bps: Option<i32>,
    pub dividend_yield: Option<String>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub collected_at: DateTime<Utc>,
}

impl QuoteRecord {
    /// Builds the record persisted when a quote page could not be used
    pub fn failure(source_url: &str, status_code: Option<u16>, error_message: String) -> Self {
        Self {
            source_url: source_url.to_string(),
            status_code,
            error_message: Some(error_message),
            collected_at: Utc::now(),
            ..Self::default()
        }
    }

    /// Returns true if this attempt produced data
    pub fn is_success(&self) -> bool {
        self.status_code == Some(200) && self.error_message.is_none()
    }
}

/// News site an article was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleSource {
    Naver,
    Cnn,
}

impl ArticleSource {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Naver => "naver",
            Self::Cnn => "cnn",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "naver" => Some(Self::Naver),
            "cnn" => Some(Self::Cnn),
            _ => None,
        }
    }
}

/// An extracted article ready to be persisted
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub article_url: String,
    pub source: ArticleSource,
    pub media: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub html_content: Option<String>,
    pub author: Option<String>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub published_at: Option<NaiveDateTime>,
}

/// Represents an article in the database
///
/// `published_at` is the local time printed by the source site. The
/// translation fields are filled by a downstream translator, never by a
/// crawl.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub article_url: String,
    pub source: ArticleSource,
    pub media: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub html_content: Option<String>,
    pub author: Option<String>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub published_at: Option<NaiveDateTime>,
    pub crawled_at: DateTime<Utc>,
    pub title_translated: Option<String>,
    pub body_translated: Option<String>,
    pub translated_at: Option<DateTime<Utc>>,
}

/// Represents a pipeline run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Which pipeline a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    Web,
    Quote,
    Articles,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Quote => "quote",
            Self::Articles => "articles",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "web" => Some(Self::Web),
            "quote" => Some(Self::Quote),
            "articles" => Some(Self::Articles),
            _ => None,
        }
    }
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
