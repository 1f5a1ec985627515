//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Each pipeline run opens its own connection; WAL mode plus a busy timeout
//! lets concurrent runs share one database file.

use crate::state::PageState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    ArticleRecord, ArticleSource, LinkRecord, NewArticle, NewLink, NewPage, PageRecord,
    QuoteRecord, RunKind, RunRecord, RunStatus,
};
use crate::url::LinkType;
use crate::QuarryError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const PAGE_COLUMNS: &str = "id, url, domain, state, html_content, title, meta_description,
    status_code, content_type, crawled_at, depth, parent_id, error_message";

const ARTICLE_COLUMNS: &str = "id, article_url, source, media, category, title, body,
    html_content, author, status_code, error_message, published_at, crawled_at,
    title_translated, body_translated, translated_at";

const QUOTE_COLUMNS: &str = "source_url, stock_code, stock_name, current_price, change_price,
    change_rate, sales_revenue, oper_profit, adjusted_oper_profit, oper_profit_growth_rate,
    net_income, earning_per_share, roe, opening_price, high_price, low_price, ending_price,
    market_cap, market_cap_rank, listed_shares_count, par_value, trading_unit,
    investment_opinion, target_price, fifty_two_week_high, fifty_two_week_low, current_per,
    current_eps, pbr, bps, dividend_yield, status_code, error_message, collected_at";

const RUN_COLUMNS: &str = "id, kind, started_at, finished_at, config_hash, status";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and initializes the schema
    pub fn new(path: &Path) -> Result<Self, QuarryError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, QuarryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Decodes an enum column, failing the row when the stored text is unknown
fn decode<T>(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(StorageError::InvalidValue { column, value: raw }),
        )
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        domain: row.get(2)?,
        state: decode(row, 3, "pages.state", PageState::from_db_string)?,
        html_content: row.get(4)?,
        title: row.get(5)?,
        meta_description: row.get(6)?,
        status_code: row.get(7)?,
        content_type: row.get(8)?,
        crawled_at: row.get(9)?,
        depth: row.get(10)?,
        parent_id: row.get(11)?,
        error_message: row.get(12)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<LinkRecord> {
    Ok(LinkRecord {
        id: row.get(0)?,
        source_page_id: row.get(1)?,
        link_url: row.get(2)?,
        link_text: row.get(3)?,
        link_type: decode(row, 4, "links.link_type", LinkType::from_db_string)?,
        crawled_at: row.get(5)?,
    })
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleRecord> {
    Ok(ArticleRecord {
        id: row.get(0)?,
        article_url: row.get(1)?,
        source: decode(row, 2, "articles.source", ArticleSource::from_db_string)?,
        media: row.get(3)?,
        category: row.get(4)?,
        title: row.get(5)?,
        body: row.get(6)?,
        html_content: row.get(7)?,
        author: row.get(8)?,
        status_code: row.get(9)?,
        error_message: row.get(10)?,
        published_at: row.get(11)?,
        crawled_at: row.get(12)?,
        title_translated: row.get(13)?,
        body_translated: row.get(14)?,
        translated_at: row.get(15)?,
    })
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<QuoteRecord> {
    Ok(QuoteRecord {
        source_url: row.get(0)?,
        stock_code: row.get(1)?,
        stock_name: row.get(2)?,
        current_price: row.get(3)?,
        change_price: row.get(4)?,
        change_rate: row.get(5)?,
        sales_revenue: row.get(6)?,
        oper_profit: row.get(7)?,
        adjusted_oper_profit: row.get(8)?,
        oper_profit_growth_rate: row.get(9)?,
        net_income: row.get(10)?,
        earning_per_share: row.get(11)?,
        roe: row.get(12)?,
        opening_price: row.get(13)?,
        high_price: row.get(14)?,
        low_price: row.get(15)?,
        ending_price: row.get(16)?,
        market_cap: row.get(17)?,
        market_cap_rank: row.get(18)?,
        listed_shares_count: row.get(19)?,
        par_value: row.get(20)?,
        trading_unit: row.get(21)?,
        investment_opinion: row.get(22)?,
        target_price: row.get(23)?,
        fifty_two_week_high: row.get(24)?,
        fifty_two_week_low: row.get(25)?,
        current_per: row.get(26)?,
        current_eps: row.get(27)?,
        pbr: row.get(28)?,
        bps: row.get(29)?,
        dividend_yield: row.get(30)?,
        status_code: row.get(31)?,
        error_message: row.get(32)?,
        collected_at: row.get(33)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: decode(row, 1, "runs.kind", RunKind::from_db_string)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: decode(row, 5, "runs.status", RunStatus::from_db_string)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                Utc::now(),
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), Utc::now(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Pages =====

    fn find_page_by_url(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE url = ?1", PAGE_COLUMNS),
                params![url],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn find_page_by_id(&self, page_id: i64) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn save_page(&mut self, page: &NewPage) -> StorageResult<PageRecord> {
        let inserted = self.conn.execute(
            "INSERT INTO pages (url, domain, state, html_content, title, meta_description,
             status_code, content_type, crawled_at, depth, parent_id, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(url) DO NOTHING",
            params![
                page.url,
                page.domain,
                page.state.to_db_string(),
                page.html_content,
                page.title,
                page.meta_description,
                page.status_code,
                page.content_type,
                Utc::now(),
                page.depth,
                page.parent_id,
                page.error_message,
            ],
        )?;

        let stored = if inserted == 0 {
            tracing::debug!("Page {} already stored by another run", page.url);
            self.find_page_by_url(&page.url)?
        } else {
            self.find_page_by_id(self.conn.last_insert_rowid())?
        };

        stored.ok_or(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    // ===== Links =====

    fn save_link(&mut self, link: &NewLink) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO links (source_page_id, link_url, link_text, link_type, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                link.source_page_id,
                link.link_url,
                link.link_text,
                link.link_type.to_db_string(),
                Utc::now(),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn links_from(&self, page_id: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, source_page_id, link_url, link_text, link_type, crawled_at
             FROM links WHERE source_page_id = ?1 ORDER BY id",
        )?;

        let links = stmt
            .query_map(params![page_id], link_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    // ===== Quotes =====

    fn save_quote(&mut self, quote: &QuoteRecord) -> StorageResult<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO quotes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                 ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25,
                 ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34)",
                QUOTE_COLUMNS
            ),
            params![
                quote.source_url,
                quote.stock_code,
                quote.stock_name,
                quote.current_price,
                quote.change_price,
                quote.change_rate,
                quote.sales_revenue,
                quote.oper_profit,
                quote.adjusted_oper_profit,
                quote.oper_profit_growth_rate,
                quote.net_income,
                quote.earning_per_share,
                quote.roe,
                quote.opening_price,
                quote.high_price,
                quote.low_price,
                quote.ending_price,
                quote.market_cap,
                quote.market_cap_rank,
                quote.listed_shares_count,
                quote.par_value,
                quote.trading_unit,
                quote.investment_opinion,
                quote.target_price,
                quote.fifty_two_week_high,
                quote.fifty_two_week_low,
                quote.current_per,
                quote.current_eps,
                quote.pbr,
                quote.bps,
                quote.dividend_yield,
                quote.status_code,
                quote.error_message,
                quote.collected_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_quote(&self, source_url: &str) -> StorageResult<Option<QuoteRecord>> {
        let quote = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM quotes WHERE source_url = ?1
                     ORDER BY collected_at DESC, id DESC LIMIT 1",
                    QUOTE_COLUMNS
                ),
                params![source_url],
                quote_from_row,
            )
            .optional()?;
        Ok(quote)
    }

    // ===== Articles =====

    fn find_article_by_url(&self, article_url: &str) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM articles WHERE article_url = ?1",
                    ARTICLE_COLUMNS
                ),
                params![article_url],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn find_article_by_id(&self, article_id: i64) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                &format!("SELECT {} FROM articles WHERE id = ?1", ARTICLE_COLUMNS),
                params![article_id],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn save_article(&mut self, article: &NewArticle) -> StorageResult<ArticleRecord> {
        let inserted = self.conn.execute(
            "INSERT INTO articles (article_url, source, media, category, title, body,
             html_content, author, status_code, error_message, published_at, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(article_url) DO NOTHING",
            params![
                article.article_url,
                article.source.to_db_string(),
                article.media,
                article.category,
                article.title,
                article.body,
                article.html_content,
                article.author,
                article.status_code,
                article.error_message,
                article.published_at,
                Utc::now(),
            ],
        )?;

        let stored = if inserted == 0 {
            tracing::debug!("Article {} already stored by another run", article.article_url);
            self.find_article_by_url(&article.article_url)?
        } else {
            self.find_article_by_id(self.conn.last_insert_rowid())?
        };

        stored.ok_or(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    // ===== Statistics =====

    fn count_total_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM pages")
    }

    fn count_pages_by_state(&self, state: PageState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_unique_domains(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT domain) FROM pages")
    }

    fn get_depth_breakdown(&self) -> StorageResult<HashMap<u32, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT depth, COUNT(*) FROM pages GROUP BY depth ORDER BY depth")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut breakdown = HashMap::new();
        for row in rows {
            let (depth, count) = row?;
            breakdown.insert(depth, count as u64);
        }

        Ok(breakdown)
    }

    fn count_links(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM links")
    }

    fn count_quotes(&self) -> StorageResult<(u64, u64)> {
        let total = self.count("SELECT COUNT(*) FROM quotes")?;
        let succeeded =
            self.count("SELECT COUNT(*) FROM quotes WHERE status_code = 200 AND error_message IS NULL")?;
        Ok((total, succeeded))
    }

    fn count_articles_by_source(&self) -> StorageResult<HashMap<ArticleSource, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, COUNT(*) FROM articles GROUP BY source")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (source, count) = row?;
            if let Some(source) = ArticleSource::from_db_string(&source) {
                counts.insert(source, count as u64);
            }
        }

        Ok(counts)
    }
}
