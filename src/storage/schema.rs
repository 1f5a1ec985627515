//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Quarry database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track pipeline runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per visited URL; parent_id is a weak back-reference (no FK, no cascade)
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    domain TEXT,
    state TEXT NOT NULL,
    html_content TEXT,
    title TEXT,
    meta_description TEXT,
    status_code INTEGER,
    content_type TEXT,
    crawled_at TEXT NOT NULL,
    depth INTEGER NOT NULL,
    parent_id INTEGER,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_pages_domain ON pages(domain);
CREATE INDEX IF NOT EXISTS idx_pages_state ON pages(state);

-- Link edges found on stored pages
CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_page_id INTEGER NOT NULL REFERENCES pages(id),
    link_url TEXT NOT NULL,
    link_text TEXT,
    link_type TEXT NOT NULL,
    crawled_at TEXT NOT NULL,
    UNIQUE(source_page_id, link_url)
);

CREATE INDEX IF NOT EXISTS idx_links_source ON links(source_page_id);

-- One row per quote collection attempt
CREATE TABLE IF NOT EXISTS quotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_url TEXT NOT NULL,
    stock_code TEXT,
    stock_name TEXT,
    current_price INTEGER,
    change_price TEXT,
    change_rate TEXT,
    sales_revenue INTEGER,
    oper_profit INTEGER,
    adjusted_oper_profit INTEGER,
    oper_profit_growth_rate TEXT,
    net_income INTEGER,
    earning_per_share TEXT,
    roe TEXT,
    opening_price INTEGER,
    high_price INTEGER,
    low_price INTEGER,
    ending_price INTEGER,
    market_cap TEXT,
    market_cap_rank TEXT,
    listed_shares_count INTEGER,
    par_value INTEGER,
    trading_unit INTEGER,
    investment_opinion TEXT,
    target_price INTEGER,
    fifty_two_week_high INTEGER,
    fifty_two_week_low INTEGER,
    current_per TEXT,
    current_eps INTEGER,
    pbr TEXT,
    bps INTEGER,
    dividend_yield TEXT,
    status_code INTEGER,
    error_message TEXT,
    collected_at TEXT NOT NULL,
    UNIQUE(source_url, collected_at)
);

CREATE INDEX IF NOT EXISTS idx_quotes_source ON quotes(source_url);

-- Articles keyed by URL so a story is only ever fetched once
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_url TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    media TEXT,
    category TEXT,
    title TEXT,
    body TEXT,
    html_content TEXT,
    author TEXT,
    status_code INTEGER,
    error_message TEXT,
    published_at TEXT,
    crawled_at TEXT NOT NULL,
    title_translated TEXT,
    body_translated TEXT,
    translated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
