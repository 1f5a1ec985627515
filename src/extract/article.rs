//! Field extraction for news article pages

use crate::extract::html::{element_text, first_attr, first_text, non_empty, own_text};
use chrono::{Local, NaiveDateTime};
use scraper::{Html, Selector};
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("valid selector"));
    };
}

selector!(NAVER_MEDIA, "a.media_end_head_top_logo img");
selector!(NAVER_TITLE, "h2#title_area span");
selector!(NAVER_BODY, "div#newsct_article");
selector!(NAVER_DATE, "span.media_end_head_info_datestamp_time");
selector!(NAVER_AUTHOR, "em.media_end_head_journalist_name");
selector!(NAVER_CATEGORY, "li.Nlist_item._LNB_ITEM.is_active");

selector!(CNN_TITLE, "h1.headline__text");
selector!(CNN_PARAGRAPH, "div.article__content > p[data-component-name='paragraph']");
selector!(CNN_AUTHOR, "span.byline__name");
selector!(CNN_PUBLISHED, "div.timestamp__published");

/// `data-date-time` attribute format on Naver article pages
pub const NAVER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Publication line format on CNN article pages, e.g. `Aug 1, 2025, 10:15 AM`
pub const CNN_DATE_FORMAT: &str = "%b %d, %Y, %I:%M %p";

/// Outlet name stored for every CNN article
pub const CNN_MEDIA: &str = "CNN";

/// Fields read from an article detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleFields {
    pub media: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    /// Local time printed by the site
    pub published_at: Option<NaiveDateTime>,
    pub html_content: Option<String>,
}

/// Reads a Naver news article
///
/// The raw page is kept as `html_content`. An unparseable timestamp leaves
/// `published_at` empty.
pub fn extract_naver_article(document: &Html, raw_html: &str) -> ArticleFields {
    let root = document.root_element();

    let published_at = first_attr(root, &NAVER_DATE, "data-date-time").and_then(|stamp| {
        let parsed = parse_naver_timestamp(&stamp);
        if parsed.is_none() {
            tracing::warn!("Unparseable article timestamp: {}", stamp);
        }
        parsed
    });

    ArticleFields {
        media: first_attr(root, &NAVER_MEDIA, "title"),
        category: first_text(root, &NAVER_CATEGORY),
        title: first_text(root, &NAVER_TITLE),
        body: first_text(root, &NAVER_BODY),
        author: first_text(root, &NAVER_AUTHOR),
        published_at,
        html_content: Some(raw_html.to_string()),
    }
}

/// Parses a Naver `data-date-time` value
pub fn parse_naver_timestamp(stamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(stamp.trim(), NAVER_DATE_FORMAT).ok()
}

/// Reads a CNN article
///
/// Body paragraphs are joined by blank lines. A publication line that
/// cannot be parsed falls back to the current local time.
pub fn extract_cnn_article(document: &Html) -> ArticleFields {
    let root = document.root_element();

    let paragraphs: Vec<String> = root
        .select(&CNN_PARAGRAPH)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect();

    let author = root
        .select(&CNN_AUTHOR)
        .next()
        .map(own_text)
        .and_then(non_empty);

    let published_at = first_text(root, &CNN_PUBLISHED).map(|line| {
        parse_cnn_timestamp(&line).unwrap_or_else(|| {
            tracing::warn!("Unparseable publication line {:?}, using current time", line);
            Local::now().naive_local()
        })
    });

    ArticleFields {
        media: Some(CNN_MEDIA.to_string()),
        category: None,
        title: first_text(root, &CNN_TITLE),
        body: Some(paragraphs.join("\n\n")),
        author,
        published_at,
        html_content: None,
    }
}

/// Parses a CNN publication line such as `PUBLISHED Aug 1, 2025, 10:15 AM ET`
pub fn parse_cnn_timestamp(line: &str) -> Option<NaiveDateTime> {
    let cleaned = line.replace("PUBLISHED", "").replace(" ET", "");
    NaiveDateTime::parse_from_str(cleaned.trim(), CNN_DATE_FORMAT).ok()
}
