//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Page title
//! - The `og:description` meta value
//! - Links to follow, with their anchor text

use crate::extract::html::{element_text, first_attr, first_text, non_empty};
use crate::url::resolve_link;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static OG_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("meta[property='og:description']").expect("valid selector")
});
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    /// Absolute URL without fragment
    pub url: Url,

    /// Anchor text, if any
    pub text: Option<String>,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Content of `<meta property="og:description">`
    pub meta_description: Option<String>,

    /// Distinct links on the page, in document order
    pub links: Vec<ExtractedLink>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Extraction Rules
///
/// Every `<a href>` is resolved against `base_url`. Fragment-only,
/// `javascript:`, `mailto:`, `tel:` and `data:` hrefs are dropped, as is
/// anything that does not resolve to http(s). A URL that appears more than
/// once keeps the anchor text of its first occurrence.
///
/// # Example
///
/// ```
/// use quarry::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url.as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let root = document.root_element();

    ParsedPage {
        title: first_text(root, &TITLE),
        meta_description: first_attr(root, &OG_DESCRIPTION, "content"),
        links: extract_links(&document, base_url),
    }
}

/// Extracts distinct absolute links from the document
fn extract_links(document: &Html, base_url: &Url) -> Vec<ExtractedLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ANCHOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_link(href, base_url) else {
            continue;
        };

        if seen.insert(url.as_str().to_string()) {
            links.push(ExtractedLink {
                url,
                text: non_empty(element_text(element)),
            });
        }
    }

    links
}
