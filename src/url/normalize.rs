use crate::{UrlError, UrlResult};
use url::Url;

/// Href prefixes that never produce a crawlable link
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Parses an absolute http(s) URL
///
/// # Examples
///
/// ```
/// use quarry::url::parse_http_url;
///
/// assert!(parse_http_url("https://example.com/").is_ok());
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty and fragment-only hrefs
/// - javascript:, mailto:, tel: and data: hrefs
/// - hrefs that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped so `/a#top` and `/a` are the
/// same crawl target.
///
/// # Examples
///
/// ```
/// use quarry::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/news/").unwrap();
/// let link = resolve_link("story?id=1#comments", &base).unwrap();
/// assert_eq!(link.as_str(), "https://example.com/news/story?id=1");
/// assert!(resolve_link("mailto:desk@example.com", &base).is_none());
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    absolute.set_fragment(None);
    Some(absolute)
}
