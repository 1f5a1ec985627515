/// File extensions treated as image links
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg"];

/// File extensions treated as document links
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// Category of a hyperlink relative to the page's domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Internal,
    External,
    Image,
    Document,
    Unknown,
}

impl LinkType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Image => "image",
            Self::Document => "document",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(Self::Internal),
            "external" => Some(Self::External),
            "image" => Some(Self::Image),
            "document" => Some(Self::Document),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Classifies a link relative to a base domain
///
/// Rules are checked in order and the first match wins:
/// 1. empty URL → `Unknown`
/// 2. URL contains the base domain → `Internal`
/// 3. image extension → `Image`
/// 4. office/PDF extension → `Document`
/// 5. otherwise → `External`
///
/// An empty base domain never matches rule 2.
///
/// # Examples
///
/// ```
/// use quarry::url::{classify_link, LinkType};
///
/// assert_eq!(classify_link("https://example.com/a", "example.com"), LinkType::Internal);
/// assert_eq!(classify_link("https://cdn.io/x.png", "example.com"), LinkType::Image);
/// assert_eq!(classify_link("https://other.com/page", "example.com"), LinkType::External);
/// ```
pub fn classify_link(url: &str, base_domain: &str) -> LinkType {
    if url.trim().is_empty() {
        return LinkType::Unknown;
    }

    if !base_domain.is_empty() && url.contains(base_domain) {
        return LinkType::Internal;
    }

    if has_extension(url, IMAGE_EXTENSIONS) {
        return LinkType::Image;
    }

    if has_extension(url, DOCUMENT_EXTENSIONS) {
        return LinkType::Document;
    }

    LinkType::External
}

/// Returns true when the URL ends with `.ext` for one of the extensions
fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let lowered = url.to_ascii_lowercase();
    match lowered.rsplit_once('.') {
        Some((_, ext)) => extensions.contains(&ext),
        None => false,
    }
}
