/// Page state definitions for recorded page visits
///
/// A page is fetched at most once, so every stored state is terminal.
use std::fmt;

/// Outcome of a single page visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Status 200 with an HTML body: title, description and links were extracted
    Parsed,

    /// Any other status or content type; recorded so the URL is never re-fetched
    ContentMismatch,

    /// Transport failure (DNS, connect, timeout, body read)
    Failed,
}

impl PageState {
    /// Returns true if this represents a successful visit
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Parsed)
    }

    /// Returns true if this represents an error outcome
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ContentMismatch | Self::Failed)
    }

    /// Converts the page state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::ContentMismatch => "content_mismatch",
            Self::Failed => "failed",
        }
    }

    /// Parses a page state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "parsed" => Some(Self::Parsed),
            "content_mismatch" => Some(Self::ContentMismatch),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible page states
    pub fn all_states() -> Vec<Self> {
        vec![Self::Parsed, Self::ContentMismatch, Self::Failed]
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
