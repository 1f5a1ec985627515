//! URL handling module for Quarry
//!
//! This module provides domain extraction, link resolution, and the link
//! classifier used when recording link edges.

mod classify;
mod domain;
mod normalize;

// Re-export main functions
pub use classify::{classify_link, LinkType};
pub use domain::{extract_domain, same_domain};
pub use normalize::{parse_http_url, resolve_link};
