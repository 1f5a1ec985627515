//! Output module for reporting what has been collected
//!
//! This module handles:
//! - Loading statistics over pages, links, quotes and articles
//! - Printing them for the `stats` command

pub mod stats;

pub use stats::{load_statistics, print_statistics, CollectionStatistics};
