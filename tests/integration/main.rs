//! Integration tests for the pipelines
//!
//! These tests use wiremock to create mock HTTP servers and drive each
//! pipeline end-to-end against a real SQLite file.

mod article_tests;
mod common;
mod crawl_tests;
mod quote_tests;
mod summarize_tests;
