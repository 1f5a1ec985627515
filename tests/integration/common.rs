//! Shared helpers for integration tests

use quarry::config::{parse_config, Config};
use quarry::storage::SqliteStorage;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::ResponseTemplate;

/// A temporary database file removed when dropped
pub struct TestDb {
    _dir: TempDir,
    pub path: PathBuf,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("quarry.db");
        Self { _dir: dir, path }
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().expect("utf-8 temp path")
    }

    pub fn open(&self) -> SqliteStorage {
        SqliteStorage::new(&self.path).expect("Failed to open database")
    }
}

/// Builds a validated config from `sections`, adding the storage section
pub fn config(db: &TestDb, sections: &str) -> Config {
    let content = format!(
        "[fetch]\ntimeout-ms = 5000\n\n[storage]\ndatabase-path = {:?}\n\n{}",
        db.path_str(),
        sections
    );
    parse_config(&content).expect("Failed to parse test config")
}

/// A 200 HTML response
pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

/// A shutdown receiver that is never signalled
pub fn no_shutdown() -> watch::Receiver<bool> {
    watch::channel(false).1
}

/// A URL on a local port with no listener
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}
