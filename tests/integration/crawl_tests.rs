//! Integration tests for the page-graph crawl

use crate::common::{config, html, no_shutdown, unreachable_url, TestDb};
use quarry::crawler::run_crawl;
use quarry::state::PageState;
use quarry::storage::{RunKind, RunStatus, Storage};
use quarry::LinkType;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts a small site:
///
/// ```text
/// /      -> /a, /b, /a (again), /report.pdf, /missing, external
/// /a     -> /, /c
/// /c     -> /d
/// ```
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head><title>Home</title>
                <meta property="og:description" content="Root page"></head><body>
                <a href="/a">Page A</a>
                <a href="{base}/b">Page B</a>
                <a href="/a#top">Page A again</a>
                <a href="/report.pdf">Report</a>
                <a href="/missing">Missing</a>
                <a href="https://elsewhere.example.org/">Elsewhere</a>
                <a href="mailto:team@example.com">Mail</a>
            </body></html>"#
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(
            r#"<html><head><title>A</title></head><body>
                <a href="/">Home</a><a href="/c">Page C</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<html><head><title>B</title></head><body>B</body></html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html(r#"<html><body><a href="/d">Page D</a></body></html>"#))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/d"))
        .respond_with(html("<html><body>D</body></html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw("not found", "text/html"),
        )
        .mount(server)
        .await;
}

fn crawler_section(server: &MockServer, max_depth: u32) -> String {
    format!(
        "[crawler]\nstart-url = \"{}/\"\nmax-depth = {}\nmin-delay-ms = 0\nmax-delay-ms = 0\n",
        server.uri(),
        max_depth
    )
}

#[tokio::test]
async fn test_crawl_respects_depth_bound() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let db = TestDb::new();
    let config = config(&db, &crawler_section(&server, 1));
    let crawler = config.crawler.clone().unwrap();

    let report = run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("crawl failed");

    let storage = db.open();
    let base = server.uri();

    // Root, /a, /b, /report.pdf and /missing are within one hop.
    assert_eq!(storage.count_total_pages().unwrap(), 5);
    assert!(storage
        .find_page_by_url(&format!("{}/c", base))
        .unwrap()
        .is_none());
    assert!(storage
        .get_depth_breakdown()
        .unwrap()
        .keys()
        .all(|depth| *depth <= 1));
    assert_eq!(report.pages_parsed, 3);
    assert_eq!(report.pages_mismatched, 2);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() != "/c"));
}

#[tokio::test]
async fn test_crawl_records_graph() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let db = TestDb::new();
    let config = config(&db, &crawler_section(&server, 3));
    let crawler = config.crawler.clone().unwrap();
    run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("crawl failed");

    let storage = db.open();
    let base = server.uri();
    let page = |p: &str| {
        storage
            .find_page_by_url(&format!("{}{}", base, p))
            .unwrap()
            .unwrap_or_else(|| panic!("{} not stored", p))
    };

    let root = page("/");
    let a = page("/a");
    let c = page("/c");
    let d = page("/d");

    assert_eq!(root.depth, 0);
    assert_eq!(root.parent_id, None);
    assert_eq!(root.title.as_deref(), Some("Home"));
    assert_eq!(root.meta_description.as_deref(), Some("Root page"));
    assert!(root.html_content.is_some());
    assert_eq!(a.parent_id, Some(root.id));
    assert_eq!(c.parent_id, Some(a.id));
    assert_eq!((c.depth, d.depth), (2, 3));

    // One edge per distinct target, fragments and mailto dropped.
    let links = storage.links_from(root.id).unwrap();
    let targets: Vec<&str> = links.iter().map(|l| l.link_url.as_str()).collect();
    assert_eq!(targets.len(), 5);
    assert_eq!(
        targets.iter().filter(|t| t.ends_with("/a")).count(),
        1,
        "duplicate edge to /a"
    );
    let external = links
        .iter()
        .find(|l| l.link_url.starts_with("https://elsewhere"))
        .unwrap();
    assert_eq!(external.link_type, LinkType::External);

    // The external target is recorded but never fetched.
    assert!(storage
        .find_page_by_url("https://elsewhere.example.org/")
        .unwrap()
        .is_none());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.kind, RunKind::Web);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash");
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_crawl_persists_unusable_responses() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let db = TestDb::new();
    let config = config(&db, &crawler_section(&server, 1));
    let crawler = config.crawler.clone().unwrap();
    run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("crawl failed");

    let storage = db.open();
    let base = server.uri();

    let pdf = storage
        .find_page_by_url(&format!("{}/report.pdf", base))
        .unwrap()
        .unwrap();
    assert_eq!(pdf.state, PageState::ContentMismatch);
    assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));
    assert!(pdf.html_content.is_none());

    let missing = storage
        .find_page_by_url(&format!("{}/missing", base))
        .unwrap()
        .unwrap();
    assert_eq!(missing.state, PageState::ContentMismatch);
    assert_eq!(missing.status_code, Some(404));
    assert_eq!(
        missing.error_message.as_deref(),
        Some("Non-HTML content or non-200 status: 404, Type: text/html")
    );
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let db = TestDb::new();
    let config = config(&db, &crawler_section(&server, 3));
    let crawler = config.crawler.clone().unwrap();

    run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("first crawl failed");
    let first_requests = server.received_requests().await.unwrap().len();
    let (first_pages, first_links) = {
        let storage = db.open();
        (
            storage.count_total_pages().unwrap(),
            storage.count_links().unwrap(),
        )
    };

    let report = run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("second crawl failed");

    assert_eq!(server.received_requests().await.unwrap().len(), first_requests);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(report.skipped_stored, 1);

    let storage = db.open();
    assert_eq!(storage.count_total_pages().unwrap(), first_pages);
    assert_eq!(storage.count_links().unwrap(), first_links);
}

#[tokio::test]
async fn test_unreachable_start_is_recorded_as_failed() {
    let start = unreachable_url();

    let db = TestDb::new();
    let config = config(
        &db,
        &format!(
            "[crawler]\nstart-url = \"{}\"\nmax-depth = 2\nmin-delay-ms = 0\nmax-delay-ms = 0\n",
            start
        ),
    );
    let crawler = config.crawler.clone().unwrap();

    let report = run_crawl(&config, &crawler, "hash", no_shutdown())
        .await
        .expect("crawl should not abort");

    assert_eq!(report.pages_failed, 1);
    let page = db.open().find_page_by_url(&start).unwrap().unwrap();
    assert_eq!(page.state, PageState::Failed);
    assert!(page.status_code.is_none());
    assert!(page.error_message.is_some());
}
