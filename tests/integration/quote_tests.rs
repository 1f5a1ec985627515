//! Integration tests for the quote pipeline

use crate::common::{config, html, no_shutdown, TestDb};
use quarry::pipeline::run_quotes;
use quarry::storage::{RunKind, RunStatus, Storage};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUOTE_PAGE: &str = include_str!("../fixtures/quote_page.html");

fn quote_section(server: &MockServer, codes: &[&str]) -> String {
    let codes: Vec<String> = codes.iter().map(|c| format!("\"{}\"", c)).collect();
    format!(
        "[quote]\nbase-url = \"{}/item/main?code=\"\ncodes = [{}]\nmin-delay-ms = 0\nmax-delay-ms = 0\n",
        server.uri(),
        codes.join(", ")
    )
}

#[tokio::test]
async fn test_quote_run_records_success_and_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/item/main"))
        .and(query_param("code", "005930"))
        .and(header("referer", "https://www.naver.com"))
        .respond_with(html(QUOTE_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item/main"))
        .and(query_param("code", "000660"))
        .respond_with(ResponseTemplate::new(500).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(&db, &quote_section(&server, &["005930", "000660"]));
    let quote = config.quote.clone().unwrap();

    let report = run_quotes(&config, &quote, &quote.codes, "hash", no_shutdown())
        .await
        .expect("quote run failed");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let storage = db.open();
    assert_eq!(storage.count_quotes().unwrap(), (2, 1));

    let ok = storage
        .latest_quote(&quote.url_for("005930"))
        .unwrap()
        .unwrap();
    assert!(ok.is_success());
    assert_eq!(ok.stock_code.as_deref(), Some("005930"));
    assert_eq!(ok.current_price, Some(69_800));
    assert_eq!(ok.listed_shares_count, Some(5_969_782_550));
    assert_eq!(ok.investment_opinion.as_deref(), Some("4.00매수"));

    let failed = storage
        .latest_quote(&quote.url_for("000660"))
        .unwrap()
        .unwrap();
    assert_eq!(failed.status_code, Some(500));
    assert!(failed.error_message.is_some());
    assert!(failed.current_price.is_none());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.kind, RunKind::Quote);
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_each_attempt_is_a_new_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item/main"))
        .respond_with(html(QUOTE_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(&db, &quote_section(&server, &["005930"]));
    let quote = config.quote.clone().unwrap();

    for _ in 0..2 {
        run_quotes(&config, &quote, &quote.codes, "hash", no_shutdown())
            .await
            .expect("quote run failed");
    }

    assert_eq!(db.open().count_quotes().unwrap(), (2, 2));
}

#[tokio::test]
async fn test_code_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item/main"))
        .and(query_param("code", "035720"))
        .respond_with(html("<html><body>partial</body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(&db, &quote_section(&server, &["005930"]));
    let quote = config.quote.clone().unwrap();

    let report = run_quotes(
        &config,
        &quote,
        &["035720".to_string()],
        "hash",
        no_shutdown(),
    )
    .await
    .expect("quote run failed");

    // A page with none of the expected tables is still a success.
    assert_eq!(report.succeeded, 1);
    assert!(db
        .open()
        .latest_quote(&quote.url_for("005930"))
        .unwrap()
        .is_none());
}
