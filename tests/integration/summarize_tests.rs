//! Integration tests for the summarization client against stored articles

use crate::common::{config, TestDb};
use quarry::storage::{ArticleSource, NewArticle, Storage};
use quarry::summarize::{summarize_article, SummaryClient};
use quarry::QuarryError;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn summarizer_section(server: &MockServer) -> String {
    format!("[summarizer]\nendpoint = \"{}\"\n", server.uri())
}

fn stored_article(db: &TestDb, body: &str) -> i64 {
    let mut storage = db.open();
    storage
        .save_article(&NewArticle {
            article_url: "https://n.news.example.com/article/001/1".to_string(),
            source: ArticleSource::Naver,
            media: Some("연합뉴스".to_string()),
            category: None,
            title: Some("금리 동결".to_string()),
            body: Some(body.to_string()),
            html_content: None,
            author: None,
            status_code: Some(200),
            error_message: None,
            published_at: None,
        })
        .expect("save article")
        .id
}

#[tokio::test]
async fn test_summarize_stored_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/summarize"))
        .and(body_json(json!({ "text": "한국은행이 기준금리를 동결했다." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 200,
            "summary": "기준금리 동결",
            "keywords": ["한국은행", "금리"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(&db, &summarizer_section(&server));
    let id = stored_article(&db, "한국은행이 기준금리를 동결했다.");

    let client = SummaryClient::new(config.summarizer.as_ref().unwrap()).unwrap();
    let summary = summarize_article(&client, &db.open(), id).await.unwrap();

    assert_eq!(summary.summary.as_deref(), Some("기준금리 동결"));
    assert_eq!(summary.keywords, vec!["한국은행", "금리"]);
}

#[tokio::test]
async fn test_service_error_yields_empty_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/summarize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseCode": 400,
            "summary": null,
            "keywords": []
        })))
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(&db, &summarizer_section(&server));
    let id = stored_article(&db, "text");

    let client = SummaryClient::new(config.summarizer.as_ref().unwrap()).unwrap();
    let summary = summarize_article(&client, &db.open(), id).await.unwrap();

    assert!(summary.is_empty());
}

#[tokio::test]
async fn test_unknown_article_id() {
    let server = MockServer::start().await;
    let db = TestDb::new();
    let config = config(&db, &summarizer_section(&server));

    let client = SummaryClient::new(config.summarizer.as_ref().unwrap()).unwrap();
    let result = summarize_article(&client, &db.open(), 999).await;

    assert!(matches!(result, Err(QuarryError::ArticleNotFound(999))));
}
