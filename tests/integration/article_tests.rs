//! Integration tests for the two-phase article pipeline

use crate::common::{config, html, no_shutdown, TestDb};
use quarry::pipeline::run_articles;
use quarry::storage::{ArticleSource, RunKind, RunStatus, Storage};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn naver_article(title: &str, body: &str) -> String {
    format!(
        r#"<html><body>
            <ul><li class="Nlist_item _LNB_ITEM is_active"><a>경제</a></li></ul>
            <a class="media_end_head_top_logo"><img title="연합뉴스"></a>
            <h2 id="title_area"><span>{title}</span></h2>
            <span class="media_end_head_info_datestamp_time" data-date-time="2024-05-01 09:30:00">2024.05.01.</span>
            <em class="media_end_head_journalist_name">홍길동 기자</em>
            <div id="newsct_article">{body}</div>
        </body></html>"#
    )
}

async fn mount_naver(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/section/101"))
        .respond_with(html(format!(
            r#"<html><body>
                <a class="_NLOG_IMPRESSION" href="{base}/article/1">one</a>
                <a class="_NLOG_IMPRESSION" href="{base}/article/2">two</a>
                <a class="_NLOG_IMPRESSION" href="{base}/article/1">one, again</a>
                <a class="_NLOG_IMPRESSION" href="/article/ad">relative</a>
                <a class="_NLOG_IMPRESSION" href="{base}/article/3">three</a>
            </body></html>"#
        )))
        .expect(1..)
        .mount(server)
        .await;

    for (id, title) in [("1", "첫 기사"), ("3", "셋째 기사")] {
        Mock::given(method("GET"))
            .and(path(format!("/article/{}", id)))
            .and(header("referer", "https://news.naver.com/"))
            .respond_with(html(naver_article(title, "본문입니다.")))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/article/2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("error"))
        .mount(server)
        .await;
}

fn naver_section(server: &MockServer) -> String {
    format!(
        "[[articles]]\nsource = \"naver\"\nindex-urls = [\"{}/section/101\"]\nmin-delay-ms = 0\nmax-delay-ms = 0\n",
        server.uri()
    )
}

#[tokio::test]
async fn test_failed_article_does_not_stop_the_queue() {
    let server = MockServer::start().await;
    mount_naver(&server).await;

    let db = TestDb::new();
    let config = config(&db, &naver_section(&server));

    let reports = run_articles(&config, None, "hash", no_shutdown())
        .await
        .expect("article run failed");

    assert_eq!(reports.len(), 1);
    let (source, report) = &reports[0];
    assert_eq!(*source, ArticleSource::Naver);
    assert_eq!(report.links_found, 3);
    assert_eq!(report.articles_saved, 2);
    assert_eq!(report.skipped_mismatch, 1);

    let storage = db.open();
    let base = server.uri();

    let first = storage
        .find_article_by_url(&format!("{}/article/1", base))
        .unwrap()
        .expect("article 1 stored");
    assert_eq!(first.title.as_deref(), Some("첫 기사"));
    assert_eq!(first.media.as_deref(), Some("연합뉴스"));
    assert_eq!(first.category.as_deref(), Some("경제"));
    assert_eq!(first.author.as_deref(), Some("홍길동 기자"));
    assert_eq!(first.body.as_deref(), Some("본문입니다."));
    assert!(first.published_at.is_some());
    assert!(first.html_content.is_some());

    assert!(storage
        .find_article_by_url(&format!("{}/article/2", base))
        .unwrap()
        .is_none());
    assert!(storage
        .find_article_by_url(&format!("{}/article/3", base))
        .unwrap()
        .is_some());

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.kind, RunKind::Articles);
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_second_run_only_retries_missing_articles() {
    let server = MockServer::start().await;
    mount_naver(&server).await;

    let db = TestDb::new();
    let config = config(&db, &naver_section(&server));

    run_articles(&config, None, "hash", no_shutdown())
        .await
        .expect("first run failed");
    let reports = run_articles(&config, None, "hash", no_shutdown())
        .await
        .expect("second run failed");

    let report = &reports[0].1;
    assert_eq!(report.skipped_stored, 2);
    assert_eq!(report.articles_saved, 0);

    let requests = server.received_requests().await.unwrap();
    let hits = |p: &str| requests.iter().filter(|r| r.url.path() == p).count();
    assert_eq!(hits("/article/1"), 1);
    assert_eq!(hits("/article/3"), 1);
    assert_eq!(hits("/article/2"), 2);
}

#[tokio::test]
async fn test_cnn_source_with_configured_pattern() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/business"))
        .respond_with(html(
            r#"<html><body>
                <a class="container__link container__link--type-article" href="/2025/08/01/business/markets">Markets</a>
                <a class="container__link container__link--type-article" href="/business/live-news">Live</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2025/08/01/business/markets"))
        .and(header("referer", "https://edition.cnn.com/"))
        .respond_with(html(
            r#"<html><body>
                <h1 class="headline__text">Markets rally</h1>
                <span class="byline__name">Jane Doe</span>
                <div class="timestamp__published">PUBLISHED Aug 1, 2025, 10:15 AM ET</div>
                <div class="article__content">
                    <p data-component-name="paragraph">First.</p>
                    <p data-component-name="paragraph">Second.</p>
                </div>
            </body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let db = TestDb::new();
    let config = config(
        &db,
        &format!(
            r#"
[[articles]]
source = "naver"
index-urls = ["{base}/unused"]

[[articles]]
source = "cnn"
index-urls = ["{base}/business"]
url-pattern = '/\d{{4}}/\d{{2}}/\d{{2}}/'
min-delay-ms = 0
max-delay-ms = 0
"#,
            base = server.uri()
        ),
    );

    let reports = run_articles(&config, Some(ArticleSource::Cnn), "hash", no_shutdown())
        .await
        .expect("article run failed");

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, ArticleSource::Cnn);
    assert_eq!(reports[0].1.articles_saved, 1);

    let article = db
        .open()
        .find_article_by_url(&format!("{}/2025/08/01/business/markets", server.uri()))
        .unwrap()
        .expect("article stored");
    assert_eq!(article.source, ArticleSource::Cnn);
    assert_eq!(article.media.as_deref(), Some("CNN"));
    assert_eq!(article.author.as_deref(), Some("Jane Doe"));
    assert_eq!(article.body.as_deref(), Some("First.\n\nSecond."));
    assert!(article.html_content.is_none());
}
