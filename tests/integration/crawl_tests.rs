//! End-to-end crawl cycles against a mock site
//!
//! These tests use wiremock to create mock HTTP servers and drive the crawl
//! loop one step at a time on a manual clock.

use crate::common::{crawler, crawler_with, spider_config, stored_urls};
use std::time::Duration;
use sumi_recrawl::crawler::Step;
use sumi_recrawl::output::{Document, DocumentSink, FileSink, OutputError, OutputResult};
use sumi_recrawl::storage::Storage;
use sumi_recrawl::{DocumentMeta, Source};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Home</title></head><body>
            <p>Ultime notizie</p>
            <a href="/page1?ref=home">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="http://elsewhere.example/">Elsewhere</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            r#"<html><head><title>Page 1</title></head><body>
            <p>Primo articolo</p><a href="/">Home</a></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(
            r#"<html><head><title>Page 2</title></head><body>
            <p>Secondo articolo</p><a href="/page3">deeper</a></body></html>"#,
        ))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_single_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.depth = 1;
    let (mut crawler, clock) = crawler(config, &storage, &output, CancellationToken::new());

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);
    assert_eq!(crawler.step().await.unwrap(), Step::Idle);

    assert_eq!(
        stored_urls(&output),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
        ]
    );

    let stats = crawler.queues().stats().unwrap();
    assert_eq!(stats.priority, 1);
    assert_eq!(stats.normal, 0);
    assert_eq!(stats.refetch, 2);

    // the start URL comes back first, on its own cadence
    clock.advance(120);
    let next = crawler.queues().pop().unwrap();
    assert_eq!(next.url, format!("{}/", base));
    assert_eq!(next.source, Source::Priority);
    assert_eq!(next.delay, 120);
}

#[tokio::test]
async fn test_links_stop_at_depth_limit() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let (mut crawler, _) = crawler(
        spider_config("site", &base),
        &storage,
        &output,
        CancellationToken::new(),
    );

    crawler.seed().unwrap();
    let mut steps = 0;
    while crawler.step().await.unwrap() != Step::Idle {
        steps += 1;
        assert!(steps < 10, "crawl did not settle");
    }

    // /page3 is found at depth 1 and fetched at depth 2, where links stop
    assert_eq!(
        stored_urls(&output),
        vec![
            format!("{}/", base),
            format!("{}/page1", base),
            format!("{}/page2", base),
            format!("{}/page3", base),
        ]
    );

    // the home page was linked again from page 1
    let home = crawler
        .queues()
        .seen()
        .get(&format!("{}/", base))
        .unwrap()
        .unwrap();
    assert_eq!(home.occurrences, 2);
}

#[tokio::test]
async fn test_refetch_detects_change() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>prima versione della pagina con molte parole diverse</p>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>contenuto completamente nuovo dopo l'aggiornamento del sito</p>"))
        .mount(&server)
        .await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::sqlite(&dir.path().join("state.db")).unwrap();
    let (mut crawler, clock) = crawler(
        spider_config("site", &base),
        &storage,
        &output,
        CancellationToken::new(),
    );

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);
    let first = crawler
        .queues()
        .seen()
        .get(&format!("{}/", base))
        .unwrap()
        .unwrap()
        .fingerprint;

    assert_eq!(crawler.step().await.unwrap(), Step::Idle);
    clock.advance(120);
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);

    let second = crawler
        .queues()
        .seen()
        .get(&format!("{}/", base))
        .unwrap()
        .unwrap()
        .fingerprint;
    assert_ne!(first, second);
    assert_eq!(stored_urls(&output).len(), 2);
}

#[tokio::test]
async fn test_unnormalized_url_is_dropped_without_fetching() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.start_urls = vec![format!("{}/page1?ref=rss", base)];
    let (mut crawler, _) = crawler(config, &storage, &output, CancellationToken::new());

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Dropped);
    assert_eq!(crawler.step().await.unwrap(), Step::Idle);

    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(stored_urls(&output).is_empty());
}

#[tokio::test]
async fn test_robots_filters_discovered_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<a href="/public">public</a><a href="/private/secret">private</a>"#,
        ))
        .mount(&server)
        .await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.robots_compliant = true;
    let (mut crawler, _) = crawler(config, &storage, &output, CancellationToken::new());

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Stored);

    let next = crawler.queues().pop().unwrap();
    assert_eq!(next.url, format!("{}/public", base));
    assert!(crawler.queues().pop().unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_site_is_rescheduled() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let mut config = spider_config("down", "http://127.0.0.1:1");
    config.allowed_domains = Vec::new();
    let (mut crawler, _) = crawler(config, &storage, &output, CancellationToken::new());

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Rescheduled);

    assert!(!crawler.queues().seen().is_new("http://127.0.0.1:1/").unwrap());
    assert_eq!(crawler.queues().stats().unwrap().priority, 1);
    assert!(stored_urls(&output).is_empty());
}

/// Answers after the 200ms request timeout used by the tests below
fn slow(body: &str) -> ResponseTemplate {
    html(body).set_delay(Duration::from_secs(2))
}

struct FailingSink;

impl DocumentSink for FailingSink {
    fn store(&mut self, _doc: &Document) -> OutputResult<()> {
        Err(OutputError::Storage("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_timed_out_refetch_is_rescheduled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<p>pagina aggiornata ogni ora</p>"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(slow("<p>troppo tardi</p>"))
        .mount(&server)
        .await;
    let base = server.uri();
    let page = format!("{}/page", base);

    let dir = TempDir::new().unwrap();
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.start_urls = Vec::new();
    let sink = FileSink::open(&dir.path().join("docs.jsonl")).unwrap();
    let (mut crawler, clock) = crawler_with(
        config,
        &storage,
        Box::new(sink),
        Duration::from_millis(200),
        CancellationToken::new(),
    );

    let mut parent = DocumentMeta::new(format!("{}/", base));
    parent.links = vec![page.clone()];
    crawler.queues().add_normal_urls(&parent).unwrap();

    assert_eq!(crawler.step().await.unwrap(), Step::Stored);
    let fingerprint = crawler.queues().seen().get(&page).unwrap().unwrap().fingerprint;

    clock.advance(5000);
    assert_eq!(crawler.step().await.unwrap(), Step::Skipped);

    let stats = crawler.queues().stats().unwrap();
    assert_eq!(stats.refetch, 1);
    assert_eq!(stats.normal, 0);
    assert_eq!(
        crawler.queues().seen().get(&page).unwrap().unwrap().fingerprint,
        fingerprint
    );

    // backed off to twice the previous delay
    clock.advance(10_000);
    let next = crawler.queues().pop().unwrap();
    assert_eq!(next.url, page);
    assert_eq!(next.source, Source::Refetch);
    assert_eq!(next.delay, 10_000);
}

#[tokio::test]
async fn test_timed_out_start_url_stays_priority() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(slow("<p>home</p>"))
        .mount(&server)
        .await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let storage = Storage::memory();
    let sink = FileSink::open(&dir.path().join("docs.jsonl")).unwrap();
    let (mut crawler, clock) = crawler_with(
        spider_config("site", &base),
        &storage,
        Box::new(sink),
        Duration::from_millis(200),
        CancellationToken::new(),
    );

    crawler.seed().unwrap();
    assert_eq!(crawler.step().await.unwrap(), Step::Skipped);
    assert_eq!(crawler.queues().stats().unwrap().priority, 1);

    clock.advance(120);
    let next = crawler.queues().pop().unwrap();
    assert_eq!(next.url, format!("{}/", base));
    assert_eq!(next.source, Source::Priority);
}

#[tokio::test]
async fn test_timed_out_discovered_link_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(slow("<p>lenta</p>"))
        .mount(&server)
        .await;
    let base = server.uri();
    let link = format!("{}/slow", base);

    let dir = TempDir::new().unwrap();
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.start_urls = Vec::new();
    let sink = FileSink::open(&dir.path().join("docs.jsonl")).unwrap();
    let (mut crawler, _) = crawler_with(
        config,
        &storage,
        Box::new(sink),
        Duration::from_millis(200),
        CancellationToken::new(),
    );

    let mut parent = DocumentMeta::new(format!("{}/", base));
    parent.links = vec![link.clone()];
    crawler.queues().add_normal_urls(&parent).unwrap();

    assert_eq!(crawler.step().await.unwrap(), Step::Skipped);
    let stats = crawler.queues().stats().unwrap();
    assert_eq!((stats.priority, stats.normal, stats.refetch), (0, 0, 0));
    assert!(crawler.queues().seen().is_new(&link).unwrap());
}

#[tokio::test]
async fn test_sink_failure_keeps_start_url_scheduled() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let storage = Storage::memory();
    let (mut crawler, clock) = crawler_with(
        spider_config("site", &base),
        &storage,
        Box::new(FailingSink),
        Duration::from_secs(5),
        CancellationToken::new(),
    );

    crawler.seed().unwrap();
    assert!(crawler.step().await.is_err());
    assert_eq!(crawler.queues().stats().unwrap().priority, 1);

    clock.advance(120);
    let next = crawler.queues().pop().unwrap();
    assert_eq!(next.url, format!("{}/", base));
    assert_eq!(next.source, Source::Priority);
}

#[tokio::test]
async fn test_bootstrap_list_is_queued() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let list = dir.path().join("urllist.jsonl");
    std::fs::write(
        &list,
        format!(
            "{{\"url\": \"{base}/page2\", \"depth\": \"0\"}}\n{{\"url\": \"http://elsewhere.example/x\", \"depth\": 0}}\n"
        ),
    )
    .unwrap();

    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let mut config = spider_config("site", &base);
    config.start_urls = Vec::new();
    config.urllist = Some(list.to_string_lossy().into_owned());
    let (crawler, _) = crawler(config, &storage, &output, CancellationToken::new());

    crawler.seed().unwrap();
    let meta = crawler.queues().pop().unwrap();
    assert_eq!(meta.url, format!("{}/page2", base));
    assert_eq!(meta.depth, 2);
    assert!(crawler.queues().pop().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("docs.jsonl");
    let storage = Storage::memory();
    let cancel = CancellationToken::new();
    let (mut crawler, _) = crawler(spider_config("site", &base), &storage, &output, cancel.clone());

    let handle = tokio::spawn(async move { crawler.run().await });
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(summary.stored >= 1);
    assert_eq!(summary.errors, 0);
}
