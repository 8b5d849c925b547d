//! Helpers shared by the integration tests

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sumi_recrawl::clock::ManualClock;
use sumi_recrawl::config::SpiderConfig;
use sumi_recrawl::crawler::{build_http_client, Crawler, QueueManager, RetryPolicy};
use sumi_recrawl::output::{DocumentSink, FileSink};
use sumi_recrawl::refetch::BaseStrategy;
use sumi_recrawl::spider::ConfiguredSpider;
use sumi_recrawl::storage::Storage;
use tokio_util::sync::CancellationToken;

pub const NOW: i64 = 1_700_000_000;

/// Returns the `host:port` of a mock server URI
pub fn domain_of(uri: &str) -> String {
    uri.trim_start_matches("http://").to_string()
}

/// A spider restricted to the mock server's domain
pub fn spider_config(name: &str, server_uri: &str) -> SpiderConfig {
    SpiderConfig {
        name: name.to_string(),
        start_urls: vec![format!("{}/", server_uri)],
        allowed_domains: vec![domain_of(server_uri)],
        exclude_pages: Vec::new(),
        depth: 2,
        restart_delay: 120,
        delay: 0,
        use_canonical: true,
        nofollow_compliant: true,
        robots_compliant: false,
        normalize_params: vec!["ref".to_string()],
        urllist: None,
        headers: BTreeMap::new(),
        default_encoding: "utf-8".to_string(),
        strategy: None,
    }
}

/// Fast retry policy for tests
pub fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        backoff_unit: Duration::ZERO,
        status_retries: 0,
        status_backoff: Duration::ZERO,
    }
}

/// Builds a crawler on a manual clock writing JSON lines to `output`
pub fn crawler(
    config: SpiderConfig,
    storage: &Storage,
    output: &Path,
    cancel: CancellationToken,
) -> (Crawler, Arc<ManualClock>) {
    let sink = FileSink::open(output).unwrap();
    crawler_with(config, storage, Box::new(sink), Duration::from_secs(5), cancel)
}

/// Builds a crawler on a manual clock with its own sink and request timeout
pub fn crawler_with(
    config: SpiderConfig,
    storage: &Storage,
    sink: Box<dyn DocumentSink>,
    request_timeout: Duration,
    cancel: CancellationToken,
) -> (Crawler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(NOW));
    let queues = QueueManager::new(
        config.name.clone(),
        storage,
        Box::new(BaseStrategy::new(config.restart_delay, 5000)),
        config.restart_delay,
        false,
        clock.clone(),
    );
    let client = build_http_client(&config.headers, request_timeout).unwrap();
    let spider = Arc::new(ConfiguredSpider::new(config).unwrap());

    let crawler = Crawler::new(
        spider,
        queues,
        client,
        quick_policy(),
        sink,
        Duration::from_millis(20),
        cancel,
    );
    (crawler, clock)
}

/// Reads the URLs of the documents written to a JSON-lines file
pub fn stored_urls(output: &Path) -> Vec<String> {
    std::fs::read_to_string(output)
        .unwrap_or_default()
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["url"].as_str().unwrap().to_string()
        })
        .collect()
}
