//! Crawl loop of one spider
//!
//! Each iteration pops the next due URL, checks it against the spider,
//! fetches it, parses the page, queues the discovered links, stores the
//! document and reschedules the URL. The loop stops at the next iteration
//! boundary once its cancellation token fires.

use crate::clock::Clock;
use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch, FetchOutcome, RetryPolicy, DEFAULT_USER_AGENT};
use crate::crawler::queue_manager::QueueManager;
use crate::output::{open_sink, DocumentSink};
use crate::robots::RobotsCache;
use crate::spider::{load_bootstrap, Spider};
use crate::state::{DocumentMeta, Source};
use crate::storage::Storage;
use crate::CrawlError;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What one iteration of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing was due
    Idle,

    /// The URL was excluded, off-site or not normalized and was forgotten
    Dropped,

    /// The page was fetched, stored and rescheduled
    Stored,

    /// Connection attempts ran out; the URL was rescheduled
    Rescheduled,

    /// Terminal fetch failure; start URLs and refetches were rescheduled,
    /// discovered links dropped
    Skipped,

    /// Unexpected fetch failure; handled like `Skipped`
    Failed,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub stored: u64,
    pub rescheduled: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub failed: u64,
    pub errors: u64,
}

impl CrawlSummary {
    fn record(&mut self, step: Step) {
        match step {
            Step::Idle => {}
            Step::Dropped => self.dropped += 1,
            Step::Stored => self.stored += 1,
            Step::Rescheduled => self.rescheduled += 1,
            Step::Skipped => self.skipped += 1,
            Step::Failed => self.failed += 1,
        }
    }

    pub fn processed(&self) -> u64 {
        self.stored + self.rescheduled + self.dropped + self.skipped + self.failed
    }
}

/// Sleeps unless cancelled; returns false when the loop should stop
async fn wait(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// The crawl loop of one spider
pub struct Crawler {
    spider: Arc<dyn Spider>,
    queues: QueueManager,
    client: Client,
    policy: RetryPolicy,
    sink: Box<dyn DocumentSink>,
    robots: Option<RobotsCache>,
    idle_wait: Duration,
    cancel: CancellationToken,
}

impl Crawler {
    /// Creates a crawler from its parts
    ///
    /// Robots filtering is enabled when the spider is `robots-compliant`.
    pub fn new(
        spider: Arc<dyn Spider>,
        queues: QueueManager,
        client: Client,
        policy: RetryPolicy,
        sink: Box<dyn DocumentSink>,
        idle_wait: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let robots = spider.settings().robots_compliant.then(|| {
            let user_agent = spider
                .settings()
                .headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
                .map(|(_, value)| value.as_str())
                .unwrap_or(DEFAULT_USER_AGENT);
            RobotsCache::new(client.clone(), user_agent)
        });

        Self {
            spider,
            queues,
            client,
            policy,
            sink,
            robots,
            idle_wait,
            cancel,
        }
    }

    /// Builds the crawler of `spider` from the loaded configuration
    ///
    /// # Arguments
    ///
    /// * `spider` - The spider to run
    /// * `config` - The whole configuration
    /// * `storage` - Backend shared by every spider
    /// * `clock` - Source of the current time
    /// * `cancel` - Stops the loop
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(CrawlError)` - The HTTP client or the sink could not be built
    pub fn from_config(
        spider: Arc<dyn Spider>,
        config: &Config,
        storage: &Storage,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> Result<Self, CrawlError> {
        let settings = spider.settings();
        let queues = QueueManager::from_config(settings, &config.crawler, storage, clock);
        let client = build_http_client(
            &settings.headers,
            Duration::from_secs(config.crawler.request_timeout),
        )?;
        let sink = open_sink(spider.name(), &config.output)?;

        Ok(Self::new(
            spider,
            queues,
            client,
            RetryPolicy::from_config(&config.crawler),
            sink,
            Duration::from_secs(config.crawler.idle_wait),
            cancel,
        ))
    }

    pub fn name(&self) -> &str {
        self.spider.name()
    }

    pub fn queues(&self) -> &QueueManager {
        &self.queues
    }

    /// Schedules the start URLs and the bootstrap list
    pub fn seed(&self) -> Result<(), CrawlError> {
        let settings = self.spider.settings();
        self.queues.init_priority_list(&settings.start_urls)?;

        if let Some(urllist) = settings.urllist.as_deref() {
            let entries = load_bootstrap(Path::new(urllist), settings);
            self.queues.add_bootstrap_urls(&entries)?;
        }
        Ok(())
    }

    /// Runs one iteration of the loop
    ///
    /// # Returns
    ///
    /// * `Ok(Step)` - What happened to the popped URL
    /// * `Err(CrawlError)` - Storage, parse or sink failure; a start URL or
    ///   refetch is rescheduled before the error is returned
    pub async fn step(&mut self) -> Result<Step, CrawlError> {
        let mut meta = self.queues.pop()?;
        if meta.is_empty() {
            return Ok(Step::Idle);
        }

        let (normalized, drop) = self.spider.check_and_normalize(&meta.url);
        if drop {
            debug!("[{}] Dropping {}", self.name(), meta.url);
            self.queues.remove_seen(&meta.url)?;
            return Ok(Step::Dropped);
        }
        meta.alternatives = vec![normalized];
        let attempt = meta.clone();

        debug!("[{}] Fetching {} ({})", self.name(), meta.url, meta.source);
        let settings = self.spider.settings();
        let outcome = fetch(
            &self.client,
            meta,
            &self.policy,
            &settings.default_encoding,
            &self.cancel,
        )
        .await;

        match outcome {
            FetchOutcome::Fetched(meta) => match self.store(meta).await {
                Ok(()) => Ok(Step::Stored),
                Err(e) => {
                    if let Err(reschedule) = self.reschedule_failed(&attempt) {
                        error!(
                            "[{}] Could not reschedule {}: {}",
                            self.name(),
                            attempt.url,
                            reschedule
                        );
                    }
                    Err(e)
                }
            },
            FetchOutcome::RetriesExhausted(meta) => {
                self.queues.add_seen_and_reschedule(&meta)?;
                Ok(Step::Rescheduled)
            }
            FetchOutcome::Skipped { meta, reason } => {
                warn!("[{}] Skipping {}: {}", self.name(), meta.url, reason);
                self.reschedule_failed(&meta)?;
                Ok(Step::Skipped)
            }
            FetchOutcome::Failed { meta, reason } => {
                error!("[{}] Failed to fetch {}: {}", self.name(), meta.url, reason);
                self.reschedule_failed(&meta)?;
                Ok(Step::Failed)
            }
        }
    }

    /// Parses a fetched page, queues its links, stores it and reschedules it
    async fn store(&mut self, mut meta: DocumentMeta) -> Result<(), CrawlError> {
        if let Some(final_url) = meta.response.as_ref().map(|r| r.final_url.clone()) {
            let final_url = self.spider.normalize_url(&final_url);
            meta.push_alternative(final_url);
        }

        let (document, mut meta) = self.spider.parse(meta)?;
        if let Some(robots) = &self.robots {
            meta.links = robots.filter(std::mem::take(&mut meta.links)).await;
        }

        self.queues.add_normal_urls(&meta)?;
        self.sink.store(&document)?;
        self.queues.add_seen_and_reschedule(&meta)?;
        info!(
            "[{}] Stored {} ({}, {} links)",
            self.name(),
            document.url,
            document.status,
            meta.links.len()
        );
        Ok(())
    }

    /// Puts a start URL or refetch that could not be stored back on its cadence
    ///
    /// The strategy sees no response and backs off. Discovered links are
    /// dropped; they come back when a page links to them again.
    fn reschedule_failed(&self, meta: &DocumentMeta) -> Result<(), CrawlError> {
        if meta.source == Source::Normal {
            return Ok(());
        }
        self.queues.add_seen_and_reschedule(meta)?;
        Ok(())
    }

    /// Seeds the queues and crawls until cancelled
    ///
    /// Errors within one iteration are logged and the loop moves on; only a
    /// failure to seed the queues aborts it.
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        self.seed()?;
        info!("[{}] Crawl loop started", self.name());

        let mut summary = CrawlSummary::default();
        let start_time = Instant::now();
        let delay = Duration::from_secs(self.spider.settings().delay);

        while !self.cancel.is_cancelled() {
            match self.step().await {
                Ok(Step::Idle) => {
                    if !wait(self.idle_wait, &self.cancel).await {
                        break;
                    }
                    continue;
                }
                Ok(step) => {
                    summary.record(step);
                    if step == Step::Stored && !wait(delay, &self.cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    error!("[{}] Crawl iteration failed: {}", self.name(), e);
                }
            }

            if summary.processed() > 0 && summary.processed() % 100 == 0 {
                info!(
                    "[{}] Progress: {} URLs processed, {} stored, {:.2} URLs/sec",
                    self.name(),
                    summary.processed(),
                    summary.stored,
                    summary.processed() as f64 / start_time.elapsed().as_secs_f64()
                );
            }
        }

        info!(
            "[{}] Crawl loop stopped after {:?}: {} stored, {} rescheduled, {} dropped, {} skipped, {} failed",
            self.name(),
            start_time.elapsed(),
            summary.stored,
            summary.rescheduled,
            summary.dropped,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }
}
