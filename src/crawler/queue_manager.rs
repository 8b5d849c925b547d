//! Queue manager - decides what a spider fetches next
//!
//! Each spider owns three queues and a seen store:
//! - `{name}-priority`: start URLs, due every `restart-delay` seconds
//! - `{name}-normal`: newly discovered links, shallowest first
//! - `{name}-refetch`: fetched pages waiting for their next visit
//! - `{name}-hash`: seen records
//!
//! Spiders with realtime enabled also share the `realtime` queue, which
//! collects every new or changed URL for downstream consumers.

use crate::clock::Clock;
use crate::config::{CrawlerConfig, SpiderConfig};
use crate::crawler::work_queue::{NormalItem, TimedItem, WorkQueue};
use crate::refetch::{build_strategy, RefetchStrategy, Schedule};
use crate::seen::SeenStore;
use crate::spider::BootstrapEntry;
use crate::state::{DocumentMeta, Source};
use crate::storage::{Storage, StorageResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the queue shared by every realtime-enabled spider
pub const REALTIME_QUEUE: &str = "realtime";

/// Queue lengths of one spider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub spider: String,
    pub priority: usize,
    pub normal: usize,
    pub refetch: usize,
    pub realtime: Option<usize>,
    pub seen: usize,
}

/// Orchestrates the queues, the seen store and the refetch strategy of a spider
pub struct QueueManager {
    name: String,
    priority: WorkQueue<TimedItem>,
    normal: WorkQueue<NormalItem>,
    refetch: WorkQueue<TimedItem>,
    realtime: Option<WorkQueue<String>>,
    seen: SeenStore,
    strategy: Box<dyn RefetchStrategy>,
    start_delay: u64,
    clock: Arc<dyn Clock>,
}

impl QueueManager {
    /// Creates a queue manager
    ///
    /// # Arguments
    ///
    /// * `name` - Spider name, prefix of every queue
    /// * `storage` - Backend shared with the other spiders
    /// * `strategy` - Refetch strategy
    /// * `start_delay` - Refetch delay of start URLs
    /// * `realtime` - Whether to feed the shared realtime queue
    /// * `clock` - Source of the current time
    pub fn new(
        name: impl Into<String>,
        storage: &Storage,
        strategy: Box<dyn RefetchStrategy>,
        start_delay: u64,
        realtime: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = name.into();
        Self {
            priority: WorkQueue::new(format!("{}-priority", name), storage.queues.clone()),
            normal: WorkQueue::new(format!("{}-normal", name), storage.queues.clone()),
            refetch: WorkQueue::new(format!("{}-refetch", name), storage.queues.clone()),
            realtime: realtime.then(|| WorkQueue::new(REALTIME_QUEUE, storage.queues.clone())),
            seen: SeenStore::new(format!("{}-hash", name), storage.seen.clone()),
            strategy,
            start_delay,
            clock,
            name,
        }
    }

    /// Creates the queue manager of a configured spider
    pub fn from_config(
        spider: &SpiderConfig,
        crawler: &CrawlerConfig,
        storage: &Storage,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let kind = spider.strategy.unwrap_or(crawler.strategy);
        let strategy = build_strategy(kind, spider.restart_delay, crawler.refetching_delay);
        Self::new(
            &spider.name,
            storage,
            strategy,
            spider.restart_delay,
            crawler.realtime,
            clock,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn seen(&self) -> &SeenStore {
        &self.seen
    }

    /// Replaces the priority queue with `urls`, all due immediately
    pub fn init_priority_list(&self, urls: &[String]) -> StorageResult<()> {
        self.priority.clear()?;
        for url in urls {
            self.priority
                .push(&TimedItem::new(1, url.as_str(), self.start_delay, 0), 1)?;
        }
        info!("[{}] {} start URLs scheduled", self.name, urls.len());
        Ok(())
    }

    /// Queues bootstrap URLs that were never seen
    ///
    /// Bootstrap entries are pushed two levels deeper than their recorded depth.
    pub fn add_bootstrap_urls(&self, entries: &[BootstrapEntry]) -> StorageResult<()> {
        let mut added = 0;
        for entry in entries {
            if self.seen.is_new(&entry.url)? {
                let depth = entry.depth.saturating_add(2);
                self.normal
                    .push(&NormalItem::new(depth, entry.url.as_str()), i64::from(depth))?;
                added += 1;
            }
        }
        info!("[{}] {} bootstrap URLs queued", self.name, added);
        Ok(())
    }

    /// Queues the unseen links of `meta` one level deeper; counts the seen ones
    pub fn add_normal_urls(&self, meta: &DocumentMeta) -> StorageResult<()> {
        let depth = meta.depth.saturating_add(1);
        for link in &meta.links {
            if self.seen.is_new(link)? {
                self.normal
                    .push(&NormalItem::new(depth, link.as_str()), i64::from(depth))?;
            } else {
                self.seen.increment_count(link)?;
            }
        }
        Ok(())
    }

    /// Records the fetch of `meta` and schedules the next one
    ///
    /// Without a response there is no content to compare: a known URL keeps
    /// its stored fingerprint, counts as unchanged and is not pushed to the
    /// realtime queue.
    pub fn add_seen_and_reschedule(&self, meta: &DocumentMeta) -> StorageResult<()> {
        let previous = self.seen.get(&meta.url)?;
        let is_new = previous.is_none();
        let (is_changed, fingerprint) = match previous {
            Some(record) if meta.response.is_none() => (false, record.fingerprint),
            _ => (
                self.seen.is_changed(&meta.url, meta.fingerprint)?,
                meta.fingerprint,
            ),
        };
        let now = self.clock.now();

        if let Some(realtime) = &self.realtime {
            if meta.response.is_some() && (is_new || is_changed) {
                realtime.push(&meta.url, now)?;
            }
        }

        self.seen.add_with_fingerprint(meta, fingerprint)?;

        match self.strategy.compute(meta, is_new, is_changed, now) {
            Schedule::Stop => {
                info!("[{}] {} will not be refetched", self.name, meta.url);
            }
            Schedule::Next(next) => {
                let item = TimedItem::new(next.expire_at, meta.url.as_str(), next.delay, meta.depth);
                let queue = if next.source == Source::Priority {
                    &self.priority
                } else {
                    &self.refetch
                };
                queue.push(&item, next.expire_at)?;
                debug!(
                    "[{}] {} due again in {}s on {} (new: {}, changed: {})",
                    self.name,
                    meta.url,
                    next.delay,
                    queue.name(),
                    is_new,
                    is_changed
                );
            }
        }
        Ok(())
    }

    /// Forgets `url` and its whole cluster
    pub fn remove_seen(&self, url: &str) -> StorageResult<()> {
        self.seen.delete(url)
    }

    /// Returns the next URL to crawl
    ///
    /// Due start URLs come first, then unseen discovered links, then due
    /// refetches. When nothing is due the returned meta has an empty URL.
    pub fn pop(&self) -> StorageResult<DocumentMeta> {
        let now = self.clock.now();

        if let Some(item) = self.priority.pop(now)? {
            return Ok(timed_meta(item, Source::Priority));
        }

        while let Some(item) = self.normal.pop(0)? {
            if !self.seen.is_new(item.url())? {
                debug!("[{}] Skipping already seen {}", self.name, item.url());
                continue;
            }
            let NormalItem(depth, url) = item;
            let mut meta = DocumentMeta::new(url);
            meta.depth = depth;
            meta.source = Source::Normal;
            return Ok(meta);
        }

        if let Some(item) = self.refetch.pop(now)? {
            return Ok(timed_meta(item, Source::Refetch));
        }

        Ok(DocumentMeta::empty())
    }

    /// Current queue lengths and number of seen keys
    pub fn stats(&self) -> StorageResult<QueueStats> {
        Ok(QueueStats {
            spider: self.name.clone(),
            priority: self.priority.len()?,
            normal: self.normal.len()?,
            refetch: self.refetch.len()?,
            realtime: match &self.realtime {
                Some(queue) => Some(queue.len()?),
                None => None,
            },
            seen: self.seen.len()?,
        })
    }
}

fn timed_meta(item: TimedItem, source: Source) -> DocumentMeta {
    let TimedItem(_, url, delay, depth) = item;
    let mut meta = DocumentMeta::new(url);
    meta.delay = delay;
    meta.depth = depth;
    meta.source = source;
    meta
}
