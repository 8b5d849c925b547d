//! Crawler module for recurring crawls
//!
//! This module contains the core crawling logic, including:
//! - Score-ordered work queues over a storage backend
//! - The queue manager deciding what to crawl next and when to refetch
//! - HTTP fetching with retry logic
//! - The per-spider crawl loop

mod coordinator;
mod fetcher;
mod queue_manager;
mod work_queue;

pub use coordinator::{CrawlSummary, Crawler, Step};
pub use fetcher::{
    build_http_client, classify_error, fetch, FetchOutcome, RetryPolicy, DEFAULT_USER_AGENT,
};
pub use queue_manager::{QueueManager, QueueStats, REALTIME_QUEUE};
pub use work_queue::{NormalItem, TimedItem, WorkQueue};
