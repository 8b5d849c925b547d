//! Queue managers sharing one SQLite store
//!
//! Crawl state must survive restarts and be shared by every process pointed
//! at the same database file.

use crate::common::NOW;
use std::sync::Arc;
use sumi_recrawl::clock::ManualClock;
use sumi_recrawl::crawler::{QueueManager, TimedItem, WorkQueue};
use sumi_recrawl::refetch::BaseStrategy;
use sumi_recrawl::state::FetchedPage;
use sumi_recrawl::storage::Storage;
use sumi_recrawl::{DocumentMeta, Source};
use tempfile::TempDir;

fn manager(storage: &Storage, clock: Arc<ManualClock>, realtime: bool) -> QueueManager {
    QueueManager::new(
        "site",
        storage,
        Box::new(BaseStrategy::new(300, 5000)),
        300,
        realtime,
        clock,
    )
}

fn fetched(mut meta: DocumentMeta, fingerprint: u64) -> DocumentMeta {
    meta.fingerprint = fingerprint;
    meta.response = Some(FetchedPage {
        final_url: meta.url.clone(),
        status: 200,
        content_type: Some("text/html".to_string()),
        body: String::new(),
    });
    meta
}

#[test]
fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");
    let clock = Arc::new(ManualClock::new(NOW));

    {
        let storage = Storage::sqlite(&db).unwrap();
        let queues = manager(&storage, clock.clone(), false);
        queues
            .init_priority_list(&["http://site.com/".to_string()])
            .unwrap();

        let mut meta = DocumentMeta::new("http://site.com/");
        meta.links = vec!["http://site.com/a".to_string()];
        queues.add_normal_urls(&meta).unwrap();
    }

    let storage = Storage::sqlite(&db).unwrap();
    let queues = manager(&storage, clock, false);
    let stats = queues.stats().unwrap();
    assert_eq!(stats.priority, 1);
    assert_eq!(stats.normal, 1);

    assert_eq!(queues.pop().unwrap().source, Source::Priority);
    let next = queues.pop().unwrap();
    assert_eq!(next.url, "http://site.com/a");
    assert_eq!(next.depth, 1);
}

#[test]
fn test_two_managers_share_seen_store() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");
    let clock = Arc::new(ManualClock::new(NOW));

    let first = manager(&Storage::sqlite(&db).unwrap(), clock.clone(), false);
    let second = manager(&Storage::sqlite(&db).unwrap(), clock, false);

    let mut meta = DocumentMeta::new("http://site.com/page");
    meta.source = Source::Normal;
    meta.alternatives = vec!["https://site.com/page/".to_string()];
    first.add_seen_and_reschedule(&fetched(meta, 42)).unwrap();

    assert!(!second.seen().is_new("http://site.com/page").unwrap());
    assert_eq!(
        second
            .seen()
            .get("https://site.com/page")
            .unwrap()
            .unwrap()
            .fingerprint,
        42
    );
    assert_eq!(second.stats().unwrap().refetch, 1);
}

#[test]
fn test_realtime_queue_receives_new_and_changed_pages() {
    let storage = Storage::memory();
    let clock = Arc::new(ManualClock::new(NOW));
    let queues = manager(&storage, clock.clone(), true);

    let mut meta = DocumentMeta::new("http://site.com/news");
    meta.source = Source::Normal;
    queues.add_seen_and_reschedule(&fetched(meta.clone(), 0)).unwrap();
    assert_eq!(queues.stats().unwrap().realtime, Some(1));

    // same content again: nothing new for realtime consumers
    meta.source = Source::Refetch;
    meta.delay = 5000;
    queues.add_seen_and_reschedule(&fetched(meta.clone(), 0)).unwrap();
    assert_eq!(queues.stats().unwrap().realtime, Some(1));

    // the realtime queue holds one entry per URL, refreshed on change
    clock.advance(10);
    queues.add_seen_and_reschedule(&fetched(meta, u64::MAX)).unwrap();
    let realtime: WorkQueue<String> = WorkQueue::new("realtime", storage.queues.clone());
    assert_eq!(realtime.get_all().unwrap(), vec![("http://site.com/news".to_string(), NOW + 10)]);
}

#[test]
fn test_concurrent_pops_hand_out_each_item_once() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.db");

    let storage = Storage::sqlite(&db).unwrap();
    let queue: WorkQueue<TimedItem> = WorkQueue::new("site-refetch", storage.queues.clone());
    for i in 0..50 {
        queue
            .push(&TimedItem::new(i, format!("http://site.com/{}", i), 60, 0), i)
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            std::thread::spawn(move || {
                let storage = Storage::sqlite(&db).unwrap();
                let queue: WorkQueue<TimedItem> =
                    WorkQueue::new("site-refetch", storage.queues.clone());
                let mut popped = Vec::new();
                while let Some(item) = queue.pop(i64::MAX).unwrap() {
                    popped.push(item.url().to_string());
                }
                popped
            })
        })
        .collect();

    let mut all: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(all.len(), 50);
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 50);
    assert!(queue.is_empty().unwrap());
}
