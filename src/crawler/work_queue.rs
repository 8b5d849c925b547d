//! Score-ordered work queues
//!
//! A `WorkQueue` stores serialized items in a `QueueBackend` under one queue
//! name. Items are compared by their JSON encoding, so pushing an equal item
//! twice keeps a single entry with the latest score.

use crate::storage::{QueueBackend, StorageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A start URL or refetch waiting for its time, stored as `[expire_at, url, delay, depth]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedItem(pub i64, pub String, pub u64, pub u32);

impl TimedItem {
    pub fn new(expire_at: i64, url: impl Into<String>, delay: u64, depth: u32) -> Self {
        Self(expire_at, url.into(), delay, depth)
    }

    pub fn expire_at(&self) -> i64 {
        self.0
    }

    pub fn url(&self) -> &str {
        &self.1
    }

    pub fn delay(&self) -> u64 {
        self.2
    }

    pub fn depth(&self) -> u32 {
        self.3
    }
}

/// A newly discovered link, stored as `[depth, url]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalItem(pub u32, pub String);

impl NormalItem {
    pub fn new(depth: u32, url: impl Into<String>) -> Self {
        Self(depth, url.into())
    }

    pub fn depth(&self) -> u32 {
        self.0
    }

    pub fn url(&self) -> &str {
        &self.1
    }
}

/// A named, score-ordered queue of `T`
pub struct WorkQueue<T> {
    name: String,
    backend: Arc<dyn QueueBackend>,
    _item: PhantomData<fn() -> T>,
}

impl<T> WorkQueue<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(name: impl Into<String>, backend: Arc<dyn QueueBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
            _item: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts `item` with `score`, updating the score of an equal item
    pub fn push(&self, item: &T, score: i64) -> StorageResult<()> {
        let member = serde_json::to_string(item)?;
        self.backend.insert(&self.name, &member, score)
    }

    /// Removes and returns the lowest-scored item
    ///
    /// With a non-zero `ready_threshold`, an item scored above it is left in
    /// place and `None` is returned. When another consumer removes the item
    /// first, the new minimum is read and the pop retried, so an item is never
    /// handed out twice.
    ///
    /// # Arguments
    ///
    /// * `ready_threshold` - Highest score that may be popped; 0 pops regardless
    ///
    /// # Returns
    ///
    /// * `Ok(Some(item))` - The item this caller removed
    /// * `Ok(None)` - The queue is empty or its head is not due
    /// * `Err(StorageError)` - The backend failed or the item could not be decoded
    pub fn pop(&self, ready_threshold: i64) -> StorageResult<Option<T>> {
        loop {
            let Some((member, score)) = self.backend.first(&self.name)? else {
                return Ok(None);
            };

            if ready_threshold != 0 && score > ready_threshold {
                return Ok(None);
            }

            if self.backend.remove(&self.name, &member)? {
                return Ok(Some(serde_json::from_str(&member)?));
            }

            debug!("Lost race popping {} from {}, retrying", member, self.name);
        }
    }

    /// All items with their scores, lowest score first
    pub fn get_all(&self) -> StorageResult<Vec<(T, i64)>> {
        self.backend
            .members(&self.name)?
            .into_iter()
            .map(|(member, score)| -> StorageResult<(T, i64)> {
                Ok((serde_json::from_str(&member)?, score))
            })
            .collect()
    }

    /// Removes `item`, returning true if it was queued
    pub fn delete(&self, item: &T) -> StorageResult<bool> {
        let member = serde_json::to_string(item)?;
        self.backend.remove(&self.name, &member)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.backend.clear(&self.name)
    }

    pub fn len(&self) -> StorageResult<usize> {
        self.backend.count(&self.name)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
