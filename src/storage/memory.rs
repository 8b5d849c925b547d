//! In-process storage backend
//!
//! Holds everything behind mutexes. Suitable for tests and single-process
//! crawls that do not need to survive a restart.

use crate::storage::traits::{
    QueueBackend, SeenBackend, SeenRecord, StorageError, StorageResult,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SortedQueue {
    ordered: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

/// Memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    queues: Mutex<HashMap<String, SortedQueue>>,
    seen: Mutex<HashMap<String, HashMap<String, SeenRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> StorageResult<MutexGuard<'_, HashMap<String, SortedQueue>>> {
        self.queues.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn seen(&self) -> StorageResult<MutexGuard<'_, HashMap<String, HashMap<String, SeenRecord>>>> {
        self.seen.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl QueueBackend for MemoryBackend {
    fn insert(&self, queue: &str, member: &str, score: i64) -> StorageResult<()> {
        let mut queues = self.queues()?;
        let entry = queues.entry(queue.to_string()).or_default();

        if let Some(old) = entry.scores.insert(member.to_string(), score) {
            entry.ordered.remove(&(old, member.to_string()));
        }
        entry.ordered.insert((score, member.to_string()));
        Ok(())
    }

    fn first(&self, queue: &str) -> StorageResult<Option<(String, i64)>> {
        let queues = self.queues()?;
        Ok(queues
            .get(queue)
            .and_then(|q| q.ordered.iter().next())
            .map(|(score, member)| (member.clone(), *score)))
    }

    fn remove(&self, queue: &str, member: &str) -> StorageResult<bool> {
        let mut queues = self.queues()?;
        let Some(entry) = queues.get_mut(queue) else {
            return Ok(false);
        };

        match entry.scores.remove(member) {
            Some(score) => {
                entry.ordered.remove(&(score, member.to_string()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn members(&self, queue: &str) -> StorageResult<Vec<(String, i64)>> {
        let queues = self.queues()?;
        Ok(queues
            .get(queue)
            .map(|q| {
                q.ordered
                    .iter()
                    .map(|(score, member)| (member.clone(), *score))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear(&self, queue: &str) -> StorageResult<()> {
        self.queues()?.remove(queue);
        Ok(())
    }

    fn count(&self, queue: &str) -> StorageResult<usize> {
        Ok(self.queues()?.get(queue).map_or(0, |q| q.scores.len()))
    }
}

impl SeenBackend for MemoryBackend {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<SeenRecord>> {
        Ok(self
            .seen()?
            .get(collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn put_all(&self, collection: &str, keys: &[String], record: &SeenRecord) -> StorageResult<()> {
        let mut seen = self.seen()?;
        let records = seen.entry(collection.to_string()).or_default();
        for key in keys {
            records.insert(key.clone(), record.clone());
        }
        Ok(())
    }

    fn remove_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize> {
        let mut seen = self.seen()?;
        let Some(records) = seen.get_mut(collection) else {
            return Ok(0);
        };
        Ok(keys.iter().filter(|key| records.remove(*key).is_some()).count())
    }

    fn increment_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize> {
        let mut seen = self.seen()?;
        let Some(records) = seen.get_mut(collection) else {
            return Ok(0);
        };
        let mut updated = 0;
        for key in keys {
            if let Some(record) = records.get_mut(key) {
                record.occurrences = record.occurrences.saturating_add(1);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn count(&self, collection: &str) -> StorageResult<usize> {
        Ok(self.seen()?.get(collection).map_or(0, HashMap::len))
    }
}
