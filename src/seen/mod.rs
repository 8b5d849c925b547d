//! Seen/dedup store
//!
//! Remembers, per canonical URL, the fingerprint of the last fetched content,
//! how often the URL was met again, and the cluster of URLs known to serve the
//! same page. Every member of a cluster holds an identical copy of the record.

mod fingerprint;

pub use fingerprint::{
    fingerprint_text, hamming_distance, is_different, simhash, tokenize, SIMILARITY_THRESHOLD,
};

use crate::state::DocumentMeta;
use crate::storage::{SeenBackend, SeenRecord, StorageResult};
use crate::url::canonicalize;
use std::sync::Arc;
use tracing::debug;

/// Seen records of one spider
pub struct SeenStore {
    collection: String,
    backend: Arc<dyn SeenBackend>,
}

impl SeenStore {
    /// Creates a store over `backend` using the given collection name
    pub fn new(collection: impl Into<String>, backend: Arc<dyn SeenBackend>) -> Self {
        Self {
            collection: collection.into(),
            backend,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the record stored for `url`, if any
    pub fn get(&self, url: &str) -> StorageResult<Option<SeenRecord>> {
        self.backend.get(&self.collection, &canonicalize(url))
    }

    /// Returns true if no record exists for `url`
    pub fn is_new(&self, url: &str) -> StorageResult<bool> {
        Ok(self.get(url)?.is_none())
    }

    /// Returns true if `url` is unknown or its content moved away from `fingerprint`
    ///
    /// Fingerprints closer than `SIMILARITY_THRESHOLD` bits count as unchanged.
    pub fn is_changed(&self, url: &str, fingerprint: u64) -> StorageResult<bool> {
        Ok(match self.get(url)? {
            Some(record) => is_different(record.fingerprint, fingerprint),
            None => true,
        })
    }

    /// Records a fetch of `meta.url`
    ///
    /// The cluster becomes the previous cluster plus the canonical form of
    /// `meta.url` and of each of `meta.alternatives`. A fresh record carrying
    /// `meta.fingerprint` and an occurrence count of 1 is written under every
    /// member.
    pub fn add(&self, meta: &DocumentMeta) -> StorageResult<()> {
        self.add_with_fingerprint(meta, meta.fingerprint)
    }

    /// Records a fetch of `meta.url` under `fingerprint` instead of `meta.fingerprint`
    pub fn add_with_fingerprint(&self, meta: &DocumentMeta, fingerprint: u64) -> StorageResult<()> {
        let key = canonicalize(&meta.url);
        let mut cluster = match self.backend.get(&self.collection, &key)? {
            Some(previous) => previous.alternatives,
            None => Vec::new(),
        };

        let candidates = std::iter::once(&meta.url).chain(meta.alternatives.iter());
        for url in candidates.filter(|u| !u.is_empty()) {
            let canonical = canonicalize(url);
            if !cluster.contains(&canonical) {
                cluster.push(canonical);
            }
        }

        let record = SeenRecord {
            fingerprint,
            occurrences: 1,
            alternatives: cluster,
        };

        self.backend
            .put_all(&self.collection, &record.alternatives, &record)?;

        debug!(
            "Seen {} ({} alternatives, fingerprint {:016x})",
            meta.url,
            record.alternatives.len(),
            record.fingerprint
        );
        Ok(())
    }

    /// Removes the record of `url` under every member of its cluster
    pub fn delete(&self, url: &str) -> StorageResult<()> {
        let key = canonicalize(url);
        let mut cluster = match self.backend.get(&self.collection, &key)? {
            Some(record) => record.alternatives,
            None => Vec::new(),
        };
        if !cluster.contains(&key) {
            cluster.push(key);
        }
        self.backend.remove_all(&self.collection, &cluster)?;
        Ok(())
    }

    /// Increments the occurrence count under every member of the cluster of `url`
    ///
    /// Does nothing if `url` has no record. The fingerprint is left untouched.
    pub fn increment_count(&self, url: &str) -> StorageResult<()> {
        let key = canonicalize(url);
        let Some(record) = self.backend.get(&self.collection, &key)? else {
            return Ok(());
        };

        let mut cluster = record.alternatives;
        if !cluster.contains(&key) {
            cluster.push(key);
        }
        self.backend.increment_all(&self.collection, &cluster)?;
        Ok(())
    }

    /// Number of stored keys
    pub fn len(&self) -> StorageResult<usize> {
        self.backend.count(&self.collection)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}
