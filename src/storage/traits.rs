//! Storage traits and error types
//!
//! Two contracts back the crawler: a score-ordered work store keyed by queue
//! name, and a seen store keyed by collection and canonical URL. Both must be
//! safe to share between crawl loops.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What the seen store remembers about a canonical URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    /// Simhash of the page text at the last fetch
    pub fingerprint: u64,

    /// Times the URL was met again since the record was last rewritten
    pub occurrences: u32,

    /// Canonical URLs sharing this record
    pub alternatives: Vec<String>,
}

/// Score-ordered collections of serialized items, one per queue name
///
/// Members are unique within a queue; inserting an existing member updates its
/// score.
pub trait QueueBackend: Send + Sync {
    /// Inserts `member` with `score`, replacing the score if already present
    fn insert(&self, queue: &str, member: &str, score: i64) -> StorageResult<()>;

    /// Returns the member with the lowest score (ties by member) without removing it
    fn first(&self, queue: &str) -> StorageResult<Option<(String, i64)>>;

    /// Removes `member`, returning true only if this call removed it
    ///
    /// Consumers racing on the same member rely on exactly one of them
    /// observing `true`.
    fn remove(&self, queue: &str, member: &str) -> StorageResult<bool>;

    /// All members in score order
    fn members(&self, queue: &str) -> StorageResult<Vec<(String, i64)>>;

    fn clear(&self, queue: &str) -> StorageResult<()>;

    fn count(&self, queue: &str) -> StorageResult<usize>;
}

/// Seen records keyed by `(collection, canonical url)`
///
/// The batch operations act on a whole cluster at once and either apply to
/// every key or to none.
pub trait SeenBackend: Send + Sync {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<SeenRecord>>;

    /// Writes `record` under every key, replacing any previous records
    fn put_all(&self, collection: &str, keys: &[String], record: &SeenRecord) -> StorageResult<()>;

    /// Removes the records of `keys`, returning how many existed
    fn remove_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize>;

    /// Increments `occurrences` in place under every key; returns how many records were found
    fn increment_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize>;

    fn count(&self, collection: &str) -> StorageResult<usize>;
}
