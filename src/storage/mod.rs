//! Storage module for queues and seen records
//!
//! This module provides the persistence behind the crawler:
//! - Score-ordered work queues (`QueueBackend`)
//! - Seen records with their URL clusters (`SeenBackend`)
//! - An SQLite backend, safe to share between processes
//! - An in-memory backend for tests and throwaway crawls

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{QueueBackend, SeenBackend, SeenRecord, StorageError, StorageResult};

use crate::config::{BackendKind, StorageConfig};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Shared handles to the configured backend
#[derive(Clone)]
pub struct Storage {
    pub queues: Arc<dyn QueueBackend>,
    pub seen: Arc<dyn SeenBackend>,
}

impl Storage {
    /// Storage backed by an SQLite file
    pub fn sqlite(path: &Path) -> StorageResult<Self> {
        let backend = Arc::new(SqliteBackend::new(path)?);
        Ok(Self {
            queues: backend.clone(),
            seen: backend,
        })
    }

    /// Storage that lives only as long as the process
    pub fn memory() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        Self {
            queues: backend.clone(),
            seen: backend,
        }
    }
}

/// Opens the backend selected in the configuration
///
/// # Arguments
///
/// * `config` - The `[storage]` section
///
/// # Returns
///
/// * `Ok(Storage)` - Handles sharing one backend
/// * `Err(StorageError)` - The database could not be opened
pub fn open_storage(config: &StorageConfig) -> StorageResult<Storage> {
    match config.backend {
        BackendKind::Sqlite => {
            info!("Opening SQLite storage at {}", config.database_path);
            Storage::sqlite(Path::new(&config.database_path))
        }
        BackendKind::Memory => {
            info!("Using in-memory storage");
            Ok(Storage::memory())
        }
    }
}
