//! Keyed-store sink
//!
//! Documents are upserted into the `documents` table of an SQLite database,
//! keyed by `({spider}-output, url)`, so the table always holds the latest
//! version of each page.

use crate::output::traits::{Document, DocumentSink, OutputError, OutputResult};
use crate::storage::{SqliteBackend, StorageError};
use std::path::Path;

impl From<StorageError> for OutputError {
    fn from(err: StorageError) -> Self {
        OutputError::Storage(err.to_string())
    }
}

/// Writes documents to an SQLite table keyed by URL
pub struct KeyedStoreSink {
    backend: SqliteBackend,
    collection: String,
}

impl KeyedStoreSink {
    /// Opens the database at `path` for the spider named `spider`
    pub fn open(path: &Path, spider: &str) -> OutputResult<Self> {
        Ok(Self {
            backend: SqliteBackend::new(path)?,
            collection: format!("{}-output", spider),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the stored document for `url`, if any
    pub fn get(&self, url: &str) -> OutputResult<Option<Document>> {
        match self.backend.get_document(&self.collection, url)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> OutputResult<usize> {
        Ok(self.backend.document_count(&self.collection)?)
    }

    pub fn is_empty(&self) -> OutputResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl DocumentSink for KeyedStoreSink {
    fn store(&mut self, doc: &Document) -> OutputResult<()> {
        let body = serde_json::to_string(doc)?;
        self.backend
            .upsert_document(&self.collection, &doc.url, &body)?;
        Ok(())
    }
}
