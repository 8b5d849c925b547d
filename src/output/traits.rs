//! Output sink traits and types
//!
//! This module defines the document produced for every successful fetch and
//! the trait implemented by the places documents are written to.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Output configuration error: {0}")]
    Config(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A parsed page as handed to the sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Normalized URL the page was served from
    pub url: String,

    pub raw_html: String,

    pub title: Option<String>,

    /// Fetch time, `%Y-%m-%dT%H:%M` in UTC
    pub fetched_time: String,

    /// HTTP status code
    pub status: u16,

    /// Content fingerprint as 16 hex digits
    pub hash: String,

    /// `host[:port]` of `url`
    pub domain: String,
}

/// Destination for parsed documents
pub trait DocumentSink: Send {
    /// Writes one document
    fn store(&mut self, doc: &Document) -> OutputResult<()>;
}
