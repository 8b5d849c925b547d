//! Output module for parsed documents and statistics
//!
//! This module handles:
//! - Writing documents to stdout or a JSON-lines file
//! - Upserting documents into an SQLite keyed store
//! - Formatting queue statistics

mod json_lines;
mod keyed_store;
pub mod stats;
mod traits;

pub use json_lines::{FileSink, StdoutSink};
pub use keyed_store::KeyedStoreSink;
pub use stats::{format_statistics, print_statistics};
pub use traits::{Document, DocumentSink, OutputError, OutputResult};

use crate::config::{OutputConfig, OutputKind};
use std::path::Path;

/// Opens the sink selected in the configuration for one spider
///
/// # Arguments
///
/// * `spider` - Spider name, used to key the keyed store
/// * `config` - The `[output]` section
///
/// # Returns
///
/// * `Ok(Box<dyn DocumentSink>)` - Ready to store documents
/// * `Err(OutputError)` - A path is missing or could not be opened
pub fn open_sink(spider: &str, config: &OutputConfig) -> OutputResult<Box<dyn DocumentSink>> {
    let path = || {
        config
            .path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(Path::new)
            .ok_or_else(|| OutputError::Config(format!("output type {:?} needs a path", config.kind)))
    };

    let sink: Box<dyn DocumentSink> = match config.kind {
        OutputKind::Stdout => Box::new(StdoutSink::new()),
        OutputKind::File => Box::new(FileSink::open(path()?)?),
        OutputKind::KeyedStore => Box::new(KeyedStoreSink::open(path()?, spider)?),
    };
    Ok(sink)
}
