//! JSON-lines sinks
//!
//! Each document becomes one line of JSON, on stdout or appended to a file.

use crate::output::traits::{Document, DocumentSink, OutputResult};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn write_line<W: Write>(writer: &mut W, doc: &Document) -> OutputResult<()> {
    serde_json::to_writer(&mut *writer, doc)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Prints every document to standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentSink for StdoutSink {
    fn store(&mut self, doc: &Document) -> OutputResult<()> {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_line(&mut handle, doc)
    }
}

/// Appends every document to a file
#[derive(Debug)]
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Opens `path` for appending, creating it if needed
    pub fn open(path: &Path) -> OutputResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl DocumentSink for FileSink {
    fn store(&mut self, doc: &Document) -> OutputResult<()> {
        write_line(&mut self.writer, doc)
    }
}
