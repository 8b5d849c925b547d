//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Recrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Score-ordered work queues
CREATE TABLE IF NOT EXISTS work_queue (
    queue TEXT NOT NULL,
    member TEXT NOT NULL,
    score INTEGER NOT NULL,
    PRIMARY KEY (queue, member)
);

CREATE INDEX IF NOT EXISTS idx_work_queue_score ON work_queue(queue, score, member);

-- Seen records, one row per canonical URL of a cluster
CREATE TABLE IF NOT EXISTS seen (
    collection TEXT NOT NULL,
    url TEXT NOT NULL,
    fingerprint INTEGER NOT NULL,
    occurrences INTEGER NOT NULL DEFAULT 1,
    alternatives TEXT NOT NULL,
    PRIMARY KEY (collection, url)
);

-- Parsed documents written by the keyed-store sink
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    url TEXT NOT NULL,
    body TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (collection, url)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
