//! SQLite storage implementation
//!
//! One database file can be shared by several crawler processes: removals are
//! single `DELETE` statements whose affected row count tells the caller whether
//! it won the item.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    QueueBackend, SeenBackend, SeenRecord, StorageError, StorageResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite storage backend
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteBackend)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Inserts or replaces a serialized document
    pub fn upsert_document(&self, collection: &str, url: &str, body: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (collection, url, body, stored_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, url, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_document(&self, collection: &str, url: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let body = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND url = ?2",
                params![collection, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    pub fn document_count(&self, collection: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl QueueBackend for SqliteBackend {
    fn insert(&self, queue: &str, member: &str, score: i64) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO work_queue (queue, member, score) VALUES (?1, ?2, ?3)
             ON CONFLICT(queue, member) DO UPDATE SET score = excluded.score",
            params![queue, member, score],
        )?;
        Ok(())
    }

    fn first(&self, queue: &str) -> StorageResult<Option<(String, i64)>> {
        let conn = self.lock()?;
        let item = conn
            .query_row(
                "SELECT member, score FROM work_queue WHERE queue = ?1
                 ORDER BY score ASC, member ASC LIMIT 1",
                params![queue],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(item)
    }

    fn remove(&self, queue: &str, member: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM work_queue WHERE queue = ?1 AND member = ?2",
            params![queue, member],
        )?;
        Ok(removed == 1)
    }

    fn members(&self, queue: &str) -> StorageResult<Vec<(String, i64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT member, score FROM work_queue WHERE queue = ?1 ORDER BY score ASC, member ASC",
        )?;

        let members = stmt
            .query_map(params![queue], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    fn clear(&self, queue: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM work_queue WHERE queue = ?1", params![queue])?;
        Ok(())
    }

    fn count(&self, queue: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM work_queue WHERE queue = ?1",
            params![queue],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl SeenBackend for SqliteBackend {
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<SeenRecord>> {
        let conn = self.lock()?;
        let row: Option<(i64, u32, String)> = conn
            .query_row(
                "SELECT fingerprint, occurrences, alternatives FROM seen
                 WHERE collection = ?1 AND url = ?2",
                params![collection, key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((fingerprint, occurrences, alternatives)) => Ok(Some(SeenRecord {
                // fingerprints are stored bit-for-bit in a signed column
                fingerprint: fingerprint as u64,
                occurrences,
                alternatives: serde_json::from_str(&alternatives)?,
            })),
            None => Ok(None),
        }
    }

    fn put_all(&self, collection: &str, keys: &[String], record: &SeenRecord) -> StorageResult<()> {
        let alternatives = serde_json::to_string(&record.alternatives)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO seen (collection, url, fingerprint, occurrences, alternatives)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for key in keys {
                stmt.execute(params![
                    collection,
                    key,
                    record.fingerprint as i64,
                    record.occurrences,
                    alternatives
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM seen WHERE collection = ?1 AND url = ?2")?;
            for key in keys {
                removed += stmt.execute(params![collection, key])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn increment_all(&self, collection: &str, keys: &[String]) -> StorageResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE seen SET occurrences = occurrences + 1 WHERE collection = ?1 AND url = ?2",
            )?;
            for key in keys {
                updated += stmt.execute(params![collection, key])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    fn count(&self, collection: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM seen WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
