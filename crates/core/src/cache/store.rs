//! Ordered key-value primitives on top of the `kv` table.
//!
//! Keys are compared bytewise, so range scans return entries in
//! lexicographic order. Write batches are applied in a single transaction:
//! either every operation in the batch is visible afterwards or none is.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, Connection, OptionalExtension};

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// An ordered list of mutations committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Put { key, value });
        self
    }

    pub fn delete(&mut self, key: Vec<u8>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Apply every operation on `conn`, in order.
    ///
    /// The caller owns the surrounding transaction.
    pub(crate) fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        for op in &self.ops {
            match op {
                BatchOp::Put { key, value } => {
                    conn.execute(
                        "INSERT INTO kv (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                        params![key, value],
                    )?;
                }
                BatchOp::Delete { key } => {
                    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                }
            }
        }
        Ok(())
    }
}

/// Read a single value inside an open connection or transaction.
pub(crate) fn get_value(conn: &Connection, key: &[u8]) -> rusqlite::Result<Option<Vec<u8>>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
        .optional()
}

/// Read up to `limit` entries with `start <= key < end`, ascending.
pub(crate) fn scan_values(
    conn: &Connection, start: &[u8], end: &[u8], limit: usize,
) -> rusqlite::Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut stmt = conn.prepare_cached(
        "SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key ASC LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![start, end, limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

impl CacheDb {
    /// Get the value stored under `key`.
    ///
    /// Returns None if the key doesn't exist.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let key = key.to_vec();
        self.conn
            .call(move |conn| -> Result<Option<Vec<u8>>, Error> { Ok(get_value(conn, &key)?) })
            .await
            .map_err(Error::from)
    }

    /// Commit a batch atomically.
    ///
    /// Any failure rolls back the whole batch and is reported as
    /// [`Error::CacheWrite`].
    pub async fn write(&self, batch: WriteBatch) -> Result<(), Error> {
        if batch.is_empty() {
            return Ok(());
        }
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction().map_err(|e| Error::CacheWrite(e.to_string()))?;
                batch.apply(&tx).map_err(|e| Error::CacheWrite(e.to_string()))?;
                tx.commit().map_err(|e| Error::CacheWrite(e.to_string()))
            })
            .await
            .map_err(Error::from)
    }

    /// Scan entries with `start <= key < end` in ascending key order.
    pub async fn scan_range(&self, start: &[u8], end: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
        let start = start.to_vec();
        let end = end.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<(Vec<u8>, Vec<u8>)>, Error> {
                Ok(scan_values(conn, &start, &end, limit)?)
            })
            .await
            .map_err(Error::from)
    }

    /// Count keys starting with `prefix`.
    pub async fn count_prefix(&self, prefix: &[u8]) -> Result<u64, Error> {
        let prefix = prefix.to_vec();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM kv WHERE substr(key, 1, ?2) = ?1",
                    params![prefix, prefix.len() as i64],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
