//! Time-to-live cache for resolved posts.
//!
//! Each record lives under its post id. Alongside it sits exactly one
//! expiration pointer `exp-<expiry>` whose value is the post id. Both are
//! written in one transaction, and the sweep walks pointers oldest-first,
//! deleting pointer and record together until it reaches the first pointer
//! that has not yet expired.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::keys::{POINTER_RANGE_END, parse_pointer_key, pointer_key, pointer_range_start, record_key, to_nanos};
use super::store::{WriteBatch, get_value, scan_values};
use crate::{Error, Record};

/// Default record lifetime (24 hours).
pub const DEFAULT_TTL: Duration = Duration::hours(24);

/// Pointers examined per sweep round trip.
const SWEEP_CHUNK: usize = 256;

/// Value stored under a record key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    /// Expiry in Unix nanoseconds; matches the record's pointer key.
    expires_at: i64,
    record: Record,
}

fn decode(id: &str, bytes: &[u8]) -> Result<StoredRecord, Error> {
    serde_json::from_slice(bytes).map_err(|e| Error::CorruptRecord(format!("record {id}: {e}")))
}

/// TTL cache over the ordered key-value store.
#[derive(Clone, Debug)]
pub struct TtlCache {
    db: CacheDb,
    ttl: Duration,
}

impl TtlCache {
    /// Wrap a database with the default 24 hour TTL.
    pub fn new(db: CacheDb) -> Self {
        Self::with_ttl(db, DEFAULT_TTL)
    }

    pub fn with_ttl(db: CacheDb, ttl: Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a cached record.
    ///
    /// Records stay readable until the sweep removes them, even past expiry.
    /// Undecodable bytes surface as [`Error::CorruptRecord`].
    pub async fn get(&self, id: &str) -> Result<Option<Record>, Error> {
        match self.db.get(&record_key(id)).await? {
            Some(bytes) => Ok(Some(decode(id, &bytes)?.record)),
            None => Ok(None),
        }
    }

    /// Store a record expiring one TTL from now.
    pub async fn put(&self, record: &Record) -> Result<DateTime<Utc>, Error> {
        self.put_at(record, Utc::now()).await
    }

    /// Store a record as if written at `now`, returning its expiry.
    ///
    /// The record, its new pointer, and the removal of any pointer left by a
    /// previous write of the same id commit in a single transaction. Pointer
    /// keys are unique, so an expiry already claimed by another id is pushed
    /// forward one nanosecond at a time until a free key is found.
    pub async fn put_at(&self, record: &Record, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| Error::CacheWrite(format!("expiry out of range for record {}", record.id)))?;
        let requested = to_nanos(expires);
        let record = record.clone();

        let expires_at = self
            .db
            .conn
            .call(move |conn| -> Result<i64, Error> {
                let write_err = |e: rusqlite::Error| Error::CacheWrite(e.to_string());
                let tx = conn.transaction().map_err(write_err)?;
                let id = record.id.clone();
                let key = record_key(&id);

                let mut expires_at = requested;
                while let Some(owner) = get_value(&tx, &pointer_key(expires_at)).map_err(write_err)? {
                    if owner == id.as_bytes() {
                        break;
                    }
                    expires_at = expires_at
                        .checked_add(1)
                        .ok_or_else(|| Error::CacheWrite(format!("no free expiry pointer for record {id}")))?;
                }

                let mut batch = WriteBatch::new();
                if let Some(prior) = get_value(&tx, &key).map_err(write_err)? {
                    match serde_json::from_slice::<StoredRecord>(&prior) {
                        Ok(stored) if stored.expires_at != expires_at => {
                            let prior_pointer = pointer_key(stored.expires_at);
                            let owner = get_value(&tx, &prior_pointer).map_err(write_err)?;
                            if owner.as_deref() == Some(id.as_bytes()) {
                                batch.delete(prior_pointer);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(post_id = %id, error = %e, "replacing undecodable cache record"),
                    }
                }

                let value = serde_json::to_vec(&StoredRecord { expires_at, record })
                    .map_err(|e| Error::CacheWrite(format!("failed to serialize record {id}: {e}")))?;
                batch.put(key, value);
                batch.put(pointer_key(expires_at), id.into_bytes());

                batch.apply(&tx).map_err(write_err)?;
                tx.commit().map_err(write_err)?;
                Ok(expires_at)
            })
            .await
            .map_err(Error::from)?;

        Ok(DateTime::from_timestamp_nanos(expires_at))
    }

    /// Sweep everything expired as of now.
    pub async fn sweep(&self) -> Result<u64, Error> {
        self.sweep_expired(Utc::now()).await
    }

    /// Delete every record whose pointer expired at or before `cutoff`.
    ///
    /// Pointers are visited in ascending order and the scan stops at the first
    /// pointer later than `cutoff`. Returns the number of records deleted.
    pub async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = to_nanos(cutoff);
        let mut deleted = 0u64;

        loop {
            let (removed, done) = self
                .db
                .conn
                .call(move |conn| -> Result<(u64, bool), Error> {
                    let tx = conn.transaction()?;
                    let pointers = scan_values(&tx, pointer_range_start(), POINTER_RANGE_END, SWEEP_CHUNK)?;
                    let exhausted = pointers.len() < SWEEP_CHUNK;

                    let mut batch = WriteBatch::new();
                    let mut removed = 0u64;
                    let mut reached_live = false;

                    for (pointer, id) in pointers {
                        let Some(expires_at) = parse_pointer_key(&pointer) else {
                            batch.delete(pointer);
                            continue;
                        };
                        if expires_at > cutoff {
                            reached_live = true;
                            break;
                        }
                        batch.delete(pointer);

                        let owned = match get_value(&tx, &id)? {
                            Some(bytes) => serde_json::from_slice::<StoredRecord>(&bytes)
                                .map(|stored| stored.expires_at == expires_at)
                                .unwrap_or(true),
                            None => false,
                        };
                        if owned {
                            batch.delete(id);
                            removed += 1;
                        }
                    }

                    batch.apply(&tx)?;
                    tx.commit()?;
                    Ok((removed, reached_live || exhausted))
                })
                .await
                .map_err(Error::from)?;

            deleted += removed;
            if done {
                break;
            }
        }

        Ok(deleted)
    }

    /// Number of live expiration pointers.
    pub async fn pointer_count(&self) -> Result<u64, Error> {
        self.db.count_prefix(pointer_range_start()).await
    }

    /// Run [`sweep`](Self::sweep) every `interval` until the task is aborted.
    pub fn spawn_sweeper(&self, interval: StdDuration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match cache.sweep().await {
                    Ok(0) => tracing::trace!("cache sweep found nothing to expire"),
                    Ok(deleted) => tracing::info!(deleted, "expired cache records swept"),
                    Err(e) => tracing::error!(error = %e, "cache sweep failed"),
                }
            }
        })
    }
}
