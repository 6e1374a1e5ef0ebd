//! SQLite-backed TTL cache for resolved posts.
//!
//! This module provides a persistent cache using SQLite as an ordered
//! key-value store, with async access via tokio-rusqlite. It supports:
//!
//! - Atomic multi-key write batches
//! - Ascending range scans over byte-ordered keys
//! - A time-ordered expiration index swept oldest-first
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod keys;
pub mod migrations;
pub mod store;
pub mod ttl;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::{BatchOp, WriteBatch};
pub use ttl::{DEFAULT_TTL, TtlCache};
