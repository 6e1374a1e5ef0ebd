//! Core types and shared functionality for embedfix.
//!
//! This crate provides:
//! - TTL cache over an ordered SQLite key-value store
//! - Unified error types
//! - Canonical post records
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod record;

pub use cache::{CacheDb, TtlCache, WriteBatch};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use record::{MediaItem, Record, validate_post_id};
