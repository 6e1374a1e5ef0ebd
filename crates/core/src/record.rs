//! Canonical resolved post types and post id validation.

use serde::{Deserialize, Serialize};

use crate::Error;

/// Prefix reserved for expiration pointer keys in the shared keyspace.
pub const POINTER_PREFIX: &str = "exp-";

/// Longest post id accepted.
const MAX_POST_ID_LEN: usize = 64;

/// A single media entry of a post, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MediaItem {
    /// Upstream type tag, e.g. `GraphImage` or `GraphVideo`.
    pub kind: String,
    /// Absolute resource URL.
    pub url: String,
}

/// A resolved post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Record {
    pub id: String,
    pub username: String,
    pub caption: String,
    pub media: Vec<MediaItem>,
}

/// Validate a post id before it is used as a cache key or in an upstream URL.
///
/// Ids are upstream shortcodes: ASCII letters, digits, `_` and `-`. Ids that
/// would collide with the pointer namespace are rejected.
pub fn validate_post_id(id: &str) -> Result<(), Error> {
    if id.is_empty() {
        return Err(Error::InvalidInput("post id cannot be empty".into()));
    }
    if id.len() > MAX_POST_ID_LEN {
        return Err(Error::InvalidInput(format!("post id exceeds {MAX_POST_ID_LEN} characters")));
    }
    if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return Err(Error::InvalidInput(format!("post id contains invalid characters: {id}")));
    }
    if id.starts_with(POINTER_PREFIX) {
        return Err(Error::InvalidInput(format!("post id may not start with {POINTER_PREFIX}")));
    }
    Ok(())
}
