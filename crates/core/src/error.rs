//! Unified error types for embedfix.
//!
//! The taxonomy separates expected outcomes (a post that upstream has no data
//! for) from transport, parse and cache failures so callers can log and map
//! them differently.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the resolution pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a malformed post id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Upstream has no recoverable data for the post.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Network failure or timeout after the retry budget was spent.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(String),

    /// Malformed JSON, HTML or script payload.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// An atomic cache write did not commit.
    #[error("CACHE_WRITE_ERROR: {0}")]
    CacheWrite(String),

    /// A stored value could not be decoded.
    #[error("CACHE_CORRUPT: {0}")]
    CorruptRecord(String),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether this failure is a normal outcome rather than a fault.
    ///
    /// Only `NotFound` qualifies; it is logged at warning level while
    /// everything else is logged as an error.
    pub fn is_expected(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::Transport(msg) => (-32003, msg.clone()),
            Error::Parse(msg) => (-32004, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::CacheWrite(msg) => (-32002, msg.clone()),
            Error::CorruptRecord(msg) => (-32002, msg.clone()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("C0ffee".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("C0ffee"));
    }

    #[test]
    fn test_only_not_found_is_expected() {
        assert!(Error::NotFound("x".into()).is_expected());
        assert!(!Error::Transport("x".into()).is_expected());
        assert!(!Error::Parse("x".into()).is_expected());
        assert!(!Error::CacheWrite("x".into()).is_expected());
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NotFound("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::CacheWrite("disk full".into()).into();
        assert_eq!(mcp_err.code.0, -32002);
    }
}
