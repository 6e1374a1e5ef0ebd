//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Longest accepted record lifetime (ten years).
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_attempts` is 0 or greater than 10
    /// - `cache_ttl_secs` or `sweep_interval_secs` is 0
    /// - `cache_ttl_secs` exceeds ten years
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `proxy_file` is set to an empty path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(ConfigError::Invalid { field: "max_attempts".into(), reason: "must be between 1 and 10".into() });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: format!("must not exceed ten years ({MAX_CACHE_TTL_SECS}s)"),
            });
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep_interval_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(path) = &self.proxy_file
            && path.as_os_str().is_empty()
        {
            return Err(ConfigError::Missing {
                field: "proxy_file".into(),
                hint: "Unset EMBEDFIX_PROXY_FILE to connect directly".into(),
            });
        }

        if self.retry_exponential && self.retry_base_delay_ms == 0 {
            tracing::warn!("retry_exponential is set but retry_base_delay_ms is 0; retries will not back off");
        }

        Ok(())
    }
}
