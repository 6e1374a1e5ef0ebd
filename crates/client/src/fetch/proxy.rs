//! Outbound proxy selection.
//!
//! The proxy list is a plain text file with one address per line. It is
//! re-read on every call so edits take effect without a restart.

use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};

/// Picks a proxy per request attempt, or none for a direct connection.
#[derive(Debug, Clone, Default)]
pub struct ProxySelector {
    path: Option<PathBuf>,
}

impl ProxySelector {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// A selector that always connects directly.
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Pick a proxy address uniformly at random from the list.
    ///
    /// Returns `None` when no list is configured, the list is empty, or it
    /// cannot be read. A read failure is logged and degrades to direct.
    pub async fn next(&self) -> Option<String> {
        let path = self.path.as_ref()?;
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read proxy file");
                return None;
            }
        };

        let proxies = parse_list(&contents);
        proxies.choose(&mut rand::thread_rng()).map(|p| p.to_string())
    }
}

/// Non-empty trimmed lines of a proxy list.
pub fn parse_list(contents: &str) -> Vec<&str> {
    contents.lines().map(str::trim).filter(|line| !line.is_empty()).collect()
}

/// Proxy URL for an address; bare `host:port` entries are SOCKS5.
pub fn proxy_url(address: &str) -> String {
    if address.contains("://") { address.to_string() } else { format!("socks5://{address}") }
}
