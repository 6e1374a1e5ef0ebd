//! embedfix server entry point.
//!
//! Boots the MCP server on stdio transport with the post resolver behind it.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use embedfix_client::{FetchClient, FetchConfig, ProxySelector, Resolver};
use embedfix_core::{AppConfig, CacheDb, TtlCache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache at {}", config.db_path.display()))?;
    let cache = TtlCache::with_ttl(db, config.cache_ttl());
    let sweeper = cache.spawn_sweeper(config.sweep_interval());

    let proxies = ProxySelector::new(config.proxy_file.clone());
    tracing::info!(
        db_path = %config.db_path.display(),
        proxy_file = ?proxies.path(),
        ttl_secs = cache.ttl().num_seconds(),
        "Starting embedfix server on stdio transport"
    );

    let client = FetchClient::new(FetchConfig::from(&config), proxies)?;
    let resolver = Resolver::new(cache, Arc::new(client));

    let handler = handler::EmbedfixServer::new(resolver);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    sweeper.abort();

    Ok(())
}
