//! Upstream HTTP transport with proxy rotation and bounded retries.
//!
//! ### Requests
//! - Browser-like headers, `Connection: close`, no idle connection pooling
//! - Fixed per-attempt timeout (default 10s)
//!
//! ### Egress
//! - Each attempt asks the [`ProxySelector`] for a SOCKS proxy
//! - No proxy (or an unusable one) means a direct connection
//!
//! ### Retries
//! - An error or an empty body counts as a failed attempt
//! - Attempts and delays come from the injected [`RetryPolicy`]

pub mod proxy;
pub mod retry;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use proxy::{ProxySelector, proxy_url};
pub use retry::RetryPolicy;
pub use url::{GRAPHQL_QUERY_HASH, UpstreamRequest, embed_request, graphql_request, post_url};

use embedfix_core::Error;
use embedfix_core::config::{AppConfig, DEFAULT_USER_AGENT};

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Performs upstream GETs on behalf of the resolver.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a non-empty response body.
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Bytes, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Chrome)
    pub user_agent: String,

    /// Per-attempt timeout (default: 10s)
    pub timeout: Duration,

    /// Retry policy (default: 3 attempts, no backoff)
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: DEFAULT_USER_AGENT.to_string(), timeout: Duration::from_secs(10), retry: RetryPolicy::default() }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            retry: RetryPolicy::new(config.max_attempts)
                .with_base_delay(config.retry_base_delay())
                .with_exponential_backoff(config.retry_exponential),
        }
    }
}

/// HTTP client for upstream requests.
pub struct FetchClient {
    direct: Client,
    config: FetchConfig,
    proxies: ProxySelector,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig, proxies: ProxySelector) -> Result<Self, Error> {
        let direct = build_client(&config, None)?;
        Ok(Self { direct, config, proxies })
    }

    /// Client for one attempt, routed through `proxy` when given.
    fn client_for(&self, proxy: Option<&str>) -> Client {
        match proxy {
            Some(address) => match build_client(&self.config, Some(address)) {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!(proxy = %address, error = %e, "unusable proxy, connecting directly");
                    self.direct.clone()
                }
            },
            None => self.direct.clone(),
        }
    }

    async fn attempt(&self, client: &Client, request: &UpstreamRequest) -> Result<Bytes, Error> {
        let mut builder = client
            .get(request.url.clone())
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .header(header::CONNECTION, "close")
            .header("Sec-Fetch-Mode", "navigate");
        if let Some(referer) = &request.referer {
            builder = builder.header(header::REFERER, referer);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Transport(format!("timed out after {:?}", self.config.timeout))
            } else {
                Error::Transport(format!("network error: {e}"))
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response: {e}")))?;

        tracing::debug!(status = status.as_u16(), bytes = bytes.len(), "upstream responded");
        Ok(bytes)
    }
}

#[async_trait]
impl Transport for FetchClient {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<Bytes, Error> {
        let start = Instant::now();
        let attempts = self.config.retry.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            let proxy = self.proxies.next().await;
            let client = self.client_for(proxy.as_deref());

            match self.attempt(&client, request).await {
                Ok(body) if !body.is_empty() => {
                    tracing::debug!(
                        url = %request.url,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "fetched upstream document"
                    );
                    return Ok(body);
                }
                Ok(_) => {
                    tracing::warn!(url = %request.url, attempt, proxy = ?proxy, "empty response body");
                    last_error = Some(Error::Transport("empty response body".into()));
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, attempt, proxy = ?proxy, error = %e, "upstream attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                let delay = self.config.retry.delay_for_attempt(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Transport("no attempts made".into())))
    }
}

fn build_client(config: &FetchConfig, proxy: Option<&str>) -> Result<Client, Error> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .pool_max_idle_per_host(0)
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true);

    builder = match proxy {
        Some(address) => {
            let proxy = reqwest::Proxy::all(proxy_url(address))
                .map_err(|e| Error::Transport(format!("invalid proxy {address}: {e}")))?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const EMPTY: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const HELLO: &str = "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";

    /// Serve one canned response per connection, counting connections.
    async fn serve(responses: Vec<&'static str>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}/p/abc/embed/captioned/"), hits)
    }

    fn request(url: &str) -> UpstreamRequest {
        UpstreamRequest { url: url.parse().unwrap(), referer: None }
    }

    fn client(attempts: u32) -> FetchClient {
        let config = FetchConfig {
            timeout: Duration::from_secs(2),
            retry: RetryPolicy::new(attempts),
            ..Default::default()
        };
        FetchClient::new(config, ProxySelector::direct()).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::new(3));
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 2500, max_attempts: 5, retry_base_delay_ms: 100, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default(), ProxySelector::direct());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_retries_empty_body() {
        let (url, hits) = serve(vec![EMPTY, HELLO]).await;
        let body = client(3).fetch(&request(&url)).await.unwrap();
        assert_eq!(&body[..], b"hello");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempt_budget() {
        let (url, hits) = serve(vec![EMPTY, EMPTY, EMPTY, HELLO]).await;
        let result = client(3).fetch(&request(&url)).await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = client(2).fetch(&request(&format!("http://{addr}/"))).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_proxied_client_builds() {
        assert!(build_client(&FetchConfig::default(), Some("127.0.0.1:1080")).is_ok());
    }
}
