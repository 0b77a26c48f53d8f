//! Network-fetch capability used by remote resolution sources.
//!
//! A [`Fetcher`] performs a single GET and hands back the body. Sources own
//! the URL layout; fetchers own the transport. [`HttpFetcher`] is the reqwest
//! implementation; [`memory::MemoryFetcher`] serves canned responses for tests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use keystone_core::time::serde_millis;

use crate::error::{ResolutionError, Result};

/// One GET per call.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`. `Ok(None)` means the resource does not exist (404).
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>>;
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpFetcherConfig {
    /// Per-request timeout.
    #[serde(with = "serde_millis")]
    pub timeout: Duration,
    /// User-Agent header for HTTP requests.
    pub user_agent: String,
    /// Bodies larger than this are rejected before parsing.
    pub max_body_bytes: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: concat!("keystone/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ResolutionError::Fetch(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/did+json, application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ResolutionError::Fetch(format!("{url} returned {status}")));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.config.max_body_bytes as u64)
        {
            return Err(ResolutionError::Fetch(format!(
                "{url} body exceeds {} bytes",
                self.config.max_body_bytes
            )));
        }

        let body = response.bytes().await?;
        if body.len() > self.config.max_body_bytes {
            return Err(ResolutionError::Fetch(format!(
                "{url} body exceeds {} bytes",
                self.config.max_body_bytes
            )));
        }
        Ok(Some(body))
    }
}

/// A canned-response fetcher for tests.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Clone)]
    enum Route {
        Body(Bytes),
        Failure(String),
        Stall(Duration, Bytes),
    }

    /// Serves registered URLs; everything else is a 404.
    #[derive(Debug, Default)]
    pub struct MemoryFetcher {
        routes: RwLock<HashMap<String, Route>>,
        requests: RwLock<Vec<String>>,
    }

    impl MemoryFetcher {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Serve `body` at `url`.
        pub async fn serve(&self, url: &str, body: impl Into<Bytes>) {
            self.routes
                .write()
                .await
                .insert(url.to_string(), Route::Body(body.into()));
        }

        /// Fail every request to `url`.
        pub async fn fail(&self, url: &str, message: &str) {
            self.routes
                .write()
                .await
                .insert(url.to_string(), Route::Failure(message.to_string()));
        }

        /// Serve `body` at `url` after sleeping for `delay`.
        pub async fn stall(&self, url: &str, delay: Duration, body: impl Into<Bytes>) {
            self.routes
                .write()
                .await
                .insert(url.to_string(), Route::Stall(delay, body.into()));
        }

        /// Every URL requested so far, in order.
        pub async fn requests(&self) -> Vec<String> {
            self.requests.read().await.clone()
        }
    }

    #[async_trait]
    impl Fetcher for MemoryFetcher {
        async fn fetch(&self, url: &str) -> Result<Option<Bytes>> {
            self.requests.write().await.push(url.to_string());
            let route = self.routes.read().await.get(url).cloned();
            match route {
                Some(Route::Body(body)) => Ok(Some(body)),
                Some(Route::Failure(message)) => Err(ResolutionError::Fetch(message)),
                Some(Route::Stall(delay, body)) => {
                    tokio::time::sleep(delay).await;
                    Ok(Some(body))
                }
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryFetcher;
    use super::*;

    #[tokio::test]
    async fn test_memory_fetcher_routes() {
        let fetcher = MemoryFetcher::new();
        fetcher.serve("https://a.example/did.json", "{}").await;
        fetcher.fail("https://b.example/did.json", "connection reset").await;

        assert_eq!(
            fetcher.fetch("https://a.example/did.json").await.unwrap(),
            Some(Bytes::from_static(b"{}"))
        );
        assert!(fetcher.fetch("https://b.example/did.json").await.is_err());
        assert_eq!(fetcher.fetch("https://c.example/did.json").await.unwrap(), None);
        assert_eq!(fetcher.requests().await.len(), 3);
    }

    #[test]
    fn test_http_fetcher_builds() {
        let config = HttpFetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(HttpFetcher::new(config).is_ok());
    }
}
