// src/utils/http.rs

//! HTTP client utilities.
//!
//! Two seams keep the network out of the pipeline's logic:
//! [`PageFetcher`] serves listing pages to adapters and [`HttpProbe`]
//! answers the HEAD/GET requests of the verification stages.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::FetchConfig;
use crate::storage::{CacheStore, Expiring, HtmlCacheEntry};
use crate::utils::throttle::HostThrottle;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &FetchConfig, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Source of listing page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body. `delay` overrides the default per-host spacing.
    async fn fetch_html(&self, url: &str, delay: Option<Duration>) -> Result<String>;
}

/// Cached, throttled listing page fetcher.
pub struct Fetcher {
    client: reqwest::Client,
    throttle: Arc<HostThrottle>,
    cache: Arc<dyn CacheStore<HtmlCacheEntry>>,
    cache_ttl: chrono::Duration,
}

impl Fetcher {
    pub fn new(
        client: reqwest::Client,
        throttle: Arc<HostThrottle>,
        cache: Arc<dyn CacheStore<HtmlCacheEntry>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            client,
            throttle,
            cache,
            cache_ttl: chrono::Duration::from_std(cache_ttl)
                .unwrap_or_else(|_| chrono::Duration::hours(1)),
        }
    }

    async fn download(&self, url: &str, delay: Option<Duration>) -> Result<(u16, String)> {
        match delay {
            Some(delay) => self.throttle.wait_with(url, delay).await,
            None => self.throttle.wait(url).await,
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_request(url, e))?;
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    async fn fetch_html(&self, url: &str, delay: Option<Duration>) -> Result<String> {
        let now = Utc::now();
        match self.cache.get(url).await {
            Ok(Some(entry)) if entry.is_fresh(now) => {
                log::debug!("HTML cache hit: {}", url);
                return Ok(entry.body);
            }
            Ok(_) => {}
            Err(e) => log::warn!("HTML cache read failed for {}: {}", url, e),
        }

        let (status, body) = self.download(url, delay).await?;
        log::debug!("Fetched {} ({} bytes)", url, body.len());

        let entry = HtmlCacheEntry {
            url: url.to_string(),
            status,
            body: body.clone(),
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        };
        if let Err(e) = self.cache.put(url, entry).await {
            log::warn!("HTML cache write failed for {}: {}", url, e);
        }
        Ok(body)
    }
}

/// What a verification request observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// Present for GET requests
    pub body: Option<String>,
}

/// HEAD/GET requests for the verification stages.
///
/// Non-2xx answers are responses, not errors; `Err` means no response
/// arrived at all (DNS, TLS, timeout).
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn head(&self, url: &str) -> Result<ProbeResponse>;

    async fn get(&self, url: &str) -> Result<ProbeResponse>;
}

/// [`HttpProbe`] over reqwest, sharing the per-host throttle.
pub struct ReqwestProbe {
    client: reqwest::Client,
    throttle: Arc<HostThrottle>,
}

impl ReqwestProbe {
    pub fn new(client: reqwest::Client, throttle: Arc<HostThrottle>) -> Self {
        Self { client, throttle }
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        self.throttle.wait(url).await;
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| AppError::from_request(url, e))?;

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
            body: None,
        })
    }

    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        self.throttle.wait(url).await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::from_request(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_request(url, e))?;

        Ok(ProbeResponse {
            status,
            final_url,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_fresh_cache_entry_skips_network() {
        let cache: Arc<MemoryStore<HtmlCacheEntry>> = Arc::new(MemoryStore::new());
        let now = Utc::now();
        // Port 9 on localhost: any real request here would fail.
        let url = "http://127.0.0.1:9/listing";
        cache
            .put(
                url,
                HtmlCacheEntry {
                    url: url.into(),
                    status: 200,
                    body: "<html>cached</html>".into(),
                    fetched_at: now,
                    expires_at: now + chrono::Duration::hours(1),
                },
            )
            .await
            .unwrap();

        let client = create_client(&FetchConfig::default(), 1).unwrap();
        let fetcher = Fetcher::new(
            client,
            Arc::new(HostThrottle::new(Duration::ZERO)),
            cache,
            Duration::from_secs(60),
        );

        let body = fetcher.fetch_html(url, None).await.unwrap();
        assert_eq!(body, "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_expired_cache_entry_refetches() {
        let cache: Arc<MemoryStore<HtmlCacheEntry>> = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let url = "http://127.0.0.1:9/listing";
        cache
            .put(
                url,
                HtmlCacheEntry {
                    url: url.into(),
                    status: 200,
                    body: "stale".into(),
                    fetched_at: now - chrono::Duration::hours(2),
                    expires_at: now - chrono::Duration::hours(1),
                },
            )
            .await
            .unwrap();

        let client = create_client(&FetchConfig::default(), 1).unwrap();
        let fetcher = Fetcher::new(
            client,
            Arc::new(HostThrottle::new(Duration::ZERO)),
            cache,
            Duration::from_secs(60),
        );

        // Nothing listens on the discard port, so the refetch errors.
        assert!(fetcher.fetch_html(url, None).await.is_err());
    }
}
