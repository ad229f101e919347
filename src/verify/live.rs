// src/verify/live.rs

//! Stage A: is the registration URL reachable at all?

use std::sync::Arc;

use chrono::Utc;

use crate::models::VerificationConfig;
use crate::storage::{CacheStore, Expiring, UrlCheckEntry};
use crate::utils::http::{HttpProbe, ProbeResponse};
use crate::utils::url::{canonicalize, get_domain, host_matches, url_hash};

/// Result of a reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn from_status(status: u16) -> Self {
        let ok = is_success(status);
        Self {
            ok,
            status: Some(status),
            error: (!ok).then(|| format!("HTTP {status}")),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            error: Some(error.into()),
        }
    }
}

impl From<&UrlCheckEntry> for CheckOutcome {
    fn from(entry: &UrlCheckEntry) -> Self {
        Self {
            ok: entry.ok,
            status: entry.status,
            error: entry.error.clone(),
        }
    }
}

/// Statuses counted as live: `[200, 400)`.
pub fn is_success(status: u16) -> bool {
    (200..400).contains(&status)
}

/// HEAD-with-GET-fallback checker backed by a TTL cache.
pub struct LiveVerifier {
    probe: Arc<dyn HttpProbe>,
    cache: Arc<dyn CacheStore<UrlCheckEntry>>,
    ttl: chrono::Duration,
    head_blocked_hosts: Vec<String>,
}

impl LiveVerifier {
    pub fn new(
        probe: Arc<dyn HttpProbe>,
        cache: Arc<dyn CacheStore<UrlCheckEntry>>,
        config: &VerificationConfig,
    ) -> Self {
        let hours = i64::try_from(config.url_check_ttl_hours).unwrap_or(24);
        Self {
            probe,
            cache,
            ttl: chrono::Duration::hours(hours),
            head_blocked_hosts: config.head_blocked_hosts.clone(),
        }
    }

    fn head_blocked(&self, url: &str) -> bool {
        get_domain(url).is_some_and(|host| {
            self.head_blocked_hosts
                .iter()
                .any(|blocked| host_matches(&host, blocked))
        })
    }

    /// Check a URL, serving a fresh cached answer without network traffic.
    pub async fn verify(&self, url: &str) -> CheckOutcome {
        let canonical = canonicalize(url);
        let key = url_hash(url);
        let now = Utc::now();

        match self.cache.get(&key).await {
            Ok(Some(entry)) if entry.is_fresh(now) => {
                log::debug!("URL check cache hit: {}", canonical);
                return CheckOutcome::from(&entry);
            }
            Ok(_) => {}
            Err(e) => log::warn!("URL check cache read failed: {}", e),
        }

        let outcome = self.probe_url(&canonical).await;
        let entry = UrlCheckEntry {
            key: key.clone(),
            url: canonical,
            ok: outcome.ok,
            status: outcome.status,
            error: outcome.error.clone(),
            checked_at: now,
            expires_at: now + self.ttl,
        };
        if let Err(e) = self.cache.put(&key, entry).await {
            log::warn!("URL check cache write failed: {}", e);
        }
        outcome
    }

    async fn probe_url(&self, url: &str) -> CheckOutcome {
        if !self.head_blocked(url) {
            match self.probe.head(url).await {
                Ok(ProbeResponse { status, .. }) if status != 405 && status != 501 => {
                    return CheckOutcome::from_status(status);
                }
                Ok(ProbeResponse { status, .. }) => {
                    log::debug!("HEAD {} answered {}, retrying with GET", url, status);
                }
                Err(e) => {
                    log::debug!("HEAD {} failed ({}), retrying with GET", url, e);
                }
            }
        }

        match self.probe.get(url).await {
            Ok(response) => CheckOutcome::from_status(response.status),
            Err(e) => CheckOutcome::failed(e.to_string()),
        }
    }
}
