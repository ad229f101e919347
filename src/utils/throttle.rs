// src/utils/throttle.rs

//! Per-host request spacing.
//!
//! Each host owns a "next free slot". A caller reserves the current slot
//! under the lock and pushes the slot forward by the delay, then sleeps
//! outside the lock. Concurrent workers hitting the same host therefore
//! queue up behind each other while other hosts proceed freely.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::utils::url::get_domain;

/// Enforces a minimum delay between consecutive requests to the same host.
#[derive(Debug)]
pub struct HostThrottle {
    default_delay: Duration,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl HostThrottle {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    pub fn default_delay(&self) -> Duration {
        self.default_delay
    }

    /// Wait for this URL's host using the default delay.
    pub async fn wait(&self, url: &str) {
        self.wait_with(url, self.default_delay).await;
    }

    /// Wait for this URL's host, then reserve the next slot `delay` later.
    pub async fn wait_with(&self, url: &str, delay: Duration) {
        let Some(host) = get_domain(url) else {
            return;
        };

        let slot = {
            let mut slots = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = slots
                .get(&host)
                .copied()
                .filter(|next| *next > now)
                .unwrap_or(now);
            slots.insert(host.clone(), slot + delay);
            slot
        };

        if slot > Instant::now() {
            log::debug!("Throttling {} until slot in {:?}", host, slot - Instant::now());
            tokio::time::sleep_until(slot).await;
        }
    }
}
