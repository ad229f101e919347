// src/health/mod.rs

//! Provider health tracking.
//!
//! Each provider carries a small state machine that moves
//! HEALTHY → DEGRADED → FAILED as consecutive fetch failures accumulate and
//! snaps back to HEALTHY on the first success. Records are updated once per
//! provider per run and persisted through [`HealthStore`](crate::storage::HealthStore).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::HealthConfig;

/// Health state of a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    #[default]
    Healthy,
    Degraded,
    Failed,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Degraded => "DEGRADED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted health of one provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderHealthRecord {
    pub provider_id: String,
    #[serde(default)]
    pub state: HealthState,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub total_successes: u64,
    #[serde(default)]
    pub total_failures: u64,
    /// Items returned by the most recent successful fetch
    #[serde(default)]
    pub last_item_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ProviderHealthRecord {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            state: HealthState::Healthy,
            consecutive_failures: 0,
            last_success_at: None,
            last_failure_at: None,
            total_runs: 0,
            total_successes: 0,
            total_failures: 0,
            last_item_count: 0,
            last_error: None,
        }
    }
}

/// Failure thresholds for state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub degraded_threshold: u32,
    pub failed_threshold: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            degraded_threshold: 2,
            failed_threshold: 3,
        }
    }
}

impl From<&HealthConfig> for HealthPolicy {
    fn from(config: &HealthConfig) -> Self {
        Self {
            degraded_threshold: config.degraded_threshold,
            failed_threshold: config.failed_threshold,
        }
    }
}

impl HealthPolicy {
    /// State implied by a consecutive failure count.
    pub fn state_for(&self, consecutive_failures: u32) -> HealthState {
        if consecutive_failures >= self.failed_threshold {
            HealthState::Failed
        } else if consecutive_failures >= self.degraded_threshold {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        }
    }
}

/// In-memory view of all provider health records for one run.
#[derive(Debug, Clone)]
pub struct HealthTracker {
    policy: HealthPolicy,
    records: BTreeMap<String, ProviderHealthRecord>,
}

impl HealthTracker {
    pub fn new(policy: HealthPolicy, records: BTreeMap<String, ProviderHealthRecord>) -> Self {
        Self { policy, records }
    }

    pub fn policy(&self) -> HealthPolicy {
        self.policy
    }

    /// Current record, if the provider has ever run.
    pub fn get(&self, provider_id: &str) -> Option<&ProviderHealthRecord> {
        self.records.get(provider_id)
    }

    /// Current state (HEALTHY for providers never seen).
    pub fn state(&self, provider_id: &str) -> HealthState {
        self.get(provider_id).map(|r| r.state).unwrap_or_default()
    }

    fn entry(&mut self, provider_id: &str) -> &mut ProviderHealthRecord {
        self.records
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealthRecord::new(provider_id))
    }

    /// Record a successful fetch: reset the failure streak.
    pub fn record_success(
        &mut self,
        provider_id: &str,
        item_count: usize,
        at: DateTime<Utc>,
    ) -> &ProviderHealthRecord {
        let record = self.entry(provider_id);
        let previous = record.state;

        record.total_runs += 1;
        record.total_successes += 1;
        record.consecutive_failures = 0;
        record.state = HealthState::Healthy;
        record.last_success_at = Some(at);
        record.last_item_count = item_count;
        record.last_error = None;

        if previous != HealthState::Healthy {
            log::info!("Provider {} recovered: {} -> HEALTHY", provider_id, previous);
        }
        record
    }

    /// Record a failed fetch and advance the state machine.
    pub fn record_failure(
        &mut self,
        provider_id: &str,
        error: &str,
        at: DateTime<Utc>,
    ) -> &ProviderHealthRecord {
        let policy = self.policy;
        let record = self.entry(provider_id);
        let previous = record.state;

        record.total_runs += 1;
        record.total_failures += 1;
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.state = policy.state_for(record.consecutive_failures);
        record.last_failure_at = Some(at);
        record.last_error = Some(error.to_string());

        if record.state != previous {
            log::warn!(
                "Provider {} health: {} -> {} after {} consecutive failures",
                provider_id,
                previous,
                record.state,
                record.consecutive_failures
            );
        }
        record
    }

    pub fn records(&self) -> &BTreeMap<String, ProviderHealthRecord> {
        &self.records
    }
}
