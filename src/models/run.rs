// src/models/run.rs

//! Per-run accounting: rejections, per-provider funnel counts, run summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::EventItem;

/// Why an item was dropped from the published set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    StructuralValidationError,
    LiveCheckFailure,
    ContentVerificationFailure,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuralValidationError => "StructuralValidationError",
            Self::LiveCheckFailure => "LiveCheckFailure",
            Self::ContentVerificationFailure => "ContentVerificationFailure",
        }
    }
}

/// An item dropped during validation or verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedItem {
    pub item_id: String,
    pub provider_id: String,
    pub title: String,
    pub registration_url: String,
    pub reason: RejectionReason,
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RejectedItem {
    pub fn new(item: &EventItem, reason: RejectionReason, details: Vec<String>) -> Self {
        Self {
            item_id: item.id.clone(),
            provider_id: item.provider_id.clone(),
            title: item.title.clone(),
            registration_url: item.registration_url.clone(),
            reason,
            details,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Option<u16>) -> Self {
        self.status = status;
        self
    }
}

/// Funnel counts for a single provider within one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderRunStats {
    pub fetched: usize,
    pub structurally_valid: usize,
    pub live_passed: usize,
    pub content_passed: usize,
    pub deduped_out: usize,
    pub published: usize,
    /// Health state after this run's update
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider was skipped because its health state is FAILED
    #[serde(default)]
    pub suppressed: bool,
}

/// Deduplication statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DedupeStats {
    pub input_count: usize,
    pub output_count: usize,
    pub duplicates_removed: usize,
    /// Groups that had more than one candidate
    pub conflicts: usize,
}

/// Everything a human needs to audit one refresh run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub verification_skipped: bool,
    pub months: u32,
    pub total_fetched: usize,
    pub total_published: usize,
    pub dedupe: DedupeStats,
    pub providers: BTreeMap<String, ProviderRunStats>,
    pub rejected: Vec<RejectedItem>,
    /// Publish guard refused to overwrite the previous event set
    #[serde(default)]
    pub publish_skipped: bool,
    /// Previously published events dropped because this run found them dead
    #[serde(default)]
    pub withdrawn: usize,
}

impl RunSummary {
    /// Count rejections per reason.
    pub fn rejected_by_reason(&self, reason: RejectionReason) -> usize {
        self.rejected.iter().filter(|r| r.reason == reason).count()
    }
}
