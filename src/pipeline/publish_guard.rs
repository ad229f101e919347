//! Publish guard (circuit breaker) for the published event set.
//!
//! Refuses to overwrite `events.json` when the new set is much smaller than
//! the previous one, which usually means a provider broke rather than
//! that events disappeared.
//!
//! > If the published count drops by more than `max_drop_percent`
//! > compared to a previous set of at least `min_baseline` events, the
//! > events write is skipped.
//!
//! A kept set is still filtered: events this run found dead are withdrawn
//! with [`withdraw_dead`].

use std::collections::HashSet;

use crate::models::{EventItem, PublishConfig, RejectedItem, RejectionReason};

/// Publish guard configuration.
#[derive(Debug, Clone)]
pub struct PublishGuardConfig {
    /// Maximum allowed drop percentage (0-100). Default: 50%
    pub max_drop_percent: u8,
    /// Previous counts below this skip the check (new deployments).
    pub min_baseline: usize,
}

impl Default for PublishGuardConfig {
    fn default() -> Self {
        Self {
            max_drop_percent: 50,
            min_baseline: 10,
        }
    }
}

impl From<&PublishConfig> for PublishGuardConfig {
    fn from(config: &PublishConfig) -> Self {
        Self {
            max_drop_percent: config.max_drop_percent,
            min_baseline: config.min_baseline,
        }
    }
}

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardResult {
    /// Safe to proceed with the write
    Safe {
        current_count: usize,
        previous_count: usize,
    },
    /// No previous data, or below baseline
    ColdStart { current_count: usize },
    /// Drop too large: keep the previous set
    Triggered {
        current_count: usize,
        previous_count: usize,
        drop_percent: f64,
    },
    /// Nothing to publish while a real baseline exists
    EmptyResult { previous_count: usize },
}

impl GuardResult {
    pub fn allows_write(&self) -> bool {
        matches!(self, Self::Safe { .. } | Self::ColdStart { .. })
    }
}

/// Guard against publishing a collapsed event set.
#[derive(Debug, Clone, Default)]
pub struct PublishGuard {
    config: PublishGuardConfig,
}

impl PublishGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PublishGuardConfig) -> Self {
        Self { config }
    }

    /// Compare the new event set against the previously published one.
    pub fn check(&self, current: &[EventItem], previous: &[EventItem]) -> GuardResult {
        let current_count = current.len();
        let previous_count = previous.len();

        if previous_count < self.config.min_baseline {
            return GuardResult::ColdStart { current_count };
        }

        if current_count == 0 {
            return GuardResult::EmptyResult { previous_count };
        }

        if current_count < previous_count {
            let drop = previous_count - current_count;
            let drop_percent = (drop as f64 / previous_count as f64) * 100.0;

            if drop_percent > self.config.max_drop_percent as f64 {
                return GuardResult::Triggered {
                    current_count,
                    previous_count,
                    drop_percent,
                };
            }
        }

        GuardResult::Safe {
            current_count,
            previous_count,
        }
    }

    /// Check and log the decision.
    pub fn evaluate(&self, current: &[EventItem], previous: &[EventItem]) -> GuardResult {
        let result = self.check(current, previous);
        match &result {
            GuardResult::Safe {
                current_count,
                previous_count,
            } => log::info!(
                "Publish guard: SAFE ({} events, was {})",
                current_count,
                previous_count
            ),
            GuardResult::ColdStart { current_count } => log::info!(
                "Publish guard: COLD START ({} events, first run or below baseline)",
                current_count
            ),
            GuardResult::Triggered {
                current_count,
                previous_count,
                drop_percent,
            } => log::error!(
                "Publish guard: TRIGGERED! {} → {} events ({:.1}% drop > {}% threshold)",
                previous_count,
                current_count,
                drop_percent,
                self.config.max_drop_percent
            ),
            GuardResult::EmptyResult { previous_count } => log::error!(
                "Publish guard: EMPTY RESULT (previous set had {} events)",
                previous_count
            ),
        }
        result
    }
}

/// Drop previously published events that this run rejected at the live or
/// content stage, matched by id or registration URL.
pub fn withdraw_dead(previous: Vec<EventItem>, rejected: &[RejectedItem]) -> Vec<EventItem> {
    let dead: Vec<&RejectedItem> = rejected
        .iter()
        .filter(|r| {
            matches!(
                r.reason,
                RejectionReason::LiveCheckFailure | RejectionReason::ContentVerificationFailure
            )
        })
        .collect();
    if dead.is_empty() {
        return previous;
    }

    let ids: HashSet<&str> = dead.iter().map(|r| r.item_id.as_str()).collect();
    let urls: HashSet<&str> = dead.iter().map(|r| r.registration_url.as_str()).collect();
    previous
        .into_iter()
        .filter(|event| {
            let gone = ids.contains(event.id.as_str())
                || urls.contains(event.registration_url.as_str());
            if gone {
                log::info!("Withdrawing {} ({})", event.id, event.registration_url);
            }
            !gone
        })
        .collect()
}
