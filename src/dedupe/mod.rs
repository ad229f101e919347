// src/dedupe/mod.rs

//! Fuzzy duplicate removal across providers.
//!
//! Items are grouped by `normalized title | ISO start date | place` and each
//! group keeps exactly one winner. The winner ordering is total, so the
//! output does not depend on input order and deduping the output again
//! changes nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::{DedupeStats, EventItem};
use crate::utils::dates::to_iso;
use crate::utils::text::normalize_words;

/// Outcome of one dedupe pass.
#[derive(Debug, Clone, Default)]
pub struct DedupeResult {
    /// Winners, sorted by start date then title then id
    pub items: Vec<EventItem>,
    pub stats: DedupeStats,
    /// Items removed per provider
    pub removed_by_provider: HashMap<String, usize>,
}

/// Place component of the key: empty for online-only events, else the
/// normalized city, else the normalized country.
fn place_key(item: &EventItem) -> String {
    if item.location.is_online_only() {
        return String::new();
    }
    let pick = |field: &Option<String>| {
        field
            .as_deref()
            .map(normalize_words)
            .filter(|v| !v.is_empty())
    };
    pick(&item.location.city)
        .or_else(|| pick(&item.location.country))
        .unwrap_or_default()
}

/// Grouping key for an item.
pub fn dedupe_key(item: &EventItem) -> String {
    format!(
        "{}|{}|{}",
        normalize_words(&item.title),
        to_iso(item.start_date),
        place_key(item)
    )
}

/// Winner ordering: `Less` means `a` beats `b`.
pub fn compare_candidates(a: &EventItem, b: &EventItem) -> Ordering {
    b.is_verified()
        .cmp(&a.is_verified())
        .then_with(|| b.location.richness().cmp(&a.location.richness()))
        .then_with(|| a.provider_priority.cmp(&b.provider_priority))
        .then_with(|| b.verified_at.cmp(&a.verified_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Collapse duplicates, keeping the best candidate of each group.
pub fn dedupe(items: Vec<EventItem>) -> DedupeResult {
    let input_count = items.len();

    let mut groups: BTreeMap<String, Vec<EventItem>> = BTreeMap::new();
    for item in items {
        groups.entry(dedupe_key(&item)).or_default().push(item);
    }

    let mut winners = Vec::with_capacity(groups.len());
    let mut removed_by_provider: HashMap<String, usize> = HashMap::new();
    let mut conflicts = 0;

    for (key, mut candidates) in groups {
        candidates.sort_by(compare_candidates);
        let mut candidates = candidates.into_iter();
        let Some(winner) = candidates.next() else {
            continue;
        };

        let losers: Vec<EventItem> = candidates.collect();
        if !losers.is_empty() {
            conflicts += 1;
            log::debug!(
                "Dedupe conflict on '{}': kept {} ({}), dropped {}",
                key,
                winner.id,
                winner.provider_id,
                losers.len()
            );
            for loser in losers {
                *removed_by_provider.entry(loser.provider_id).or_default() += 1;
            }
        }
        winners.push(winner);
    }

    winners.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });

    let output_count = winners.len();
    DedupeResult {
        items: winners,
        stats: DedupeStats {
            input_count,
            output_count,
            duplicates_removed: input_count - output_count,
            conflicts,
        },
        removed_by_provider,
    }
}
