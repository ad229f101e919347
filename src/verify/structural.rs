// src/verify/structural.rs

//! Network-free validation of registration URLs and item fields.

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use url::Url;

use crate::models::{EventItem, UrlPolicyConfig, WindowConfig};
use crate::utils::url::host_matches;

/// Ticketing URLs end in `/e/<slug>-<id>` or `/e/<id>` with a 6+ digit id.
static TICKET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/e/(?:[^/]*-)?\d{6,}/?$").expect("valid regex"));

/// Outcome of a structural check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Accepted start dates: `[today - grace_days, today + months]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

impl DateWindow {
    pub fn new(today: NaiveDate, grace_days: u32, months: u32) -> Self {
        let earliest = today - chrono::Duration::days(i64::from(grace_days));
        let latest = today
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX);
        Self { earliest, latest }
    }

    pub fn from_config(today: NaiveDate, config: &WindowConfig, months: u32) -> Self {
        Self::new(today, config.grace_days, months)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.earliest <= date && date <= self.latest
    }
}

/// Check a registration URL against scheme, host and shape rules.
pub fn validate_url(raw: &str, policy: &UrlPolicyConfig) -> ValidationReport {
    let url = match Url::parse(raw.trim()) {
        Ok(url) => url,
        Err(e) => return ValidationReport::from_errors(vec![format!("unparseable URL: {e}")]),
    };

    let mut errors = Vec::new();
    if url.scheme() != "https" {
        errors.push(format!("scheme must be https, got {}", url.scheme()));
    }

    let Some(host) = url
        .host_str()
        .map(|h| h.trim_end_matches('.').to_lowercase())
    else {
        errors.push("URL has no host".to_string());
        return ValidationReport::from_errors(errors);
    };
    let path = url.path().to_lowercase();

    if let Some(blocked) = policy
        .blocked_domains
        .iter()
        .find(|d| host_matches(&host, d))
    {
        errors.push(format!("host {host} is block-listed ({blocked})"));
    }

    if let Some(blocked) = policy
        .blocked_paths
        .iter()
        .find(|b| host_matches(&host, &b.host) && path.contains(&b.path_contains.to_lowercase()))
    {
        errors.push(format!(
            "{} links under {} are not registration pages",
            blocked.path_contains, blocked.host
        ));
    }

    let allowed = policy
        .allowed_domains
        .iter()
        .any(|d| host_matches(&host, d))
        || policy
            .allowed_suffixes
            .iter()
            .any(|s| host.ends_with(&s.to_lowercase()));
    if !allowed {
        errors.push(format!("host {host} is not allow-listed"));
    }

    let is_ticketing = policy
        .ticketing_domains
        .iter()
        .any(|d| host_matches(&host, d));
    if is_ticketing && !TICKET_ID.is_match(url.path()) {
        errors.push("ticketing URL lacks a numeric ticket id".to_string());
    }

    ValidationReport::from_errors(errors)
}

/// Check an item's title, dates and registration URL.
pub fn validate_item(
    item: &EventItem,
    policy: &UrlPolicyConfig,
    window: &DateWindow,
) -> ValidationReport {
    let mut errors = Vec::new();

    if item.title.trim().is_empty() {
        errors.push("title is empty".to_string());
    }
    if !window.contains(item.start_date) {
        errors.push(format!(
            "start_date {} outside [{}, {}]",
            item.start_date, window.earliest, window.latest
        ));
    }
    if let Some(end) = item.end_date {
        if end <= item.start_date {
            errors.push(format!(
                "end_date {} is not after start_date {}",
                end, item.start_date
            ));
        }
    }

    errors.extend(validate_url(&item.registration_url, policy).errors);
    ValidationReport::from_errors(errors)
}
