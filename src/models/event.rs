// src/models/event.rs

//! Canonical career event representation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How attendees take part in an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationMode {
    #[default]
    InPerson,
    Online,
    Hybrid,
}

/// Broad event category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    JobFair,
    Webinar,
    Conference,
    Workshop,
    Networking,
    #[default]
    Other,
}

/// Trust level of an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
    Failed,
}

/// Where an event takes place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventLocation {
    #[serde(default)]
    pub mode: LocationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online_url: Option<String>,
}

impl EventLocation {
    /// Number of populated place fields (city, region, country, venue).
    pub fn richness(&self) -> usize {
        [&self.city, &self.region, &self.country, &self.venue]
            .iter()
            .filter(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
            .count()
    }

    /// True when the event has no physical component.
    pub fn is_online_only(&self) -> bool {
        self.mode == LocationMode::Online
    }
}

/// A career event as published to end users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventItem {
    /// Stable id derived from provider id and source key
    pub id: String,

    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default)]
    pub category: EventCategory,

    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Free-form time text as shown by the source (e.g. "09:00–15:00")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_time: Option<String>,

    #[serde(default)]
    pub location: EventLocation,

    pub registration_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,

    #[serde(default)]
    pub youth_focused: bool,
    #[serde(default)]
    pub industry_tags: Vec<String>,

    pub provider_id: String,
    /// Provider priority rank at capture time (lower wins)
    pub provider_priority: u32,

    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_score: Option<f32>,
}

impl EventItem {
    /// Create a minimal unverified event. Remaining fields use defaults.
    pub fn new(
        provider_id: impl Into<String>,
        source_key: &str,
        title: impl Into<String>,
        start_date: NaiveDate,
        registration_url: impl Into<String>,
    ) -> Self {
        let provider_id = provider_id.into();
        Self {
            id: event_id(&provider_id, source_key),
            title: title.into(),
            description: String::new(),
            organizer: None,
            category: EventCategory::Other,
            start_date,
            end_date: None,
            display_time: None,
            location: EventLocation::default(),
            registration_url: registration_url.into(),
            capacity: None,
            youth_focused: false,
            industry_tags: Vec::new(),
            provider_id,
            provider_priority: u32::MAX,
            verification_status: VerificationStatus::Unverified,
            verified_at: None,
            verification_notes: Vec::new(),
            verification_score: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// Mark the event verified at `at` with a 0.0–1.0 confidence score.
    pub fn mark_verified(&mut self, at: DateTime<Utc>, score: f32) {
        self.verification_status = VerificationStatus::Verified;
        self.verified_at = Some(at);
        self.verification_score = Some(score.clamp(0.0, 1.0));
    }
}

/// Derive a stable event id: `{provider}_{first 16 hex of sha256(source_key)}`.
pub fn event_id(provider_id: &str, source_key: &str) -> String {
    let digest = Sha256::digest(source_key.trim().as_bytes());
    format!("{}_{}", provider_id, &hex::encode(digest)[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_event_id_is_stable() {
        let a = event_id("nav", "https://example.com/e/1");
        let b = event_id("nav", " https://example.com/e/1 ");
        assert_eq!(a, b);
        assert!(a.starts_with("nav_"));
        assert_eq!(a.len(), "nav_".len() + 16);
    }

    #[test]
    fn test_event_id_differs_per_provider() {
        assert_ne!(event_id("nav", "k"), event_id("eventbrite", "k"));
    }

    #[test]
    fn test_location_richness() {
        let mut location = EventLocation::default();
        assert_eq!(location.richness(), 0);
        location.city = Some("Oslo".into());
        location.venue = Some("  ".into());
        assert_eq!(location.richness(), 1);
        location.country = Some("Norway".into());
        assert_eq!(location.richness(), 2);
    }

    #[test]
    fn test_mark_verified_clamps_score() {
        let mut item = EventItem::new("nav", "k", "Karrieredag", date(2026, 11, 2), "https://nav.no");
        item.mark_verified(Utc::now(), 1.7);
        assert!(item.is_verified());
        assert_eq!(item.verification_score, Some(1.0));
    }

    #[test]
    fn test_serialization_skips_empty_optionals() {
        let item = EventItem::new("nav", "k", "Karrieredag", date(2026, 11, 2), "https://nav.no");
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("end_date").is_none());
        assert_eq!(json["start_date"], "2026-11-02");
        assert_eq!(json["verification_status"], "unverified");
        assert_eq!(json["location"]["mode"], "in_person");
    }
}
