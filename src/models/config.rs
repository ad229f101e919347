//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AdapterKind, EventCategory, EventProvider};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetching, caching and throttling
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Stage A/B/C verification settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Accepted start date window
    #[serde(default)]
    pub window: WindowConfig,

    /// Registration URL allow/block lists
    #[serde(default)]
    pub url_policy: UrlPolicyConfig,

    /// Provider health thresholds
    #[serde(default)]
    pub health: HealthConfig,

    /// Guard against publishing a collapsed event set
    #[serde(default)]
    pub publish: PublishConfig,

    /// Keyword classification rules
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Provider definitions
    #[serde(default = "defaults::default_providers")]
    pub providers: Vec<EventProvider>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Look up a provider by id.
    pub fn provider(&self, id: &str) -> Option<&EventProvider> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if self.verification.max_concurrent == 0 {
            return Err(AppError::validation(
                "verification.max_concurrent must be > 0",
            ));
        }
        if self.verification.timeout_secs == 0 {
            return Err(AppError::validation(
                "verification.timeout_secs must be > 0",
            ));
        }
        if !(1..=5).contains(&self.verification.min_marker_categories) {
            return Err(AppError::validation(
                "verification.min_marker_categories must be between 1 and 5",
            ));
        }
        if self.window.months == 0 {
            return Err(AppError::validation("window.months must be > 0"));
        }
        if self.health.degraded_threshold == 0
            || self.health.failed_threshold < self.health.degraded_threshold
        {
            return Err(AppError::validation(
                "health thresholds must satisfy 0 < degraded_threshold <= failed_threshold",
            ));
        }
        if self.publish.max_drop_percent > 100 {
            return Err(AppError::validation(
                "publish.max_drop_percent must be <= 100",
            ));
        }
        if self.providers.is_empty() {
            return Err(AppError::validation("No providers defined"));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(AppError::validation("provider id is empty"));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate provider id '{}'",
                    provider.id
                )));
            }
            if provider.listing_urls.is_empty() {
                return Err(AppError::validation(format!(
                    "provider '{}' has no listing_urls",
                    provider.id
                )));
            }
            if provider.kind == AdapterKind::HtmlList && provider.selectors.is_none() {
                return Err(AppError::validation(format!(
                    "provider '{}' is html_list but has no [selectors]",
                    provider.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            verification: VerificationConfig::default(),
            window: WindowConfig::default(),
            url_policy: UrlPolicyConfig::default(),
            health: HealthConfig::default(),
            publish: PublishConfig::default(),
            classification: ClassificationConfig::default(),
            providers: defaults::default_providers(),
        }
    }
}

/// HTTP client, page cache and throttle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum providers fetched concurrently
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Default minimum delay between requests to the same host
    #[serde(default = "defaults::throttle_ms")]
    pub throttle_ms: u64,

    /// How long a cached listing page stays fresh
    #[serde(default = "defaults::html_cache_ttl")]
    pub html_cache_ttl_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            throttle_ms: defaults::throttle_ms(),
            html_cache_ttl_secs: defaults::html_cache_ttl(),
        }
    }
}

/// Verification stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// TTL of URL-check cache entries
    #[serde(default = "defaults::url_check_ttl")]
    pub url_check_ttl_hours: u64,

    /// Request timeout for verification requests
    #[serde(default = "defaults::verify_timeout")]
    pub timeout_secs: u64,

    /// Maximum items verified concurrently
    #[serde(default = "defaults::verify_concurrency")]
    pub max_concurrent: usize,

    /// Bodies shorter than this are treated as soft 404s
    #[serde(default = "defaults::min_body_bytes")]
    pub min_body_bytes: usize,

    /// Distinct content marker categories a page must show
    #[serde(default = "defaults::min_marker_categories")]
    pub min_marker_categories: usize,

    /// Hosts known to reject HEAD; go straight to GET
    #[serde(default = "defaults::head_blocked_hosts")]
    pub head_blocked_hosts: Vec<String>,

    /// Run the Stage C seam after Stage B
    #[serde(default)]
    pub headless_enabled: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            url_check_ttl_hours: defaults::url_check_ttl(),
            timeout_secs: defaults::verify_timeout(),
            max_concurrent: defaults::verify_concurrency(),
            min_body_bytes: defaults::min_body_bytes(),
            min_marker_categories: defaults::min_marker_categories(),
            head_blocked_hosts: defaults::head_blocked_hosts(),
            headless_enabled: false,
        }
    }
}

/// Accepted event start date window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// How far ahead events may start (overridden by `--months`)
    #[serde(default = "defaults::months")]
    pub months: u32,

    /// Days into the past tolerated for clock/timezone skew
    #[serde(default = "defaults::grace_days")]
    pub grace_days: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            months: defaults::months(),
            grace_days: defaults::grace_days(),
        }
    }
}

/// A host plus path fragment that marks an unusable link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedPath {
    pub host: String,
    pub path_contains: String,
}

/// Registration URL allow/block lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlPolicyConfig {
    /// Domains accepted along with their subdomains
    #[serde(default = "defaults::allowed_domains")]
    pub allowed_domains: Vec<String>,

    /// Host suffixes accepted (e.g. ".gov")
    #[serde(default = "defaults::allowed_suffixes")]
    pub allowed_suffixes: Vec<String>,

    /// Domains always rejected (URL shorteners)
    #[serde(default = "defaults::blocked_domains")]
    pub blocked_domains: Vec<String>,

    /// Post and shared-document links on otherwise normal hosts
    #[serde(default = "defaults::blocked_paths")]
    pub blocked_paths: Vec<BlockedPath>,

    /// Ticketing platforms whose URLs must carry a numeric ticket id
    #[serde(default = "defaults::ticketing_domains")]
    pub ticketing_domains: Vec<String>,
}

impl Default for UrlPolicyConfig {
    fn default() -> Self {
        Self {
            allowed_domains: defaults::allowed_domains(),
            allowed_suffixes: defaults::allowed_suffixes(),
            blocked_domains: defaults::blocked_domains(),
            blocked_paths: defaults::blocked_paths(),
            ticketing_domains: defaults::ticketing_domains(),
        }
    }
}

/// Provider health thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Consecutive failures that make a provider DEGRADED
    #[serde(default = "defaults::degraded_threshold")]
    pub degraded_threshold: u32,

    /// Consecutive failures that make a provider FAILED
    #[serde(default = "defaults::failed_threshold")]
    pub failed_threshold: u32,

    /// Skip FAILED providers instead of only reporting them
    #[serde(default)]
    pub suppress_failed: bool,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degraded_threshold: defaults::degraded_threshold(),
            failed_threshold: defaults::failed_threshold(),
            suppress_failed: false,
        }
    }
}

/// Publish guard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "defaults::publish_guard")]
    pub guard_enabled: bool,

    /// Maximum allowed drop percentage (0-100)
    #[serde(default = "defaults::max_drop_percent")]
    pub max_drop_percent: u8,

    /// Previous counts below this skip the check
    #[serde(default = "defaults::min_baseline")]
    pub min_baseline: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            guard_enabled: defaults::publish_guard(),
            max_drop_percent: defaults::max_drop_percent(),
            min_baseline: defaults::min_baseline(),
        }
    }
}

/// Mapping from keyword to industry tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryKeyword {
    pub keyword: String,
    pub tag: String,
}

/// Mapping from keyword to event category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeyword {
    pub keyword: String,
    pub category: EventCategory,
}

/// Keyword classification rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "defaults::youth_keywords")]
    pub youth_keywords: Vec<String>,

    #[serde(default = "defaults::industry_keywords")]
    pub industries: Vec<IndustryKeyword>,

    /// Checked in order; first hit wins
    #[serde(default = "defaults::category_keywords")]
    pub categories: Vec<CategoryKeyword>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            youth_keywords: defaults::youth_keywords(),
            industries: defaults::industry_keywords(),
            categories: defaults::category_keywords(),
        }
    }
}

mod defaults {
    use super::{BlockedPath, CategoryKeyword, IndustryKeyword};
    use crate::models::{
        AdapterKind, DateLocale, EventCategory, EventProvider, ListingSelectors,
    };

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; CareerEventsBot/1.0; +https://example.org/bot)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn throttle_ms() -> u64 {
        1000
    }
    pub fn html_cache_ttl() -> u64 {
        3600
    }

    // Verification defaults
    pub fn url_check_ttl() -> u64 {
        24
    }
    pub fn verify_timeout() -> u64 {
        10
    }
    pub fn verify_concurrency() -> usize {
        4
    }
    pub fn min_body_bytes() -> usize {
        1000
    }
    pub fn min_marker_categories() -> usize {
        2
    }
    pub fn head_blocked_hosts() -> Vec<String> {
        vec!["www.linkedin.com".into(), "www.facebook.com".into()]
    }

    // Window defaults
    pub fn months() -> u32 {
        6
    }
    pub fn grace_days() -> u32 {
        1
    }

    // URL policy defaults
    pub fn allowed_domains() -> Vec<String> {
        [
            "nav.no",
            "uio.no",
            "ntnu.no",
            "uib.no",
            "oslomet.no",
            "eventbrite.com",
            "eventbrite.no",
            "eventbrite.co.uk",
            "eventbrite.se",
            "eventbrite.dk",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn allowed_suffixes() -> Vec<String> {
        [".gov", ".edu", ".gov.uk", ".ac.uk", ".kommune.no"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn blocked_domains() -> Vec<String> {
        [
            "bit.ly",
            "tinyurl.com",
            "t.co",
            "goo.gl",
            "ow.ly",
            "buff.ly",
            "lnkd.in",
            "is.gd",
            "rebrand.ly",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn blocked_paths() -> Vec<BlockedPath> {
        [
            ("facebook.com", "/posts/"),
            ("facebook.com", "/permalink"),
            ("linkedin.com", "/posts/"),
            ("linkedin.com", "/feed/"),
            ("instagram.com", "/p/"),
            ("twitter.com", "/status/"),
            ("x.com", "/status/"),
            ("docs.google.com", "/document/"),
            ("docs.google.com", "/spreadsheets/"),
            ("drive.google.com", "/file/"),
            ("dropbox.com", "/s/"),
        ]
        .into_iter()
        .map(|(host, path)| BlockedPath {
            host: host.into(),
            path_contains: path.into(),
        })
        .collect()
    }
    pub fn ticketing_domains() -> Vec<String> {
        [
            "eventbrite.com",
            "eventbrite.no",
            "eventbrite.co.uk",
            "eventbrite.se",
            "eventbrite.dk",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    // Health defaults
    pub fn degraded_threshold() -> u32 {
        2
    }
    pub fn failed_threshold() -> u32 {
        3
    }

    // Publish defaults
    pub fn publish_guard() -> bool {
        true
    }
    pub fn max_drop_percent() -> u8 {
        50
    }
    pub fn min_baseline() -> usize {
        10
    }

    // Classification defaults
    pub fn youth_keywords() -> Vec<String> {
        [
            "student",
            "graduate",
            "trainee",
            "internship",
            "intern",
            "youth",
            "ungdom",
            "studenter",
            "nyutdannet",
            "sommerjobb",
            "lærling",
            "traineeprogram",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn industry_keywords() -> Vec<IndustryKeyword> {
        [
            ("software", "tech"),
            ("developer", "tech"),
            ("ikt", "tech"),
            ("data", "tech"),
            ("teknologi", "tech"),
            ("helse", "health"),
            ("health", "health"),
            ("sykepleie", "health"),
            ("finance", "finance"),
            ("økonomi", "finance"),
            ("bank", "finance"),
            ("energy", "energy"),
            ("energi", "energy"),
            ("olje", "energy"),
            ("engineering", "engineering"),
            ("ingeniør", "engineering"),
            ("bygg", "construction"),
            ("construction", "construction"),
            ("offentlig", "public_sector"),
            ("public sector", "public_sector"),
        ]
        .into_iter()
        .map(|(keyword, tag)| IndustryKeyword {
            keyword: keyword.into(),
            tag: tag.into(),
        })
        .collect()
    }
    pub fn category_keywords() -> Vec<CategoryKeyword> {
        [
            ("job fair", EventCategory::JobFair),
            ("career fair", EventCategory::JobFair),
            ("karrieredag", EventCategory::JobFair),
            ("jobbmesse", EventCategory::JobFair),
            ("rekrutteringsmesse", EventCategory::JobFair),
            ("webinar", EventCategory::Webinar),
            ("nettmøte", EventCategory::Webinar),
            ("conference", EventCategory::Conference),
            ("konferanse", EventCategory::Conference),
            ("workshop", EventCategory::Workshop),
            ("kurs", EventCategory::Workshop),
            ("networking", EventCategory::Networking),
            ("nettverk", EventCategory::Networking),
            ("meetup", EventCategory::Networking),
        ]
        .into_iter()
        .map(|(keyword, category)| CategoryKeyword {
            keyword: keyword.into(),
            category,
        })
        .collect()
    }

    // Provider defaults
    pub fn default_providers() -> Vec<EventProvider> {
        vec![
            EventProvider {
                id: "nav".to_string(),
                name: "NAV Arbeidsplassen".to_string(),
                priority: 1,
                enabled: true,
                throttle_ms: Some(1500),
                kind: AdapterKind::HtmlList,
                listing_urls: vec!["https://arbeidsplassen.nav.no/arrangementer".to_string()],
                date_locale: DateLocale::Nb,
                default_country: Some("Norway".to_string()),
                selectors: Some(ListingSelectors {
                    row_selector: "article.event-card".to_string(),
                    title_selector: "h2 a, h3 a".to_string(),
                    date_selector: ".event-card__date".to_string(),
                    link_selector: None,
                    location_selector: Some(".event-card__location".to_string()),
                    description_selector: Some(".event-card__summary".to_string()),
                    organizer_selector: Some(".event-card__organizer".to_string()),
                    attr_name: "href".to_string(),
                }),
            },
            EventProvider {
                id: "uio".to_string(),
                name: "UiO Karrieresenteret".to_string(),
                priority: 2,
                enabled: true,
                throttle_ms: None,
                kind: AdapterKind::JsonLd,
                listing_urls: vec![
                    "https://www.uio.no/studier/karriere/arrangementer/".to_string(),
                ],
                date_locale: DateLocale::Nb,
                default_country: Some("Norway".to_string()),
                selectors: None,
            },
            EventProvider {
                id: "eventbrite".to_string(),
                name: "Eventbrite".to_string(),
                priority: 3,
                enabled: true,
                throttle_ms: Some(2000),
                kind: AdapterKind::JsonLd,
                listing_urls: vec![
                    "https://www.eventbrite.com/d/norway--oslo/career-fair/".to_string(),
                ],
                date_locale: DateLocale::En,
                default_country: Some("Norway".to_string()),
                selectors: None,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.fetch.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.fetch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_health_thresholds() {
        let mut config = Config::default();
        config.health.degraded_threshold = 4;
        config.health.failed_threshold = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_provider_ids() {
        let mut config = Config::default();
        let copy = config.providers[0].clone();
        config.providers.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_html_list_without_selectors() {
        let mut config = Config::default();
        config.providers[0].selectors = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [verification]
            url_check_ttl_hours = 12

            [health]
            suppress_failed = true
            "#,
        )
        .unwrap();

        assert_eq!(config.verification.url_check_ttl_hours, 12);
        assert_eq!(config.verification.min_body_bytes, 1000);
        assert!(config.health.suppress_failed);
        assert_eq!(config.health.failed_threshold, 3);
        assert_eq!(config.providers.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn shipped_config_parses() {
        let config: Config = toml::from_str(include_str!("../../data/config.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider("nav").unwrap().kind, AdapterKind::HtmlList);
        assert_eq!(
            config.provider("nav").unwrap().selectors.as_ref().unwrap().attr_name,
            "href"
        );
    }
}
