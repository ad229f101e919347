// src/models/provider.rs

//! Provider configuration units.

use serde::{Deserialize, Serialize};

/// Which generic adapter reads a provider's listing pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// schema.org `Event` objects embedded as JSON-LD
    JsonLd,
    /// Row-based HTML listing read with CSS selectors
    HtmlList,
}

/// Language of free-text dates on a provider's pages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateLocale {
    /// Norwegian Bokmål
    Nb,
    #[default]
    En,
}

/// CSS selectors for an HTML listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selector for each event row/card
    pub row_selector: String,

    /// Selector for the title element within a row
    pub title_selector: String,

    /// Selector for the date element within a row
    pub date_selector: String,

    /// Selector for the link element (defaults to the title element)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_selector: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,
}

fn default_attr_name() -> String {
    "href".to_string()
}

/// One external source of event listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventProvider {
    /// Short identifier, also used for `DISABLE_<ID>` toggles
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Dedupe priority rank (lower wins)
    pub priority: u32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum delay between requests to this provider's hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle_ms: Option<u64>,

    pub kind: AdapterKind,

    /// Listing pages to read
    pub listing_urls: Vec<String>,

    #[serde(default)]
    pub date_locale: DateLocale,

    /// Country assumed when a listing omits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_country: Option<String>,

    /// Required for `html_list` providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<ListingSelectors>,
}

fn default_enabled() -> bool {
    true
}

impl EventProvider {
    /// Environment variable that disables this provider.
    pub fn disable_var(&self) -> String {
        disable_var_for(&self.id)
    }
}

/// `DISABLE_<ID>` with the id uppercased and non-alphanumerics mapped to `_`.
pub fn disable_var_for(provider_id: &str) -> String {
    let name: String = provider_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("DISABLE_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_var() {
        assert_eq!(disable_var_for("nav"), "DISABLE_NAV");
        assert_eq!(disable_var_for("eventbrite-no"), "DISABLE_EVENTBRITE_NO");
        assert_eq!(disable_var_for("uio.karriere"), "DISABLE_UIO_KARRIERE");
    }

    #[test]
    fn test_provider_from_toml() {
        let provider: EventProvider = toml::from_str(
            r#"
            id = "karrieredag"
            name = "Karrieredag"
            priority = 2
            kind = "html_list"
            listing_urls = ["https://example.no/arrangementer"]
            date_locale = "nb"

            [selectors]
            row_selector = "li.event"
            title_selector = "h3 a"
            date_selector = ".date"
            "#,
        )
        .unwrap();

        assert!(provider.enabled);
        assert_eq!(provider.kind, AdapterKind::HtmlList);
        assert_eq!(provider.date_locale, DateLocale::Nb);
        assert_eq!(provider.selectors.unwrap().attr_name, "href");
    }
}
