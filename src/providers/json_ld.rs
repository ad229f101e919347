// src/providers/json_ld.rs

//! Adapter for listing pages that embed schema.org `Event` JSON-LD.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;

use crate::error::Result;
use crate::models::{EventItem, EventLocation, EventProvider, LocationMode};
use crate::providers::{Classifier, FetchParams, ProviderAdapter, RawEvent, finish_item};
use crate::utils::dates::parse_iso_datetime;
use crate::utils::html::{parse_selector, strip_html};
use crate::utils::http::PageFetcher;
use crate::utils::text::collapse_whitespace;
use crate::utils::url::resolve;

const LD_JSON_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

pub struct JsonLdAdapter {
    provider: EventProvider,
    pages: Arc<dyn PageFetcher>,
    classifier: Arc<Classifier>,
}

impl JsonLdAdapter {
    pub fn new(
        provider: EventProvider,
        pages: Arc<dyn PageFetcher>,
        classifier: Arc<Classifier>,
    ) -> Self {
        Self {
            provider,
            pages,
            classifier,
        }
    }
}

#[async_trait]
impl ProviderAdapter for JsonLdAdapter {
    fn provider(&self) -> &EventProvider {
        &self.provider
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<EventItem>> {
        let delay = self.provider.throttle_ms.map(Duration::from_millis);
        let mut items = Vec::new();

        for page_url in &self.provider.listing_urls {
            let html = self.pages.fetch_html(page_url, delay).await?;
            let events = parse_events(&html, page_url)?;
            log::debug!(
                "[{}] {} JSON-LD events on {}",
                self.provider.id,
                events.len(),
                page_url
            );
            items.extend(
                events
                    .into_iter()
                    .filter_map(|raw| finish_item(&self.provider, raw, params, &self.classifier)),
            );
        }
        Ok(items)
    }
}

/// Extract every `Event` object embedded in a page.
pub fn parse_events(html: &str, page_url: &str) -> Result<Vec<RawEvent>> {
    let document = Html::parse_document(html);
    let selector = parse_selector(LD_JSON_SELECTOR)?;

    let mut events = Vec::new();
    for script in document.select(&selector) {
        let text: String = script.text().collect();
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                log::debug!("Skipping malformed JSON-LD block on {}: {}", page_url, e);
                continue;
            }
        };

        let mut nodes = Vec::new();
        collect_event_nodes(&value, &mut nodes);
        events.extend(nodes.into_iter().filter_map(|node| map_event(node, page_url)));
    }
    Ok(events)
}

/// True for `Event` and its schema.org subtypes (`BusinessEvent`, ...).
fn is_event_type(node: &Value) -> bool {
    let matches = |t: &str| {
        let t = t.rsplit('/').next().unwrap_or(t);
        t == "Event" || t.ends_with("Event")
    };
    match node.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

fn collect_event_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(values) => {
            for v in values {
                collect_event_nodes(v, out);
            }
        }
        Value::Object(map) => {
            if is_event_type(value) {
                out.push(value);
                return;
            }
            for key in ["@graph", "itemListElement", "item", "subEvent"] {
                if let Some(child) = map.get(key) {
                    collect_event_nodes(child, out);
                }
            }
        }
        _ => {}
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(collapse_whitespace(&strip_html(s))).filter(|s| !s.is_empty()),
        Value::Object(map) => text_of(map.get("name")),
        Value::Array(values) => values.first().and_then(|v| text_of(Some(v))),
        _ => None,
    }
}

fn number_of(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Registration link: first offer URL, else the event URL.
fn registration_url(node: &Value) -> Option<String> {
    let offer_url = match node.get("offers") {
        Some(Value::Array(offers)) => offers
            .iter()
            .find_map(|o| o.get("url").and_then(Value::as_str)),
        Some(offer) => offer.get("url").and_then(Value::as_str),
        None => None,
    };
    offer_url
        .or_else(|| node.get("url").and_then(Value::as_str))
        .map(str::to_string)
}

fn apply_address(location: &mut EventLocation, address: &Value) {
    match address {
        Value::String(s) => {
            // "Street 1, 0150 Oslo, Norway": the last parts name the place.
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() >= 2 && location.city.is_none() {
                let city = parts[parts.len() - 2];
                let city = city.trim_start_matches(|c: char| c.is_ascii_digit()).trim();
                location.city = Some(city.to_string()).filter(|c| !c.is_empty());
            }
        }
        Value::Object(map) => {
            location.city = location.city.take().or_else(|| text_of(map.get("addressLocality")));
            location.region = location.region.take().or_else(|| text_of(map.get("addressRegion")));
            location.country = location
                .country
                .take()
                .or_else(|| text_of(map.get("addressCountry")));
        }
        _ => {}
    }
}

fn map_location(node: &Value) -> EventLocation {
    let mut location = EventLocation::default();
    let mut physical = false;
    let mut virtual_place = false;

    let places: Vec<&Value> = match node.get("location") {
        Some(Value::Array(values)) => values.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    };

    for place in places {
        match place {
            Value::String(name) => {
                physical = true;
                location.venue = Some(collapse_whitespace(name)).filter(|v| !v.is_empty());
            }
            Value::Object(map) => {
                let kind = map.get("@type").and_then(Value::as_str).unwrap_or("Place");
                if kind == "VirtualLocation" {
                    virtual_place = true;
                    location.online_url = map.get("url").and_then(Value::as_str).map(String::from);
                    continue;
                }
                physical = true;
                location.venue = location.venue.take().or_else(|| text_of(map.get("name")));
                if let Some(address) = map.get("address") {
                    apply_address(&mut location, address);
                }
                if let Some(geo) = map.get("geo") {
                    location.lat = number_of(geo.get("latitude"));
                    location.lng = number_of(geo.get("longitude"));
                }
            }
            _ => {}
        }
    }

    let mode = node
        .get("eventAttendanceMode")
        .and_then(Value::as_str)
        .unwrap_or_default();
    location.mode = if mode.contains("Mixed") || (physical && virtual_place) {
        LocationMode::Hybrid
    } else if mode.contains("Online") || (virtual_place && !physical) {
        LocationMode::Online
    } else {
        LocationMode::InPerson
    };
    location
}

fn map_event(node: &Value, page_url: &str) -> Option<RawEvent> {
    let title = text_of(node.get("name"))?;
    let (start_date, display_time) = node
        .get("startDate")
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime)?;
    let end_date = node
        .get("endDate")
        .and_then(Value::as_str)
        .and_then(parse_iso_datetime)
        .map(|(date, _)| date)
        .filter(|end| *end > start_date);

    let registration_url = registration_url(node)
        .map(|href| resolve(page_url, &href))
        .unwrap_or_default();
    let source_key = node
        .get("url")
        .and_then(Value::as_str)
        .map(|href| resolve(page_url, href))
        .unwrap_or_else(|| registration_url.clone());

    let capacity = number_of(node.get("maximumAttendeeCapacity"))
        .filter(|c| *c >= 0.0 && *c <= f64::from(u32::MAX))
        .map(|c| c as u32);

    Some(RawEvent {
        source_key,
        title,
        description: text_of(node.get("description")).unwrap_or_default(),
        organizer: text_of(node.get("organizer")),
        category: None,
        start_date: Some(start_date),
        end_date,
        display_time,
        location: map_location(node),
        registration_url,
        capacity,
    })
}
