// src/providers/html_list.rs

//! Adapter for row-based HTML listings read with configured CSS selectors.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{
    DateLocale, EventItem, EventLocation, EventProvider, ListingSelectors, LocationMode,
};
use crate::providers::{Classifier, FetchParams, ProviderAdapter, RawEvent, finish_item};
use crate::utils::dates::parse_date;
use crate::utils::html::{first_text, parse_selector};
use crate::utils::http::PageFetcher;
use crate::utils::url::resolve;

static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}[./]\d{1,2}[./]\d{2,4}\b").expect("valid regex"));

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[:.](\d{2})(?:\s*[-–]\s*(\d{1,2})[:.](\d{2}))?\b")
        .expect("valid regex")
});

/// Location words that mean the event has no venue.
const ONLINE_WORDS: &[&str] = &[
    "online",
    "digital",
    "digitalt",
    "nettbasert",
    "webinar",
    "zoom",
    "teams",
];

/// Parsed form of [`ListingSelectors`].
struct CompiledSelectors {
    row: Selector,
    title: Selector,
    date: Selector,
    link: Option<Selector>,
    location: Option<Selector>,
    description: Option<Selector>,
    organizer: Option<Selector>,
    anchor: Selector,
    attr_name: String,
}

impl CompiledSelectors {
    fn compile(selectors: &ListingSelectors) -> Result<Self> {
        let optional = |s: &Option<String>| s.as_deref().map(parse_selector).transpose();
        Ok(Self {
            row: parse_selector(&selectors.row_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            date: parse_selector(&selectors.date_selector)?,
            link: optional(&selectors.link_selector)?,
            location: optional(&selectors.location_selector)?,
            description: optional(&selectors.description_selector)?,
            organizer: optional(&selectors.organizer_selector)?,
            anchor: parse_selector("a[href]")?,
            attr_name: selectors.attr_name.clone(),
        })
    }
}

pub struct HtmlListAdapter {
    provider: EventProvider,
    pages: Arc<dyn PageFetcher>,
    classifier: Arc<Classifier>,
}

impl HtmlListAdapter {
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
impl ProviderAdapter for HtmlListAdapter {
    fn provider(&self) -> &EventProvider {
        &self.provider
    }

    async fn fetch(&self, params: &FetchParams) -> Result<Vec<EventItem>> {
        let selectors = self.provider.selectors.as_ref().ok_or_else(|| {
            AppError::config(format!("provider '{}' has no selectors", self.provider.id))
        })?;
        let delay = self.provider.throttle_ms.map(Duration::from_millis);

        let mut items = Vec::new();
        for page_url in &self.provider.listing_urls {
            let html = self.pages.fetch_html(page_url, delay).await?;
            let rows = parse_listing(
                &html,
                page_url,
                selectors,
                self.provider.date_locale,
                params.today,
            )?;
            log::debug!(
                "[{}] {} rows on {}",
                self.provider.id,
                rows.len(),
                page_url
            );
            items.extend(
                rows.into_iter()
                    .filter_map(|raw| finish_item(&self.provider, raw, params, &self.classifier)),
            );
        }
        Ok(items)
    }
}

/// Parse every row of a listing page.
pub fn parse_listing(
    html: &str,
    page_url: &str,
    selectors: &ListingSelectors,
    locale: DateLocale,
    today: NaiveDate,
) -> Result<Vec<RawEvent>> {
    let compiled = CompiledSelectors::compile(selectors)?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&compiled.row)
        .filter_map(|row| parse_row(&row, &compiled, page_url, locale, today))
        .collect())
}

fn parse_row(
    row: &ElementRef<'_>,
    selectors: &CompiledSelectors,
    page_url: &str,
    locale: DateLocale,
    today: NaiveDate,
) -> Option<RawEvent> {
    let title = first_text(row, &selectors.title)?;
    let date_text = first_text(row, &selectors.date).unwrap_or_default();

    let href = find_link(row, selectors)?;
    let registration_url = resolve(page_url, &href);

    let time_text = NUMERIC_DATE.replace_all(&date_text, " ");
    let display_time = TIME_RANGE.captures(&time_text).map(|caps| match caps.get(3) {
        Some(_) => format!("{}:{}–{}:{}", &caps[1], &caps[2], &caps[3], &caps[4]),
        None => format!("{}:{}", &caps[1], &caps[2]),
    });

    // A range like "12.–13. mars 2027" keeps the first date only.
    let start_date = parse_date(&date_text, locale, today);

    let location_text = selectors
        .location
        .as_ref()
        .and_then(|sel| first_text(row, sel));

    Some(RawEvent {
        source_key: registration_url.clone(),
        title,
        description: selectors
            .description
            .as_ref()
            .and_then(|sel| first_text(row, sel))
            .unwrap_or_default(),
        organizer: selectors
            .organizer
            .as_ref()
            .and_then(|sel| first_text(row, sel)),
        category: None,
        start_date,
        end_date: None,
        display_time,
        location: parse_location(location_text.as_deref()),
        registration_url,
        capacity: None,
    })
}

/// Link from the link selector, else the title element, else any anchor.
fn find_link(row: &ElementRef<'_>, selectors: &CompiledSelectors) -> Option<String> {
    let attr = selectors.attr_name.as_str();
    let from = |el: ElementRef<'_>| {
        el.value().attr(attr).map(String::from).or_else(|| {
            el.select(&selectors.anchor)
                .next()
                .and_then(|a| a.value().attr("href").map(String::from))
        })
    };

    if let Some(sel) = &selectors.link {
        return row.select(sel).next().and_then(&from);
    }
    row.select(&selectors.title)
        .next()
        .and_then(&from)
        .or_else(|| {
            row.select(&selectors.anchor)
                .next()
                .and_then(|a| a.value().attr("href").map(String::from))
        })
}

/// `"Oslo Spektrum, Oslo"` → venue + city; `"Online"` → online mode.
fn parse_location(text: Option<&str>) -> EventLocation {
    let mut location = EventLocation::default();
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return location;
    };

    let lower = text.to_lowercase();
    let online = ONLINE_WORDS.iter().any(|w| lower.contains(w));
    let parts: Vec<&str> = text
        .split(['/', ','])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let p = p.to_lowercase();
            !ONLINE_WORDS.iter().any(|w| p == *w)
        })
        .collect();

    match parts.as_slice() {
        [] => {}
        [city] => location.city = Some(city.to_string()),
        [venue, .., city] => {
            location.venue = Some(venue.to_string());
            location.city = Some(city.to_string());
        }
    }

    location.mode = match (online, location.city.is_some()) {
        (true, true) => LocationMode::Hybrid,
        (true, false) => LocationMode::Online,
        _ => LocationMode::InPerson,
    };
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> ListingSelectors {
        ListingSelectors {
            row_selector: "li.event".into(),
            title_selector: "h3".into(),
            date_selector: ".date".into(),
            link_selector: None,
            location_selector: Some(".place".into()),
            description_selector: Some("p.summary".into()),
            organizer_selector: None,
            attr_name: "href".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    const PAGE: &str = r#"
        <ul>
          <li class="event">
            <h3><a href="/arrangement/karrieredag">Karrieredag   2026</a></h3>
            <span class="date">tirsdag 3. nov. kl. 10.00–15.00</span>
            <span class="place">Oslo Spektrum, Oslo</span>
            <p class="summary">Møt arbeidsgivere.</p>
          </li>
          <li class="event">
            <h3>Webinar: Søknadsskriving</h3>
            <a href="https://nav.no/webinar/42">Les mer</a>
            <span class="date">12.11.2026</span>
            <span class="place">Digitalt</span>
          </li>
          <li class="event">
            <h3>Uten lenke</h3>
            <span class="date">12.11.2026</span>
          </li>
        </ul>
    "#;

    #[test]
    fn test_parse_rows() {
        let rows =
            parse_listing(PAGE, "https://nav.no/arrangementer", &selectors(), DateLocale::Nb, today())
                .unwrap();
        assert_eq!(rows.len(), 2);

        let fair = &rows[0];
        assert_eq!(fair.title, "Karrieredag 2026");
        assert_eq!(fair.registration_url, "https://nav.no/arrangement/karrieredag");
        assert_eq!(fair.start_date, NaiveDate::from_ymd_opt(2026, 11, 3));
        assert_eq!(fair.display_time.as_deref(), Some("10:00–15:00"));
        assert_eq!(fair.location.city.as_deref(), Some("Oslo"));
        assert_eq!(fair.location.venue.as_deref(), Some("Oslo Spektrum"));
        assert_eq!(fair.description, "Møt arbeidsgivere.");

        let webinar = &rows[1];
        assert_eq!(webinar.registration_url, "https://nav.no/webinar/42");
        assert_eq!(webinar.location.mode, LocationMode::Online);
        assert!(webinar.location.city.is_none());
    }

    #[test]
    fn test_invalid_selector_is_error() {
        let mut bad = selectors();
        bad.row_selector = "li[".into();
        assert!(parse_listing(PAGE, "https://nav.no/", &bad, DateLocale::Nb, today()).is_err());
    }

    #[test]
    fn test_hybrid_location() {
        let location = parse_location(Some("Bergen / online"));
        assert_eq!(location.mode, LocationMode::Hybrid);
        assert_eq!(location.city.as_deref(), Some("Bergen"));
    }
}
