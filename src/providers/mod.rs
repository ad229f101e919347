// src/providers/mod.rs

//! Provider adapters and the registry that selects them.
//!
//! Every adapter turns a provider's listing pages into [`RawEvent`]s;
//! [`finish_item`] then derives the id, stamps provenance and classifies,
//! so all sources produce items the same way.

pub mod classify;
pub mod html_list;
pub mod json_ld;
pub mod registry;

use async_trait::async_trait;
use chrono::{Months, NaiveDate};

use crate::error::Result;
use crate::models::{EventCategory, EventItem, EventLocation, EventProvider};

pub use classify::Classifier;
pub use html_list::HtmlListAdapter;
pub use json_ld::JsonLdAdapter;
pub use registry::{EnvToggles, ProviderRegistry, ResolvedProvider};

/// Per-run inputs shared by all adapters.
#[derive(Debug, Clone, Copy)]
pub struct FetchParams {
    /// Reference date for yearless dates
    pub today: NaiveDate,
    /// Look-ahead window in months
    pub months: u32,
}

impl FetchParams {
    /// Last start date adapters keep.
    pub fn horizon(&self) -> NaiveDate {
        self.today
            .checked_add_months(Months::new(self.months))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// One source of event listings.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> &EventProvider;

    /// Fetch and parse all listing pages. Any page failure fails the fetch.
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<EventItem>>;
}

/// Fields an adapter extracted before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    /// Stable per-provider key (detail URL or source id)
    pub source_key: String,
    pub title: String,
    pub description: String,
    pub organizer: Option<String>,
    pub category: Option<EventCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub display_time: Option<String>,
    pub location: EventLocation,
    pub registration_url: String,
    pub capacity: Option<u32>,
}

/// Turn a raw listing into a canonical item. Returns `None` without a
/// start date or when it starts past the look-ahead horizon. Past dates
/// are left to structural validation.
pub fn finish_item(
    provider: &EventProvider,
    raw: RawEvent,
    params: &FetchParams,
    classifier: &Classifier,
) -> Option<EventItem> {
    let Some(start_date) = raw.start_date else {
        log::debug!(
            "[{}] Skipping '{}': no start date",
            provider.id,
            raw.title
        );
        return None;
    };

    let horizon = params.horizon();
    if start_date > horizon {
        log::debug!(
            "[{}] Skipping '{}': starts {} after horizon {}",
            provider.id,
            raw.title,
            start_date,
            horizon
        );
        return None;
    }

    let source_key = if raw.source_key.trim().is_empty() {
        format!("{}|{}", raw.title, start_date)
    } else {
        raw.source_key
    };

    let mut item = EventItem::new(
        provider.id.as_str(),
        &source_key,
        raw.title.trim(),
        start_date,
        raw.registration_url.trim(),
    );
    item.description = raw.description;
    item.organizer = raw.organizer.filter(|o| !o.trim().is_empty());
    item.category = raw.category.unwrap_or_default();
    item.end_date = raw.end_date;
    item.display_time = raw.display_time;
    item.location = raw.location;
    item.capacity = raw.capacity;
    item.provider_priority = provider.priority;

    if item.location.country.is_none() && !item.location.is_online_only() {
        item.location.country = provider.default_country.clone();
    }

    classifier.apply(&mut item);
    Some(item)
}
