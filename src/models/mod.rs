// src/models/mod.rs

//! Domain models for the refresh job.
//!
//! This module contains the data structures shared across the pipeline,
//! organized by their primary purpose.

mod config;
mod event;
mod provider;
mod run;

// Re-export all public types
pub use config::{
    BlockedPath, CategoryKeyword, ClassificationConfig, Config, FetchConfig, HealthConfig,
    IndustryKeyword, PublishConfig, UrlPolicyConfig, VerificationConfig, WindowConfig,
};
pub use event::{
    EventCategory, EventItem, EventLocation, LocationMode, VerificationStatus, event_id,
};
pub use provider::{
    AdapterKind, DateLocale, EventProvider, ListingSelectors, disable_var_for,
};
pub use run::{
    DedupeStats, ProviderRunStats, RejectedItem, RejectionReason, RunSummary,
};
