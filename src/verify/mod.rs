// src/verify/mod.rs

//! Staged trust checks between scraped items and the published set.
//!
//! - [`structural`]: pure URL and field checks, no network
//! - [`live`]: Stage A, reachability with a TTL cache
//! - [`content`]: Stage B, soft-404 / login-wall / marker heuristics
//! - [`headless`]: Stage C seam

pub mod content;
pub mod headless;
pub mod live;
pub mod structural;

use chrono::Utc;

use crate::models::{EventItem, RejectedItem, RejectionReason};

pub use content::{ContentOutcome, ContentVerifier, MarkerCategory, RULESET_VERSION};
pub use headless::HeadlessVerifier;
pub use live::{CheckOutcome, LiveVerifier};
pub use structural::{DateWindow, ValidationReport, validate_item, validate_url};

/// Where an item ended up after the network stages.
#[derive(Debug, Clone)]
pub enum Verdict {
    Verified(EventItem),
    LiveFailed(RejectedItem),
    ContentFailed(RejectedItem),
}

impl Verdict {
    pub fn passed_live(&self) -> bool {
        !matches!(self, Self::LiveFailed(_))
    }

    pub fn passed_content(&self) -> bool {
        matches!(self, Self::Verified(_))
    }
}

/// Stage A, then Stage B, then the optional Stage C seam.
pub struct VerificationPipeline {
    live: LiveVerifier,
    content: ContentVerifier,
    headless: Option<HeadlessVerifier>,
}

impl VerificationPipeline {
    pub fn new(
        live: LiveVerifier,
        content: ContentVerifier,
        headless: Option<HeadlessVerifier>,
    ) -> Self {
        Self {
            live,
            content,
            headless,
        }
    }

    pub async fn verify(&self, mut item: EventItem) -> Verdict {
        let url = item.registration_url.clone();

        let live = self.live.verify(&url).await;
        if !live.ok {
            let detail = live.error.clone().unwrap_or_else(|| "unreachable".into());
            log::info!("Stage A rejected {} ({}): {}", item.id, url, detail);
            return Verdict::LiveFailed(
                RejectedItem::new(&item, RejectionReason::LiveCheckFailure, vec![detail])
                    .with_status(live.status),
            );
        }

        let content = self.content.verify(&url).await;
        if !content.ok {
            let detail = content.error.clone().unwrap_or_default();
            log::info!("Stage B rejected {} ({}): {}", item.id, url, detail);
            return Verdict::ContentFailed(
                RejectedItem::new(
                    &item,
                    RejectionReason::ContentVerificationFailure,
                    vec![detail, format!("ruleset {RULESET_VERSION}")],
                )
                .with_status(content.status),
            );
        }

        let markers: Vec<&str> = content.markers.iter().map(|m| m.as_str()).collect();
        item.verification_notes
            .push(format!("markers: {}", markers.join(", ")));

        if let Some(headless) = &self.headless {
            let rendered = headless.verify(&url).await;
            if !rendered.ok {
                let note = rendered.error.unwrap_or_else(|| headless::UNAVAILABLE.into());
                item.verification_notes.push(format!("headless: {note}"));
            }
        }

        item.mark_verified(Utc::now(), content.score());
        Verdict::Verified(item)
    }
}
