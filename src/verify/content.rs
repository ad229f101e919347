// src/verify/content.rs

//! Stage B: does the page look like a real, open event page?
//!
//! Checks run in a fixed order: soft 404 (body too short), login wall,
//! soft 404 (not-found wording), then content markers. Signature lists are versioned with
//! [`RULESET_VERSION`] so rejected items can be traced to the rules that
//! rejected them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{UrlPolicyConfig, VerificationConfig};
use crate::utils::html::strip_html;
use crate::utils::http::HttpProbe;
use crate::verify::live::is_success;
use crate::verify::structural::validate_url;

pub const RULESET_VERSION: &str = "content-2026.10.2";

/// Path fragments of sign-in pages a registration link may redirect to.
pub const LOGIN_PATH_SIGNATURES: &[&str] = &[
    "/login",
    "/log-in",
    "/signin",
    "/sign-in",
    "/sso",
    "/auth/",
    "/logg-inn",
    "/innlogging",
    "/accounts/login",
];

/// Visible-text phrases of "not found" pages served with a 2xx status.
pub const SOFT_404_SIGNATURES: &[&str] = &[
    "page not found",
    "page could not be found",
    "page you requested could not be found",
    "this event has ended",
    "event not found",
    "no longer available",
    "siden finnes ikke",
    "siden ble ikke funnet",
    "fant ikke siden",
    "arrangementet er avlyst",
    "arrangementet finnes ikke",
];

/// Raw-HTML fragments of a login form.
pub const LOGIN_BODY_SIGNATURES: &[&str] = &[
    "type=\"password\"",
    "type='password'",
    "name=\"password\"",
    "id=\"login-form\"",
    "class=\"login-form\"",
];

/// Kinds of evidence that a page describes a concrete event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    Date,
    Price,
    Location,
    Registration,
    Organizer,
}

impl MarkerCategory {
    pub const ALL: [MarkerCategory; 5] = [
        Self::Date,
        Self::Price,
        Self::Location,
        Self::Registration,
        Self::Organizer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Price => "price",
            Self::Location => "location",
            Self::Registration => "registration",
            Self::Organizer => "organizer",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &[
                "date", "dato", "when", "når", "tidspunkt", "januar", "februar", "mars",
                "april", "juni", "juli", "august", "september", "oktober", "november",
                "desember", "january", "february", "march", "june", "july", "october",
                "december",
            ],
            Self::Price => &[
                "price", "pris", "ticket", "tickets", "billett", "billetter", "free",
                "gratis", "cost", "inngang",
            ],
            Self::Location => &[
                "address", "adresse", "venue", "sted", "location", "lokasjon", "lokale",
                "online", "zoom", "microsoft teams", "digitalt",
            ],
            Self::Registration => &[
                "register", "registration", "påmelding", "meld deg på", "sign up",
                "rsvp", "book now", "get tickets", "reserve", "apply",
            ],
            Self::Organizer => &[
                "organizer", "organiser", "organized by", "organised by", "arrangør",
                "arrangert av", "hosted by", "presented by",
            ],
        }
    }

    fn pattern(&self) -> &'static Regex {
        &MARKER_PATTERNS[*self as usize]
    }
}

impl fmt::Display for MarkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One whole-word alternation per category, indexed by discriminant.
static MARKER_PATTERNS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    MarkerCategory::ALL.map(|category| {
        let words: Vec<String> = category.keywords().iter().map(|k| regex::escape(k)).collect();
        Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).expect("valid regex")
    })
});

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}\b|\b\d{1,2}[./]\d{1,2}[./]\d{2,4}\b").expect("valid regex")
});

/// An amount next to a currency: `250 kr`, `NOK 100`, `$20`, `kr 150,-`.
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(?:\b(?:kr|nok|eur|usd)\.?\s?|[€$£]\s?)\d",
        r"|\d(?:[.,]\d+)?\s?(?:kr\b|nok\b|[€£]|,-)",
    ))
    .expect("valid regex")
});

/// Stage B result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub markers: BTreeSet<MarkerCategory>,
}

impl ContentOutcome {
    fn rejected(status: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status,
            error: Some(error.into()),
            markers: BTreeSet::new(),
        }
    }

    /// Share of marker categories found, 0.0 to 1.0.
    pub fn score(&self) -> f32 {
        self.markers.len() as f32 / MarkerCategory::ALL.len() as f32
    }
}

/// Marker categories present in the visible text of a page.
pub fn detect_markers(text: &str) -> BTreeSet<MarkerCategory> {
    let mut found: BTreeSet<MarkerCategory> = MarkerCategory::ALL
        .into_iter()
        .filter(|category| category.pattern().is_match(text))
        .collect();
    if DATE_PATTERN.is_match(text) {
        found.insert(MarkerCategory::Date);
    }
    if PRICE_PATTERN.is_match(text) {
        found.insert(MarkerCategory::Price);
    }
    found
}

/// The first soft-404 phrase found in the visible text.
pub fn soft_404_signature(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    SOFT_404_SIGNATURES
        .iter()
        .copied()
        .find(|sig| text.contains(sig))
}

/// True if the final URL or the body looks like a sign-in page.
pub fn is_login_wall(final_url: &str, body: &str) -> bool {
    let path = Url::parse(final_url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| final_url.to_lowercase());
    if LOGIN_PATH_SIGNATURES.iter().any(|sig| path.contains(sig)) {
        return true;
    }
    let body = body.to_lowercase();
    LOGIN_BODY_SIGNATURES.iter().any(|sig| body.contains(sig))
}

/// Thresholds for [`inspect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRules {
    pub min_body_bytes: usize,
    pub min_marker_categories: usize,
}

impl From<&VerificationConfig> for ContentRules {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            min_body_bytes: config.min_body_bytes,
            min_marker_categories: config.min_marker_categories,
        }
    }
}

/// Apply the Stage B rules to a fetched page.
pub fn inspect(status: u16, final_url: &str, body: &str, rules: ContentRules) -> ContentOutcome {
    if !is_success(status) {
        return ContentOutcome::rejected(Some(status), format!("HTTP {status}"));
    }
    if body.len() < rules.min_body_bytes {
        return ContentOutcome::rejected(
            Some(status),
            format!(
                "soft 404: body is {} bytes (< {})",
                body.len(),
                rules.min_body_bytes
            ),
        );
    }
    if is_login_wall(final_url, body) {
        return ContentOutcome::rejected(Some(status), format!("login wall at {final_url}"));
    }

    let text = strip_html(body);
    if let Some(signature) = soft_404_signature(&text) {
        return ContentOutcome::rejected(Some(status), format!("soft 404: page says \"{signature}\""));
    }

    let markers = detect_markers(&text);
    if markers.len() < rules.min_marker_categories {
        let found: Vec<&str> = markers.iter().map(|m| m.as_str()).collect();
        return ContentOutcome {
            ok: false,
            status: Some(status),
            error: Some(format!(
                "only {} content marker categories [{}] (need {})",
                markers.len(),
                found.join(", "),
                rules.min_marker_categories
            )),
            markers,
        };
    }

    ContentOutcome {
        ok: true,
        status: Some(status),
        error: None,
        markers,
    }
}

/// Fetches a page and applies [`inspect`]. A redirect target must pass
/// the same URL policy as the registration link itself.
pub struct ContentVerifier {
    probe: Arc<dyn HttpProbe>,
    rules: ContentRules,
    url_policy: UrlPolicyConfig,
}

impl ContentVerifier {
    pub fn new(
        probe: Arc<dyn HttpProbe>,
        config: &VerificationConfig,
        url_policy: &UrlPolicyConfig,
    ) -> Self {
        Self {
            probe,
            rules: ContentRules::from(config),
            url_policy: url_policy.clone(),
        }
    }

    pub async fn verify(&self, url: &str) -> ContentOutcome {
        let response = match self.probe.get(url).await {
            Ok(response) => response,
            Err(e) => return ContentOutcome::rejected(None, e.to_string()),
        };

        if response.final_url.trim() != url.trim() {
            let report = validate_url(&response.final_url, &self.url_policy);
            if !report.valid {
                return ContentOutcome::rejected(
                    Some(response.status),
                    format!(
                        "redirected to {}: {}",
                        response.final_url,
                        report.errors.join("; ")
                    ),
                );
            }
        }

        let body = response.body.unwrap_or_default();
        inspect(response.status, &response.final_url, &body, self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: ContentRules = ContentRules {
        min_body_bytes: 1000,
        min_marker_categories: 2,
    };

    fn page(body: &str) -> String {
        // Pad with an invisible comment so only the visible text matters.
        format!("<html><body>{body}<!-- {} --></body></html>", "x".repeat(1000))
    }

    #[test]
    fn test_short_body_is_soft_404() {
        let outcome = inspect(200, "https://nav.no/e/1", "<html>Not found</html>", RULES);
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().starts_with("soft 404"));
    }

    #[test]
    fn test_login_redirect_rejected() {
        let body = page("<p>Dato: 12.11.2026. Meld deg på her. Sted: Oslo.</p>");
        let outcome = inspect(200, "https://nav.no/login?next=/e/1", &body, RULES);
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("login wall"));
    }

    #[test]
    fn test_login_form_rejected() {
        let body = page(r#"<form><input type="password" name="pw"></form> date venue"#);
        assert!(!inspect(200, "https://nav.no/e/1", &body, RULES).ok);
    }

    #[test]
    fn test_markers_required() {
        let thin = page("<h1>Velkommen</h1>");
        let outcome = inspect(200, "https://nav.no/e/1", &thin, RULES);
        assert!(!outcome.ok);

        let rich = page(
            "<h1>Karrieredag</h1><p>Dato: 12.11.2026</p><p>Sted: Oslo Spektrum</p>\
             <a>Meld deg på</a>",
        );
        let outcome = inspect(200, "https://nav.no/e/1", &rich, RULES);
        assert!(outcome.ok);
        assert!(outcome.markers.contains(&MarkerCategory::Date));
        assert!(outcome.markers.contains(&MarkerCategory::Location));
        assert!(outcome.markers.contains(&MarkerCategory::Registration));
        assert!(outcome.score() >= 0.6);
    }

    #[test]
    fn test_error_status_rejected() {
        let body = page("date venue register");
        let outcome = inspect(404, "https://nav.no/e/1", &body, RULES);
        assert!(!outcome.ok);
        assert_eq!(outcome.status, Some(404));
    }

    #[test]
    fn test_not_found_page_rejected_despite_markers() {
        let body = page(
            "<h1>Page not found</h1><p>Please update your bookmarks.</p>\
             <footer>Ghost theme · Apply now</footer>",
        );
        let outcome = inspect(200, "https://nav.no/e/1", &body, RULES);
        assert!(!outcome.ok);
        assert_eq!(
            outcome.error.as_deref(),
            Some("soft 404: page says \"page not found\"")
        );

        let nb = page("<h1>Beklager, siden finnes ikke</h1><p>Dato: 12.11.2026, Sted: Oslo</p>");
        assert!(!inspect(200, "https://nav.no/e/1", &nb, RULES).ok);
    }

    #[test]
    fn test_markers_match_whole_words_only() {
        let markers = detect_markers("Please update your bookmarks. Ghost theme for teams.");
        assert!(markers.is_empty(), "unexpected markers {markers:?}");

        let markers = detect_markers("Hosted by NAV. Price: 250 kr. Online via Zoom.");
        assert!(markers.contains(&MarkerCategory::Organizer));
        assert!(markers.contains(&MarkerCategory::Price));
        assert!(markers.contains(&MarkerCategory::Location));
    }

    #[test]
    fn test_currency_needs_an_amount() {
        assert!(!detect_markers("Save $ on shipping").contains(&MarkerCategory::Price));
        assert!(detect_markers("Entry $20").contains(&MarkerCategory::Price));
        assert!(detect_markers("Billettpris NOK 150").contains(&MarkerCategory::Price));
    }

    #[test]
    fn test_iso_date_counts_as_marker() {
        let markers = detect_markers("Starts 2026-11-02");
        assert!(markers.contains(&MarkerCategory::Date));
        assert_eq!(markers.len(), 1);
    }
}
