//! End-to-end refresh runs against scripted providers and HTTP responses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;

use career_events::error::{AppError, Result};
use career_events::health::HealthState;
use career_events::models::{Config, EventItem, EventProvider, RejectionReason};
use career_events::pipeline::{RefreshJob, RefreshOptions};
use career_events::providers::{EnvToggles, FetchParams, ProviderAdapter, ProviderRegistry};
use career_events::storage::cache::{MemoryStore, UrlCheckEntry};
use career_events::storage::local::LocalStorage;
use career_events::storage::{HealthStore, OutputStore};
use career_events::utils::http::{HttpProbe, ProbeResponse};
use career_events::verify::{ContentVerifier, LiveVerifier, VerificationPipeline};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2026, 10, 18)
}

fn event_page() -> String {
    format!(
        "<html><body><h1>Karrieredag</h1><p>Dato: 12.11.2026</p><p>Sted: Oslo Spektrum</p>\
         <a href=\"/meld-deg-pa\">Meld deg på</a>{}</body></html>",
        "<p>Program kommer.</p>".repeat(80)
    )
}

/// Answers HEAD and GET from a fixed URL table; unknown URLs are 404.
struct ScriptedProbe {
    pages: HashMap<String, (u16, String)>,
}

impl ScriptedProbe {
    fn new(pages: &[(&str, u16, String)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, status, body)| (url.to_string(), (*status, body.clone())))
                .collect(),
        }
    }

    fn respond(&self, url: &str, with_body: bool) -> ProbeResponse {
        let (status, body) = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or((404, "<html>Not found</html>".to_string()));
        ProbeResponse {
            status,
            final_url: url.to_string(),
            body: with_body.then_some(body),
        }
    }
}

#[async_trait]
impl HttpProbe for ScriptedProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        Ok(self.respond(url, false))
    }

    async fn get(&self, url: &str) -> Result<ProbeResponse> {
        Ok(self.respond(url, true))
    }
}

enum Listing {
    Items(Vec<EventItem>),
    Fail(String),
}

struct FakeAdapter {
    provider: EventProvider,
    listing: Listing,
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn provider(&self) -> &EventProvider {
        &self.provider
    }

    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<EventItem>> {
        match &self.listing {
            Listing::Items(items) => Ok(items.clone()),
            Listing::Fail(message) => Err(AppError::provider(&self.provider.id, message)),
        }
    }
}

fn provider(config: &Config, id: &str) -> EventProvider {
    config.provider(id).cloned().unwrap()
}

fn item(provider: &EventProvider, key: &str, title: &str, url: &str) -> EventItem {
    let mut item = EventItem::new(&provider.id, key, title, date(2026, 11, 12), url);
    item.provider_priority = provider.priority;
    item
}

struct Fixture {
    _dir: TempDir,
    storage: Arc<LocalStorage>,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()));
        Self {
            _dir: dir,
            storage,
            config: Config::default(),
        }
    }

    fn job(&self, adapters: Vec<FakeAdapter>, probe: ScriptedProbe) -> RefreshJob {
        let mut registry = ProviderRegistry::new();
        for adapter in adapters {
            registry.register(Arc::new(adapter));
        }

        let probe: Arc<dyn HttpProbe> = Arc::new(probe);
        let verifier = VerificationPipeline::new(
            LiveVerifier::new(
                Arc::clone(&probe),
                Arc::new(MemoryStore::<UrlCheckEntry>::new()),
                &self.config.verification,
            ),
            ContentVerifier::new(
                probe,
                &self.config.verification,
                &self.config.url_policy,
            ),
            None,
        );

        RefreshJob::new(
            self.config.clone(),
            registry,
            verifier,
            self.storage.clone(),
            self.storage.clone(),
            EnvToggles::default(),
        )
    }
}

fn options() -> RefreshOptions {
    RefreshOptions {
        today: Some(today()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_dead_link_never_published() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let good = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";
    let dead = "https://arbeidsplassen.nav.no/arrangementer/avlyst";

    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(vec![
                item(&nav, good, "Karrieredag", good),
                item(&nav, dead, "Avlyst messe", dead),
                item(&nav, "insecure", "Usikker lenke", "http://nav.no/arrangement/3"),
            ]),
            provider: nav,
        }],
        ScriptedProbe::new(&[(good, 200, event_page())]),
    );

    let summary = job.run(&options()).await.unwrap();

    assert_eq!(summary.total_fetched, 3);
    assert_eq!(summary.total_published, 1);
    assert_eq!(summary.rejected_by_reason(RejectionReason::LiveCheckFailure), 1);
    assert_eq!(
        summary.rejected_by_reason(RejectionReason::StructuralValidationError),
        1
    );
    let dead_rejection = summary
        .rejected
        .iter()
        .find(|r| r.registration_url == dead)
        .unwrap();
    assert_eq!(dead_rejection.status, Some(404));

    let published = fixture.storage.load_published().await.unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].registration_url, good);
    assert!(published[0].is_verified());
    assert!(published.iter().all(|e| e.registration_url != dead));

    let stats = &summary.providers["nav"];
    assert_eq!(stats.fetched, 3);
    assert_eq!(stats.structurally_valid, 2);
    assert_eq!(stats.live_passed, 1);
    assert_eq!(stats.content_passed, 1);
    assert_eq!(stats.published, 1);
    assert!(fixture.storage.summary_path().exists());
}

#[tokio::test]
async fn test_soft_404_rejected_by_content_stage() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let url = "https://arbeidsplassen.nav.no/arrangementer/tom";

    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(vec![item(&nav, url, "Tom side", url)]),
            provider: nav,
        }],
        ScriptedProbe::new(&[(url, 200, "<html><body>Siden finnes ikke</body></html>".into())]),
    );

    let summary = job.run(&options()).await.unwrap();
    assert_eq!(summary.total_published, 0);
    assert_eq!(
        summary.rejected_by_reason(RejectionReason::ContentVerificationFailure),
        1
    );
    assert_eq!(summary.providers["nav"].live_passed, 1);
    assert_eq!(summary.providers["nav"].content_passed, 0);
}

#[tokio::test]
async fn test_duplicate_across_providers_keeps_higher_priority() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let uio = provider(&fixture.config, "uio");
    let nav_url = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";
    let uio_url = "https://www.uio.no/studier/karriere/arrangementer/karrieredag";

    let job = fixture.job(
        vec![
            FakeAdapter {
                listing: Listing::Items(vec![item(&uio, uio_url, "Karrieredag 2026", uio_url)]),
                provider: uio,
            },
            FakeAdapter {
                listing: Listing::Items(vec![item(&nav, nav_url, "KARRIEREDAG 2026!", nav_url)]),
                provider: nav,
            },
        ],
        ScriptedProbe::new(&[(nav_url, 200, event_page()), (uio_url, 200, event_page())]),
    );

    let summary = job.run(&options()).await.unwrap();
    assert_eq!(summary.total_published, 1);
    assert_eq!(summary.dedupe.duplicates_removed, 1);
    assert_eq!(summary.providers["uio"].deduped_out, 1);

    let published = fixture.storage.load_published().await.unwrap();
    assert_eq!(published[0].provider_id, "nav");
}

#[tokio::test]
async fn test_provider_failure_is_contained_and_tracked() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let uio = provider(&fixture.config, "uio");
    let url = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";

    let adapters = |uio_fails: bool| {
        vec![
            FakeAdapter {
                listing: Listing::Items(vec![item(&nav, url, "Karrieredag", url)]),
                provider: nav.clone(),
            },
            FakeAdapter {
                listing: if uio_fails {
                    Listing::Fail("listing markup changed".into())
                } else {
                    Listing::Items(Vec::new())
                },
                provider: uio.clone(),
            },
        ]
    };
    let probe = || ScriptedProbe::new(&[(url, 200, event_page())]);

    let expected = [
        (HealthState::Healthy, 1),
        (HealthState::Degraded, 2),
        (HealthState::Failed, 3),
    ];
    for (run, (state, failures)) in expected.into_iter().enumerate() {
        let summary = fixture.job(adapters(true), probe()).run(&options()).await.unwrap();
        assert_eq!(summary.total_published, 1, "run {run}");
        assert!(summary.providers["uio"].error.is_some());
        assert_eq!(summary.providers["uio"].health, state.to_string());
        assert_eq!(summary.providers["nav"].health, "HEALTHY");

        let records = fixture.storage.load_health().await.unwrap();
        assert_eq!(records["uio"].state, state, "run {run}");
        assert_eq!(records["uio"].consecutive_failures, failures);
    }

    let recovered = fixture.job(adapters(false), probe()).run(&options()).await.unwrap();
    assert_eq!(recovered.providers["uio"].health, "HEALTHY");
    assert!(recovered.providers["uio"].error.is_none());

    let records = fixture.storage.load_health().await.unwrap();
    assert_eq!(records["uio"].state, HealthState::Healthy);
    assert_eq!(records["uio"].consecutive_failures, 0);
    assert_eq!(records["uio"].total_failures, 3);
    assert_eq!(records["uio"].total_runs, 4);
    assert!(records["uio"].last_success_at.is_some());
    assert_eq!(records["nav"].total_successes, 4);
    assert_eq!(records["nav"].last_item_count, 1);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let url = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";

    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(vec![item(&nav, url, "Karrieredag", url)]),
            provider: nav,
        }],
        ScriptedProbe::new(&[(url, 200, event_page())]),
    );

    let summary = job
        .run(&RefreshOptions {
            dry_run: true,
            ..options()
        })
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.total_published, 1);
    assert!(!fixture.storage.events_path().exists());
    assert!(!fixture.storage.summary_path().exists());
    assert!(!fixture.storage.health_path().exists());
}

#[tokio::test]
async fn test_skip_verify_publishes_unverified() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let url = "https://arbeidsplassen.nav.no/arrangementer/uten-side";

    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(vec![item(&nav, url, "Karrieredag", url)]),
            provider: nav,
        }],
        ScriptedProbe::new(&[]),
    );

    let summary = job
        .run(&RefreshOptions {
            skip_verify: true,
            ..options()
        })
        .await
        .unwrap();

    assert!(summary.verification_skipped);
    let published = fixture.storage.load_published().await.unwrap();
    assert_eq!(published.len(), 1);
    assert!(!published[0].is_verified());
}

#[tokio::test]
async fn test_unknown_provider_is_an_error() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(Vec::new()),
            provider: nav,
        }],
        ScriptedProbe::new(&[]),
    );

    let result = job
        .run(&RefreshOptions {
            provider: Some("missing".into()),
            ..options()
        })
        .await;
    assert!(result.is_err());
    assert!(!fixture.storage.summary_path().exists());
}

#[tokio::test]
async fn test_publish_guard_keeps_previous_set() {
    let mut fixture = Fixture::new();
    fixture.config.publish.min_baseline = 2;
    let nav = provider(&fixture.config, "nav");

    let previous: Vec<EventItem> = (0..4)
        .map(|i| {
            let url = format!("https://arbeidsplassen.nav.no/arrangementer/{i}");
            item(&nav, &url, &format!("Messe {i}"), &url)
        })
        .collect();
    fixture.storage.write_published(&previous).await.unwrap();

    let url = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";
    let adapters = || {
        vec![FakeAdapter {
            listing: Listing::Items(vec![item(&nav, url, "Karrieredag", url)]),
            provider: nav.clone(),
        }]
    };
    let probe = || ScriptedProbe::new(&[(url, 200, event_page())]);

    let summary = fixture.job(adapters(), probe()).run(&options()).await.unwrap();
    assert!(summary.publish_skipped);
    assert_eq!(fixture.storage.load_published().await.unwrap().len(), 4);

    let forced = fixture
        .job(adapters(), probe())
        .run(&RefreshOptions {
            force: true,
            ..options()
        })
        .await
        .unwrap();
    assert!(!forced.publish_skipped);
    assert_eq!(fixture.storage.load_published().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_guarded_run_still_withdraws_dead_events() {
    let fixture = Fixture::new();
    let nav = provider(&fixture.config, "nav");
    let dead = "https://arbeidsplassen.nav.no/arrangementer/avlyst";
    let good = "https://arbeidsplassen.nav.no/arrangementer/karrieredag";

    let mut previous: Vec<EventItem> = (0..9)
        .map(|i| {
            let url = format!("https://arbeidsplassen.nav.no/arrangementer/messe-{i}");
            item(&nav, &url, &format!("Messe {i}"), &url)
        })
        .collect();
    previous.push(item(&nav, dead, "Avlyst messe", dead));
    fixture.storage.write_published(&previous).await.unwrap();

    let job = fixture.job(
        vec![FakeAdapter {
            listing: Listing::Items(vec![
                item(&nav, good, "Karrieredag", good),
                item(&nav, dead, "Avlyst messe", dead),
            ]),
            provider: nav,
        }],
        ScriptedProbe::new(&[(good, 200, event_page())]),
    );

    let summary = job.run(&options()).await.unwrap();
    assert!(summary.publish_skipped);
    assert_eq!(summary.rejected_by_reason(RejectionReason::LiveCheckFailure), 1);
    assert_eq!(summary.withdrawn, 1);

    let published = fixture.storage.load_published().await.unwrap();
    assert_eq!(published.len(), 9);
    assert!(published.iter().all(|e| e.registration_url != dead));
}
