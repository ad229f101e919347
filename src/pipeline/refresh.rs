// src/pipeline/refresh.rs

//! The events refresh job.
//!
//! One call to [`RefreshJob::run`] is one batch pass: resolve providers,
//! fetch with error containment, validate, verify, dedupe, publish. Item
//! failures become rejections, provider failures become health updates,
//! and only output I/O aborts the run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use futures::stream::{self, StreamExt};

use crate::dedupe::dedupe;
use crate::error::{AppError, Result};
use crate::health::{HealthPolicy, HealthState, HealthTracker};
use crate::models::{
    Config, EventItem, ProviderRunStats, RejectedItem, RejectionReason, RunSummary,
};
use crate::pipeline::publish_guard::{PublishGuard, PublishGuardConfig, withdraw_dead};
use crate::providers::{
    Classifier, EnvToggles, FetchParams, ProviderRegistry, ResolvedProvider,
};
use crate::storage::{HealthStore, LocalStorage, OutputStore};
use crate::utils::http::{Fetcher, HttpProbe, PageFetcher, ReqwestProbe, create_client};
use crate::utils::report;
use crate::utils::throttle::HostThrottle;
use crate::verify::{
    ContentVerifier, DateWindow, HeadlessVerifier, LiveVerifier, Verdict, VerificationPipeline,
    validate_item,
};

const TOTAL_STEPS: usize = 5;

/// Per-invocation flags, parsed once by the CLI.
#[derive(Debug, Clone, Default)]
pub struct RefreshOptions {
    /// Look-ahead window; `window.months` from config when unset
    pub months: Option<u32>,
    /// Run everything but write no output files
    pub dry_run: bool,
    /// Skip Stage A/B/C; items stay unverified
    pub skip_verify: bool,
    /// Only run this provider id
    pub provider: Option<String>,
    /// Publish even when the publish guard objects
    pub force: bool,
    /// Reference date; the local date when unset
    pub today: Option<NaiveDate>,
}

/// Everything one refresh run needs, wired up front.
pub struct RefreshJob {
    config: Config,
    registry: ProviderRegistry,
    verifier: VerificationPipeline,
    output: Arc<dyn OutputStore>,
    health: Arc<dyn HealthStore>,
    env: EnvToggles,
}

impl RefreshJob {
    pub fn new(
        config: Config,
        registry: ProviderRegistry,
        verifier: VerificationPipeline,
        output: Arc<dyn OutputStore>,
        health: Arc<dyn HealthStore>,
        env: EnvToggles,
    ) -> Self {
        Self {
            config,
            registry,
            verifier,
            output,
            health,
            env,
        }
    }

    /// Wire the job with HTTP clients and file-backed stores under the data
    /// directory.
    pub fn from_storage(config: Config, storage: LocalStorage, env: EnvToggles) -> Result<Self> {
        let throttle = Arc::new(HostThrottle::new(Duration::from_millis(
            config.fetch.throttle_ms,
        )));

        let page_client = create_client(&config.fetch, config.fetch.timeout_secs)?;
        let pages: Arc<dyn PageFetcher> = Arc::new(Fetcher::new(
            page_client,
            Arc::clone(&throttle),
            Arc::new(storage.html_store()),
            Duration::from_secs(config.fetch.html_cache_ttl_secs),
        ));
        let classifier = Arc::new(Classifier::new(&config.classification));
        let registry = ProviderRegistry::from_config(&config, pages, classifier);

        let verify_client = create_client(&config.fetch, config.verification.timeout_secs)?;
        let probe: Arc<dyn HttpProbe> = Arc::new(ReqwestProbe::new(verify_client, throttle));
        let verifier = VerificationPipeline::new(
            LiveVerifier::new(
                Arc::clone(&probe),
                Arc::new(storage.url_check_store()),
                &config.verification,
            ),
            ContentVerifier::new(probe, &config.verification, &config.url_policy),
            config
                .verification
                .headless_enabled
                .then(HeadlessVerifier::new),
        );

        let storage = Arc::new(storage);
        Ok(Self::new(
            config,
            registry,
            verifier,
            storage.clone(),
            storage,
            env,
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one refresh pass and return its summary.
    pub async fn run(&self, options: &RefreshOptions) -> Result<RunSummary> {
        let started_at = Utc::now();
        let today = options.today.unwrap_or_else(|| Local::now().date_naive());
        let months = options.months.unwrap_or(self.config.window.months);

        if let Some(only) = options.provider.as_deref() {
            if !self.registry.contains(only) {
                return Err(AppError::config(format!("unknown provider '{only}'")));
            }
        }

        report::header("Events Refresh");

        let records = match self.health.load_health().await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Could not read provider health ({}); starting fresh", e);
                BTreeMap::new()
            }
        };
        let mut tracker = HealthTracker::new(HealthPolicy::from(&self.config.health), records);
        let mut stats: BTreeMap<String, ProviderRunStats> = BTreeMap::new();

        // Step 1: providers
        report::step(1, TOTAL_STEPS, "Fetch - Reading provider listings");
        let mut active = Vec::new();
        for resolved in self.registry.resolve(&self.env, options.provider.as_deref()) {
            let id = resolved.id().to_string();
            if let Some(reason) = &resolved.skip_reason {
                log::info!("Skipping provider {}: {}", id, reason);
                continue;
            }
            if self.config.health.suppress_failed && tracker.state(&id) == HealthState::Failed {
                log::warn!("Suppressing provider {}: health is FAILED", id);
                stats.insert(
                    id,
                    ProviderRunStats {
                        health: HealthState::Failed.to_string(),
                        suppressed: true,
                        ..Default::default()
                    },
                );
                continue;
            }
            active.push(resolved);
        }

        let fetched = self.fetch_all(active, today, months).await;
        let mut items = Vec::new();
        for (id, result) in fetched {
            let entry = stats.entry(id.clone()).or_default();
            let now = Utc::now();
            match result {
                Ok(provider_items) => {
                    if provider_items.is_empty() {
                        log::warn!("Provider {} returned no events", id);
                    }
                    entry.fetched = provider_items.len();
                    tracker.record_success(&id, provider_items.len(), now);
                    items.extend(provider_items);
                }
                Err(e) => {
                    log::warn!("Provider {} failed: {}", id, e);
                    entry.error = Some(e.to_string());
                    tracker.record_failure(&id, &e.to_string(), now);
                }
            }
            entry.health = tracker.state(&id).to_string();
        }
        let total_fetched = items.len();
        report::sub_item(&format!("{} items from {} providers", total_fetched, stats.len()));

        // Step 2: structural validation
        report::step(2, TOTAL_STEPS, "Validate - Structural checks");
        let window = DateWindow::from_config(today, &self.config.window, months);
        let mut rejected = Vec::new();
        let mut valid = Vec::new();
        for item in items {
            let validation = validate_item(&item, &self.config.url_policy, &window);
            if validation.valid {
                stats.entry(item.provider_id.clone()).or_default().structurally_valid += 1;
                valid.push(item);
            } else {
                log::info!(
                    "Rejected {} ({}): {}",
                    item.id,
                    item.registration_url,
                    validation.errors.join("; ")
                );
                rejected.push(RejectedItem::new(
                    &item,
                    RejectionReason::StructuralValidationError,
                    validation.errors,
                ));
            }
        }
        report::sub_item(&format!("{} structurally valid", valid.len()));

        // Step 3: verification
        let candidates = if options.skip_verify {
            report::step(3, TOTAL_STEPS, "Verify - Skipped (--skip-verify)");
            valid
        } else {
            report::step(3, TOTAL_STEPS, "Verify - Live and content checks");
            self.verify_all(valid, &mut stats, &mut rejected).await
        };

        // Step 4: dedupe
        report::step(4, TOTAL_STEPS, "Dedupe - Collapsing duplicates");
        let deduped = dedupe(candidates);
        for (provider_id, removed) in &deduped.removed_by_provider {
            stats.entry(provider_id.clone()).or_default().deduped_out = *removed;
        }
        for item in &deduped.items {
            stats.entry(item.provider_id.clone()).or_default().published += 1;
        }
        report::sub_item(&format!(
            "{} → {} ({} duplicates, {} conflicting groups)",
            deduped.stats.input_count,
            deduped.stats.output_count,
            deduped.stats.duplicates_removed,
            deduped.stats.conflicts
        ));

        rejected.sort_by(|a, b| {
            a.provider_id
                .cmp(&b.provider_id)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let mut summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            dry_run: options.dry_run,
            verification_skipped: options.skip_verify,
            months,
            total_fetched,
            total_published: deduped.items.len(),
            dedupe: deduped.stats,
            providers: stats,
            rejected,
            publish_skipped: false,
            withdrawn: 0,
        };

        // Step 5: output
        if options.dry_run {
            report::step(5, TOTAL_STEPS, "Publish - Skipped (--dry-run)");
            return Ok(summary);
        }
        report::step(5, TOTAL_STEPS, "Publish - Writing output");

        match self.held_back_previous(&deduped.items, options.force).await {
            None => self.output.write_published(&deduped.items).await?,
            Some(previous) => {
                summary.publish_skipped = true;
                let before = previous.len();
                let kept = withdraw_dead(previous, &summary.rejected);
                summary.withdrawn = before - kept.len();
                if summary.withdrawn > 0 {
                    log::warn!(
                        "Withdrawing {} dead events from the previous event set",
                        summary.withdrawn
                    );
                    self.output.write_published(&kept).await?;
                }
            }
        }
        self.health.save_health(tracker.records()).await?;
        summary.finished_at = Utc::now();
        self.output.write_summary(&summary).await?;

        Ok(summary)
    }

    /// Fetch enabled providers with bounded concurrency. Results come back
    /// in priority order regardless of completion order.
    async fn fetch_all(
        &self,
        providers: Vec<ResolvedProvider>,
        today: NaiveDate,
        months: u32,
    ) -> Vec<(String, Result<Vec<EventItem>>)> {
        let params = FetchParams { today, months };
        let concurrency = self.config.fetch.max_concurrent.max(1);
        let order: Vec<String> = providers.iter().map(|p| p.id().to_string()).collect();

        let mut results: BTreeMap<String, Result<Vec<EventItem>>> = stream::iter(providers)
            .map(|provider| async move {
                let id = provider.id().to_string();
                log::info!("Fetching provider {}", id);
                let result = provider.adapter.fetch(&params).await;
                (id, result)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        order
            .into_iter()
            .filter_map(|id| results.remove(&id).map(|result| (id, result)))
            .collect()
    }

    /// Run the verification stages; returns the verified items.
    async fn verify_all(
        &self,
        items: Vec<EventItem>,
        stats: &mut BTreeMap<String, ProviderRunStats>,
        rejected: &mut Vec<RejectedItem>,
    ) -> Vec<EventItem> {
        let concurrency = self.config.verification.max_concurrent.max(1);
        let verdicts: Vec<(String, Verdict)> = stream::iter(items)
            .map(|item| async move {
                let provider_id = item.provider_id.clone();
                (provider_id, self.verifier.verify(item).await)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut verified = Vec::new();
        for (provider_id, verdict) in verdicts {
            let entry = stats.entry(provider_id).or_default();
            if verdict.passed_live() {
                entry.live_passed += 1;
            }
            if verdict.passed_content() {
                entry.content_passed += 1;
            }
            match verdict {
                Verdict::Verified(item) => verified.push(item),
                Verdict::LiveFailed(rejection) | Verdict::ContentFailed(rejection) => {
                    rejected.push(rejection)
                }
            }
        }
        report::sub_item(&format!("{} verified", verified.len()));
        verified
    }

    /// `None` when the new set may be written, otherwise the previously
    /// published set the guard keeps in place.
    async fn held_back_previous(&self, items: &[EventItem], force: bool) -> Option<Vec<EventItem>> {
        if !self.config.publish.guard_enabled {
            return None;
        }
        let previous = match self.output.load_published().await {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!("Could not read previous events ({}); treating as empty", e);
                Vec::new()
            }
        };

        let guard = PublishGuard::with_config(PublishGuardConfig::from(&self.config.publish));
        let result = guard.evaluate(items, &previous);
        if result.allows_write() {
            return None;
        }
        if force {
            log::warn!("Publish guard overridden with --force");
            return None;
        }
        Some(previous)
    }
}

/// Print the human-readable run summary.
pub fn print_summary(summary: &RunSummary) {
    report::summary(
        "Refresh",
        &[
            ("Fetched", summary.total_fetched.to_string()),
            ("Published", summary.total_published.to_string()),
            (
                "Duplicates removed",
                summary.dedupe.duplicates_removed.to_string(),
            ),
            ("Rejected", summary.rejected.len().to_string()),
            (
                "Duration",
                format!(
                    "{:.1}s",
                    (summary.finished_at - summary.started_at).num_milliseconds() as f64 / 1000.0
                ),
            ),
        ],
    );

    for reason in [
        RejectionReason::StructuralValidationError,
        RejectionReason::LiveCheckFailure,
        RejectionReason::ContentVerificationFailure,
    ] {
        let count = summary.rejected_by_reason(reason);
        if count > 0 {
            report::sub_item(&format!("{}: {}", reason.as_str(), count));
        }
    }

    report::separator();
    for (id, p) in &summary.providers {
        if p.suppressed {
            report::info(&format!("{id} [{}] suppressed", p.health));
            continue;
        }
        report::info(&format!(
            "{id} [{}] fetched {} → valid {} → live {} → content {} → deduped out {} → published {}",
            p.health,
            p.fetched,
            p.structurally_valid,
            p.live_passed,
            p.content_passed,
            p.deduped_out,
            p.published
        ));
        if let Some(error) = &p.error {
            report::sub_item(&format!("error: {error}"));
        }
    }
    report::separator();

    if summary.dry_run {
        report::info("Dry run: no files written");
    } else if summary.publish_skipped {
        report::info("Publish guard kept the previous events.json (use --force to override)");
        if summary.withdrawn > 0 {
            report::sub_item(&format!(
                "{} dead events withdrawn from it",
                summary.withdrawn
            ));
        }
    }
}
