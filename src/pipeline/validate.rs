// src/pipeline/validate.rs

//! `validate` and `health` commands.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::health::ProviderHealthRecord;
use crate::models::Config;
use crate::providers::EnvToggles;
use crate::storage::HealthStore;
use crate::utils::report;

/// Resolved run status of one configured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub id: String,
    pub name: String,
    pub priority: u32,
    pub enabled: bool,
    pub reason: Option<String>,
}

/// Provider list with config flags and env toggles applied.
pub fn provider_statuses(config: &Config, env: &EnvToggles) -> Vec<ProviderStatus> {
    let mut statuses: Vec<ProviderStatus> = config
        .providers
        .iter()
        .map(|p| {
            let reason = if !p.enabled {
                Some("disabled in config".to_string())
            } else if env.is_disabled(&p.id) {
                Some(format!("{}=true", p.disable_var()))
            } else {
                None
            };
            ProviderStatus {
                id: p.id.clone(),
                name: p.name.clone(),
                priority: p.priority,
                enabled: reason.is_none(),
                reason,
            }
        })
        .collect();
    statuses.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
    statuses
}

/// Validate configuration and print the provider list.
pub fn run_validate(config: &Config, env: &EnvToggles) -> Result<()> {
    report::header("Validate Configuration");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    report::info("Config OK");
    report::sub_item(&format!("User agent: {}", config.fetch.user_agent));
    report::sub_item(&format!("Timeout: {}s", config.fetch.timeout_secs));
    report::sub_item(&format!("Max concurrent: {}", config.fetch.max_concurrent));
    report::sub_item(&format!(
        "URL check TTL: {}h",
        config.verification.url_check_ttl_hours
    ));

    report::separator();
    for status in provider_statuses(config, env) {
        let state = match &status.reason {
            None => "enabled".to_string(),
            Some(reason) => format!("skipped ({reason})"),
        };
        report::info(&format!(
            "#{} {} ({}): {}",
            status.priority, status.id, status.name, state
        ));
    }
    Ok(())
}

/// Print persisted provider health records.
pub async fn run_health(store: &dyn HealthStore) -> Result<BTreeMap<String, ProviderHealthRecord>> {
    report::header("Provider Health");

    let records = store.load_health().await?;
    if records.is_empty() {
        report::info("No health records yet; run a refresh first");
        return Ok(records);
    }

    for record in records.values() {
        report::info(&format!(
            "{} [{}] consecutive failures: {}",
            record.provider_id, record.state, record.consecutive_failures
        ));
        report::sub_item(&format!(
            "runs {} / ok {} / failed {} / last items {}",
            record.total_runs, record.total_successes, record.total_failures, record.last_item_count
        ));
        if let Some(at) = record.last_success_at {
            report::sub_item(&format!("last success: {}", at.to_rfc3339()));
        }
        if let Some(error) = &record.last_error {
            report::sub_item(&format!("last error: {error}"));
        }
    }
    Ok(records)
}
