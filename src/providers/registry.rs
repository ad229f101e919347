// src/providers/registry.rs

//! Configuration-driven provider registry.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::{AdapterKind, Config, disable_var_for};
use crate::providers::{Classifier, HtmlListAdapter, JsonLdAdapter, ProviderAdapter};
use crate::utils::http::PageFetcher;

/// `DISABLE_<ID>` switches read once from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvToggles {
    disabled: HashSet<String>,
}

impl EnvToggles {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Keep every `DISABLE_*` variable set to a truthy value.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let disabled = vars
            .into_iter()
            .filter(|(key, value)| {
                key.as_ref().starts_with("DISABLE_")
                    && matches!(
                        value.as_ref().trim().to_lowercase().as_str(),
                        "true" | "1" | "yes" | "on"
                    )
            })
            .map(|(key, _)| key.as_ref().to_string())
            .collect();
        Self { disabled }
    }

    pub fn is_disabled(&self, provider_id: &str) -> bool {
        self.disabled.contains(&disable_var_for(provider_id))
    }
}

/// A registered provider with its resolved run status.
#[derive(Clone)]
pub struct ResolvedProvider {
    pub adapter: Arc<dyn ProviderAdapter>,
    /// `None` when the provider runs
    pub skip_reason: Option<String>,
}

impl ResolvedProvider {
    pub fn id(&self) -> &str {
        &self.adapter.provider().id
    }

    pub fn is_enabled(&self) -> bool {
        self.skip_reason.is_none()
    }
}

/// All known adapters, ordered by priority rank.
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one adapter per configured provider.
    pub fn from_config(
        config: &Config,
        pages: Arc<dyn PageFetcher>,
        classifier: Arc<Classifier>,
    ) -> Self {
        let mut registry = Self::new();
        for provider in &config.providers {
            let adapter: Arc<dyn ProviderAdapter> = match provider.kind {
                AdapterKind::JsonLd => Arc::new(JsonLdAdapter::new(
                    provider.clone(),
                    Arc::clone(&pages),
                    Arc::clone(&classifier),
                )),
                AdapterKind::HtmlList => Arc::new(HtmlListAdapter::new(
                    provider.clone(),
                    Arc::clone(&pages),
                    Arc::clone(&classifier),
                )),
            };
            registry.register(adapter);
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.push(adapter);
        self.adapters.sort_by(|a, b| {
            let (a, b) = (a.provider(), b.provider());
            a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id))
        });
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.adapters.iter().any(|a| a.provider().id == provider_id)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Apply the config flag, env toggles and an optional `--provider`
    /// filter, in that order.
    pub fn resolve(&self, env: &EnvToggles, only: Option<&str>) -> Vec<ResolvedProvider> {
        self.adapters
            .iter()
            .map(|adapter| {
                let provider = adapter.provider();
                let skip_reason = if only.is_some_and(|id| id != provider.id) {
                    Some("not selected".to_string())
                } else if !provider.enabled {
                    Some("disabled in config".to_string())
                } else if env.is_disabled(&provider.id) {
                    Some(format!("{}=true", provider.disable_var()))
                } else {
                    None
                };
                ResolvedProvider {
                    adapter: Arc::clone(adapter),
                    skip_reason,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::Result;
    use crate::models::{EventItem, EventProvider};
    use crate::providers::FetchParams;

    struct NullPages;

    #[async_trait]
    impl PageFetcher for NullPages {
        async fn fetch_html(
            &self,
            _url: &str,
            _delay: Option<std::time::Duration>,
        ) -> Result<String> {
            Ok(String::new())
        }
    }

    struct Stub(EventProvider);

    #[async_trait]
    impl ProviderAdapter for Stub {
        fn provider(&self) -> &EventProvider {
            &self.0
        }

        async fn fetch(&self, _params: &FetchParams) -> Result<Vec<EventItem>> {
            Ok(Vec::new())
        }
    }

    fn registry() -> ProviderRegistry {
        let config = Config::default();
        ProviderRegistry::from_config(
            &config,
            Arc::new(NullPages),
            Arc::new(Classifier::new(&config.classification)),
        )
    }

    #[test]
    fn test_env_toggles() {
        let env = EnvToggles::from_vars([
            ("DISABLE_NAV", "true"),
            ("DISABLE_UIO", "false"),
            ("DISABLE_EVENTBRITE_NO", "1"),
            ("PATH", "/usr/bin"),
        ]);
        assert!(env.is_disabled("nav"));
        assert!(!env.is_disabled("uio"));
        assert!(env.is_disabled("eventbrite-no"));
    }

    #[test]
    fn test_from_config_orders_by_priority() {
        let registry = registry();
        let ids: Vec<String> = registry
            .resolve(&EnvToggles::default(), None)
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["nav", "uio", "eventbrite"]);
    }

    #[test]
    fn test_resolve_applies_toggles_and_filter() {
        let mut registry = registry();
        let mut disabled = Config::default().providers[0].clone();
        disabled.id = "legacy".into();
        disabled.enabled = false;
        registry.register(Arc::new(Stub(disabled)));

        let env = EnvToggles::from_vars([("DISABLE_UIO", "true")]);
        let resolved = registry.resolve(&env, None);
        let enabled: Vec<&str> = resolved
            .iter()
            .filter(|p| p.is_enabled())
            .map(|p| p.id())
            .collect();
        assert_eq!(enabled, vec!["nav", "eventbrite"]);

        let only = registry.resolve(&EnvToggles::default(), Some("eventbrite"));
        assert_eq!(only.iter().filter(|p| p.is_enabled()).count(), 1);
        assert!(registry.contains("legacy"));
        assert!(!registry.contains("missing"));
    }
}
