//! Provider registry
//!
//! Holds the configured providers in a fixed order. Aggregation walks them in
//! that order, which is what makes the merged candidate list reproducible.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::ProvidersConfig;
use crate::providers::{DemoProvider, PrimeboxProvider, PrimenetProvider, StreamProvider};

/// Ordered, read-only set of providers
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn StreamProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard provider set from configuration
    ///
    /// Registration order: Primenet, then each Primebox endpoint, then Demo.
    pub fn from_config(config: &ProvidersConfig, client: &reqwest::Client) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut registry = Self::new();

        if let Some(url) = &config.primenet_url {
            registry.register(PrimenetProvider::new(url.as_str(), client.clone(), timeout));
        }

        for url in &config.primebox_urls {
            registry.register(PrimeboxProvider::new(url.as_str(), client.clone(), timeout));
        }

        if config.demo {
            registry.register(DemoProvider::new());
        }

        info!(providers = ?registry.names(), "Provider registry ready");
        registry
    }

    /// Append a provider; it will be queried after all earlier ones
    pub fn register(&mut self, provider: impl StreamProvider + 'static) {
        self.providers.push(Arc::new(provider));
    }

    /// Builder-style registration
    pub fn with(mut self, provider: impl StreamProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    /// Providers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn StreamProvider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Display names in registration order
    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_order() {
        let config = ProvidersConfig {
            primebox_urls: vec![
                "https://a.example/primebox".to_string(),
                "https://b.example/primebox".to_string(),
            ],
            primenet_url: Some("https://c.example/primenet".to_string()),
            demo: true,
            request_timeout_secs: 5,
        };

        let registry = ProviderRegistry::from_config(&config, &reqwest::Client::new());

        assert_eq!(
            registry.names(),
            vec![
                "Primenet",
                "Primebox (a.example)",
                "Primebox (b.example)",
                "Demo"
            ]
        );
    }

    #[test]
    fn test_from_config_disabled_providers() {
        let config = ProvidersConfig {
            primebox_urls: vec![],
            primenet_url: None,
            demo: false,
            request_timeout_secs: 5,
        };

        let registry = ProviderRegistry::from_config(&config, &reqwest::Client::new());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_default_config_registers_three() {
        let registry =
            ProviderRegistry::from_config(&ProvidersConfig::default(), &reqwest::Client::new());
        assert_eq!(registry.len(), 3);
    }
}
