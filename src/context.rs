//! Application context
//!
//! Everything a command needs, built once at startup and then only read:
//! configuration, the shared HTTP client, the provider registry and the
//! metadata resolver.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::api::{MetadataResolver, TmdbClient};
use crate::config::Config;
use crate::models::Device;
use crate::providers::ProviderRegistry;

/// Connect timeout for every outbound request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AppContext {
    pub config: Config,
    pub client: reqwest::Client,
    pub registry: ProviderRegistry,
    /// Absent when no TMDB credentials are configured
    pub resolver: Option<Arc<dyn MetadataResolver>>,
}

impl AppContext {
    pub fn new(
        config: Config,
        client: reqwest::Client,
        registry: ProviderRegistry,
        resolver: Option<Arc<dyn MetadataResolver>>,
    ) -> Self {
        Self {
            config,
            client,
            registry,
            resolver,
        }
    }

    /// Wire up the standard providers and TMDB resolver from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("autocast/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let registry = ProviderRegistry::from_config(&config.providers, &client);

        let resolver = match config.tmdb_auth() {
            Some(auth) => {
                let tmdb: Arc<dyn MetadataResolver> = Arc::new(TmdbClient::new(auth, client.clone()));
                Some(tmdb)
            }
            None => {
                warn!("No TMDB credentials configured, metadata lookups are unavailable");
                None
            }
        };

        debug!(
            devices = config.devices.len(),
            providers = registry.len(),
            "Application context ready"
        );

        Ok(Self::new(config, client, registry, resolver))
    }

    /// Device by name or address; the first configured device when no
    /// identifier is given
    pub fn device(&self, identifier: Option<&str>) -> Option<&Device> {
        match identifier {
            Some(identifier) => self.config.find_device(identifier),
            None => self.config.devices.first(),
        }
    }
}
