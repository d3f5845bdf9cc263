//! Configuration management for Autocast
//!
//! Handles config file loading/saving, device lists and API credentials.
//! Config is stored at ~/.config/autocast/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::Device;
use crate::providers::{primebox, primenet};

/// Media Assistant's channel ID in the Roku channel store
pub const MEDIA_ASSISTANT_CHANNEL_ID: &str = "782875";

/// URL prefixes that mark placeholder/sample streams
pub const PLACEHOLDER_PREFIXES: &[&str] = &["https://example-", "http://example-"];

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB v3 API key
    pub tmdb_api_key: Option<String>,
    /// TMDB v4 read access token
    pub tmdb_read_access_token: Option<String>,
    /// Roku devices that can be cast to
    pub devices: Vec<Device>,
    pub providers: ProvidersConfig,
    pub search: SearchConfig,
    pub cast: CastConfig,
}

/// Which providers are registered, and where they point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Primebox endpoints, one provider each (empty disables)
    pub primebox_urls: Vec<String>,
    /// Primenet endpoint (absent disables)
    pub primenet_url: Option<String>,
    /// Register the placeholder demo provider
    pub demo: bool,
    /// Per-request timeout for provider HTTP calls
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primebox_urls: vec![primebox::MAIN_URL.to_string(), primebox::BACKEND_URL.to_string()],
            primenet_url: Some(primenet::DEFAULT_URL.to_string()),
            demo: false,
            request_timeout_secs: 15,
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers queried at the same time
    pub concurrency: usize,
    /// Upper bound on a single provider call, however it behaves
    pub provider_timeout_secs: u64,
    /// Candidates whose URL starts with one of these are never cast
    pub placeholder_prefixes: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            provider_timeout_secs: 20,
            placeholder_prefixes: PLACEHOLDER_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SearchConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Device readiness and launch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CastConfig {
    /// Channel that plays the stream on the device
    pub channel_id: String,
    pub status_timeout_secs: u64,
    pub power_on_timeout_secs: u64,
    pub launch_timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Status polls after a wake command before giving up
    pub max_boot_polls: u32,
    /// Log boot progress every N polls
    pub progress_every: u32,
    /// Send a wake command to unresponsive devices
    pub wake_when_unresponsive: bool,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            channel_id: MEDIA_ASSISTANT_CHANNEL_ID.to_string(),
            status_timeout_secs: 3,
            power_on_timeout_secs: 5,
            launch_timeout_secs: 10,
            poll_interval_secs: 1,
            max_boot_polls: 30,
            progress_every: 5,
            wake_when_unresponsive: true,
        }
    }
}

impl CastConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_secs(self.launch_timeout_secs)
    }
}

/// How to authenticate against TMDB
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TmdbAuth {
    /// v3 key, sent as `api_key` query parameter
    ApiKey(String),
    /// v4 read access token, sent as a bearer token
    Bearer(String),
}

impl Config {
    /// Get config file path (~/.config/autocast/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("autocast").join("config.toml"))
    }

    /// Starter config written on first run
    pub fn starter() -> Self {
        Self {
            devices: vec![
                Device::new("Living Room TV", "192.168.1.100"),
                Device::new("Bedroom TV", "192.168.1.101"),
            ],
            ..Default::default()
        }
    }

    /// Load config from `path` (or the default location), then apply
    /// environment overrides
    ///
    /// A missing file is created from [`Config::starter`]. A file that exists
    /// but doesn't parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path.map(Path::to_path_buf).or_else(Self::path) {
            Some(path) => Self::load_from(&path)?,
            None => {
                warn!("Could not determine config path, using defaults");
                Self::default()
            }
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Load a specific file, writing the starter config if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::starter();
            config.save_to(path)?;
            info!(path = %path.display(), "Created default configuration file");
            return Ok(config);
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    /// Save config to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Override credentials from the environment:
    /// `TMDB_API_KEY` and `TMDB_READ_ACCESS_TOKEN`
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("TMDB_API_KEY").filter(|k| !k.is_empty()) {
            self.tmdb_api_key = Some(key);
        }
        if let Some(token) = lookup("TMDB_READ_ACCESS_TOKEN").filter(|t| !t.is_empty()) {
            self.tmdb_read_access_token = Some(token);
        }
        self
    }

    /// TMDB credentials, preferring the API key
    pub fn tmdb_auth(&self) -> Option<TmdbAuth> {
        self.tmdb_api_key
            .clone()
            .map(TmdbAuth::ApiKey)
            .or_else(|| self.tmdb_read_access_token.clone().map(TmdbAuth::Bearer))
    }

    /// Find a configured device by name or address
    pub fn find_device(&self, identifier: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.matches(identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.tmdb_api_key.is_none());
        assert!(config.devices.is_empty());
        assert_eq!(config.search.concurrency, 2);
        assert_eq!(config.cast.channel_id, "782875");
        assert_eq!(config.cast.max_boot_polls, 30);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            tmdb_api_key = "abc"

            [[devices]]
            name = "Den"
            address = "10.0.0.9"

            [cast]
            max_boot_polls = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].port, 8060);
        assert_eq!(config.cast.max_boot_polls, 10);
        assert_eq!(config.cast.status_timeout_secs, 3);
        assert_eq!(config.providers.primebox_urls.len(), 2);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config {
            tmdb_api_key: Some("from-file".to_string()),
            ..Default::default()
        }
        .with_env_overrides(|key| match key {
            "TMDB_API_KEY" => Some("from-env".to_string()),
            _ => None,
        });

        assert_eq!(config.tmdb_api_key.as_deref(), Some("from-env"));
        assert!(config.tmdb_read_access_token.is_none());
    }

    #[test]
    fn test_tmdb_auth_prefers_key() {
        let mut config = Config {
            tmdb_read_access_token: Some("token".to_string()),
            ..Default::default()
        };
        assert_eq!(config.tmdb_auth(), Some(TmdbAuth::Bearer("token".to_string())));

        config.tmdb_api_key = Some("key".to_string());
        assert_eq!(config.tmdb_auth(), Some(TmdbAuth::ApiKey("key".to_string())));
    }

    #[test]
    fn test_find_device() {
        let config = Config::starter();
        assert_eq!(
            config.find_device("bedroom tv").map(|d| d.address.as_str()),
            Some("192.168.1.101")
        );
        assert!(config.find_device("192.168.1.100").is_some());
        assert!(config.find_device("Kitchen").is_none());
    }
}
