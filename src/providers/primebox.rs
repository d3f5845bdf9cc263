//! Primebox provider
//!
//! Title-based lookup. The endpoint answers with a map of quality labels to
//! stream URLs:
//!
//! ```json
//! { "status": "ok", "streams": { "1080P": "https://...", "720P": "https://..." } }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::models::{CandidateStream, MediaMetadata, MediaRequest, OutcomeCode, ProviderOutcome};
use crate::providers::{
    excerpt, failure_for_malformed, failure_for_status, failure_for_transport, host_of,
    media_type_from_url, order_by_preference, ProviderSearch, StreamProvider,
};

/// Main public endpoint
pub const MAIN_URL: &str = "https://xprime.tv/primebox";

/// Backend mirror of the same API
pub const BACKEND_URL: &str = "https://backend.xprime.tv/primebox";

/// Quality labels in the order candidates are emitted
pub const QUALITY_PREFERENCE: &[&str] = &["1080P", "720P", "480P", "360P"];

const RATE_LIMIT_HINT: &str =
    "Note: this endpoint rate limits aggressively. Consider waiting between requests.";

/// Primebox API response
#[derive(Debug, Deserialize)]
struct PrimeboxResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    streams: Option<Map<String, Value>>,
    #[serde(default)]
    message: Option<String>,
}

/// Title-based Primebox provider
pub struct PrimeboxProvider {
    name: String,
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl PrimeboxProvider {
    /// Provider for the given endpoint, named after its host
    pub fn new(base_url: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            name: format!("Primebox ({})", host_of(&base_url)),
            base_url,
            client,
            timeout,
        }
    }

    /// Create a provider with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::new(base_url, reqwest::Client::new(), Duration::from_secs(15))
    }

    fn no_results(&self, title: &str, data: &PrimeboxResponse, body: &str) -> ProviderOutcome {
        let api_status = data.status.as_deref().unwrap_or("unknown");
        let mut message = format!("No streams found for '{}'", title);
        if let Some(api_message) = data.message.as_deref().filter(|m| !m.is_empty()) {
            message.push_str(&format!(". API message: {}", api_message));
        }

        ProviderOutcome::failed(&self.name, OutcomeCode::NoResults, message)
            .with_details(format!("API status '{}': {}", api_status, excerpt(body)))
    }
}

#[async_trait]
impl StreamProvider for PrimeboxProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_streams(
        &self,
        metadata: &MediaMetadata,
        request: &Arc<MediaRequest>,
    ) -> anyhow::Result<ProviderSearch> {
        let title = metadata.confirmed_title.as_str();

        let mut params: Vec<(&str, String)> = vec![("name", title.to_string())];
        if let Some(year) = metadata.year {
            params.push(("fallback_year", year.to_string()));
        }

        info!(provider = %self.name, title, year = ?metadata.year, "Searching for streams");

        let response = match self
            .client
            .get(&self.base_url)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = %self.name, error = %e, "Request failed");
                return Ok(ProviderSearch::failed(failure_for_transport(&self.name, &e)));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ProviderSearch::failed(failure_for_transport(&self.name, &e))),
        };

        if !status.is_success() {
            warn!(provider = %self.name, status = status.as_u16(), "Upstream returned error status");
            return Ok(ProviderSearch::failed(failure_for_status(
                &self.name,
                status,
                &body,
                RATE_LIMIT_HINT,
            )));
        }

        let data: PrimeboxResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(e) => {
                warn!(provider = %self.name, error = %e, "Malformed response");
                return Ok(ProviderSearch::failed(failure_for_malformed(&self.name, &e, &body)));
            }
        };

        let streams = match (&data.status, &data.streams) {
            (Some(s), Some(streams)) if s == "ok" && !streams.is_empty() => streams,
            _ => {
                info!(provider = %self.name, title, "No streams found");
                return Ok(ProviderSearch::failed(self.no_results(title, &data, &body)));
            }
        };

        let candidates: Vec<CandidateStream> = order_by_preference(streams, QUALITY_PREFERENCE)
            .into_iter()
            .map(|(quality, url)| {
                debug!(provider = %self.name, quality, url = excerpt(url), "Added stream");
                CandidateStream::new(
                    url,
                    quality,
                    media_type_from_url(url),
                    Arc::clone(request),
                    &self.name,
                )
            })
            .collect();

        if candidates.is_empty() {
            return Ok(ProviderSearch::failed(self.no_results(title, &data, &body)));
        }

        let labels: Vec<&str> = candidates.iter().map(|c| c.quality()).collect();
        let message = format!(
            "Found {} stream(s) in qualities: {}",
            candidates.len(),
            labels.join(", ")
        );
        info!(provider = %self.name, count = candidates.len(), "Search succeeded");

        Ok(ProviderSearch::found(&self.name, candidates, message))
    }
}
