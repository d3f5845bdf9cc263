//! Primenet provider
//!
//! Looks streams up by numeric catalog ID instead of title. The endpoint
//! returns a single URL without a quality label, so candidates are tagged `HD`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{CandidateStream, MediaMetadata, MediaRequest, OutcomeCode, ProviderOutcome};
use crate::providers::{
    excerpt, failure_for_malformed, failure_for_status, failure_for_transport,
    media_type_from_url, ProviderSearch, StreamProvider,
};

/// Default endpoint
pub const DEFAULT_URL: &str = "https://backend.xprime.tv/primenet";

/// Quality label for the unlabelled stream
pub const DEFAULT_QUALITY: &str = "HD";

const PROVIDER_NAME: &str = "Primenet";

const RATE_LIMIT_HINT: &str =
    "Note: this endpoint rate limits aggressively. Consider waiting between requests.";

#[derive(Debug, Deserialize)]
struct PrimenetResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Catalog-ID based provider
pub struct PrimenetProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl PrimenetProvider {
    pub fn new(base_url: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            timeout,
        }
    }

    /// Create a provider with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::new(base_url, reqwest::Client::new(), Duration::from_secs(15))
    }
}

#[async_trait]
impl StreamProvider for PrimenetProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search_streams(
        &self,
        metadata: &MediaMetadata,
        request: &Arc<MediaRequest>,
    ) -> anyhow::Result<ProviderSearch> {
        let Some(catalog_id) = metadata.catalog_id else {
            info!(provider = PROVIDER_NAME, "No catalog ID, skipping");
            return Ok(ProviderSearch::failed(ProviderOutcome::failed(
                PROVIDER_NAME,
                OutcomeCode::MissingPrecondition,
                "No catalog ID available for lookup",
            )));
        };

        info!(
            provider = PROVIDER_NAME,
            title = %metadata.confirmed_title,
            catalog_id,
            "Searching for streams"
        );

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("id", catalog_id)])
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Request failed");
                return Ok(ProviderSearch::failed(failure_for_transport(PROVIDER_NAME, &e)));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(ProviderSearch::failed(failure_for_transport(PROVIDER_NAME, &e))),
        };

        if !status.is_success() {
            warn!(provider = PROVIDER_NAME, status = status.as_u16(), "Upstream returned error status");
            let mut outcome = failure_for_status(PROVIDER_NAME, status, &body, RATE_LIMIT_HINT);
            if status == StatusCode::NOT_FOUND {
                outcome.message = format!("Not found for catalog ID {} (HTTP 404)", catalog_id);
            }
            return Ok(ProviderSearch::failed(outcome));
        }

        let data: PrimenetResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(e) => return Ok(ProviderSearch::failed(failure_for_malformed(PROVIDER_NAME, &e, &body))),
        };

        let Some(url) = data.url.filter(|u| !u.trim().is_empty()) else {
            info!(provider = PROVIDER_NAME, catalog_id, "No stream URL in response");
            return Ok(ProviderSearch::failed(
                ProviderOutcome::failed(
                    PROVIDER_NAME,
                    OutcomeCode::NoResults,
                    format!("No stream URL found for catalog ID {}", catalog_id),
                )
                .with_details(format!("API returned: {}", excerpt(&body))),
            ));
        };

        let candidate = CandidateStream::new(
            url.as_str(),
            DEFAULT_QUALITY,
            media_type_from_url(&url),
            Arc::clone(request),
            PROVIDER_NAME,
        );

        Ok(ProviderSearch::found(
            PROVIDER_NAME,
            vec![candidate],
            format!("Found stream for catalog ID {}", catalog_id),
        ))
    }
}
