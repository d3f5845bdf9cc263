//! Aggregation engine
//!
//! Fans a request out to every registered provider and merges what comes
//! back. A provider can fail, hang, return an error or panic; in every case it
//! still contributes exactly one outcome and never stops the others.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{stream, FutureExt, StreamExt};
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::models::{AggregateResult, MediaMetadata, MediaRequest, OutcomeCode, ProviderOutcome};
use crate::providers::{ProviderRegistry, ProviderSearch, StreamProvider};

/// Runs one search across all providers
pub struct AggregationEngine {
    registry: ProviderRegistry,
    concurrency: usize,
    provider_timeout: Duration,
}

impl AggregationEngine {
    /// `concurrency` bounds how many providers are in flight at once (min 1)
    pub fn new(registry: ProviderRegistry, concurrency: usize, provider_timeout: Duration) -> Self {
        Self {
            registry,
            concurrency: concurrency.max(1),
            provider_timeout,
        }
    }

    pub fn from_config(registry: ProviderRegistry, config: &SearchConfig) -> Self {
        Self::new(registry, config.concurrency, config.provider_timeout())
    }

    /// Query every provider and merge the results
    ///
    /// Candidates keep registration order, then each provider's own order.
    /// Providers may run concurrently, but results are consumed in order.
    pub async fn run(&self, metadata: &MediaMetadata, request: &Arc<MediaRequest>) -> AggregateResult {
        info!(
            title = %metadata.confirmed_title,
            providers = self.registry.len(),
            concurrency = self.concurrency,
            "Searching all providers"
        );

        let searches: Vec<ProviderSearch> = stream::iter(
            self.registry
                .iter()
                .map(|provider| self.query(provider.as_ref(), metadata, request)),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut result = AggregateResult::default();
        for search in searches {
            result.candidates.extend(search.candidates);
            result.outcomes.push(search.outcome);
        }

        info!(
            queried = result.providers_queried(),
            succeeded = result.providers_succeeded(),
            streams = result.total_streams(),
            "Search finished"
        );

        result
    }

    /// One provider call with timeout and fault isolation
    async fn query(
        &self,
        provider: &dyn StreamProvider,
        metadata: &MediaMetadata,
        request: &Arc<MediaRequest>,
    ) -> ProviderSearch {
        let name = provider.name().to_string();
        let call = AssertUnwindSafe(provider.search_streams(metadata, request)).catch_unwind();

        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(Ok(Ok(search))) => normalize(&name, search),
            Ok(Ok(Err(e))) => {
                warn!(provider = %name, error = %e, "Provider failed unexpectedly");
                ProviderSearch::failed(
                    ProviderOutcome::failed(
                        &name,
                        OutcomeCode::UnknownError,
                        format!("Unexpected error: {}", e),
                    )
                    .with_details(format!("{:#}", e)),
                )
            }
            Ok(Err(panic)) => {
                let reason = panic_message(panic.as_ref());
                warn!(provider = %name, reason, "Provider panicked");
                ProviderSearch::failed(
                    ProviderOutcome::failed(
                        &name,
                        OutcomeCode::UnknownError,
                        format!("Provider panicked: {}", reason),
                    )
                    .with_details(reason),
                )
            }
            Err(_) => {
                warn!(provider = %name, timeout = ?self.provider_timeout, "Provider timed out");
                ProviderSearch::failed(ProviderOutcome::failed(
                    &name,
                    OutcomeCode::RequestError,
                    format!("Timed out after {}s", self.provider_timeout.as_secs_f32()),
                ))
            }
        }
    }
}

/// Keep outcome and candidates consistent with each other
fn normalize(name: &str, mut search: ProviderSearch) -> ProviderSearch {
    if search.outcome.success {
        search.outcome.streams_found = search.candidates.len();
    } else if !search.candidates.is_empty() {
        warn!(
            provider = name,
            dropped = search.candidates.len(),
            "Failed outcome carried candidates, dropping them"
        );
        search.candidates.clear();
        search.outcome.streams_found = 0;
    }
    search
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
