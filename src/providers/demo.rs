//! Demo provider for wiring checks.
//!
//! Returns a placeholder stream without any network calls. Its URLs sit under
//! the `https://example-` prefix, which the stream selector filters out, so a
//! demo candidate can never be cast to a real device.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{CandidateStream, MediaMetadata, MediaRequest};
use crate::providers::{ProviderSearch, StreamProvider};

/// Base of every placeholder URL this provider hands out
pub const PLACEHOLDER_BASE: &str = "https://example-streams.invalid/stream";

const PROVIDER_NAME: &str = "Demo";

/// Provider that always "finds" one placeholder stream
#[derive(Debug, Default)]
pub struct DemoProvider;

impl DemoProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamProvider for DemoProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn search_streams(
        &self,
        metadata: &MediaMetadata,
        request: &Arc<MediaRequest>,
    ) -> anyhow::Result<ProviderSearch> {
        let url = format!(
            "{}/{}.mp4",
            PLACEHOLDER_BASE,
            urlencoding::encode(&metadata.confirmed_title)
        );
        let candidate = CandidateStream::new(url, "1080p", "mp4", Arc::clone(request), PROVIDER_NAME);

        Ok(ProviderSearch::found(
            PROVIDER_NAME,
            vec![candidate],
            format!("Placeholder stream for {}", metadata.confirmed_title),
        ))
    }
}
