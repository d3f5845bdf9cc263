//! Stream providers
//!
//! Each provider asks one upstream service for playable streams and reports
//! exactly one [`ProviderOutcome`] describing how that went.
//!
//! - Primebox: title-based lookup returning a map of quality → URL
//! - Primenet: catalog-ID lookup returning a single URL
//! - Demo: placeholder stream for wiring checks (disabled by default)

pub mod demo;
pub mod primebox;
pub mod primenet;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};

use crate::models::{CandidateStream, MediaMetadata, MediaRequest, OutcomeCode, ProviderOutcome};

pub use demo::DemoProvider;
pub use primebox::PrimeboxProvider;
pub use primenet::PrimenetProvider;
pub use registry::ProviderRegistry;

/// Container extensions recognised when inferring a media type
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m3u8"];

/// Media type used when a URL carries no usable suffix
pub const DEFAULT_MEDIA_TYPE: &str = "mp4";

/// Longest response excerpt kept in error details
const BODY_EXCERPT_LEN: usize = 200;

/// Candidates plus the single outcome record of one provider attempt
#[derive(Debug, Clone)]
pub struct ProviderSearch {
    pub candidates: Vec<CandidateStream>,
    pub outcome: ProviderOutcome,
}

impl ProviderSearch {
    /// Successful search; the outcome's count is taken from `candidates`
    pub fn found(
        api_name: &str,
        candidates: Vec<CandidateStream>,
        message: impl Into<String>,
    ) -> Self {
        let outcome = ProviderOutcome::succeeded(api_name, candidates.len(), message);
        Self {
            candidates,
            outcome,
        }
    }

    /// Failed search with no candidates
    pub fn failed(outcome: ProviderOutcome) -> Self {
        Self {
            candidates: Vec::new(),
            outcome,
        }
    }
}

/// A source of candidate streams
///
/// Expected failures (no results, rate limiting, bad status, transport errors,
/// malformed bodies) come back as `Ok` with a failed outcome. `Err` is for
/// faults the provider did not anticipate; the aggregation engine turns those
/// into an `UNKNOWN_ERROR` outcome.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Stable display name, used as the `source` of every candidate and as
    /// the outcome's `api_name`
    fn name(&self) -> &str;

    /// Search for streams for already-resolved metadata
    async fn search_streams(
        &self,
        metadata: &MediaMetadata,
        request: &Arc<MediaRequest>,
    ) -> anyhow::Result<ProviderSearch>;
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Infer a container type from a stream URL
///
/// The query string is dropped before looking at the suffix, so
/// `movie.mkv?token=abc` is `mkv`.
pub fn media_type_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();

    // Drop scheme and authority; a URL with no path has nothing to infer from
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or_default(),
        None => without_query,
    }
    .to_lowercase();

    if let Some(ext) = VIDEO_EXTENSIONS
        .iter()
        .find(|ext| path.ends_with(&format!(".{}", ext)))
    {
        return ext.to_string();
    }

    let last_segment = path.rsplit('/').next().unwrap_or_default();
    if let Some((_, suffix)) = last_segment.rsplit_once('.') {
        if !suffix.is_empty()
            && suffix.len() <= 4
            && suffix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return suffix.to_string();
        }
    }

    DEFAULT_MEDIA_TYPE.to_string()
}

/// Order a quality → URL map: preferred labels first, then the rest in
/// upstream order. Entries whose value isn't a non-empty string are skipped.
pub fn order_by_preference<'a>(
    streams: &'a Map<String, Value>,
    preference: &[&str],
) -> Vec<(&'a str, &'a str)> {
    let as_url = |value: &'a Value| value.as_str().filter(|s| !s.is_empty());

    let preferred = preference.iter().filter_map(|label| {
        streams
            .get_key_value(*label)
            .and_then(|(k, v)| as_url(v).map(|url| (k.as_str(), url)))
    });

    let rest = streams
        .iter()
        .filter(|(label, _)| !preference.contains(&label.as_str()))
        .filter_map(|(label, value)| as_url(value).map(|url| (label.as_str(), url)));

    preferred.chain(rest).collect()
}

/// Failed outcome for an upstream error status
///
/// `rate_limit_hint` is appended to the details of a 429 so the operator
/// knows to back off.
pub fn failure_for_status(
    api_name: &str,
    status: StatusCode,
    body: &str,
    rate_limit_hint: &str,
) -> ProviderOutcome {
    let code = OutcomeCode::Http(status.as_u16());
    let mut details = if body.trim().is_empty() {
        "No response body".to_string()
    } else {
        format!("Response: {}", excerpt(body))
    };

    let message = if code.is_rate_limited() {
        details.push_str(". ");
        details.push_str(rate_limit_hint);
        "Rate limited (HTTP 429). Try again in a few seconds".to_string()
    } else {
        format!("HTTP {} error", status.as_u16())
    };

    ProviderOutcome::failed(api_name, code, message).with_details(details)
}

/// Failed outcome for a transport-level error
pub fn failure_for_transport(api_name: &str, err: &reqwest::Error) -> ProviderOutcome {
    let message = if err.is_timeout() {
        "Request timed out".to_string()
    } else {
        format!("Request error: {}", err)
    };
    ProviderOutcome::failed(api_name, OutcomeCode::RequestError, message)
        .with_details(err.to_string())
}

/// Failed outcome for a body that didn't parse as expected
pub fn failure_for_malformed(api_name: &str, err: &serde_json::Error, body: &str) -> ProviderOutcome {
    ProviderOutcome::failed(
        api_name,
        OutcomeCode::UnknownError,
        format!("Malformed response: {}", err),
    )
    .with_details(format!("Response: {}", excerpt(body)))
}

/// Trim a response body for logs and outcome details
pub fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Host part of a base URL, for display names
pub fn host_of(base_url: &str) -> &str {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}
