//! Data structures and types for Autocast
//!
//! Contains all shared models used across the application organized by domain:
//! - **Request**: what the user asked for, and the metadata it resolved to
//! - **Streams**: candidate streams and per-provider outcomes
//! - **Devices**: configured Roku targets and cast results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Default ECP control port on Roku devices
pub const DEFAULT_CONTROL_PORT: u16 = 8060;

// =============================================================================
// Request Models
// =============================================================================

/// Validation errors for a media request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("At least one of title or external ID must be provided")]
    MissingIdentifier,
}

/// What the user asked to watch
///
/// Immutable once built. At least one of `title` / `external_id` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRequest {
    title: Option<String>,
    external_id: Option<String>,
    year: Option<u16>,
    device: Option<String>,
}

impl MediaRequest {
    /// Build a request, treating blank strings as absent
    pub fn new(
        title: Option<String>,
        external_id: Option<String>,
        year: Option<u16>,
        device: Option<String>,
    ) -> Result<Self, RequestError> {
        let title = non_blank(title);
        let external_id = non_blank(external_id);

        if title.is_none() && external_id.is_none() {
            return Err(RequestError::MissingIdentifier);
        }

        Ok(Self {
            title,
            external_id,
            year,
            device: non_blank(device),
        })
    }

    /// Shorthand for a title-only request
    pub fn from_title(title: impl Into<String>) -> Result<Self, RequestError> {
        Self::new(Some(title.into()), None, None, None)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// External catalog ID (an IMDb ID like `tt1375666`)
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn year(&self) -> Option<u16> {
        self.year
    }

    /// Target device name or address
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

impl fmt::Display for MediaRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.title, &self.external_id) {
            (Some(title), Some(id)) => write!(f, "{} [{}]", title, id)?,
            (Some(title), None) => write!(f, "{}", title)?,
            (None, Some(id)) => write!(f, "{}", id)?,
            (None, None) => write!(f, "(untitled)")?,
        }
        if let Some(year) = self.year {
            write!(f, " ({})", year)?;
        }
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Canonical record resolved from a request by the metadata service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub confirmed_title: String,
    /// Numeric catalog ID (TMDB movie ID)
    pub catalog_id: Option<u64>,
    /// External ID (IMDb)
    pub external_id: Option<String>,
    pub year: Option<u16>,
    pub plot: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub actors: Option<String>,
    /// Formatted runtime, e.g. "2h 28m"
    pub runtime: Option<String>,
    pub poster_url: Option<String>,
}

impl MediaMetadata {
    /// Minimal record with just a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            confirmed_title: title.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for MediaMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year.map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{}", self.confirmed_title, year_str)
    }
}

// =============================================================================
// Stream Models
// =============================================================================

/// One playable stream found by a provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateStream {
    url: String,
    quality: String,
    media_type: String,
    #[serde(skip)]
    request: Arc<MediaRequest>,
    source: String,
}

impl CandidateStream {
    pub fn new(
        url: impl Into<String>,
        quality: impl Into<String>,
        media_type: impl Into<String>,
        request: Arc<MediaRequest>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            quality: quality.into(),
            media_type: media_type.into(),
            request,
            source: source.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Quality label as the provider reported it ("1080P", "HD", ...)
    pub fn quality(&self) -> &str {
        &self.quality
    }

    /// Container hint ("mp4", "m3u8", ...)
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The request this stream was found for
    pub fn request(&self) -> &MediaRequest {
        &self.request
    }

    /// Display name of the provider that produced this stream
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for CandidateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}) from {}",
            self.quality, self.url, self.media_type, self.source
        )
    }
}

/// Machine status attached to a provider outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeCode {
    Ok,
    /// Required metadata (e.g. catalog ID) was absent
    MissingPrecondition,
    /// Upstream answered with an error status
    Http(u16),
    /// Network or transport failure, including timeouts
    RequestError,
    /// Well-formed response with nothing in it
    NoResults,
    UnknownError,
}

impl OutcomeCode {
    /// Whether this is the upstream rate-limit status
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, OutcomeCode::Http(429))
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeCode::Ok => write!(f, "OK"),
            OutcomeCode::MissingPrecondition => write!(f, "MISSING_PRECONDITION"),
            OutcomeCode::Http(code) => write!(f, "HTTP_{}", code),
            OutcomeCode::RequestError => write!(f, "REQUEST_ERROR"),
            OutcomeCode::NoResults => write!(f, "NO_RESULTS"),
            OutcomeCode::UnknownError => write!(f, "UNKNOWN_ERROR"),
        }
    }
}

impl Serialize for OutcomeCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Record of one provider's attempt during an aggregation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderOutcome {
    pub api_name: String,
    pub success: bool,
    pub streams_found: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OutcomeCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl ProviderOutcome {
    /// Successful attempt that produced `streams_found` candidates
    pub fn succeeded(
        api_name: impl Into<String>,
        streams_found: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            api_name: api_name.into(),
            success: true,
            streams_found,
            message: message.into(),
            status: Some(OutcomeCode::Ok),
            error_details: None,
        }
    }

    /// Failed attempt; always reports zero streams
    pub fn failed(
        api_name: impl Into<String>,
        status: OutcomeCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            api_name: api_name.into(),
            success: false,
            streams_found: 0,
            message: message.into(),
            status: Some(status),
            error_details: None,
        }
    }

    /// Attach error detail text
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

impl fmt::Display for ProviderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = if self.success { "✓" } else { "✗" };
        write!(f, "{} {}: {}", icon, self.api_name, self.message)?;
        if let (false, Some(status)) = (self.success, self.status) {
            write!(f, " [{}]", status)?;
        }
        Ok(())
    }
}

/// Merged result of one aggregation run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Registration order, then each provider's quality order
    pub candidates: Vec<CandidateStream>,
    /// Exactly one per registered provider, in registration order
    pub outcomes: Vec<ProviderOutcome>,
}

impl AggregateResult {
    pub fn providers_queried(&self) -> usize {
        self.outcomes.len()
    }

    pub fn providers_succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn total_streams(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// =============================================================================
// Device Models
// =============================================================================

/// A configured Roku device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Friendly name, e.g. "Living Room TV"
    pub name: String,
    /// IP address or hostname
    pub address: String,
    /// ECP control port
    #[serde(default = "default_control_port")]
    pub port: u16,
}

fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}

impl Device {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: DEFAULT_CONTROL_PORT,
        }
    }

    /// Base URL of the device's control surface
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// Match by exact name (case-insensitive) or address
    pub fn matches(&self, identifier: &str) -> bool {
        let identifier = identifier.trim();
        self.name.eq_ignore_ascii_case(identifier) || self.address == identifier
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Why a cast attempt failed on the device side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastFailure {
    Unresponsive,
    PowerOnFailed,
    BootTimeout,
    LaunchFailed,
    Cancelled,
}

impl fmt::Display for CastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastFailure::Unresponsive => write!(f, "UNRESPONSIVE"),
            CastFailure::PowerOnFailed => write!(f, "POWER_ON_FAILED"),
            CastFailure::BootTimeout => write!(f, "BOOT_TIMEOUT"),
            CastFailure::LaunchFailed => write!(f, "LAUNCH_FAILED"),
            CastFailure::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl Serialize for CastFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Terminal result of a readiness check plus launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastOutcome {
    pub success: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<CastFailure>,
}

impl CastOutcome {
    pub fn launched(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
            failure: None,
        }
    }

    pub fn failed(failure: CastFailure, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            failure: Some(failure),
        }
    }
}

impl fmt::Display for CastOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure {
            Some(failure) => write!(f, "{}: {}", failure, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
