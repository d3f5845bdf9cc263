//! Cast launcher
//!
//! Sends the single launch command that starts playback on a ready device.
//! One attempt, bounded by a timeout, no retry.

use std::time::Duration;

use tracing::{info, warn};

use crate::cast::ecp::{DeviceControl, LaunchParams};
use crate::config::CastConfig;
use crate::models::{CandidateStream, CastFailure, CastOutcome, MediaMetadata, MediaRequest};

/// Title shown on screen when nothing better is known
pub const FALLBACK_TITLE: &str = "Movie";

pub struct CastLauncher {
    channel_id: String,
    timeout: Duration,
}

impl CastLauncher {
    pub fn new(channel_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            channel_id: channel_id.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CastConfig) -> Self {
        Self::new(config.channel_id.as_str(), config.launch_timeout())
    }

    /// Launch `stream` on the device
    pub async fn launch(
        &self,
        control: &dyn DeviceControl,
        stream: &CandidateStream,
        title: &str,
    ) -> CastOutcome {
        let params = LaunchParams {
            channel_id: &self.channel_id,
            url: stream.url(),
            title,
            media_type: stream.media_type(),
        };

        info!(
            device = control.name(),
            channel = %self.channel_id,
            title,
            quality = stream.quality(),
            source = stream.source(),
            "Launching stream"
        );

        match tokio::time::timeout(self.timeout, control.launch(&params)).await {
            Ok(Ok(())) => CastOutcome::launched(format!(
                "Launched '{}' ({}) on {}",
                title,
                stream.quality(),
                control.name()
            )),
            Ok(Err(e)) => {
                warn!(device = control.name(), error = %e, "Launch failed");
                CastOutcome::failed(
                    CastFailure::LaunchFailed,
                    format!("Launch on {} failed: {}", control.name(), e),
                )
            }
            Err(_) => {
                warn!(device = control.name(), timeout = ?self.timeout, "Launch timed out");
                CastOutcome::failed(
                    CastFailure::LaunchFailed,
                    format!(
                        "Launch on {} timed out after {}s",
                        control.name(),
                        self.timeout.as_secs()
                    ),
                )
            }
        }
    }
}

/// On-screen title: confirmed title, else requested title, else "Movie"
pub fn display_title(metadata: Option<&MediaMetadata>, request: &MediaRequest) -> String {
    metadata
        .map(|m| m.confirmed_title.trim())
        .filter(|t| !t.is_empty())
        .or_else(|| request.title())
        .unwrap_or(FALLBACK_TITLE)
        .to_string()
}
