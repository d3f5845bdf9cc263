//! Device readiness controller
//!
//! Makes sure a device answers before anything is launched on it:
//!
//! ```text
//! Unknown → Checking → Responsive                       (fast path)
//!                    → Unresponsive → PoweringOn → PowerOnFailed
//!                                                → PowerOnSent → WaitingForBoot → Ready
//!                                                                               → BootTimeout
//! ```
//!
//! Any state may end in `Cancelled` when the caller's token fires. All timing
//! state lives in one [`ReadinessController::run`] call.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cast::ecp::{DeviceControl, EcpError};
use crate::config::CastConfig;
use crate::models::{CastFailure, CastOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    Unknown,
    Checking,
    Responsive,
    Unresponsive,
    PoweringOn,
    PowerOnSent,
    PowerOnFailed,
    WaitingForBoot,
    Ready,
    BootTimeout,
    Cancelled,
}

impl ReadinessState {
    /// States from which a launch may proceed
    pub fn is_ready(self) -> bool {
        matches!(self, ReadinessState::Responsive | ReadinessState::Ready)
    }

    /// The failure a run ending in this state reports, if any
    pub fn failure(self) -> Option<CastFailure> {
        match self {
            ReadinessState::Unresponsive => Some(CastFailure::Unresponsive),
            ReadinessState::PowerOnFailed => Some(CastFailure::PowerOnFailed),
            ReadinessState::BootTimeout => Some(CastFailure::BootTimeout),
            ReadinessState::Cancelled => Some(CastFailure::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Timing knobs for one readiness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessConfig {
    pub status_timeout: Duration,
    pub power_on_timeout: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
    /// Log boot progress every N polls (0 disables)
    pub progress_every: u32,
    /// When false, an unresponsive device is a terminal failure
    pub wake_when_unresponsive: bool,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self::from(&CastConfig::default())
    }
}

impl From<&CastConfig> for ReadinessConfig {
    fn from(config: &CastConfig) -> Self {
        Self {
            status_timeout: Duration::from_secs(config.status_timeout_secs),
            power_on_timeout: Duration::from_secs(config.power_on_timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_polls: config.max_boot_polls,
            progress_every: config.progress_every,
            wake_when_unresponsive: config.wake_when_unresponsive,
        }
    }
}

/// How a readiness run went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    /// Terminal state
    pub state: ReadinessState,
    /// Every state entered, in order, starting with `Unknown`
    pub history: Vec<ReadinessState>,
    /// Status polls issued while waiting for boot
    pub polls: u32,
    pub power_on_sent: bool,
    pub elapsed: Duration,
    /// Last device error seen, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ReadinessReport {
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Failed cast outcome for a run that did not end ready
    pub fn failure_outcome(&self, device: &str) -> Option<CastOutcome> {
        let failure = self.state.failure()?;
        let reason = match failure {
            CastFailure::Unresponsive => {
                format!("{} did not respond to a status query", device)
            }
            CastFailure::PowerOnFailed => format!(
                "Failed to power on {}: {}",
                device,
                self.detail.as_deref().unwrap_or("no response")
            ),
            CastFailure::BootTimeout => format!(
                "{} did not become ready after {} status checks ({:.0}s)",
                device,
                self.polls,
                self.elapsed.as_secs_f32()
            ),
            CastFailure::Cancelled => format!("Cancelled while preparing {}", device),
            CastFailure::LaunchFailed => return None,
        };
        Some(CastOutcome::failed(failure, reason))
    }
}

/// Result of one bounded status probe
enum Probe {
    Up,
    Down(String),
    Cancelled,
}

/// Tracks the current state and its history during one run
struct Run {
    started: Instant,
    state: ReadinessState,
    history: Vec<ReadinessState>,
    polls: u32,
    power_on_sent: bool,
    detail: Option<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            state: ReadinessState::Unknown,
            history: vec![ReadinessState::Unknown],
            polls: 0,
            power_on_sent: false,
            detail: None,
        }
    }

    fn enter(&mut self, state: ReadinessState) {
        debug!(from = %self.state, to = %state, "Readiness transition");
        self.state = state;
        self.history.push(state);
    }

    fn finish(mut self, state: ReadinessState) -> ReadinessReport {
        self.enter(state);
        self.end()
    }

    /// End the run in the state it is already in
    fn end(self) -> ReadinessReport {
        ReadinessReport {
            state: self.state,
            history: self.history,
            polls: self.polls,
            power_on_sent: self.power_on_sent,
            elapsed: self.started.elapsed(),
            detail: self.detail,
        }
    }
}

/// Check / wake / wait state machine for one device
#[derive(Debug, Clone, Default)]
pub struct ReadinessController {
    config: ReadinessConfig,
}

impl ReadinessController {
    pub fn new(config: ReadinessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Drive the device to a terminal readiness state
    pub async fn run(&self, control: &dyn DeviceControl, cancel: &CancellationToken) -> ReadinessReport {
        let device = control.name().to_string();
        let mut run = Run::new();

        run.enter(ReadinessState::Checking);
        match self.probe(control, cancel).await {
            Probe::Up => {
                info!(device = %device, "Device is responsive");
                return run.finish(ReadinessState::Responsive);
            }
            Probe::Cancelled => return run.finish(ReadinessState::Cancelled),
            Probe::Down(reason) => {
                info!(device = %device, reason = %reason, "Device is not responding");
                run.detail = Some(reason);
                run.enter(ReadinessState::Unresponsive);
            }
        }

        if !self.config.wake_when_unresponsive {
            return run.end();
        }

        run.enter(ReadinessState::PoweringOn);
        info!(device = %device, "Sending power-on command");
        let power_on = tokio::select! {
            biased;
            _ = cancel.cancelled() => return run.finish(ReadinessState::Cancelled),
            result = tokio::time::timeout(self.config.power_on_timeout, control.power_on()) => result,
        };

        match power_on {
            Ok(Ok(())) => {
                run.power_on_sent = true;
                run.enter(ReadinessState::PowerOnSent);
            }
            Ok(Err(e)) => {
                warn!(device = %device, error = %e, "Power-on command failed");
                run.detail = Some(e.to_string());
                return run.finish(ReadinessState::PowerOnFailed);
            }
            Err(_) => {
                warn!(device = %device, "Power-on command timed out");
                run.detail = Some(EcpError::Timeout.to_string());
                return run.finish(ReadinessState::PowerOnFailed);
            }
        }

        run.enter(ReadinessState::WaitingForBoot);
        info!(
            device = %device,
            max_polls = self.config.max_polls,
            "Waiting for device to boot"
        );

        for poll in 1..=self.config.max_polls {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return run.finish(ReadinessState::Cancelled),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            run.polls = poll;
            match self.probe(control, cancel).await {
                Probe::Up => {
                    info!(device = %device, polls = poll, "Device is ready");
                    return run.finish(ReadinessState::Ready);
                }
                Probe::Cancelled => return run.finish(ReadinessState::Cancelled),
                Probe::Down(reason) => {
                    run.detail = Some(reason);
                    if self.config.progress_every > 0 && poll % self.config.progress_every == 0 {
                        info!(
                            device = %device,
                            poll,
                            max_polls = self.config.max_polls,
                            "Still waiting for device"
                        );
                    }
                }
            }
        }

        warn!(device = %device, polls = run.polls, "Device did not become ready");
        run.finish(ReadinessState::BootTimeout)
    }

    async fn probe(&self, control: &dyn DeviceControl, cancel: &CancellationToken) -> Probe {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Probe::Cancelled,
            result = tokio::time::timeout(self.config.status_timeout, control.query_status()) => {
                match result {
                    Ok(Ok(())) => Probe::Up,
                    Ok(Err(e)) => Probe::Down(e.to_string()),
                    Err(_) => Probe::Down(EcpError::Timeout.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_states() {
        assert!(ReadinessState::Responsive.is_ready());
        assert!(ReadinessState::Ready.is_ready());
        assert!(!ReadinessState::PowerOnSent.is_ready());
        assert!(!ReadinessState::BootTimeout.is_ready());
    }

    #[test]
    fn test_failure_mapping() {
        assert_eq!(ReadinessState::Ready.failure(), None);
        assert_eq!(ReadinessState::Unresponsive.failure(), Some(CastFailure::Unresponsive));
        assert_eq!(ReadinessState::PowerOnFailed.failure(), Some(CastFailure::PowerOnFailed));
        assert_eq!(ReadinessState::BootTimeout.failure(), Some(CastFailure::BootTimeout));
        assert_eq!(ReadinessState::Cancelled.failure(), Some(CastFailure::Cancelled));
    }

    #[test]
    fn test_config_from_cast_config() {
        let config = ReadinessConfig::default();
        assert_eq!(config.status_timeout, Duration::from_secs(3));
        assert_eq!(config.power_on_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_polls, 30);
        assert_eq!(config.progress_every, 5);
        assert!(config.wake_when_unresponsive);
    }

    #[test]
    fn test_state_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_value(ReadinessState::WaitingForBoot).unwrap(),
            "WAITING_FOR_BOOT"
        );
    }
}
