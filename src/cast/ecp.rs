//! Roku External Control Protocol (ECP) client
//!
//! The device exposes a small HTTP surface on port 8060:
//! - `GET  /query/device-info`            → 200 when awake
//! - `POST /keypress/PowerOn`             → 200 or 202 when accepted
//! - `POST /launch/{channel}?u=&t=v&...`  → 200 when the channel started

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::models::Device;

/// Backstop for any single device request; callers apply tighter bounds
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Device control errors
#[derive(Error, Debug)]
pub enum EcpError {
    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected response: HTTP {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for EcpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EcpError::Timeout
        } else {
            EcpError::Transport(err)
        }
    }
}

/// What to play and how to label it on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams<'a> {
    pub channel_id: &'a str,
    pub url: &'a str,
    pub title: &'a str,
    pub media_type: &'a str,
}

/// Commands the cast state machine sends to a device
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Device label for logs and messages
    fn name(&self) -> &str;

    /// Cheap reachability probe
    async fn query_status(&self) -> Result<(), EcpError>;

    /// Wake the device from standby
    async fn power_on(&self) -> Result<(), EcpError>;

    /// Start the playback channel with a stream
    async fn launch(&self, params: &LaunchParams<'_>) -> Result<(), EcpError>;
}

/// HTTP implementation of [`DeviceControl`]
pub struct EcpClient {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl EcpClient {
    /// Client for a configured device on a shared HTTP client
    pub fn for_device(device: &Device, client: reqwest::Client) -> Self {
        Self {
            name: device.name.clone(),
            base_url: device.base_url(),
            client,
        }
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn expect_status(status: StatusCode, accepted: &[StatusCode]) -> Result<(), EcpError> {
    if accepted.contains(&status) {
        Ok(())
    } else {
        Err(EcpError::Status(status.as_u16()))
    }
}

#[async_trait]
impl DeviceControl for EcpClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_status(&self) -> Result<(), EcpError> {
        let response = self
            .client
            .get(self.url("/query/device-info"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        debug!(device = %self.name, status = %response.status(), "Status query");
        expect_status(response.status(), &[StatusCode::OK])
    }

    async fn power_on(&self) -> Result<(), EcpError> {
        let response = self
            .client
            .post(self.url("/keypress/PowerOn"))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        debug!(device = %self.name, status = %response.status(), "PowerOn keypress");
        expect_status(response.status(), &[StatusCode::OK, StatusCode::ACCEPTED])
    }

    async fn launch(&self, params: &LaunchParams<'_>) -> Result<(), EcpError> {
        let response = self
            .client
            .post(self.url(&format!("/launch/{}", params.channel_id)))
            .query(&[
                ("u", params.url),
                ("t", "v"),
                ("videoName", params.title),
                ("videoFormat", params.media_type),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        debug!(device = %self.name, status = %response.status(), "Launch");
        expect_status(response.status(), &[StatusCode::OK])
    }
}
