//! Cast pipeline
//!
//! Request → metadata → aggregate → selected stream → ready device → launch.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cast::ecp::EcpClient;
use crate::cast::launcher::{display_title, CastLauncher};
use crate::cast::readiness::{ReadinessConfig, ReadinessController, ReadinessReport};
use crate::context::AppContext;
use crate::models::{
    AggregateResult, CandidateStream, CastFailure, CastOutcome, Device, MediaMetadata,
    MediaRequest,
};
use crate::search::{AggregationEngine, SelectionError, StreamSelector};

/// Failures that stop the pipeline before a device outcome exists
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("No TMDB credentials configured (set TMDB_API_KEY or TMDB_READ_ACCESS_TOKEN)")]
    MissingCredentials,

    #[error("No metadata found for {0}")]
    MetadataNotFound(String),

    #[error("Metadata lookup failed: {0:#}")]
    Metadata(anyhow::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error("{reason}")]
    NothingFound {
        metadata: Box<MediaMetadata>,
        aggregate: AggregateResult,
        #[source]
        reason: SelectionError,
    },
}

/// Metadata plus everything every provider reported
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub metadata: MediaMetadata,
    pub aggregate: AggregateResult,
}

/// Full record of one cast attempt
#[derive(Debug, Clone, Serialize)]
pub struct CastReport {
    pub device: Device,
    pub metadata: MediaMetadata,
    pub aggregate: AggregateResult,
    /// Keeps the source tag of the provider that found it
    pub selected: CandidateStream,
    pub readiness: ReadinessReport,
    pub outcome: CastOutcome,
}

pub struct CastPipeline<'a> {
    context: &'a AppContext,
    engine: AggregationEngine,
    selector: StreamSelector,
    readiness: ReadinessController,
    launcher: CastLauncher,
}

impl<'a> CastPipeline<'a> {
    pub fn new(context: &'a AppContext) -> Self {
        let config = &context.config;
        Self {
            context,
            engine: AggregationEngine::from_config(context.registry.clone(), &config.search),
            selector: StreamSelector::new(config.search.placeholder_prefixes.iter().cloned()),
            readiness: ReadinessController::new(ReadinessConfig::from(&config.cast)),
            launcher: CastLauncher::from_config(&config.cast),
        }
    }

    /// Replace the readiness timing used by `cast`
    pub fn with_readiness(mut self, config: ReadinessConfig) -> Self {
        self.readiness = ReadinessController::new(config);
        self
    }

    /// Resolve metadata and search every provider
    ///
    /// Firing `cancel` abandons the lookup and any provider still in flight.
    pub async fn search(
        &self,
        request: MediaRequest,
        cancel: &CancellationToken,
    ) -> Result<SearchReport, PipelineError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Search cancelled");
                Err(PipelineError::Cancelled)
            }
            report = self.search_all(request) => report,
        }
    }

    async fn search_all(&self, request: MediaRequest) -> Result<SearchReport, PipelineError> {
        let request = Arc::new(request);
        let metadata = self.resolve(&request).await?;
        let aggregate = self.engine.run(&metadata, &request).await;
        Ok(SearchReport { metadata, aggregate })
    }

    /// Find a stream and play it on the requested device
    ///
    /// `stream_index` is clamped to the available candidates. Device-side
    /// failures come back as a report with a failed outcome.
    pub async fn cast(
        &self,
        request: MediaRequest,
        stream_index: i64,
        cancel: &CancellationToken,
    ) -> Result<CastReport, PipelineError> {
        let device = self.device(request.device())?.clone();

        let SearchReport { metadata, aggregate } = self.search(request.clone(), cancel).await?;

        let selected = match self.selector.select(&aggregate, stream_index) {
            Ok(stream) => stream.clone(),
            Err(reason) => {
                return Err(PipelineError::NothingFound {
                    metadata: Box::new(metadata),
                    aggregate,
                    reason,
                })
            }
        };
        info!(stream = %selected, device = %device, "Selected stream");

        let control = EcpClient::for_device(&device, self.context.client.clone());
        let readiness = self.readiness.run(&control, cancel).await;

        let outcome = if readiness.is_ready() {
            let title = display_title(Some(&metadata), &request);
            self.launcher.launch(&control, &selected, &title).await
        } else {
            readiness
                .failure_outcome(&device.name)
                .unwrap_or_else(|| CastOutcome::failed(CastFailure::Unresponsive, "Device not ready"))
        };

        Ok(CastReport {
            device,
            metadata,
            aggregate,
            selected,
            readiness,
            outcome,
        })
    }

    /// Run the readiness check alone
    ///
    /// With `wake` false an unresponsive device is reported as is.
    pub async fn check_device(
        &self,
        identifier: Option<&str>,
        wake: bool,
        cancel: &CancellationToken,
    ) -> Result<(Device, ReadinessReport), PipelineError> {
        let device = self.device(identifier)?.clone();

        let mut config = self.readiness.config().clone();
        config.wake_when_unresponsive = wake;

        let control = EcpClient::for_device(&device, self.context.client.clone());
        let report = ReadinessController::new(config).run(&control, cancel).await;
        Ok((device, report))
    }

    fn device(&self, identifier: Option<&str>) -> Result<&'a Device, PipelineError> {
        self.context
            .device(identifier)
            .ok_or_else(|| PipelineError::DeviceNotFound(identifier.unwrap_or("(none configured)").to_string()))
    }

    async fn resolve(&self, request: &MediaRequest) -> Result<MediaMetadata, PipelineError> {
        let resolver = self
            .context
            .resolver
            .as_ref()
            .ok_or(PipelineError::MissingCredentials)?;

        match resolver.resolve(request).await {
            Ok(Some(metadata)) => Ok(metadata),
            Ok(None) => Err(PipelineError::MetadataNotFound(request.to_string())),
            Err(e) => Err(PipelineError::Metadata(e)),
        }
    }
}
