//! Casting to Roku devices
//!
//! - ECP: HTTP control surface of the device
//! - Readiness: check / wake / wait state machine
//! - Launcher: final launch command
//! - Pipeline: request to cast outcome, end to end

pub mod ecp;
pub mod launcher;
pub mod pipeline;
pub mod readiness;

pub use ecp::{DeviceControl, EcpClient, EcpError, LaunchParams};
pub use launcher::{display_title, CastLauncher};
pub use pipeline::{CastPipeline, CastReport, PipelineError, SearchReport};
pub use readiness::{ReadinessConfig, ReadinessController, ReadinessReport, ReadinessState};
