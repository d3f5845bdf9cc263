//! Autocast - find a stream for a movie and play it on a Roku
//!
//! Searches several unreliable stream providers at once, picks one
//! candidate, makes sure the target Roku is awake and launches playback.
//!
//! # Modules
//!
//! - `models` - Requests, metadata, candidates, outcomes, devices
//! - `providers` - Stream providers and their registry
//! - `search` - Aggregation engine and stream selector
//! - `cast` - Device control, readiness state machine, launcher, pipeline
//! - `api` - TMDB metadata resolver
//! - `context` - Immutable application context
//! - `config` - Config file and environment overrides
//! - `cli` / `commands` - Command line front end

pub mod api;
pub mod cast;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod logging;
pub mod models;
pub mod providers;
pub mod search;

// Re-export commonly used types
pub use models::{
    AggregateResult, CandidateStream, CastFailure, CastOutcome, Device, MediaMetadata,
    MediaRequest, OutcomeCode, ProviderOutcome,
};

pub use api::{MetadataResolver, TmdbClient};
pub use cast::{CastPipeline, ReadinessController, ReadinessState};
pub use config::Config;
pub use context::AppContext;
pub use providers::{ProviderRegistry, StreamProvider};
pub use search::{AggregationEngine, StreamSelector};
