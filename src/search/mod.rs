//! Stream search
//!
//! - Engine: fan-out across providers with per-provider failure isolation
//! - Selector: deterministic index-based pick over the merged candidates

pub mod engine;
pub mod selector;

pub use engine::AggregationEngine;
pub use selector::{clamp_index, SelectionError, StreamSelector};
