//! API clients for external services
//!
//! - TMDB: canonical movie metadata for a request

pub mod tmdb;

pub use tmdb::{MetadataResolver, TmdbClient, TmdbError};
