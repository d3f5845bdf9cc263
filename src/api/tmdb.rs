//! TMDB (The Movie Database) metadata resolver
//!
//! Turns a media request into a canonical movie record: IMDb ID lookup first,
//! then title (+ year) search, then a detail fetch with credits and external IDs.
//! API docs: https://developer.themoviedb.org/docs

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TmdbAuth;
use crate::models::{MediaMetadata, MediaRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Poster images are served from a separate host
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Actors listed in the metadata record
const MAX_ACTORS: usize = 5;

/// TMDB API error types
#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Rate limited (429), retries exhausted")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Resolves a request into canonical metadata
///
/// `Ok(None)` means the catalog has no match; the caller must not go on to
/// search for streams in that case.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    async fn resolve(&self, request: &MediaRequest) -> anyhow::Result<Option<MediaMetadata>>;
}

/// TMDB API client
pub struct TmdbClient {
    auth: TmdbAuth,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl TmdbClient {
    /// Create a client on a shared HTTP client
    pub fn new(auth: TmdbAuth, client: reqwest::Client) -> Self {
        Self {
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            max_retries: 3,
        }
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(auth: TmdbAuth, base_url: impl Into<String>) -> Self {
        Self {
            auth,
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// Make an authenticated GET request with retry logic for rate limits
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut retries = 0;

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(params)
                .header("Accept", "application/json");

            request = match &self.auth {
                TmdbAuth::ApiKey(key) => request.query(&[("api_key", key)]),
                TmdbAuth::Bearer(token) => request.bearer_auth(token),
            };

            debug!(endpoint, "TMDB request");
            let response = request.send().await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await?;
                    let parsed: T = serde_json::from_str(&body).map_err(|e| {
                        TmdbError::InvalidResponse(format!("JSON parse error: {}", e))
                    })?;
                    return Ok(parsed);
                }
                StatusCode::NOT_FOUND => {
                    return Err(TmdbError::NotFound);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries >= self.max_retries {
                        return Err(TmdbError::RateLimited);
                    }

                    // Get Retry-After header or default to exponential backoff
                    let wait_secs = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(2u64.pow(retries));

                    warn!(endpoint, wait_secs, "TMDB rate limited, backing off");
                    tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                    continue;
                }
                status => {
                    return Err(TmdbError::ServerError(status.as_u16()));
                }
            }
        }
    }

    /// Find a movie by IMDb ID; first movie hit wins
    pub async fn find_by_imdb_id(&self, imdb_id: &str) -> Result<Option<u64>, TmdbError> {
        let endpoint = format!("/find/{}", urlencoding::encode(imdb_id));
        let params = [("external_source", "imdb_id".to_string())];

        let response: FindResponse = self.get(&endpoint, &params).await?;
        Ok(response.movie_results.first().map(|m| m.id))
    }

    /// Search movies by title, optionally narrowed by year; first hit wins
    pub async fn search_movie(&self, title: &str, year: Option<u16>) -> Result<Option<u64>, TmdbError> {
        let mut params = vec![
            ("query", title.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(year) = year {
            params.push(("year", year.to_string()));
        }

        let response: SearchResponse = self.get("/search/movie", &params).await?;
        Ok(response.results.first().map(|m| m.id))
    }

    /// Get movie details with credits and external IDs
    pub async fn movie_detail(&self, id: u64) -> Result<MediaMetadata, TmdbError> {
        let endpoint = format!("/movie/{}", id);
        let params = [("append_to_response", "credits,external_ids".to_string())];

        let response: MovieResponse = self.get(&endpoint, &params).await?;
        Ok(response.into_metadata())
    }
}

#[async_trait]
impl MetadataResolver for TmdbClient {
    async fn resolve(&self, request: &MediaRequest) -> anyhow::Result<Option<MediaMetadata>> {
        let mut movie_id = None;

        if let Some(imdb_id) = request.external_id() {
            info!(imdb_id, "Looking up metadata by IMDb ID");
            movie_id = match self.find_by_imdb_id(imdb_id).await {
                Ok(id) => id,
                Err(TmdbError::NotFound) => None,
                Err(e) => return Err(e.into()),
            };
        }

        if movie_id.is_none() {
            if let Some(title) = request.title() {
                info!(title, year = ?request.year(), "Looking up metadata by title");
                movie_id = self.search_movie(title, request.year()).await?;
            }
        }

        let Some(id) = movie_id else {
            info!(request = %request, "No movie found matching the request");
            return Ok(None);
        };

        let mut metadata = match self.movie_detail(id).await {
            Ok(metadata) => metadata,
            Err(TmdbError::NotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if metadata.external_id.is_none() {
            metadata.external_id = request.external_id().map(str::to_string);
        }
        if metadata.confirmed_title.is_empty() {
            metadata.confirmed_title = request.title().unwrap_or("Unknown Title").to_string();
        }

        info!(title = %metadata, catalog_id = id, "Metadata resolved");
        Ok(Some(metadata))
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    movie_results: Vec<MovieRef>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<MovieRef>,
}

#[derive(Debug, Deserialize)]
struct MovieRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    id: u64,
    #[serde(default)]
    title: String,
    release_date: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<GenreRaw>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    credits: CreditsRaw,
    external_ids: Option<ExternalIds>,
    imdb_id: Option<String>,
}

impl MovieResponse {
    fn into_metadata(self) -> MediaMetadata {
        let year = self.release_date.as_deref().and_then(extract_year);

        let external_id = self
            .external_ids
            .and_then(|e| e.imdb_id)
            .or(self.imdb_id)
            .filter(|id| !id.is_empty());

        let genre = Some(
            self.genres
                .into_iter()
                .map(|g| g.name)
                .collect::<Vec<_>>()
                .join(", "),
        )
        .filter(|g| !g.is_empty());

        MediaMetadata {
            confirmed_title: self.title,
            catalog_id: Some(self.id),
            external_id,
            year,
            plot: self.overview.filter(|o| !o.is_empty()),
            director: self.credits.directors(),
            genre,
            actors: self.credits.main_actors(MAX_ACTORS),
            runtime: self.runtime.and_then(format_runtime),
            poster_url: self
                .poster_path
                .map(|path| format!("{}{}", POSTER_BASE_URL, path)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenreRaw {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct CreditsRaw {
    #[serde(default)]
    cast: Vec<CastMemberRaw>,
    #[serde(default)]
    crew: Vec<CrewMemberRaw>,
}

impl CreditsRaw {
    fn directors(&self) -> Option<String> {
        let names: Vec<&str> = self
            .crew
            .iter()
            .filter(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name.as_str())
            .collect();
        (!names.is_empty()).then(|| names.join(", "))
    }

    fn main_actors(&self, limit: usize) -> Option<String> {
        let names: Vec<&str> = self.cast.iter().take(limit).map(|c| c.name.as_str()).collect();
        (!names.is_empty()).then(|| names.join(", "))
    }
}

#[derive(Debug, Deserialize)]
struct CastMemberRaw {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CrewMemberRaw {
    name: String,
    job: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

/// Extract year from a date string like "2022-03-04"
fn extract_year(date: &str) -> Option<u16> {
    date.get(..4)?.parse().ok()
}

/// Minutes as "2h 28m", or "45m" under an hour
fn format_runtime(minutes: u32) -> Option<String> {
    match (minutes / 60, minutes % 60) {
        (0, 0) => None,
        (0, m) => Some(format!("{}m", m)),
        (h, m) => Some(format!("{}h {}m", h, m)),
    }
}
