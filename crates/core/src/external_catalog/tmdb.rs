//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{MovieCandidate, MovieVideo};
use super::{ExternalCatalogError, MovieCatalog};
use crate::config::TmdbSection;

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl From<&TmdbSection> for TmdbConfig {
    fn from(section: &TmdbSection) -> Self {
        Self {
            api_key: section.api_key.clone(),
            base_url: section.base_url.clone(),
            timeout_secs: section.timeout_secs,
        }
    }
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, ExternalCatalogError> {
        if config.api_key.is_empty() {
            return Err(ExternalCatalogError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Response, ExternalCatalogError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", &self.api_key)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(ExternalCatalogError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(ExternalCatalogError::RateLimitExceeded);
        }
        if status == 404 {
            return Err(ExternalCatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalCatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl MovieCatalog for TmdbClient {
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError> {
        debug!("TMDB movie search: query='{}', year={:?}", query, year);

        let mut params = vec![("query", query.to_string())];
        if let Some(y) = year {
            params.push(("year", y.to_string()));
        }

        let response = self.get("/search/movie", &params).await?;
        let search_result: TmdbPagedResponse<TmdbMovieResult> =
            response.json().await.map_err(|e| {
                ExternalCatalogError::ParseError(format!(
                    "Failed to parse movie search response: {}",
                    e
                ))
            })?;

        Ok(search_result.results.into_iter().map(Into::into).collect())
    }

    async fn discover_movies(
        &self,
        year: u32,
        page: u32,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError> {
        debug!("TMDB discover: year={}, page={}", year, page);

        let mut params: Vec<(&str, String)> = filters
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        params.push(("primary_release_year", year.to_string()));
        params.push(("page", page.to_string()));

        let response = self.get("/discover/movie", &params).await?;
        let page_result: TmdbPagedResponse<TmdbMovieResult> =
            response.json().await.map_err(|e| {
                ExternalCatalogError::ParseError(format!(
                    "Failed to parse discover response: {}",
                    e
                ))
            })?;

        Ok(page_result.results.into_iter().map(Into::into).collect())
    }

    async fn movie_videos(&self, movie_id: u32) -> Result<Vec<MovieVideo>, ExternalCatalogError> {
        debug!("TMDB movie videos: id={}", movie_id);

        let response = self
            .get(&format!("/movie/{}/videos", movie_id), &[])
            .await?;
        let videos: TmdbPagedResponse<TmdbVideoResult> = response.json().await.map_err(|e| {
            ExternalCatalogError::ParseError(format!("Failed to parse videos response: {}", e))
        })?;

        Ok(videos.results.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbPagedResponse<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    title: String,
    release_date: Option<String>,
    popularity: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbVideoResult {
    key: String,
    site: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    official: bool,
}

// ============================================================================
// Conversions
// ============================================================================

impl From<TmdbMovieResult> for MovieCandidate {
    fn from(r: TmdbMovieResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            // TMDB sends "" for unknown dates
            release_date: r.release_date.filter(|d| !d.is_empty()),
            popularity: r.popularity.unwrap_or(0.0),
        }
    }
}

impl From<TmdbVideoResult> for MovieVideo {
    fn from(r: TmdbVideoResult) -> Self {
        Self {
            key: r.key,
            site: r.site,
            kind: r.kind,
            official: r.official,
        }
    }
}
