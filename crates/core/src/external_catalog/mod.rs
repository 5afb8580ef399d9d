//! External movie metadata (TMDB).
//!
//! The resolver and the upcoming-movie discovery talk to the metadata
//! service only through the [`MovieCatalog`] trait, so tests can swap in
//! [`crate::testing::MockMovieCatalog`].

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the metadata service.
#[derive(Debug, Error)]
pub enum ExternalCatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ExternalCatalogError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::RateLimitExceeded => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::ParseError(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Read access to a movie metadata service.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Search movies by title, optionally narrowed to a release year.
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError>;

    /// One page (1-based) of movies released in `year`, filtered by the
    /// extra discover parameters.
    async fn discover_movies(
        &self,
        year: u32,
        page: u32,
        filters: &BTreeMap<String, String>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError>;

    /// Videos (trailers, teasers, ...) attached to a movie.
    async fn movie_videos(&self, movie_id: u32) -> Result<Vec<MovieVideo>, ExternalCatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ExternalCatalogError::RateLimitExceeded.is_retryable());
        assert!(ExternalCatalogError::ApiError {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!ExternalCatalogError::ApiError {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!ExternalCatalogError::NotConfigured("key".into()).is_retryable());
    }
}
