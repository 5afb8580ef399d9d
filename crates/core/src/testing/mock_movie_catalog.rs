//! Mock metadata service for testing.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::external_catalog::{ExternalCatalogError, MovieCandidate, MovieCatalog, MovieVideo};

/// A recorded search for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    pub query: String,
    pub year: Option<u32>,
}

/// Mock implementation of the MovieCatalog trait.
///
/// Search results are keyed by the lowercased query and returned whatever
/// the year; discover pages are keyed by `(year, page)`. Every call is
/// recorded, including the ones that fail.
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::MockMovieCatalog;
///
/// let catalog = MockMovieCatalog::new();
/// catalog.add_search_results("The Matrix", vec![/* candidates */]).await;
/// catalog.fail_next_searches(1, || ExternalCatalogError::RateLimitExceeded).await;
///
/// let searches = catalog.recorded_searches().await;
/// ```
#[derive(Debug, Default)]
pub struct MockMovieCatalog {
    search_results: Arc<RwLock<HashMap<String, Vec<MovieCandidate>>>>,
    discover_pages: Arc<RwLock<HashMap<(u32, u32), Vec<MovieCandidate>>>>,
    videos: Arc<RwLock<HashMap<u32, Vec<MovieVideo>>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    discover_calls: Arc<RwLock<Vec<(u32, u32)>>>,
    video_calls: Arc<RwLock<Vec<u32>>>,
    /// Errors handed out to the next searches, in order.
    search_errors: Arc<RwLock<Vec<ExternalCatalogError>>>,
    /// If set, the next discover or videos call fails with this error.
    next_error: Arc<RwLock<Option<ExternalCatalogError>>>,
}

impl MockMovieCatalog {
    /// Create a new mock catalog with no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the results of searching for `query`.
    pub async fn add_search_results(&self, query: &str, results: Vec<MovieCandidate>) {
        self.search_results
            .write()
            .await
            .insert(query.to_lowercase(), results);
    }

    /// Register one discover page.
    pub async fn add_discover_page(&self, year: u32, page: u32, results: Vec<MovieCandidate>) {
        self.discover_pages
            .write()
            .await
            .insert((year, page), results);
    }

    /// Register the videos of a movie.
    pub async fn add_videos(&self, movie_id: u32, videos: Vec<MovieVideo>) {
        self.videos.write().await.insert(movie_id, videos);
    }

    /// Make the next `count` searches fail.
    pub async fn fail_next_searches(&self, count: usize, make: impl Fn() -> ExternalCatalogError) {
        let mut errors = self.search_errors.write().await;
        errors.extend((0..count).map(|_| make()));
    }

    /// Configure the next discover or videos call to fail.
    pub async fn set_next_error(&self, error: ExternalCatalogError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    pub async fn recorded_discover_calls(&self) -> Vec<(u32, u32)> {
        self.discover_calls.read().await.clone()
    }

    pub async fn recorded_video_calls(&self) -> Vec<u32> {
        self.video_calls.read().await.clone()
    }

    /// Forget all recorded calls.
    pub async fn clear_recorded(&self) {
        self.searches.write().await.clear();
        self.discover_calls.write().await.clear();
        self.video_calls.write().await.clear();
    }

    async fn take_error(&self) -> Option<ExternalCatalogError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl MovieCatalog for MockMovieCatalog {
    async fn search_movies(
        &self,
        query: &str,
        year: Option<u32>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError> {
        self.searches.write().await.push(RecordedSearch {
            query: query.to_string(),
            year,
        });

        {
            let mut errors = self.search_errors.write().await;
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }

        Ok(self
            .search_results
            .read()
            .await
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn discover_movies(
        &self,
        year: u32,
        page: u32,
        _filters: &BTreeMap<String, String>,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError> {
        self.discover_calls.write().await.push((year, page));

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        Ok(self
            .discover_pages
            .read()
            .await
            .get(&(year, page))
            .cloned()
            .unwrap_or_default())
    }

    async fn movie_videos(&self, movie_id: u32) -> Result<Vec<MovieVideo>, ExternalCatalogError> {
        self.video_calls.write().await.push(movie_id);

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        Ok(self
            .videos
            .read()
            .await
            .get(&movie_id)
            .cloned()
            .unwrap_or_default())
    }
}
