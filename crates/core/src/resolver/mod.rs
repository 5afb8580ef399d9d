//! Identity resolution against the metadata service.
//!
//! Given a parsed title and year, the resolver searches the metadata
//! service and decides whether exactly one movie is a safe match. It never
//! guesses between several plausible candidates.

mod similarity;
mod types;

pub use similarity::{levenshtein_distance, normalize_title, title_similarity};
pub use types::MatchResult;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::external_catalog::{MovieCandidate, MovieCatalog};
use crate::retry::RetryPolicy;

/// Confidence lost per year of distance for fuzzy matches.
const YEAR_PENALTY: f32 = 0.05;
/// Fuzzy matches never reach the confidence of an exact one.
const MAX_FUZZY_CONFIDENCE: f32 = 0.99;

/// Resolves parsed titles to canonical movie identities.
pub struct IdentityResolver {
    catalog: Arc<dyn MovieCatalog>,
    config: ResolverConfig,
    retry: RetryPolicy,
}

impl IdentityResolver {
    pub fn new(catalog: Arc<dyn MovieCatalog>, config: ResolverConfig, retry: RetryPolicy) -> Self {
        Self {
            catalog,
            config,
            retry,
        }
    }

    /// Resolve a title and optional year to a single identity.
    ///
    /// The year-narrowed search runs first; when it yields nothing usable
    /// and a year was given, a second search without the year lets
    /// neighbouring release years within the tolerance through.
    pub async fn resolve(&self, title: &str, year: Option<u32>) -> MatchResult {
        let candidates = match self.search(title, year).await {
            Ok(c) => c,
            Err(reason) => return MatchResult::TransientFailure { reason },
        };

        let result = self.decide(title, year, &candidates);
        if year.is_none() || !matches!(result, MatchResult::NotFound) {
            return result;
        }

        debug!("No match for '{}' ({:?}), widening search", title, year);
        match self.search(title, None).await {
            Ok(wider) => self.decide(title, year, &wider),
            Err(reason) => MatchResult::TransientFailure { reason },
        }
    }

    async fn search(&self, title: &str, year: Option<u32>) -> Result<Vec<MovieCandidate>, String> {
        let what = format!("Search for '{}'", title);
        self.retry
            .run(&what, || self.catalog.search_movies(title, year))
            .await
            .map_err(|e| {
                warn!("{} gave up: {}", what, e);
                e.to_string()
            })
    }

    /// Applies the match policy to a candidate list.
    fn decide(&self, title: &str, year: Option<u32>, candidates: &[MovieCandidate]) -> MatchResult {
        let wanted = normalize_title(title);

        let exact: Vec<&MovieCandidate> = candidates
            .iter()
            .filter(|c| normalize_title(&c.title) == wanted)
            .filter(|c| year.is_none() || c.year() == year)
            .filter(|c| c.year().is_some())
            .collect();

        match exact.as_slice() {
            [only] => return matched(only, 1.0),
            [] => {}
            several => {
                return MatchResult::Ambiguous {
                    candidates: several.iter().map(|c| (*c).clone()).collect(),
                }
            }
        }

        let mut fuzzy: Vec<(&MovieCandidate, f32)> = candidates
            .iter()
            .filter_map(|c| {
                let candidate_year = c.year()?;
                let distance = match year {
                    Some(y) => candidate_year.abs_diff(y),
                    None => 0,
                };
                if distance > self.config.year_tolerance {
                    return None;
                }
                let similarity = title_similarity(title, &c.title);
                if similarity < self.config.fuzzy_min_similarity {
                    return None;
                }
                let confidence = (similarity - YEAR_PENALTY * distance as f32)
                    .clamp(0.0, MAX_FUZZY_CONFIDENCE);
                Some((c, confidence))
            })
            .collect();

        match fuzzy.len() {
            0 => MatchResult::NotFound,
            1 => {
                let (candidate, confidence) = fuzzy.remove(0);
                if confidence >= self.config.auto_accept_threshold {
                    matched(candidate, confidence)
                } else {
                    MatchResult::Ambiguous {
                        candidates: vec![candidate.clone()],
                    }
                }
            }
            _ => MatchResult::Ambiguous {
                candidates: fuzzy.into_iter().map(|(c, _)| c.clone()).collect(),
            },
        }
    }
}

fn matched(candidate: &MovieCandidate, confidence: f32) -> MatchResult {
    MatchResult::Matched {
        id: candidate.id,
        title: candidate.title.clone(),
        // Callers only pass dated candidates.
        year: candidate.year().unwrap_or_default(),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_catalog::ExternalCatalogError;
    use crate::testing::MockMovieCatalog;

    fn candidate(id: u32, title: &str, date: &str) -> MovieCandidate {
        MovieCandidate {
            id,
            title: title.to_string(),
            release_date: Some(date.to_string()),
            popularity: 10.0,
        }
    }

    fn resolver(mock: Arc<MockMovieCatalog>) -> IdentityResolver {
        IdentityResolver::new(mock, ResolverConfig::default(), RetryPolicy::default())
    }

    #[tokio::test]
    async fn test_exact_match() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results(
            "The Matrix",
            vec![
                candidate(603, "The Matrix", "1999-03-30"),
                candidate(604, "The Matrix Reloaded", "2003-05-15"),
            ],
        )
        .await;

        let result = resolver(mock).resolve("The Matrix", Some(1999)).await;
        assert_eq!(
            result,
            MatchResult::Matched {
                id: 603,
                title: "The Matrix".to_string(),
                year: 1999,
                confidence: 1.0
            }
        );
    }

    #[tokio::test]
    async fn test_exact_duplicates_are_ambiguous() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results(
            "Heat",
            vec![
                candidate(949, "Heat", "1995-12-15"),
                candidate(950, "Heat", "1995-01-01"),
            ],
        )
        .await;

        let result = resolver(mock).resolve("Heat", Some(1995)).await;
        assert!(matches!(result, MatchResult::Ambiguous { ref candidates } if candidates.len() == 2));
    }

    #[tokio::test]
    async fn test_fuzzy_single_survivor_within_tolerance() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results("The Matrx", vec![candidate(603, "The Matrix", "1999-03-30")])
            .await;

        let result = resolver(mock).resolve("The Matrx", Some(1999)).await;
        match result {
            MatchResult::Matched { id, confidence, .. } => {
                assert_eq!(id, 603);
                assert!(confidence < 1.0);
                assert!(confidence >= 0.85);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fuzzy_below_threshold_is_ambiguous() {
        let mock = Arc::new(MockMovieCatalog::new());
        // Two edits over twelve characters survives the similarity floor
        // but stays under the accept threshold.
        mock.add_search_results("Blad Runnr", vec![candidate(78, "Blade Runner", "1982-06-25")])
            .await;

        let result = resolver(mock).resolve("Blad Runnr", Some(1982)).await;
        assert!(matches!(result, MatchResult::Ambiguous { ref candidates } if candidates.len() == 1));
    }

    #[tokio::test]
    async fn test_exact_title_variants_are_ambiguous() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results(
            "Dune",
            vec![
                candidate(1, "Dune!", "2021-09-15"),
                candidate(2, "Dune.", "2021-10-22"),
            ],
        )
        .await;

        let result = resolver(mock).resolve("Dune", Some(2021)).await;
        assert!(matches!(result, MatchResult::Ambiguous { .. }));
    }

    #[tokio::test]
    async fn test_fuzzy_several_survivors_never_picked() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results(
            "Ghostbusters",
            vec![
                candidate(1, "Ghostbuster", "2016-07-15"),
                candidate(2, "Ghostbusterz", "2016-07-15"),
            ],
        )
        .await;

        let result = resolver(mock).resolve("Ghostbusters", Some(2016)).await;
        assert!(matches!(result, MatchResult::Ambiguous { ref candidates } if candidates.len() == 2));
    }

    #[tokio::test]
    async fn test_year_outside_tolerance_not_found() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results("Heat", vec![candidate(949, "Heat", "1995-12-15")])
            .await;

        let result = resolver(mock.clone()).resolve("Heat", Some(1986)).await;
        assert_eq!(result, MatchResult::NotFound);
        // Narrow search, then the widened one.
        assert_eq!(mock.recorded_searches().await.len(), 2);
    }

    #[tokio::test]
    async fn test_no_candidates_not_found() {
        let mock = Arc::new(MockMovieCatalog::new());
        let result = resolver(mock).resolve("Nothing Here", None).await;
        assert_eq!(result, MatchResult::NotFound);
    }

    #[tokio::test]
    async fn test_retry_then_transient_failure() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.fail_next_searches(2, || ExternalCatalogError::RateLimitExceeded)
            .await;

        let result = resolver(mock.clone()).resolve("The Matrix", Some(1999)).await;
        assert!(matches!(result, MatchResult::TransientFailure { .. }));
        assert_eq!(mock.recorded_searches().await.len(), 2);
    }

    #[tokio::test]
    async fn test_single_failure_is_retried() {
        let mock = Arc::new(MockMovieCatalog::new());
        mock.add_search_results("The Matrix", vec![candidate(603, "The Matrix", "1999-03-30")])
            .await;
        mock.fail_next_searches(1, || ExternalCatalogError::RateLimitExceeded)
            .await;

        let result = resolver(mock).resolve("The Matrix", Some(1999)).await;
        assert!(result.is_matched());
    }
}
