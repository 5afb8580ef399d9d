//! Types for identity resolution.

use serde::{Deserialize, Serialize};

use crate::external_catalog::MovieCandidate;

/// Outcome of resolving a parsed title against the metadata service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MatchResult {
    /// A single canonical identity was chosen.
    Matched {
        id: u32,
        title: String,
        year: u32,
        /// 1.0 for exact matches, lower for fuzzy ones.
        confidence: f32,
    },
    /// Several plausible candidates, or one below the accept threshold.
    Ambiguous { candidates: Vec<MovieCandidate> },
    /// The service knows nothing that fits.
    NotFound,
    /// The service could not be reached, even after retrying.
    TransientFailure { reason: String },
}

impl MatchResult {
    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched { .. } => "matched",
            Self::Ambiguous { .. } => "ambiguous",
            Self::NotFound => "not found",
            Self::TransientFailure { .. } => "transient failure",
        }
    }
}
