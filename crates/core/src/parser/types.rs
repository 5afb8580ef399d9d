//! Types for the filename parser.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a filename did or did not yield a title and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    /// Title and year were both extracted.
    Parsed,
    /// No year-shaped token follows a title segment.
    NoYear,
    /// Nothing was left of the title after normalization.
    EmptyTitle,
    /// The title is a known extra (sample, featurette, ...).
    JunkTitle,
}

impl ParseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::NoYear => "no year token",
            Self::EmptyTitle => "empty title",
            Self::JunkTitle => "junk title",
        }
    }
}

/// Result of parsing a single raw filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    /// The path or name that was parsed.
    pub raw_path: PathBuf,
    /// Extracted title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extracted release year (1900-2099).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub outcome: ParseOutcome,
}

impl ParseResult {
    pub(crate) fn parsed(raw_path: PathBuf, title: String, year: u32) -> Self {
        Self {
            raw_path,
            title: Some(title),
            year: Some(year),
            outcome: ParseOutcome::Parsed,
        }
    }

    pub(crate) fn failed(raw_path: PathBuf, outcome: ParseOutcome) -> Self {
        Self {
            raw_path,
            title: None,
            year: None,
            outcome,
        }
    }

    /// Whether a usable title and year were extracted.
    pub fn is_parsed(&self) -> bool {
        self.outcome == ParseOutcome::Parsed
    }

    /// Title and year, when parsing succeeded.
    pub fn title_year(&self) -> Option<(&str, u32)> {
        match (&self.title, self.year) {
            (Some(title), Some(year)) if self.is_parsed() => Some((title.as_str(), year)),
            _ => None,
        }
    }
}
