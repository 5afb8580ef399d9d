//! Types for metadata service responses.

use serde::{Deserialize, Serialize};

/// A movie as returned by search or discover.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieCandidate {
    /// TMDB movie ID.
    pub id: u32,
    /// Movie title.
    pub title: String,
    /// Release date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub popularity: f32,
}

impl MovieCandidate {
    /// Extract year from release date.
    pub fn year(&self) -> Option<u32> {
        self.release_date
            .as_ref()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse().ok())
    }
}

/// A video attached to a movie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieVideo {
    /// Site-specific video key (the YouTube video id).
    pub key: String,
    /// Hosting site, e.g. "YouTube".
    pub site: String,
    /// Video type, e.g. "Trailer" or "Teaser".
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

impl MovieVideo {
    /// Watch URL for videos hosted on YouTube.
    pub fn url(&self) -> Option<String> {
        (self.site == "YouTube").then(|| format!("https://www.youtube.com/watch?v={}", self.key))
    }

    fn priority(&self) -> Option<u8> {
        if self.site != "YouTube" {
            return None;
        }
        match (self.kind.as_str(), self.official) {
            ("Trailer", true) => Some(1),
            ("Trailer", false) => Some(2),
            ("Teaser", true) => Some(3),
            _ => None,
        }
    }
}

/// Picks the best trailer: official trailer, then unofficial trailer, then
/// official teaser. Only YouTube videos are considered. Ties keep the first.
pub fn select_trailer(videos: &[MovieVideo]) -> Option<&MovieVideo> {
    videos
        .iter()
        .filter_map(|v| v.priority().map(|p| (p, v)))
        .min_by_key(|(p, _)| *p)
        .map(|(_, v)| v)
}
