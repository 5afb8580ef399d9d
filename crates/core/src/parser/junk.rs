//! Junk words learned from the library's own filenames.
//!
//! Release groups and site tags differ from library to library, so on top of
//! the parser's built-in tokens we count how often each word shows up across
//! filenames that are not yet normalized. Words shared by a large fraction of
//! those names are treated as junk.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use tracing::{info, warn};

use crate::storage::{read_json, write_json_atomic, StorageError};

use super::filename::is_normalized_stem;

/// Fewer videos than this and nothing is learned.
const MIN_VIDEOS: usize = 10;
/// Fewer unnormalized names than this and nothing is learned.
const MIN_UNNORMALIZED: usize = 5;
/// Share of unnormalized names a word must appear in.
const JUNK_SHARE: f64 = 0.2;

/// A learned set of junk words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JunkVocabulary {
    words: BTreeSet<String>,
}

impl JunkVocabulary {
    /// Learns junk words from a list of file names.
    pub fn learn<I, S>(file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = file_names
            .into_iter()
            .map(|n| n.as_ref().to_string())
            .collect();

        if names.len() < MIN_VIDEOS {
            info!(
                "Library is too small ({} videos) to learn junk words",
                names.len()
            );
            return Self::default();
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut unnormalized = 0usize;

        for name in &names {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            if is_normalized_stem(&stem) {
                continue;
            }
            unnormalized += 1;

            let unique: HashSet<String> = tokenize(&stem).into_iter().collect();
            for token in unique {
                *counts.entry(token).or_default() += 1;
            }
        }

        if unnormalized < MIN_UNNORMALIZED {
            info!(
                "Not enough unnormalized files ({}) to learn junk words",
                unnormalized
            );
            return Self::default();
        }

        let threshold = unnormalized as f64 * JUNK_SHARE;
        let words: BTreeSet<String> = counts
            .into_iter()
            .filter(|(_, count)| *count as f64 > threshold && *count > 1)
            .map(|(token, _)| token)
            .collect();

        info!(
            "Learned {} junk words from {} unnormalized files",
            words.len(),
            unnormalized
        );
        Self { words }
    }

    /// Loads the cached vocabulary, learning it again when the cache is
    /// missing, corrupt, or `force_rebuild` is set. Nothing is written here;
    /// call [`JunkVocabulary::persist`] once the run is allowed to write.
    pub fn load_or_learn<I, S>(cache_path: &Path, file_names: I, force_rebuild: bool) -> (Self, bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !force_rebuild {
            match read_json::<Vec<String>>(cache_path) {
                Ok(Some(words)) => {
                    return (
                        Self {
                            words: words.into_iter().collect(),
                        },
                        false,
                    )
                }
                Ok(None) => {}
                Err(e) => warn!("Junk word cache is corrupt, rebuilding: {}", e),
            }
        }
        (Self::learn(file_names), true)
    }

    /// Writes the vocabulary to the cache file.
    pub fn persist(&self, cache_path: &Path) -> Result<(), StorageError> {
        let words: Vec<&String> = self.words.iter().collect();
        write_json_atomic(cache_path, &words)
    }

    pub fn words(&self) -> &BTreeSet<String> {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn tokenize(stem: &str) -> Vec<String> {
    stem.replace(['.', '_', '[', ']', '(', ')', '-'], " ")
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() > 2 && !t.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tagged_names() -> Vec<String> {
        [
            "Heat.1995.GRPX.mkv",
            "Alien.1979.GRPX.mkv",
            "Brazil.1985.GRPX.mkv",
            "Ronin.1998.GRPX.mkv",
            "Fargo.1996.GRPX.mkv",
            "Gattaca.1997.other.mkv",
            "Se7en.1995.misc.mkv",
            "Jaws (1975).mkv",
            "Rocky (1976).mkv",
            "Tron (1982).mkv",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_learns_recurring_tokens() {
        let vocab = JunkVocabulary::learn(tagged_names());
        assert!(vocab.words().contains("grpx"));
        assert!(!vocab.words().contains("heat"));
        assert!(!vocab.words().contains("1995"));
    }

    #[test]
    fn test_small_library_learns_nothing() {
        let vocab = JunkVocabulary::learn(["Heat.1995.GRPX.mkv", "Alien.1979.GRPX.mkv"]);
        assert!(vocab.is_empty());
    }

    #[test]
    fn test_mostly_normalized_library_learns_nothing() {
        let mut names: Vec<String> = (0..10).map(|i| format!("Movie {} (2001).mkv", i)).collect();
        names.push("Heat.1995.GRPX.mkv".to_string());
        assert!(JunkVocabulary::learn(names).is_empty());
    }

    #[test]
    fn test_cache_round_trip_and_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junk_words.json");

        let (learned, fresh) = JunkVocabulary::load_or_learn(&path, tagged_names(), false);
        assert!(fresh);
        learned.persist(&path).unwrap();

        let (cached, fresh) = JunkVocabulary::load_or_learn(&path, Vec::<String>::new(), false);
        assert!(!fresh);
        assert_eq!(cached, learned);

        std::fs::write(&path, b"[\"grpx\"").unwrap();
        let (rebuilt, fresh) = JunkVocabulary::load_or_learn(&path, tagged_names(), false);
        assert!(fresh);
        assert!(rebuilt.words().contains("grpx"));
    }
}
