//! Title and year extraction from raw movie filenames.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{ParseOutcome, ParseResult};

/// Release and quality tokens that never belong to a title.
const DEFAULT_JUNK_TOKENS: &[&str] = &[
    "4k", "2160p", "1080p", "720p", "480p", "uhd", "hdr", "hdr10", "bluray", "blu-ray", "brrip",
    "bdrip", "webrip", "web-dl", "webdl", "hdtv", "dvdrip", "x264", "x265", "h264", "h265",
    "hevc", "avc", "aac", "ac3", "dts", "remux", "10bit",
];

/// Titles that identify extras rather than movies.
const JUNK_TITLES: &[&str] = &[
    "sample",
    "video sample",
    "deleted scenes",
    "featurette",
    "behind the scenes",
    "trailer",
];

static BRACKETED_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\(\[\{]\s*((?:19|20)\d{2})\s*[\)\]\}]").expect("static regex")
});

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").expect("static regex"));

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._]+").expect("static regex"));

static NORMALIZED_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.+\s\((?:19|20)\d{2}\)$").expect("static regex"));

/// Whether a file stem already follows the `Title (Year)` convention.
pub fn is_normalized_stem(stem: &str) -> bool {
    NORMALIZED_STEM.is_match(stem)
}

/// Parses movie filenames into a title and a year.
///
/// The parser holds only its junk vocabulary; parsing is a pure function of
/// the input name.
#[derive(Debug, Clone)]
pub struct FilenameParser {
    junk_tokens: HashSet<String>,
}

impl Default for FilenameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FilenameParser {
    /// Creates a parser with the built-in junk tokens.
    pub fn new() -> Self {
        Self {
            junk_tokens: DEFAULT_JUNK_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Adds learned junk words on top of the built-in ones.
    pub fn with_junk_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.junk_tokens
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    /// Parses a raw filename or path.
    pub fn parse(&self, raw: impl AsRef<Path>) -> ParseResult {
        let raw_path = raw.as_ref().to_path_buf();
        let stem = raw_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let normalized = normalize(&stem);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        // Last year-shaped token with at least one token in front of it.
        let year_idx = tokens
            .iter()
            .enumerate()
            .rev()
            .find(|(idx, token)| *idx > 0 && year_value(token).is_some())
            .map(|(idx, _)| idx);

        let Some(year_idx) = year_idx else {
            return ParseResult::failed(raw_path, ParseOutcome::NoYear);
        };
        let Some(year) = year_value(tokens[year_idx]) else {
            return ParseResult::failed(raw_path, ParseOutcome::NoYear);
        };

        let title = tokens[..year_idx]
            .iter()
            .filter(|t| !self.junk_tokens.contains(&t.to_lowercase()))
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        if title.is_empty() {
            return ParseResult::failed(raw_path, ParseOutcome::EmptyTitle);
        }

        if JUNK_TITLES.contains(&title.to_lowercase().as_str()) {
            return ParseResult::failed(raw_path, ParseOutcome::JunkTitle);
        }

        ParseResult::parsed(raw_path, title, year)
    }
}

/// Parses with the default vocabulary.
pub fn parse_filename(raw: impl AsRef<Path>) -> ParseResult {
    FilenameParser::new().parse(raw)
}

/// Unwraps bracketed years, drops other bracketed noise and collapses
/// separators into single spaces.
fn normalize(stem: &str) -> String {
    let unwrapped = BRACKETED_YEAR.replace_all(stem, " $1 ");
    let stripped = BRACKETED.replace_all(&unwrapped, " ");
    let spaced = SEPARATORS.replace_all(&stripped, " ");
    let dashed = collapse_dashes(&spaced);
    dashed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps dashes joining two letters ("Spider-Man"), turns the rest into spaces.
fn collapse_dashes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if c != '-' {
                return c;
            }
            let prev_alpha = i > 0 && chars[i - 1].is_alphabetic();
            let next_alpha = chars.get(i + 1).is_some_and(|n| n.is_alphabetic());
            if prev_alpha && next_alpha {
                '-'
            } else {
                ' '
            }
        })
        .collect()
}

fn year_value(token: &str) -> Option<u32> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: u32 = token.parse().ok()?;
    (1900..=2099).contains(&year).then_some(year)
}
