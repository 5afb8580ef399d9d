//! Canonical names: `Title (Year)/Title (Year).ext` plus the assets next to it.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Suffix marking trailer files, `<Folder>-trailer.<ext>`.
pub const TRAILER_SUFFIX: &str = "-trailer";

pub const BACKDROP_FILE_NAME: &str = "backdrop.jpg";

static FORBIDDEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]+"#).expect("static regex"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// `Title (Year)` with characters that are invalid in file names replaced
/// and runs of whitespace collapsed.
pub fn folder_name(title: &str, year: u32) -> String {
    let raw = format!("{} ({})", title.trim(), year);
    let replaced = FORBIDDEN.replace_all(&raw, " ");
    WHITESPACE.replace_all(&replaced, " ").trim().to_string()
}

/// Relative path of a movie file in the canonical layout.
pub fn canonical_movie_path(title: &str, year: u32, extension: &str) -> PathBuf {
    let folder = folder_name(title, year);
    let file = with_extension(&folder, extension);
    PathBuf::from(&folder).join(file)
}

/// `<folder>/<Folder>-trailer.<ext>`.
pub fn trailer_path(folder: &Path, extension: &str) -> PathBuf {
    let stem = format!("{}{}", file_name(folder), TRAILER_SUFFIX);
    folder.join(with_extension(&stem, extension))
}

/// `<folder>/<Folder>.mp4`.
pub fn placeholder_path(folder: &Path) -> PathBuf {
    folder.join(format!("{}.mp4", file_name(folder)))
}

/// `<folder>/backdrop.jpg`.
pub fn backdrop_path(folder: &Path) -> PathBuf {
    folder.join(BACKDROP_FILE_NAME)
}

/// First trailer file inside `dir`, by name.
pub fn find_trailer(dir: &Path) -> Option<PathBuf> {
    let mut trailers: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_trailer(path))
        .collect();
    trailers.sort();
    trailers.into_iter().next()
}

/// Whether a file name marks a trailer.
pub(crate) fn is_trailer(path: &Path) -> bool {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().ends_with(TRAILER_SUFFIX))
        .unwrap_or(false)
}

fn file_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn with_extension(stem: &str, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}
