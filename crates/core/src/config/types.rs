use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub tmdb: TmdbSection,
    pub library: LibraryConfig,
    /// Simulate every mutating operation and ask before applying it.
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upcoming: UpcomingConfig,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
}

/// TMDB access
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbSection {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 20)
    #[serde(default = "default_tmdb_timeout")]
    pub timeout_secs: u64,
}

fn default_tmdb_timeout() -> u64 {
    20
}

/// Library layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Folder holding the movie collection.
    pub root: PathBuf,
    /// Folder holding upcoming-movie trailer folders.
    pub trailers_root: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache")
}

fn default_video_extensions() -> Vec<String> {
    ["mkv", "mp4", "avi", "mov", "wmv", "flv"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl LibraryConfig {
    /// Whether the extension (without the dot) is a video extension.
    pub fn is_video_extension(&self, ext: &str) -> bool {
        self.video_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

/// Identity matching policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Single fuzzy candidates at or above this confidence are accepted (0.0-1.0).
    #[serde(default = "default_threshold")]
    pub auto_accept_threshold: f32,
    /// Minimum title similarity for a fuzzy candidate to survive (0.0-1.0).
    #[serde(default = "default_similarity")]
    pub fuzzy_min_similarity: f32,
    /// Allowed distance in years for fuzzy candidates.
    #[serde(default = "default_year_tolerance")]
    pub year_tolerance: u32,
}

fn default_threshold() -> f32 {
    0.85
}

fn default_similarity() -> f32 {
    0.8
}

fn default_year_tolerance() -> u32 {
    1
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            auto_accept_threshold: default_threshold(),
            fuzzy_min_similarity: default_similarity(),
            year_tolerance: default_year_tolerance(),
        }
    }
}

/// Remote call retry policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before each retry in milliseconds (default: immediate)
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_max_retries() -> u32 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: 0,
        }
    }
}

/// Catalog persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Persist the catalog after this many committed changes.
    #[serde(default = "default_persist_every")]
    pub persist_every: usize,
}

fn default_persist_every() -> usize {
    50
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            persist_every: default_persist_every(),
        }
    }
}

/// Worker pool sizes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Concurrent metadata lookups and downloads.
    #[serde(default = "default_network_workers")]
    pub max_network_workers: usize,
    /// Concurrent ffmpeg invocations.
    #[serde(default = "default_asset_workers")]
    pub max_asset_workers: usize,
}

fn default_network_workers() -> usize {
    4
}

fn default_asset_workers() -> usize {
    2
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_network_workers: default_network_workers(),
            max_asset_workers: default_asset_workers(),
        }
    }
}

/// Remote query cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Age in seconds after which a cached query is refetched (default: 1 day)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

/// Upcoming movie discovery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpcomingConfig {
    #[serde(default = "default_start_year")]
    pub start_year: u32,
    #[serde(default = "default_end_year")]
    pub end_year: u32,
    #[serde(default = "default_pages")]
    pub pages_per_year: u32,
    /// Extra query parameters for the discover endpoint.
    #[serde(default = "default_filters")]
    pub filters: BTreeMap<String, String>,
}

fn default_start_year() -> u32 {
    2024
}

fn default_end_year() -> u32 {
    2025
}

fn default_pages() -> u32 {
    3
}

fn default_filters() -> BTreeMap<String, String> {
    [
        ("language", "en-US"),
        ("sort_by", "popularity.desc"),
        ("include_adult", "false"),
        ("include_video", "false"),
        ("vote_count.gte", "50"),
        ("vote_average.gte", "4"),
        ("with_original_language", "en"),
        ("without_genres", "10751"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for UpcomingConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            pages_per_year: default_pages(),
            filters: default_filters(),
        }
    }
}

/// Placeholder and backdrop generation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_duration")]
    pub placeholder_duration_secs: u32,
    #[serde(default = "default_resolution")]
    pub placeholder_resolution: String,
    #[serde(default = "default_true")]
    pub create_placeholder: bool,
    #[serde(default = "default_true")]
    pub create_backdrop: bool,
    #[serde(default = "default_asset_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_duration() -> u32 {
    1
}

fn default_resolution() -> String {
    "1920x1080".to_string()
}

fn default_asset_timeout() -> u64 {
    120
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            placeholder_duration_secs: default_duration(),
            placeholder_resolution: default_resolution(),
            create_placeholder: true,
            create_backdrop: true,
            timeout_secs: default_asset_timeout(),
        }
    }
}

/// Trailer download backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    #[serde(default = "default_yt_dlp")]
    pub yt_dlp_path: PathBuf,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

fn default_yt_dlp() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_format() -> String {
    "bestvideo[height<=1080]+bestaudio/best".to_string()
}

fn default_download_timeout() -> u64 {
    600
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp(),
            format: default_format(),
            timeout_secs: default_download_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Sanitized config for printing (API key redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api_key_configured: bool,
    pub library: LibraryConfig,
    pub dry_run: bool,
    pub resolver: ResolverConfig,
    pub workers: WorkerConfig,
    pub cache: CacheConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key_configured: !config.tmdb.api_key.is_empty(),
            library: config.library.clone(),
            dry_run: config.dry_run,
            resolver: config.resolver.clone(),
            workers: config.workers.clone(),
            cache: config.cache.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[tmdb]
api_key = "abc"

[library]
root = "/movies"
trailers_root = "/trailers"
"#;

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.tmdb.timeout_secs, 20);
        assert_eq!(config.resolver.auto_accept_threshold, 0.85);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.delay_ms, 0);
        assert_eq!(config.catalog.persist_every, 50);
        assert_eq!(config.workers.max_network_workers, 4);
        assert_eq!(config.workers.max_asset_workers, 2);
        assert_eq!(config.cache.ttl_secs, 86400);
        assert_eq!(config.upcoming.pages_per_year, 3);
        assert_eq!(config.upcoming.filters.get("sort_by").unwrap(), "popularity.desc");
        assert_eq!(config.library.cache_dir, PathBuf::from(".cache"));
    }

    #[test]
    fn test_deserialize_missing_library_fails() {
        let toml = r#"
[tmdb]
api_key = "abc"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_video_extension_check() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert!(config.library.is_video_extension("MKV"));
        assert!(config.library.is_video_extension("mp4"));
        assert!(!config.library.is_video_extension("srt"));
    }

    #[test]
    fn test_sanitized_config_hides_key() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.api_key_configured);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("\"abc\""));
    }
}
