//! Testing utilities and mock implementations.
//!
//! Mocks of every external service trait, so the pipeline can be driven
//! end to end against a temporary directory without network or binaries.
//!
//! # Example
//!
//! ```rust,ignore
//! use marquee_core::testing::{fixtures, MockDownloader, MockMovieCatalog};
//!
//! let catalog = MockMovieCatalog::new();
//! catalog
//!     .add_search_results("The Matrix", vec![fixtures::movie(603, "The Matrix", 1999)])
//!     .await;
//! let downloader = MockDownloader::new();
//! ```

mod mock_asset_generator;
mod mock_downloader;
mod mock_movie_catalog;

pub use mock_asset_generator::MockAssetGenerator;
pub use mock_downloader::MockDownloader;
pub use mock_movie_catalog::{MockMovieCatalog, RecordedSearch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::config::Config;
    use crate::external_catalog::{MovieCandidate, MovieVideo};

    /// A movie candidate released mid-year.
    pub fn movie(id: u32, title: &str, year: u32) -> MovieCandidate {
        MovieCandidate {
            id,
            title: title.to_string(),
            release_date: Some(format!("{}-06-15", year)),
            popularity: 10.0,
        }
    }

    /// An official YouTube trailer.
    pub fn youtube_trailer(key: &str) -> MovieVideo {
        MovieVideo {
            key: key.to_string(),
            site: "YouTube".to_string(),
            kind: "Trailer".to_string(),
            official: true,
        }
    }

    /// Default configuration over the given folders, with dry-run off and
    /// a single discover page per year.
    pub fn config(root: &Path, trailers_root: &Path) -> Config {
        let mut config: Config = toml::from_str(&format!(
            r#"
dry_run = false

[tmdb]
api_key = "test-key"

[library]
root = '{}'
trailers_root = '{}'
"#,
            root.display(),
            trailers_root.display()
        ))
        .expect("fixture config");
        config.upcoming.pages_per_year = 1;
        config
    }

    /// Writes a small fake video file, creating parent folders.
    pub fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture folder");
        }
        std::fs::write(path, b"video").expect("write fixture file");
    }
}
