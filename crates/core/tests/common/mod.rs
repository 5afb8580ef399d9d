//! Shared harness for the lifecycle tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use marquee_core::{
    catalog::{CatalogStore, LIBRARY_CATALOG_FILE, TRAILERS_CATALOG_FILE},
    testing::{fixtures, MockAssetGenerator, MockDownloader, MockMovieCatalog},
    AutoConfirm, Config, Reconciler, RunOptions,
};

/// A library and a trailers folder, with mocks for every external service.
pub struct TestHarness {
    pub library: TempDir,
    pub trailers: TempDir,
    pub catalog: Arc<MockMovieCatalog>,
    pub downloader: Arc<MockDownloader>,
    pub assets: Arc<MockAssetGenerator>,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        let library = TempDir::new().expect("Failed to create library dir");
        let trailers = TempDir::new().expect("Failed to create trailers dir");
        let config = fixtures::config(library.path(), trailers.path());

        Self {
            library,
            trailers,
            catalog: Arc::new(MockMovieCatalog::new()),
            downloader: Arc::new(MockDownloader::new()),
            assets: Arc::new(MockAssetGenerator::new()),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.library.path()
    }

    pub fn trailers_root(&self) -> &Path {
        self.trailers.path()
    }

    /// A reconciler answering every confirmation with `confirm`.
    pub fn reconciler(&self, confirm: bool) -> Reconciler {
        Reconciler::new(
            self.config.clone(),
            self.catalog.clone(),
            self.downloader.clone(),
            self.assets.clone(),
            Arc::new(AutoConfirm(confirm)),
        )
    }

    pub fn options(&self, dry_run: bool) -> RunOptions {
        RunOptions {
            dry_run,
            ..RunOptions::from_config(&self.config)
        }
    }

    /// Creates a fake video under the library root.
    pub fn add_video(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        fixtures::touch(&path);
        path
    }

    pub fn library_store(&self) -> CatalogStore {
        CatalogStore::load(self.root().join(LIBRARY_CATALOG_FILE))
    }

    pub fn trailers_store(&self) -> CatalogStore {
        CatalogStore::load(self.trailers_root().join(TRAILERS_CATALOG_FILE))
    }
}

/// Every file under `dir` with its content, for before/after comparisons.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(dir, &mut files);
    files
}

fn collect(dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.insert(path.clone(), Vec::new());
            collect(&path, files);
        } else {
            let content = std::fs::read(&path).expect("Failed to read file");
            files.insert(path, content);
        }
    }
}
