pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod executor;
pub mod external_catalog;
pub mod library;
pub mod parser;
pub mod pipeline;
pub mod planner;
pub mod resolver;
pub mod retry;
pub mod storage;
pub mod testing;

pub use catalog::{AssetKind, CatalogEntry, CatalogStore, MovieId};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use executor::{AutoConfirm, Confirmer, Simulation};
pub use pipeline::{
    AssetOptions, DownloadRecord, Operation, PipelineError, Reconciler, RunOptions, RunReport,
    RunStatus, SkipCategory, SkipRecord, UpcomingOptions,
};
