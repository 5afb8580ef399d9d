//! Movie catalog - the verified, deduplicated record of what is on disk.
//!
//! Two stores share this type: the library catalog (`library.json` in the
//! library root) and the upcoming-trailers catalog (`trailers.json` in the
//! trailers root). Both are flat JSON files keyed by TMDB id, rewritten
//! atomically.

mod store;
mod types;

pub use store::CatalogStore;
pub use types::*;

/// File name of the library catalog.
pub const LIBRARY_CATALOG_FILE: &str = "library.json";

/// File name of the upcoming-trailers catalog.
pub const TRAILERS_CATALOG_FILE: &str = "trailers.json";
