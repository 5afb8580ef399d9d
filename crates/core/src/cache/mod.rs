//! Persistent caches kept next to the catalog.
//!
//! - [`TimedCache`]: remote query results with a time-to-live.
//! - [`FailureCache`]: movies known to have no fetchable trailer.
//!
//! Both load leniently (a corrupt file is an empty cache) and are only
//! written when the caller persists them after a run's plan was executed.

mod failures;
mod timed;

pub use failures::FailureCache;
pub use timed::TimedCache;

/// Discover results per year.
pub const MOVIES_CACHE_FILE: &str = "movies_cache.json";

/// Movies without a usable trailer.
pub const KNOWN_FAILURES_FILE: &str = "known_failures.json";

/// Learned junk words.
pub const JUNK_WORDS_FILE: &str = "junk_cache.json";
