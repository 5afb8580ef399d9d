use super::{types::Config, ConfigError};

/// Placeholder key shipped in the sample configuration.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY";

/// Validate configuration
/// Currently validates:
/// - TMDB API key is set and not the placeholder
/// - Worker pools and persist batch are non-zero
/// - Resolver thresholds are within 0.0-1.0
/// - Upcoming year range is ordered
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.tmdb.api_key.trim().is_empty() || config.tmdb.api_key.contains(API_KEY_PLACEHOLDER) {
        return Err(ConfigError::ValidationError(
            "tmdb.api_key must be set".to_string(),
        ));
    }

    if config.workers.max_network_workers == 0 || config.workers.max_asset_workers == 0 {
        return Err(ConfigError::ValidationError(
            "worker pool sizes cannot be 0".to_string(),
        ));
    }

    if config.catalog.persist_every == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.persist_every cannot be 0".to_string(),
        ));
    }

    for (name, value) in [
        ("resolver.auto_accept_threshold", config.resolver.auto_accept_threshold),
        ("resolver.fuzzy_min_similarity", config.resolver.fuzzy_min_similarity),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }
    }

    if config.upcoming.start_year > config.upcoming.end_year {
        return Err(ConfigError::ValidationError(format!(
            "upcoming.start_year ({}) is after upcoming.end_year ({})",
            config.upcoming.start_year, config.upcoming.end_year
        )));
    }

    Ok(())
}
