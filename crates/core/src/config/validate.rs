use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Catalog API key is present
/// - Request rate is non-zero
/// - Freshness windows are non-zero
/// - Retry delays are ordered
/// - Server port is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.catalog.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.api_key cannot be empty".to_string(),
        ));
    }

    if config.catalog.requests_per_second == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.requests_per_second must be greater than 0".to_string(),
        ));
    }

    let cache = &config.cache;
    let windows = [
        ("cache.list_ttl_secs", cache.list_ttl_secs),
        ("cache.detail_ttl_secs", cache.detail_ttl_secs),
        ("cache.search_ttl_secs", cache.search_ttl_secs),
        ("cache.default_ttl_secs", cache.default_ttl_secs),
    ];
    for (name, value) in windows {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than 0"
            )));
        }
    }

    if cache.retry_base_delay_ms > cache.retry_max_delay_ms {
        return Err(ConfigError::ValidationError(
            "cache.retry_base_delay_ms cannot exceed cache.retry_max_delay_ms".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
