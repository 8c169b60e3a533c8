use crate::config::types::{Config, CrawlerConfig, PersistenceConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_persistence_config(&config.persistence)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.delay_min_secs < 0.0 || config.delay_max_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay bounds must be non-negative, got ({}, {})",
            config.delay_min_secs, config.delay_max_secs
        )));
    }

    if config.delay_min_secs > config.delay_max_secs {
        return Err(ConfigError::Validation(format!(
            "delay-min-secs ({}) must not exceed delay-max-secs ({})",
            config.delay_min_secs, config.delay_max_secs
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.worker_count < 1 || config.worker_count > 100 {
        return Err(ConfigError::Validation(format!(
            "worker-count must be between 1 and 100, got {}",
            config.worker_count
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch-timeout-secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.retry_ceiling < 1 || config.retry_ceiling > 10 {
        return Err(ConfigError::Validation(format!(
            "retry-ceiling must be between 1 and 10, got {}",
            config.retry_ceiling
        )));
    }

    Ok(())
}

/// Validates persistence configuration
fn validate_persistence_config(config: &PersistenceConfig) -> Result<(), ConfigError> {
    if config.cache_path.is_empty() {
        return Err(ConfigError::Validation(
            "cache-path cannot be empty".to_string(),
        ));
    }

    if config.output_path.is_empty() {
        return Err(ConfigError::Validation(
            "output-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
