use crate::config::types::{Config, CrawlConfig, HttpConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Save format placeholders that make each saved name distinct
const NAME_PLACEHOLDERS: &[&str] = &["%(file)s", "%(num)d"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_seconds("interval", config.interval)?;
    validate_seconds("jitter", config.jitter)?;
    validate_seconds("retry-delay", config.retry_delay)?;

    if config.rewrite_workers < 1 || config.rewrite_workers > 4 {
        return Err(ConfigError::Validation(format!(
            "rewrite-workers must be between 1 and 4, got {}",
            config.rewrite_workers
        )));
    }

    if let Some(marker) = &config.start_marker {
        if marker.is_empty() {
            return Err(ConfigError::Validation(
                "start-marker cannot be empty".to_string(),
            ));
        }
    }

    validate_save_format(&config.save_format)?;

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if !(config.connect_timeout.is_finite() && config.connect_timeout > 0.0) {
        return Err(ConfigError::Validation(format!(
            "connect-timeout must be positive, got {}",
            config.connect_timeout
        )));
    }

    if !(config.read_timeout.is_finite() && config.read_timeout > 0.0) {
        return Err(ConfigError::Validation(format!(
            "read-timeout must be positive, got {}",
            config.read_timeout
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    for name in config.headers.keys() {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(ConfigError::Validation(format!(
                "Invalid header name '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.destination.is_empty() {
        return Err(ConfigError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }

    if config.history_dir.is_empty() {
        return Err(ConfigError::Validation(
            "history-dir cannot be empty".to_string(),
        ));
    }

    if config.cache_dir.is_empty() {
        return Err(ConfigError::Validation(
            "cache-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates a save format template
fn validate_save_format(format: &str) -> Result<(), ConfigError> {
    if !NAME_PLACEHOLDERS.iter().any(|p| format.contains(p)) {
        return Err(ConfigError::InvalidFormat(format!(
            "'{}' must contain %(file)s or %(num)d",
            format
        )));
    }

    if format.ends_with('/') || format.ends_with(std::path::MAIN_SEPARATOR) {
        return Err(ConfigError::InvalidFormat(format!(
            "'{}' must name a file, not a directory",
            format
        )));
    }

    Ok(())
}
