//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{DomainConfig, LogOutput, LoggingConfig, WardenConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WardenConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_domain_config(&config.domain)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.output == LogOutput::File {
        let Some(path) = &config.file_path else {
            return Err(ConfigError::missing_field("logging.file_path"));
        };
        if path.file_name().is_none() {
            return Err(ConfigError::validation(format!(
                "Log file path has no file name: {}",
                path.display()
            )));
        }
    }

    if config.max_files == 0 {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0",
        ));
    }

    for module in config.filters.keys() {
        validate_filter_target(module)?;
    }

    Ok(())
}

/// A filter target must be usable as the left side of an `EnvFilter` directive.
fn validate_filter_target(module: &str) -> ConfigResult<()> {
    if module.is_empty() {
        return Err(ConfigError::validation("Log filter target cannot be empty"));
    }

    if module
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '=' | ',' | '[' | ']' | '{' | '}'))
    {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {module:?}"
        )));
    }

    Ok(())
}

/// Validates domain defaults.
fn validate_domain_config(config: &DomainConfig) -> ConfigResult<()> {
    if let Some(prefix) = &config.name_prefix
        && prefix.trim().is_empty()
    {
        return Err(ConfigError::validation(
            "domain.name_prefix cannot be blank when set",
        ));
    }
    Ok(())
}
