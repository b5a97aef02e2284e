//! Configuration validation utilities.

use ballot_storage::{BackendKind, StorageConfig};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BallotConfig, CommandConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BallotConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_storage_config(&config.storage)?;
    validate_command_config(&config.commands)?;
    Ok(())
}

/// Validates logging configuration.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for module in logging.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: '{module}'"
            )));
        }
    }

    Ok(())
}

/// Validates storage configuration.
fn validate_storage_config(storage: &StorageConfig) -> ConfigResult<()> {
    if storage.space.is_empty() {
        return Err(ConfigError::missing_field("storage.space"));
    }

    if storage.backend == BackendKind::File && storage.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("storage.path"));
    }

    if storage.connect_attempts == 0 {
        return Err(ConfigError::validation(
            "storage.connect_attempts must be at least 1",
        ));
    }

    Ok(())
}

/// Validates command handling configuration.
fn validate_command_config(commands: &CommandConfig) -> ConfigResult<()> {
    if commands.timeout_ms == 0 {
        return Err(ConfigError::validation(
            "commands.timeout_ms must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&BallotConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = BallotConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { ref field }) if field == "logging.file_path"
        ));

        config.logging.file_path = Some(PathBuf::from("ballot.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_storage() {
        let mut config = BallotConfig::default();
        config.storage.connect_attempts = 0;
        assert!(validate_config(&config).is_err());

        let mut config = BallotConfig::default();
        config.storage.backend = BackendKind::File;
        config.storage.path = PathBuf::new();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = BallotConfig::default();
        config.commands.timeout_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }
}
