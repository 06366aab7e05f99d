// SPDX-FileCopyrightText: 2026 Qlite Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::QliteConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every failure.
pub fn validate_config(config: &QliteConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.database.path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "database.path must not be empty".to_string(),
        });
    }

    if config.session.acquire_timeout_ms == Some(0) {
        errors.push(ConfigError::Validation {
            message: "session.acquire_timeout_ms must be greater than 0 (omit it to wait indefinitely)"
                .to_string(),
        });
    }

    if config.session.call_timeout_ms == Some(0) {
        errors.push(ConfigError::Validation {
            message: "session.call_timeout_ms must be greater than 0 (omit it to wait indefinitely)"
                .to_string(),
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&QliteConfig::default()).is_ok());
    }

    #[test]
    fn empty_path_fails_validation() {
        let mut config = QliteConfig::default();
        config.database.path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database.path"));
    }

    #[test]
    fn zero_timeouts_fail_validation() {
        let mut config = QliteConfig::default();
        config.session.acquire_timeout_ms = Some(0);
        config.session.call_timeout_ms = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "acquire_timeout_ms"));
        assert!(has_message(&errors, "call_timeout_ms"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = QliteConfig::default();
        config.logging.level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "logging.level"));
    }

    #[test]
    fn memory_database_is_valid() {
        let mut config = QliteConfig::default();
        config.database.path = ":memory:".to_string();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
