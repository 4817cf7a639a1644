// SPDX-FileCopyrightText: 2026 Panelkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as key lengths, batch bounds, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::PanelkeepConfig;

/// Upper bound on concurrently dispatched decrypt calls per batch.
pub const MAX_BATCH_SIZE: usize = 64;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PanelkeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.general.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "general.log_level `{}` must be one of: {}",
                config.general.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(key) = &config.crypto.encryption_key
        && !is_hex_of_len(key, 32)
    {
        errors.push(ConfigError::Validation {
            message: "crypto.encryption_key must be 64 hex characters (32 bytes)".to_string(),
        });
    }

    if let Some(key) = &config.crypto.fingerprint_key
        && (key.trim().is_empty() || key.len() % 2 != 0 || !key.chars().all(|c| c.is_ascii_hexdigit()))
    {
        errors.push(ConfigError::Validation {
            message: "crypto.fingerprint_key must be a non-empty hex string".to_string(),
        });
    }

    if config.decrypt.batch_size == 0 || config.decrypt.batch_size > MAX_BATCH_SIZE {
        errors.push(ConfigError::Validation {
            message: format!(
                "decrypt.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                config.decrypt.batch_size
            ),
        });
    }

    if config.decrypt.global_index_cap == 0 {
        errors.push(ConfigError::Validation {
            message: "decrypt.global_index_cap must be at least 1".to_string(),
        });
    }

    if config.decrypt.detail_max_retries > 10 {
        errors.push(ConfigError::Validation {
            message: format!(
                "decrypt.detail_max_retries must be at most 10, got {}",
                config.decrypt.detail_max_retries
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_hex_of_len(value: &str, bytes: usize) -> bool {
    value.len() == bytes * 2 && value.chars().all(|c| c.is_ascii_hexdigit())
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
        let config = PanelkeepConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = PanelkeepConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn short_encryption_key_fails_validation() {
        let mut config = PanelkeepConfig::default();
        config.crypto.encryption_key = Some("abcd".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "crypto.encryption_key"));
    }

    #[test]
    fn valid_encryption_key_passes() {
        let mut config = PanelkeepConfig::default();
        config.crypto.encryption_key = Some("0f".repeat(32));
        config.crypto.fingerprint_key = Some("a1b2".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn non_hex_fingerprint_key_fails_validation() {
        let mut config = PanelkeepConfig::default();
        config.crypto.fingerprint_key = Some("not-hex".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "crypto.fingerprint_key"));
    }

    #[test]
    fn batch_size_bounds_are_enforced() {
        let mut config = PanelkeepConfig::default();
        config.decrypt.batch_size = 0;
        assert!(has_message(&validate_config(&config).unwrap_err(), "batch_size"));

        config.decrypt.batch_size = MAX_BATCH_SIZE + 1;
        assert!(has_message(&validate_config(&config).unwrap_err(), "batch_size"));

        config.decrypt.batch_size = MAX_BATCH_SIZE;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = PanelkeepConfig::default();
        config.general.log_level = "loud".to_string();
        config.storage.database_path = " ".to_string();
        config.decrypt.global_index_cap = 0;
        config.decrypt.detail_max_retries = 50;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
