// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Figment guarantees types; this module checks value-level constraints
//! (ranges, URL shapes, known log levels) and collects every failure so
//! the operator sees all problems at once.

use crate::diagnostic::ConfigError;
use crate::model::ChatvaultConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized config, collecting all errors.
pub fn validate_config(config: &ChatvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::invalid_value(
            "service.log_level",
            format!(
                "'{}' is not a log level (expected one of: {})",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid_value(
            "storage.database_path",
            "must not be empty",
        ));
    }

    validate_base_url(&mut errors, "meta.base_url", &config.meta.base_url);
    validate_base_url(&mut errors, "bridge.base_url", &config.bridge.base_url);

    if config.meta.page_size == 0 || config.meta.page_size > 100 {
        errors.push(ConfigError::invalid_value(
            "meta.page_size",
            "must be between 1 and 100",
        ));
    }

    if config.backup.days_back == 0 {
        errors.push(ConfigError::invalid_value(
            "backup.days_back",
            "must be at least 1",
        ));
    }

    if config.backup.fetch_timeout_secs == 0 {
        errors.push(ConfigError::invalid_value(
            "backup.fetch_timeout_secs",
            "must be at least 1",
        ));
    }

    if config.backup.scheduler_retry_secs == 0 {
        errors.push(ConfigError::invalid_value(
            "backup.scheduler_retry_secs",
            "must be at least 1",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn validate_base_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ConfigError::invalid_value(key, "must not be empty"));
        return;
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        errors.push(ConfigError::invalid_value(
            key,
            format!("'{value}' must start with http:// or https://"),
        ));
    }
}
