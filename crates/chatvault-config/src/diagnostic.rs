// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error type and rendering.

use thiserror::Error;

/// A configuration error tied to a specific key.
#[derive(Debug, Error)]
#[error("config error at `{key}`: {message}")]
pub struct ConfigError {
    pub key: String,
    pub message: String,
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap a figment extraction error. Figment already names the failing
    /// key path in its message.
    pub fn from_figment(err: &figment::Error) -> Self {
        let key = if err.path.is_empty() {
            "<root>".to_string()
        } else {
            err.path.join(".")
        };
        Self {
            key,
            message: err.kind.to_string(),
        }
    }
}

/// Print collected config errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    eprintln!("invalid configuration ({} error(s)):", errors.len());
    for err in errors {
        eprintln!("  - {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_key() {
        let err = ConfigError::invalid_value("backup.days_back", "must be at least 1");
        let text = err.to_string();
        assert!(text.contains("backup.days_back"));
        assert!(text.contains("must be at least 1"));
    }

    #[test]
    fn from_figment_extracts_key_path() {
        let err = crate::loader::load_config_from_str("[backup]\ndays_back = \"many\"\n")
            .unwrap_err();
        let config_err = ConfigError::from_figment(&err);
        assert!(!config_err.message.is_empty());
    }
}
