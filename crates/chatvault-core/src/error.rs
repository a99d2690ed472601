// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Chatvault backup service.

use thiserror::Error;

/// The primary error type used across all Chatvault crates.
#[derive(Debug, Error)]
pub enum ChatvaultError {
    /// Configuration errors (missing credentials, invalid plan selection,
    /// bad TOML). Never retried automatically.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Provider adapter errors (fetch failure, bad payload, bridge unreachable).
    /// Fatal to the backup run that triggered the fetch.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Backup run errors that are not provider-level (run already in flight,
    /// malformed message payload during extraction).
    #[error("backup error: {0}")]
    Backup(String),

    /// A backup run was rejected by plan policy. The string is the
    /// human-readable reason returned to the caller.
    #[error("backup not permitted: {0}")]
    PlanDenied(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
