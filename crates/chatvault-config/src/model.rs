// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Chatvault backup service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Chatvault configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatvaultConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Business-API provider settings (Pro tier).
    #[serde(default)]
    pub meta: MetaConfig,

    /// QR-session bridge provider settings (Express tier).
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Backup run and scheduler settings.
    #[serde(default)]
    pub backup: BackupConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "chatvault".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatvault").join("chatvault.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatvault.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Business-API provider configuration.
///
/// Per-user credentials (phone id, access token) live on the user record;
/// this section holds only endpoint-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    /// Base URL of the Graph-style listing endpoint.
    #[serde(default = "default_meta_base_url")]
    pub base_url: String,

    /// Messages requested per page (the endpoint caps at 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_meta_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            base_url: default_meta_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_meta_timeout_secs(),
        }
    }
}

fn default_meta_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_meta_timeout_secs() -> u64 {
    30
}

/// Bridge provider configuration.
///
/// The bridge is a locally-run companion process that manages QR-based
/// sessions; per-user session ids live on the user record.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the local bridge process.
    #[serde(default = "default_bridge_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_bridge_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_bridge_connect_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_base_url(),
            request_timeout_secs: default_bridge_timeout_secs(),
            connect_timeout_secs: default_bridge_connect_secs(),
        }
    }
}

fn default_bridge_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_bridge_timeout_secs() -> u64 {
    30
}

fn default_bridge_connect_secs() -> u64 {
    10
}

/// Backup run and scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// History lookback window in days for full backups.
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// Upper bound on one provider fetch. A hung provider call must not
    /// wedge a scheduler batch; the batch proceeds to the next user on
    /// timeout.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Shortened sleep after an unexpected scheduler batch error, distinct
    /// from the steady-state tier cadence.
    #[serde(default = "default_scheduler_retry_secs")]
    pub scheduler_retry_secs: u64,

    /// How often the billing-period rollover task checks for expired
    /// periods.
    #[serde(default = "default_rollover_check_secs")]
    pub rollover_check_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            scheduler_retry_secs: default_scheduler_retry_secs(),
            rollover_check_secs: default_rollover_check_secs(),
        }
    }
}

fn default_days_back() -> u32 {
    90
}

fn default_fetch_timeout_secs() -> u64 {
    120
}

fn default_scheduler_retry_secs() -> u64 {
    60 * 60
}

fn default_rollover_check_secs() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ChatvaultConfig::default();
        assert_eq!(config.service.name, "chatvault");
        assert_eq!(config.service.log_level, "info");
        assert!(config.storage.wal_mode);
        assert_eq!(config.meta.page_size, 100);
        assert_eq!(config.backup.days_back, 90);
        assert_eq!(config.backup.scheduler_retry_secs, 3600);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = ChatvaultConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: ChatvaultConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.meta.base_url, config.meta.base_url);
        assert_eq!(parsed.bridge.base_url, config.bridge.base_url);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = toml::from_str::<ChatvaultConfig>(
            "[backup]\ndays_back = 30\nnot_a_key = true\n",
        );
        assert!(result.is_err());
    }
}
