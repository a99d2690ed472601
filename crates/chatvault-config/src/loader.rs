// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./chatvault.toml` > `~/.config/chatvault/chatvault.toml`
//! > `/etc/chatvault/chatvault.toml` with environment variable overrides via
//! `CHATVAULT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatvaultConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/chatvault/chatvault.toml` (system-wide)
/// 3. `~/.config/chatvault/chatvault.toml` (user XDG config)
/// 4. `./chatvault.toml` (local directory)
/// 5. `CHATVAULT_*` environment variables
pub fn load_config() -> Result<ChatvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatvaultConfig::default()))
        .merge(Toml::file("/etc/chatvault/chatvault.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("chatvault/chatvault.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("chatvault.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Useful for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatvaultConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatvaultConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatvaultConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CHATVAULT_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("CHATVAULT_").map(|key| {
        // `map()` sees the env var name in its original case with the
        // prefix stripped, so lowercase before matching sections.
        // Example: CHATVAULT_BRIDGE_BASE_URL -> "bridge_base_url"
        let key_str = key.as_str().to_ascii_lowercase();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("meta_", "meta.", 1)
            .replacen("bridge_", "bridge.", 1)
            .replacen("backup_", "backup.", 1);
        mapped.into()
    })
}
