// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatvault backup` command implementation.

use std::sync::Arc;

use chatvault_config::ChatvaultConfig;
use chatvault_core::ChatvaultError;
use chatvault_engine::BackupEngine;
use chatvault_storage::Database;

use crate::providers::DefaultProviderFactory;

/// Opens storage and builds the engine the operator commands share.
pub(crate) async fn build_engine(
    config: &ChatvaultConfig,
) -> Result<(Database, BackupEngine), ChatvaultError> {
    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let factory = Arc::new(DefaultProviderFactory::new(
        config.meta.clone(),
        config.bridge.clone(),
    ));
    let engine = BackupEngine::new(db.clone(), factory, &config.backup);
    Ok((db, engine))
}

/// Runs one backup for `user_id` and prints the report.
pub async fn run_backup(config: ChatvaultConfig, user_id: &str) -> Result<(), ChatvaultError> {
    let (db, engine) = build_engine(&config).await?;

    let report = engine.perform_backup(user_id).await?;
    println!("backup {} {}", report.backup_id, report.status);
    println!("  source:   {}", report.source);
    println!("  messages: {}", report.total_messages);
    println!("  contacts: {}", report.total_contacts);
    if report.skipped_messages > 0 {
        println!("  skipped:  {}", report.skipped_messages);
    }

    db.close().await
}
