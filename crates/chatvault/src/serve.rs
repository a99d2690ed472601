// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatvault serve` command implementation.
//!
//! Opens storage, builds the real provider factory, and spawns the three
//! background tasks: one scheduler per tier and the billing-period
//! rollover sweep. Runs until SIGINT/SIGTERM, then drains the tasks and
//! checkpoints the database.

use std::sync::Arc;
use std::time::Duration;

use chatvault_config::ChatvaultConfig;
use chatvault_core::ChatvaultError;
use chatvault_core::types::PlanTier;
use chatvault_engine::BackupEngine;
use chatvault_plans::PlanPolicy;
use chatvault_scheduler::{TierScheduler, run_period_rollover};
use chatvault_storage::Database;
use tracing::{info, warn};

use crate::providers::DefaultProviderFactory;
use crate::shutdown;

/// Runs the `chatvault serve` command.
pub async fn run_serve(config: ChatvaultConfig) -> Result<(), ChatvaultError> {
    info!("starting chatvault serve");

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    let factory = Arc::new(DefaultProviderFactory::new(
        config.meta.clone(),
        config.bridge.clone(),
    ));
    let engine = BackupEngine::new(db.clone(), factory, &config.backup);
    let policy = PlanPolicy::new(db.clone());

    let cancel = shutdown::install_signal_handler();
    let retry_backoff = Duration::from_secs(config.backup.scheduler_retry_secs);

    let mut tasks = Vec::new();
    for tier in [PlanTier::Express, PlanTier::Pro] {
        let scheduler = TierScheduler::new(tier, db.clone(), engine.clone(), retry_backoff);
        tasks.push(tokio::spawn(scheduler.run(cancel.clone())));
    }
    tasks.push(tokio::spawn(run_period_rollover(
        policy,
        Duration::from_secs(config.backup.rollover_check_secs),
        cancel.clone(),
    )));

    info!("chatvault serve running, press Ctrl+C to stop");
    cancel.cancelled().await;

    for task in tasks {
        if let Err(err) = task.await {
            warn!(error = %err, "background task did not shut down cleanly");
        }
    }
    db.close().await?;
    info!("chatvault serve stopped");
    Ok(())
}

/// Initializes the tracing subscriber from `RUST_LOG`, falling back to
/// the configured service log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatvault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
