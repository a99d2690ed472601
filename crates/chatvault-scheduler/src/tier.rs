// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tier scheduled backups.

use std::time::Duration;

use chatvault_core::ChatvaultError;
use chatvault_core::types::PlanTier;
use chatvault_engine::BackupEngine;
use chatvault_plans::plan_for;
use chatvault_storage::Database;
use chatvault_storage::queries::users;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of one scheduler batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
}

/// Scheduled backups for one tier.
///
/// The loop runs a batch, then sleeps the tier cadence; after an
/// unexpected batch-level error it sleeps the shortened retry backoff
/// instead. Per-user failures never abort a batch.
pub struct TierScheduler {
    tier: PlanTier,
    db: Database,
    engine: BackupEngine,
    cadence: Duration,
    retry_backoff: Duration,
}

impl TierScheduler {
    /// Cadence comes from the tier's plan terms; `retry_backoff` from
    /// config (`backup.scheduler_retry_secs`).
    pub fn new(
        tier: PlanTier,
        db: Database,
        engine: BackupEngine,
        retry_backoff: Duration,
    ) -> Self {
        let hours = plan_for(tier).backup_frequency_hours;
        Self {
            tier,
            db,
            engine,
            cadence: Duration::from_secs(u64::from(hours) * 3600),
            retry_backoff,
        }
    }

    /// Overrides the steady-state cadence (tests).
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    /// Run until cancelled. Executes one batch immediately, then loops.
    pub async fn run(self, cancel: CancellationToken) {
        info!(tier = %self.tier, cadence_secs = self.cadence.as_secs(), "tier scheduler started");
        loop {
            let sleep_for = match self.run_batch().await {
                Ok(summary) => {
                    info!(
                        tier = %self.tier,
                        attempted = summary.attempted,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "scheduled batch finished"
                    );
                    self.cadence
                }
                Err(err) => {
                    warn!(tier = %self.tier, error = %err, "scheduled batch failed, backing off");
                    self.retry_backoff
                }
            };

            tokio::select! {
                () = cancel.cancelled() => {
                    info!(tier = %self.tier, "tier scheduler stopped");
                    return;
                }
                () = tokio::time::sleep(sleep_for) => {}
            }
        }
    }

    /// Back up every eligible user of this tier. A user's failure is
    /// logged and counted; the iteration continues.
    pub async fn run_batch(&self) -> Result<BatchSummary, ChatvaultError> {
        let candidates = users::list_backup_candidates(&self.db, self.tier).await?;
        let mut summary = BatchSummary {
            attempted: 0,
            succeeded: 0,
            failed: 0,
        };

        for user in candidates {
            summary.attempted += 1;
            match self.engine.perform_backup(&user.id).await {
                Ok(report) => {
                    summary.succeeded += 1;
                    info!(
                        tier = %self.tier,
                        user_id = %user.id,
                        total_messages = report.total_messages,
                        "scheduled backup completed"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(tier = %self.tier, user_id = %user.id, error = %err, "scheduled backup failed");
                }
            }
        }

        Ok(summary)
    }
}
