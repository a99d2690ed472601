// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Billing-period rollover task.

use std::time::Duration;

use chatvault_plans::PlanPolicy;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Periodically zero the usage counters of subscriptions whose billing
/// period has elapsed. Runs until cancelled; a failed sweep is logged and
/// retried on the next tick.
pub async fn run_period_rollover(
    policy: PlanPolicy,
    check_interval: Duration,
    cancel: CancellationToken,
) {
    info!(interval_secs = check_interval.as_secs(), "period rollover task started");
    loop {
        match policy.reset_expired_periods().await {
            Ok(0) => {}
            Ok(count) => info!(count, "billing periods rolled over"),
            Err(err) => warn!(error = %err, "period rollover sweep failed"),
        }

        tokio::select! {
            () = cancel.cancelled() => {
                info!("period rollover task stopped");
                return;
            }
            () = tokio::time::sleep(check_interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatvault_core::types::PlanTier;
    use chatvault_storage::Database;
    use chatvault_storage::queries::{subscriptions, users};
    use chatvault_test_utils::{make_subscription, make_user};
    use tempfile::tempdir;

    #[tokio::test]
    async fn expired_period_is_reset_by_the_task() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("rollover.db").to_str().unwrap())
            .await
            .unwrap();
        let user = make_user("u1", PlanTier::Express);
        users::create_user(&db, &user).await.unwrap();

        let mut sub = make_subscription("u1", PlanTier::Express, 4800, Some(5000));
        sub.current_period_end = Some("2026-01-01T00:00:00.000Z".to_string());
        subscriptions::create_subscription(&db, &sub).await.unwrap();

        let policy = PlanPolicy::new(db.clone());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_period_rollover(
            policy,
            Duration::from_millis(10),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("rollover task did not stop")
            .unwrap();

        let reset = subscriptions::active_for_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(reset.messages_this_period, 0);
    }
}
