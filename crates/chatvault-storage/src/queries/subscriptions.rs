// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription records: usage metering, tier upgrades, period rollover.

use chatvault_core::ChatvaultError;
use chatvault_core::types::Subscription;
use rusqlite::params;
use tracing::info;

use crate::database::Database;
use crate::queries::parse_text_col;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_tier, status, current_period_start, \
     current_period_end, cancel_at_period_end, price_monthly, messages_this_period, \
     max_messages, created_at";

fn row_to_subscription(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        plan_tier: parse_text_col(2, row.get::<_, String>(2)?)?,
        status: parse_text_col(3, row.get::<_, String>(3)?)?,
        current_period_start: row.get(4)?,
        current_period_end: row.get(5)?,
        cancel_at_period_end: row.get(6)?,
        price_monthly: row.get(7)?,
        messages_this_period: row.get(8)?,
        max_messages: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn insert_subscription_sql(
    tx: &rusqlite::Connection,
    sub: &Subscription,
) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO subscriptions (id, user_id, plan_tier, status, current_period_start,
             current_period_end, cancel_at_period_end, price_monthly, messages_this_period,
             max_messages, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            sub.id,
            sub.user_id,
            sub.plan_tier.to_string(),
            sub.status.to_string(),
            sub.current_period_start,
            sub.current_period_end,
            sub.cancel_at_period_end,
            sub.price_monthly,
            sub.messages_this_period,
            sub.max_messages,
            sub.created_at,
        ],
    )?;
    Ok(())
}

/// Insert a new subscription row.
pub async fn create_subscription(db: &Database, sub: &Subscription) -> Result<(), ChatvaultError> {
    let sub = sub.clone();
    db.connection()
        .call(move |conn| {
            insert_subscription_sql(conn, &sub)?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The user's active subscription, if any.
pub async fn active_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<Subscription>, ChatvaultError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE user_id = ?1 AND status = 'active'
                 ORDER BY created_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![user_id], row_to_subscription) {
                Ok(sub) => Ok(Some(sub)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Add `count` messages to the active subscription's period usage.
pub async fn increment_usage(
    db: &Database,
    user_id: &str,
    count: u32,
) -> Result<(), ChatvaultError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE subscriptions
                 SET messages_this_period = messages_this_period + ?2
                 WHERE user_id = ?1 AND status = 'active'",
                params![user_id, count],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Switch a user to the pro tier in one transaction: cancel the current
/// active subscription, insert the new pro one, flip the user's tier and
/// cadence, and clear any bridge session (pro backups run over the
/// business API, so stale bridge credentials must not linger).
///
/// Either every step applies or none do.
pub async fn upgrade_to_pro(
    db: &Database,
    user_id: &str,
    new_sub: &Subscription,
) -> Result<(), ChatvaultError> {
    let uid = user_id.to_string();
    let new_sub = new_sub.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE subscriptions SET status = 'cancelled', cancel_at_period_end = 1
                 WHERE user_id = ?1 AND status = 'active'",
                params![uid],
            )?;
            insert_subscription_sql(&tx, &new_sub)?;
            tx.execute(
                "UPDATE users SET plan_tier = 'pro', backup_frequency_hours = 24,
                     bridge_session_id = NULL, bridge_auth_state = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![uid],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    info!(user_id, "user upgraded to pro");
    Ok(())
}

/// Reset period usage for every active subscription whose billing period
/// has elapsed, rolling the period bounds forward: the start becomes `now`
/// and the end becomes `next_period_end`. Advancing the end is what keeps
/// an already-rolled subscription out of the next sweep, so its fresh
/// usage is not wiped again. Returns the number of subscriptions rolled
/// over.
pub async fn reset_expired_periods(
    db: &Database,
    now: &str,
    next_period_end: &str,
) -> Result<u32, ChatvaultError> {
    let now = now.to_string();
    let next_period_end = next_period_end.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE subscriptions
                 SET messages_this_period = 0,
                     current_period_start = ?1,
                     current_period_end = ?2
                 WHERE status = 'active'
                   AND current_period_end IS NOT NULL
                   AND current_period_end <= ?1",
                params![now, next_period_end],
            )?;
            Ok(changed as u32)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users::{self, tests::make_user};
    use chatvault_core::types::{PlanTier, SubscriptionStatus, now_rfc3339};
    use tempfile::tempdir;

    pub(crate) fn make_subscription(id: &str, user_id: &str, tier: PlanTier) -> Subscription {
        Subscription {
            id: id.to_string(),
            user_id: user_id.to_string(),
            plan_tier: tier,
            status: SubscriptionStatus::Active,
            current_period_start: Some(now_rfc3339()),
            current_period_end: None,
            cancel_at_period_end: false,
            price_monthly: match tier {
                PlanTier::Express => Some(18.0),
                PlanTier::Pro => Some(35.0),
            },
            messages_this_period: 0,
            max_messages: match tier {
                PlanTier::Express => Some(5000),
                PlanTier::Pro => None,
            },
            created_at: now_rfc3339(),
        }
    }

    async fn setup_with_user() -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("subs.db").to_str().unwrap())
            .await
            .unwrap();
        let user = make_user("subscriber", PlanTier::Express);
        users::create_user(&db, &user).await.unwrap();
        (db, dir, user.id)
    }

    #[tokio::test]
    async fn usage_increments_accumulate() {
        let (db, _dir, user_id) = setup_with_user().await;
        create_subscription(&db, &make_subscription("sub-1", &user_id, PlanTier::Express))
            .await
            .unwrap();

        increment_usage(&db, &user_id, 100).await.unwrap();
        increment_usage(&db, &user_id, 25).await.unwrap();

        let sub = active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 125);
        assert_eq!(sub.max_messages, Some(5000));
    }

    #[tokio::test]
    async fn upgrade_cancels_old_sub_and_clears_bridge_session() {
        let (db, _dir, user_id) = setup_with_user().await;
        create_subscription(&db, &make_subscription("sub-old", &user_id, PlanTier::Express))
            .await
            .unwrap();

        let pro = make_subscription("sub-pro", &user_id, PlanTier::Pro);
        upgrade_to_pro(&db, &user_id, &pro).await.unwrap();

        let active = active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(active.id, "sub-pro");
        assert_eq!(active.plan_tier, PlanTier::Pro);
        assert_eq!(active.max_messages, None);

        let user = users::get_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(user.plan_tier, PlanTier::Pro);
        assert_eq!(user.backup_frequency_hours, 24);
        assert!(user.bridge_session_id.is_none());
        assert!(user.bridge_auth_state.is_none());
    }

    #[tokio::test]
    async fn upgrade_rolls_back_entirely_on_conflict() {
        let (db, _dir, user_id) = setup_with_user().await;
        create_subscription(&db, &make_subscription("sub-old", &user_id, PlanTier::Express))
            .await
            .unwrap();

        // Reusing the existing primary key forces the insert to fail after
        // the cancel step already ran inside the transaction.
        let colliding = make_subscription("sub-old", &user_id, PlanTier::Pro);
        let result = upgrade_to_pro(&db, &user_id, &colliding).await;
        assert!(result.is_err());

        // The old subscription must still be active and the user untouched.
        let active = active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(active.id, "sub-old");
        assert_eq!(active.plan_tier, PlanTier::Express);

        let user = users::get_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(user.plan_tier, PlanTier::Express);
        assert!(user.bridge_session_id.is_some());
    }

    #[tokio::test]
    async fn rollover_resets_only_elapsed_periods() {
        let (db, _dir, user_id) = setup_with_user().await;

        let mut elapsed = make_subscription("sub-elapsed", &user_id, PlanTier::Express);
        elapsed.current_period_end = Some("2026-01-01T00:00:00.000Z".to_string());
        elapsed.messages_this_period = 4800;
        create_subscription(&db, &elapsed).await.unwrap();

        let other = make_user("subscriber2", PlanTier::Express);
        users::create_user(&db, &other).await.unwrap();
        let mut current = make_subscription("sub-current", &other.id, PlanTier::Express);
        current.current_period_end = Some("2030-01-01T00:00:00.000Z".to_string());
        current.messages_this_period = 10;
        create_subscription(&db, &current).await.unwrap();

        let now = "2026-02-01T00:00:00.000Z";
        let next_end = "2026-03-03T00:00:00.000Z";
        let rolled = reset_expired_periods(&db, now, next_end).await.unwrap();
        assert_eq!(rolled, 1);

        let reset = active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(reset.messages_this_period, 0);
        assert_eq!(reset.current_period_start, Some(now.to_string()));
        assert_eq!(reset.current_period_end, Some(next_end.to_string()));

        let untouched = active_for_user(&db, &other.id).await.unwrap().unwrap();
        assert_eq!(untouched.messages_this_period, 10);
    }

    #[tokio::test]
    async fn rollover_does_not_rematch_a_fresh_period() {
        let (db, _dir, user_id) = setup_with_user().await;

        let mut sub = make_subscription("sub-rolling", &user_id, PlanTier::Express);
        sub.current_period_end = Some("2026-01-01T00:00:00.000Z".to_string());
        sub.messages_this_period = 4800;
        create_subscription(&db, &sub).await.unwrap();

        let rolled = reset_expired_periods(
            &db,
            "2026-02-01T00:00:00.000Z",
            "2026-03-03T00:00:00.000Z",
        )
        .await
        .unwrap();
        assert_eq!(rolled, 1);

        // Usage accrued inside the new period must survive the next sweep.
        increment_usage(&db, &user_id, 300).await.unwrap();
        let rolled = reset_expired_periods(
            &db,
            "2026-02-01T01:00:00.000Z",
            "2026-03-03T01:00:00.000Z",
        )
        .await
        .unwrap();
        assert_eq!(rolled, 0);

        let sub = active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 300);
        assert_eq!(
            sub.current_period_end,
            Some("2026-03-03T00:00:00.000Z".to_string())
        );
    }
}
