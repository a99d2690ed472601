// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup run lifecycle: create, complete, fail, history.

use chatvault_core::ChatvaultError;
use chatvault_core::types::{BackupRun, BackupStatus, MessageSource, now_rfc3339};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_text_col;

const BACKUP_COLUMNS: &str = "id, user_id, status, source, started_at, total_messages, \
     total_contacts, error_message, usage_applied";

fn row_to_backup(row: &rusqlite::Row<'_>) -> rusqlite::Result<BackupRun> {
    Ok(BackupRun {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: parse_text_col(2, row.get::<_, String>(2)?)?,
        source: parse_text_col(3, row.get::<_, String>(3)?)?,
        started_at: row.get(4)?,
        total_messages: row.get(5)?,
        total_contacts: row.get(6)?,
        error_message: row.get(7)?,
        usage_applied: row.get(8)?,
    })
}

/// Create a new run in `in_progress` state and return it.
///
/// The row is written before any provider I/O so that interrupted runs
/// remain visible in history.
pub async fn create_run(
    db: &Database,
    user_id: &str,
    source: MessageSource,
) -> Result<BackupRun, ChatvaultError> {
    let run = BackupRun {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        status: BackupStatus::InProgress,
        source,
        started_at: now_rfc3339(),
        total_messages: 0,
        total_contacts: 0,
        error_message: None,
        usage_applied: false,
    };
    let insert = run.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO backups (id, user_id, status, source, started_at,
                     total_messages, total_contacts, error_message, usage_applied)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, NULL, 0)",
                params![
                    insert.id,
                    insert.user_id,
                    insert.status.to_string(),
                    insert.source.to_string(),
                    insert.started_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(run)
}

/// Get a run by id.
pub async fn get_run(db: &Database, id: &str) -> Result<Option<BackupRun>, ChatvaultError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {BACKUP_COLUMNS} FROM backups WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_backup) {
                Ok(run) => Ok(Some(run)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recent run for a user, if any. Used as the single-in-flight
/// guard: a new run is refused while this one is `in_progress`.
pub async fn latest_run_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Option<BackupRun>, ChatvaultError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BACKUP_COLUMNS} FROM backups WHERE user_id = ?1
                 ORDER BY started_at DESC LIMIT 1"
            ))?;
            match stmt.query_row(params![user_id], row_to_backup) {
                Ok(run) => Ok(Some(run)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Run history for a user, newest first.
pub async fn list_runs_for_user(
    db: &Database,
    user_id: &str,
    limit: u32,
) -> Result<Vec<BackupRun>, ChatvaultError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BACKUP_COLUMNS} FROM backups WHERE user_id = ?1
                 ORDER BY started_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], row_to_backup)?;
            let mut runs = Vec::new();
            for row in rows {
                runs.push(row?);
            }
            Ok(runs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a run completed and, in the same transaction, apply its message
/// count to the user's active subscription usage.
///
/// The `usage_applied` flag makes this idempotent: retrying a completion
/// never double-counts usage. `usage_count` is `None` when the user's plan
/// has no metered limit.
pub async fn complete_run(
    db: &Database,
    run_id: &str,
    total_messages: u32,
    total_contacts: u32,
    usage_count: Option<u32>,
) -> Result<(), ChatvaultError> {
    let run_id = run_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let (user_id, already_applied): (String, bool) = tx.query_row(
                "SELECT user_id, usage_applied FROM backups WHERE id = ?1",
                params![run_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let apply_usage = usage_count.is_some() && !already_applied;
            tx.execute(
                "UPDATE backups SET status = 'completed', total_messages = ?2,
                     total_contacts = ?3, error_message = NULL, usage_applied = ?4
                 WHERE id = ?1",
                params![run_id, total_messages, total_contacts, apply_usage || already_applied],
            )?;

            if apply_usage {
                if let Some(count) = usage_count {
                    tx.execute(
                        "UPDATE subscriptions
                         SET messages_this_period = messages_this_period + ?2
                         WHERE user_id = ?1 AND status = 'active'",
                        params![user_id, count],
                    )?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a run failed with an operator-readable error message.
pub async fn mark_run_failed(
    db: &Database,
    run_id: &str,
    error: &str,
) -> Result<(), ChatvaultError> {
    let run_id = run_id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE backups SET status = 'failed', error_message = ?2 WHERE id = ?1",
                params![run_id, error],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::subscriptions;
    use crate::queries::users::{self, tests::make_user};
    use chatvault_core::types::{PlanTier, Subscription, SubscriptionStatus};
    use tempfile::tempdir;

    async fn setup_with_user(tier: PlanTier) -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("runs.db").to_str().unwrap())
            .await
            .unwrap();
        let user = make_user("runner", tier);
        users::create_user(&db, &user).await.unwrap();
        (db, dir, user.id)
    }

    fn make_subscription(user_id: &str, max_messages: Option<u32>) -> Subscription {
        Subscription {
            id: format!("sub-{user_id}"),
            user_id: user_id.to_string(),
            plan_tier: PlanTier::Express,
            status: SubscriptionStatus::Active,
            current_period_start: Some(now_rfc3339()),
            current_period_end: None,
            cancel_at_period_end: false,
            price_monthly: Some(18.0),
            messages_this_period: 0,
            max_messages,
            created_at: now_rfc3339(),
        }
    }

    #[tokio::test]
    async fn create_run_starts_in_progress() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Express).await;
        let run = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();
        assert_eq!(run.status, BackupStatus::InProgress);
        assert_eq!(run.total_messages, 0);

        let stored = get_run(&db, &run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::InProgress);
        assert!(!stored.usage_applied);
    }

    #[tokio::test]
    async fn latest_run_tracks_most_recent() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Express).await;
        assert!(latest_run_for_user(&db, &user_id).await.unwrap().is_none());

        let first = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();
        complete_run(&db, &first.id, 3, 1, None).await.unwrap();
        // started_at has millisecond precision; keep ordering deterministic.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();

        let latest = latest_run_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn complete_run_applies_usage_once() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Express).await;
        subscriptions::create_subscription(&db, &make_subscription(&user_id, Some(5000)))
            .await
            .unwrap();
        let run = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();

        complete_run(&db, &run.id, 42, 7, Some(42)).await.unwrap();
        let stored = get_run(&db, &run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::Completed);
        assert_eq!(stored.total_messages, 42);
        assert_eq!(stored.total_contacts, 7);
        assert!(stored.usage_applied);

        let sub = subscriptions::active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 42);

        // Replaying completion must not double-count.
        complete_run(&db, &run.id, 42, 7, Some(42)).await.unwrap();
        let sub = subscriptions::active_for_user(&db, &user_id).await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 42);
    }

    #[tokio::test]
    async fn unmetered_completion_leaves_usage_unapplied() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Pro).await;
        let run = create_run(&db, &user_id, MessageSource::Api).await.unwrap();
        complete_run(&db, &run.id, 10, 2, None).await.unwrap();

        let stored = get_run(&db, &run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::Completed);
        assert!(!stored.usage_applied);
    }

    #[tokio::test]
    async fn failed_run_records_error_and_stays_failed() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Express).await;
        let run = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();
        mark_run_failed(&db, &run.id, "bridge unreachable").await.unwrap();

        let stored = get_run(&db, &run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BackupStatus::Failed);
        assert_eq!(stored.error_message, Some("bridge unreachable".to_string()));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let (db, _dir, user_id) = setup_with_user(PlanTier::Express).await;
        for _ in 0..3 {
            let run = create_run(&db, &user_id, MessageSource::Bridge).await.unwrap();
            complete_run(&db, &run.id, 1, 1, None).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let runs = list_runs_for_user(&db, &user_id, 2).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].started_at >= runs[1].started_at);
    }
}
