// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The backup engine.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chatvault_config::model::BackupConfig;
use chatvault_core::ChatvaultError;
use chatvault_core::traits::{ProviderAdapter, ProviderFactory};
use chatvault_core::types::{
    BackupReport, BackupRun, BackupStatus, ConnectionStatus, PlanTier, StoredMessage, User,
    now_rfc3339,
};
use chatvault_plans::PlanPolicy;
use chatvault_storage::Database;
use chatvault_storage::queries::{backups, messages, users};
use tracing::{info, warn};

/// Orchestrates backup runs for all users.
///
/// Holds the storage handle and the provider factory; one engine instance
/// serves every user and both tiers.
#[derive(Clone)]
pub struct BackupEngine {
    db: Database,
    providers: Arc<dyn ProviderFactory>,
    policy: PlanPolicy,
    days_back: u32,
    fetch_timeout: Duration,
}

impl BackupEngine {
    pub fn new(db: Database, providers: Arc<dyn ProviderFactory>, config: &BackupConfig) -> Self {
        let policy = PlanPolicy::new(db.clone());
        Self {
            db,
            providers,
            policy,
            days_back: config.days_back,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Run a full backup for one user.
    ///
    /// The `in_progress` row is written before any provider I/O; whatever
    /// happens afterwards, the run ends in exactly one terminal state
    /// (`completed` or `failed`).
    pub async fn perform_backup(&self, user_id: &str) -> Result<BackupReport, ChatvaultError> {
        let user = self.load_user(user_id).await?;
        check_credentials(&user)?;

        if let Some(latest) = backups::latest_run_for_user(&self.db, user_id).await? {
            if latest.status == BackupStatus::InProgress {
                return Err(ChatvaultError::Backup(format!(
                    "backup {} is still in progress",
                    latest.id
                )));
            }
        }

        let gate = self.policy.can_create_backup(&user).await?;
        if !gate.allowed {
            return Err(ChatvaultError::PlanDenied(gate.reason));
        }

        let provider = self.providers.for_user(&user)?;
        let run = backups::create_run(&self.db, user_id, provider.source()).await?;
        info!(user_id, run_id = %run.id, provider = provider.name(), "backup started");

        match self.fetch_and_ingest(&user, provider.as_ref(), &run).await {
            Ok((total_messages, total_contacts, skipped)) => {
                let usage = match user.plan_tier {
                    PlanTier::Express => Some(total_messages),
                    PlanTier::Pro => None,
                };
                backups::complete_run(&self.db, &run.id, total_messages, total_contacts, usage)
                    .await?;
                info!(
                    user_id,
                    run_id = %run.id,
                    total_messages,
                    total_contacts,
                    skipped,
                    "backup completed"
                );
                Ok(BackupReport {
                    backup_id: run.id,
                    status: BackupStatus::Completed,
                    total_messages,
                    total_contacts,
                    skipped_messages: skipped,
                    started_at: run.started_at,
                    source: run.source,
                })
            }
            Err(err) => {
                backups::mark_run_failed(&self.db, &run.id, &err.to_string()).await?;
                warn!(user_id, run_id = %run.id, error = %err, "backup failed");
                Err(err)
            }
        }
    }

    /// Fetch the window and ingest it. Returns
    /// `(inserted, distinct contacts, skipped)`.
    async fn fetch_and_ingest(
        &self,
        user: &User,
        provider: &dyn ProviderAdapter,
        run: &BackupRun,
    ) -> Result<(u32, u32, u32), ChatvaultError> {
        let raw_messages =
            match tokio::time::timeout(self.fetch_timeout, provider.fetch_messages(self.days_back))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ChatvaultError::Timeout {
                        duration: self.fetch_timeout,
                    });
                }
            };

        let mut inserted = 0u32;
        let mut skipped = 0u32;
        let mut contacts: HashSet<String> = HashSet::new();

        for raw in &raw_messages {
            let normalized = match provider.normalize(raw) {
                Ok(normalized) => normalized,
                Err(err) => {
                    warn!(run_id = %run.id, error = %err, "skipping malformed message");
                    skipped += 1;
                    continue;
                }
            };
            let Some(sent_at) = chrono::DateTime::from_timestamp(normalized.sent_at_epoch, 0)
            else {
                warn!(run_id = %run.id, epoch = normalized.sent_at_epoch, "skipping message with out-of-range timestamp");
                skipped += 1;
                continue;
            };

            let is_from_me = normalized.is_from_me.unwrap_or_else(|| {
                user.phone_number.as_deref() == Some(normalized.contact_phone.as_str())
            });
            let stored = StoredMessage {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user.id.clone(),
                backup_id: Some(run.id.clone()),
                provider_message_id: normalized.provider_message_id,
                contact_name: normalized.contact_name,
                contact_phone: normalized.contact_phone,
                body: normalized.body,
                kind: normalized.kind,
                source: provider.source(),
                sent_at: sent_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
                is_from_me,
                created_at: now_rfc3339(),
            };

            // Duplicates from overlapping windows are silently skipped by
            // the uniqueness constraint and never counted.
            if messages::insert_message(&self.db, &stored).await? {
                contacts.insert(stored.contact_phone);
                inserted += 1;
            }
        }

        Ok((inserted, contacts.len() as u32, skipped))
    }

    /// Probe the user's provider connection.
    pub async fn connection_status(&self, user_id: &str) -> Result<ConnectionStatus, ChatvaultError> {
        let user = self.load_user(user_id).await?;
        check_credentials(&user)?;
        let provider = self.providers.for_user(&user)?;
        provider.check_connection().await
    }

    /// Recent backup runs for a user, newest first.
    pub async fn history(&self, user_id: &str, limit: u32) -> Result<Vec<BackupRun>, ChatvaultError> {
        backups::list_runs_for_user(&self.db, user_id, limit).await
    }

    /// Substring search over the user's archive, newest first, capped at
    /// 100 results.
    pub async fn search_messages(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<Vec<StoredMessage>, ChatvaultError> {
        messages::search_messages(&self.db, user_id, query, 100).await
    }

    async fn load_user(&self, user_id: &str) -> Result<User, ChatvaultError> {
        users::get_user(&self.db, user_id)
            .await?
            .ok_or_else(|| ChatvaultError::Config(format!("unknown user {user_id}")))
    }
}

/// Fail fast when the tier's credentials are missing.
fn check_credentials(user: &User) -> Result<(), ChatvaultError> {
    let ok = match user.plan_tier {
        PlanTier::Pro => user.api_phone_id.is_some() && user.api_access_token.is_some(),
        PlanTier::Express => user.bridge_session_id.is_some(),
    };
    if ok {
        Ok(())
    } else {
        Err(ChatvaultError::Config(format!(
            "user {} has no {} credentials",
            user.id,
            match user.plan_tier {
                PlanTier::Pro => "business API",
                PlanTier::Express => "bridge session",
            }
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatvault_storage::queries::subscriptions;
    use chatvault_test_utils::{
        MockProvider, MockProviderFactory, make_subscription, make_user, raw_message,
    };
    use tempfile::tempdir;

    fn test_backup_config() -> BackupConfig {
        BackupConfig {
            days_back: 90,
            fetch_timeout_secs: 5,
            scheduler_retry_secs: 3600,
            rollover_check_secs: 3600,
        }
    }

    async fn setup() -> (Database, Arc<MockProviderFactory>, BackupEngine, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("engine.db").to_str().unwrap())
            .await
            .unwrap();
        let factory = Arc::new(MockProviderFactory::new());
        let engine = BackupEngine::new(db.clone(), factory.clone(), &test_backup_config());
        (db, factory, engine, dir)
    }

    async fn seed_express_user(
        db: &Database,
        id: &str,
        used: u32,
        max: Option<u32>,
    ) -> chatvault_core::types::User {
        let user = make_user(id, PlanTier::Express);
        users::create_user(db, &user).await.unwrap();
        let sub = make_subscription(id, PlanTier::Express, used, max);
        subscriptions::create_subscription(db, &sub).await.unwrap();
        user
    }

    #[tokio::test]
    async fn completed_run_totals_match_stored_rows() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        factory.register(
            "u1",
            Arc::new(MockProvider::with_messages(vec![
                raw_message("m1", "15550002222", "hi", 1_700_000_000),
                raw_message("m2", "15550002222", "there", 1_700_000_060),
                raw_message("m3", "15550003333", "hello", 1_700_000_120),
            ])),
        );

        let report = engine.perform_backup("u1").await.unwrap();
        assert_eq!(report.status, BackupStatus::Completed);
        assert_eq!(report.total_messages, 3);
        assert_eq!(report.total_contacts, 2);
        assert_eq!(report.skipped_messages, 0);

        // Stored rows agree with the recorded totals.
        let row_count = messages::count_for_backup(&db, &report.backup_id).await.unwrap();
        assert_eq!(row_count, report.total_messages);
        let contact_count = messages::contact_count_for_backup(&db, &report.backup_id)
            .await
            .unwrap();
        assert_eq!(contact_count, report.total_contacts);
    }

    #[tokio::test]
    async fn overlapping_rerun_inserts_no_duplicates() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        let window = vec![
            raw_message("m1", "15550002222", "hi", 1_700_000_000),
            raw_message("m2", "15550002222", "there", 1_700_000_060),
        ];
        factory.register("u1", Arc::new(MockProvider::with_messages(window)));

        let first = engine.perform_backup("u1").await.unwrap();
        assert_eq!(first.total_messages, 2);

        let second = engine.perform_backup("u1").await.unwrap();
        assert_eq!(second.total_messages, 0);

        // Only the first run's rows exist.
        let all = engine.search_messages("u1", "").await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_single_failed_run() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        factory.register("u1", Arc::new(MockProvider::failing("bridge unreachable")));

        let err = engine.perform_backup("u1").await.unwrap_err();
        assert!(err.to_string().contains("bridge unreachable"));

        let runs = engine.history("u1", 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, BackupStatus::Failed);
        assert!(runs[0].error_message.as_deref().unwrap().contains("bridge unreachable"));
    }

    #[tokio::test]
    async fn malformed_message_is_skipped_not_fatal() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        let mut bad = raw_message("m2", "15550002222", "broken", 0);
        bad["timestamp"] = serde_json::Value::String("not-a-number".to_string());
        factory.register(
            "u1",
            Arc::new(MockProvider::with_messages(vec![
                raw_message("m1", "15550002222", "fine", 1_700_000_000),
                bad,
            ])),
        );

        let report = engine.perform_backup("u1").await.unwrap();
        assert_eq!(report.status, BackupStatus::Completed);
        assert_eq!(report.total_messages, 1);
        assert_eq!(report.skipped_messages, 1);
    }

    #[tokio::test]
    async fn metered_usage_feeds_next_gate() {
        let (db, factory, engine, _dir) = setup().await;
        // 4 of 5 used; a 3-message run crosses the ceiling.
        seed_express_user(&db, "u1", 4, Some(5)).await;
        factory.register(
            "u1",
            Arc::new(MockProvider::with_messages(vec![
                raw_message("m1", "1", "a", 1_700_000_000),
                raw_message("m2", "1", "b", 1_700_000_060),
                raw_message("m3", "1", "c", 1_700_000_120),
            ])),
        );

        let report = engine.perform_backup("u1").await.unwrap();
        assert_eq!(report.total_messages, 3);

        let sub = subscriptions::active_for_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 7);

        let err = engine.perform_backup("u1").await.unwrap_err();
        assert!(matches!(err, ChatvaultError::PlanDenied(_)));
    }

    #[tokio::test]
    async fn denied_plan_creates_no_run() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 5000, Some(5000)).await;
        factory.register("u1", Arc::new(MockProvider::with_messages(vec![])));

        let err = engine.perform_backup("u1").await.unwrap_err();
        assert!(matches!(err, ChatvaultError::PlanDenied(_)));
        assert!(engine.history("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_flight_run_blocks_new_one() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        factory.register("u1", Arc::new(MockProvider::with_messages(vec![])));

        // Simulate a crashed run still marked in progress.
        backups::create_run(&db, "u1", chatvault_core::types::MessageSource::Bridge)
            .await
            .unwrap();

        let err = engine.perform_backup("u1").await.unwrap_err();
        assert!(matches!(err, ChatvaultError::Backup(_)));
    }

    #[tokio::test]
    async fn missing_credentials_fail_fast() {
        let (db, factory, engine, _dir) = setup().await;
        let mut user = make_user("u1", PlanTier::Express);
        user.bridge_session_id = None;
        users::create_user(&db, &user).await.unwrap();
        factory.register("u1", Arc::new(MockProvider::with_messages(vec![])));

        let err = engine.perform_backup("u1").await.unwrap_err();
        assert!(matches!(err, ChatvaultError::Config(_)));
        assert!(engine.history("u1", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pro_runs_are_not_metered() {
        let (db, factory, engine, _dir) = setup().await;
        let user = make_user("u1", PlanTier::Pro);
        users::create_user(&db, &user).await.unwrap();
        let sub = make_subscription("u1", PlanTier::Pro, 0, None);
        subscriptions::create_subscription(&db, &sub).await.unwrap();
        factory.register(
            "u1",
            Arc::new(
                MockProvider::with_messages(vec![raw_message("m1", "1", "a", 1_700_000_000)])
                    .with_source(chatvault_core::types::MessageSource::Api),
            ),
        );

        let report = engine.perform_backup("u1").await.unwrap();
        assert_eq!(report.source, chatvault_core::types::MessageSource::Api);

        let sub = subscriptions::active_for_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(sub.messages_this_period, 0);
        let run = backups::get_run(&db, &report.backup_id).await.unwrap().unwrap();
        assert!(!run.usage_applied);
    }

    #[tokio::test]
    async fn connection_status_uses_registered_provider() {
        let (db, factory, engine, _dir) = setup().await;
        seed_express_user(&db, "u1", 0, Some(5000)).await;
        factory.register("u1", Arc::new(MockProvider::with_messages(vec![])));

        let status = engine.connection_status("u1").await.unwrap();
        assert!(status.connected);
    }
}
