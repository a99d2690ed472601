// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup gating and usage metering.
//!
//! The decision logic is pure over `(PlanTier, Option<&Subscription>)`;
//! [`PlanPolicy`] binds it to storage for callers that only hold a user.

use chatvault_core::ChatvaultError;
use chatvault_core::types::{PlanTier, Subscription, SubscriptionStatus, User};
use chatvault_storage::Database;
use chatvault_storage::queries::subscriptions;
use tracing::debug;

use crate::catalog::plan_for;

/// Outcome of a backup gate check, with an operator-readable reason in
/// both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupGate {
    pub allowed: bool,
    pub reason: String,
}

impl BackupGate {
    fn allow(reason: String) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: String) -> Self {
        Self { allowed: false, reason }
    }
}

/// Remaining metered capacity. `remaining: None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimit {
    pub over_limit: bool,
    pub remaining: Option<u32>,
}

/// Decide whether a backup may start for this tier and subscription.
///
/// Pro is never metered. Express requires an active subscription and
/// denies once the period counter reaches the plan ceiling.
pub fn can_create_backup(tier: PlanTier, subscription: Option<&Subscription>) -> BackupGate {
    if tier == PlanTier::Pro {
        return BackupGate::allow("pro plan allows unlimited backups".to_string());
    }

    let Some(sub) = subscription else {
        return BackupGate::deny("no active subscription".to_string());
    };
    if sub.status != SubscriptionStatus::Active {
        return BackupGate::deny(format!("subscription is {}", sub.status));
    }

    match sub.max_messages {
        Some(max) if sub.messages_this_period >= max => BackupGate::deny(format!(
            "message limit reached ({} of {max} this period)",
            sub.messages_this_period
        )),
        Some(max) => BackupGate::allow(format!(
            "{} of {max} messages used this period",
            sub.messages_this_period
        )),
        None => BackupGate::allow("subscription has no message limit".to_string()),
    }
}

/// Report remaining metered capacity for a subscription.
pub fn check_message_limit(subscription: Option<&Subscription>) -> MessageLimit {
    let Some(sub) = subscription else {
        return MessageLimit { over_limit: false, remaining: None };
    };
    match sub.max_messages {
        Some(max) => MessageLimit {
            over_limit: sub.messages_this_period >= max,
            remaining: Some(max.saturating_sub(sub.messages_this_period)),
        },
        None => MessageLimit { over_limit: false, remaining: None },
    }
}

/// Storage-backed plan policy.
#[derive(Clone)]
pub struct PlanPolicy {
    db: Database,
}

impl PlanPolicy {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Gate a backup for `user` against their active subscription.
    pub async fn can_create_backup(&self, user: &User) -> Result<BackupGate, ChatvaultError> {
        let sub = subscriptions::active_for_user(&self.db, &user.id).await?;
        let gate = can_create_backup(user.plan_tier, sub.as_ref());
        debug!(user_id = %user.id, allowed = gate.allowed, reason = %gate.reason, "backup gate");
        Ok(gate)
    }

    /// Remaining metered capacity for `user_id`.
    pub async fn check_message_limit(&self, user_id: &str) -> Result<MessageLimit, ChatvaultError> {
        let sub = subscriptions::active_for_user(&self.db, user_id).await?;
        Ok(check_message_limit(sub.as_ref()))
    }

    /// Add `count` messages to the user's period usage. Metered tiers
    /// only; a pro user's counter is never touched.
    pub async fn increment_message_count(
        &self,
        user: &User,
        count: u32,
    ) -> Result<(), ChatvaultError> {
        if user.plan_tier != PlanTier::Express || count == 0 {
            return Ok(());
        }
        subscriptions::increment_usage(&self.db, &user.id, count).await
    }

    /// Move a user to the pro tier. Builds the new subscription from the
    /// catalog (30-day period starting now) and applies the switch in one
    /// storage transaction, clearing any leftover bridge session.
    pub async fn upgrade_to_pro(&self, user_id: &str) -> Result<Subscription, ChatvaultError> {
        let spec = plan_for(PlanTier::Pro);
        let now = chrono::Utc::now();
        let period_end = now + chrono::Duration::days(30);
        let new_sub = Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            plan_tier: PlanTier::Pro,
            status: SubscriptionStatus::Active,
            current_period_start: Some(format_utc(now)),
            current_period_end: Some(format_utc(period_end)),
            cancel_at_period_end: false,
            price_monthly: Some(spec.price_monthly),
            messages_this_period: 0,
            max_messages: spec.max_messages,
            created_at: format_utc(now),
        };
        subscriptions::upgrade_to_pro(&self.db, user_id, &new_sub).await?;
        Ok(new_sub)
    }

    /// Zero the period counters of active subscriptions whose billing
    /// period has elapsed, starting a fresh 30-day period from now.
    /// Returns how many rolled over.
    pub async fn reset_expired_periods(&self) -> Result<u32, ChatvaultError> {
        let now = chrono::Utc::now();
        let next_end = now + chrono::Duration::days(30);
        subscriptions::reset_expired_periods(&self.db, &format_utc(now), &format_utc(next_end))
            .await
    }
}

fn format_utc(t: chrono::DateTime<chrono::Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
