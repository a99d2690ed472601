// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across the Chatvault workspace.
//!
//! Records mirror the relational layout in `chatvault-storage`: uuid text
//! ids, RFC3339 text timestamps, string-backed enums.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two service tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// QR-bridge connection, capped messages, 12 h backup cadence.
    Express,
    /// Business-API connection, unlimited messages, 24 h backup cadence.
    Pro,
}

/// Lifecycle status of a user's plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Trial,
    Active,
    Cancelled,
}

/// Billing status of a subscription record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    PastDue,
}

/// Status lifecycle of a backup run: `in_progress -> completed | failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    InProgress,
    Completed,
    Failed,
}

/// Kind of a backed-up message. Non-text kinds are stored with
/// placeholder body text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
}

/// Which provider mechanism produced a message or backup run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Business API (Pro tier).
    Api,
    /// Local QR-session bridge process (Express tier).
    Bridge,
}

/// A tenant account.
///
/// Credentials for only the mechanism matching `plan_tier` are meaningful;
/// the upgrade path clears the other mechanism's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    /// The user's own phone identifier, used to derive message direction
    /// for the business-API variant.
    pub phone_number: Option<String>,
    pub plan_tier: PlanTier,
    pub plan_status: PlanStatus,
    /// Business-API credentials (Pro tier).
    pub api_phone_id: Option<String>,
    pub api_access_token: Option<String>,
    /// Bridge session (Express tier).
    pub bridge_session_id: Option<String>,
    pub bridge_auth_state: Option<String>,
    pub auto_backup_enabled: bool,
    pub backup_frequency_hours: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// One backup run. Created `in_progress` before any network I/O, updated
/// exactly once to a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRun {
    pub id: String,
    pub user_id: String,
    pub status: BackupStatus,
    pub source: MessageSource,
    pub started_at: String,
    pub total_messages: u32,
    pub total_contacts: u32,
    pub error_message: Option<String>,
    /// Set when the run's message count has been charged against the
    /// subscription usage counter. Makes usage accounting idempotent per run.
    pub usage_applied: bool,
}

/// A backed-up message row. Append-only: created once during a backup run,
/// never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub user_id: String,
    pub backup_id: Option<String>,
    /// Provider-assigned identifier; the dedup key (UNIQUE in storage).
    pub provider_message_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub body: String,
    pub kind: MessageKind,
    pub source: MessageSource,
    /// Origin-system timestamp, RFC3339.
    pub sent_at: String,
    pub is_from_me: bool,
    pub created_at: String,
}

/// A billing subscription. Sole authority for usage-limit state; only the
/// storage layer writes `messages_this_period`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub plan_tier: PlanTier,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<String>,
    pub current_period_end: Option<String>,
    pub cancel_at_period_end: bool,
    pub price_monthly: Option<f64>,
    pub messages_this_period: u32,
    /// `None` means unlimited (Pro tier).
    pub max_messages: Option<u32>,
    pub created_at: String,
}

/// A provider message after normalization, ready for persistence.
///
/// `is_from_me` is `None` when the provider does not report direction
/// (business-API variant); the engine derives it from the user's own
/// phone number in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub provider_message_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub body: String,
    pub kind: MessageKind,
    /// Origin-epoch seconds.
    pub sent_at_epoch: i64,
    pub is_from_me: Option<bool>,
}

/// Result of a provider connection check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub detail: Option<String>,
}

/// Summary returned by a completed backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupReport {
    pub backup_id: String,
    pub status: BackupStatus,
    pub total_messages: u32,
    pub total_contacts: u32,
    /// Messages dropped by per-message extraction errors.
    pub skipped_messages: u32,
    pub started_at: String,
    pub source: MessageSource,
}

/// Current UTC time as RFC3339 with millisecond precision, matching the
/// storage layer's text timestamp format.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enums_round_trip_through_strings() {
        for tier in [PlanTier::Express, PlanTier::Pro] {
            assert_eq!(PlanTier::from_str(&tier.to_string()).unwrap(), tier);
        }
        for status in [
            BackupStatus::InProgress,
            BackupStatus::Completed,
            BackupStatus::Failed,
        ] {
            assert_eq!(BackupStatus::from_str(&status.to_string()).unwrap(), status);
        }
        for source in [MessageSource::Api, MessageSource::Bridge] {
            assert_eq!(MessageSource::from_str(&source.to_string()).unwrap(), source);
        }
    }

    #[test]
    fn snake_case_wire_format() {
        assert_eq!(BackupStatus::InProgress.to_string(), "in_progress");
        assert_eq!(SubscriptionStatus::PastDue.to_string(), "past_due");
        assert_eq!(PlanTier::Express.to_string(), "express");
        assert_eq!(MessageSource::Bridge.to_string(), "bridge");
    }

    #[test]
    fn enum_serde_matches_strum() {
        let json = serde_json::to_string(&BackupStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: BackupStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, BackupStatus::InProgress);
    }

    #[test]
    fn now_rfc3339_has_expected_shape() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2026-01-01T00:00:00.000Z".len());
    }
}
