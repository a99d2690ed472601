// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-layer re-exports of the persisted domain types.

pub use chatvault_core::types::{
    BackupRun, BackupStatus, MessageKind, MessageSource, PlanStatus, PlanTier, StoredMessage,
    Subscription, SubscriptionStatus, User,
};
