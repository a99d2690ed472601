// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Chatvault backup service.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Chatvault workspace. Provider adapters
//! and the storage layer implement against the contracts defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChatvaultError;
pub use traits::{ProviderAdapter, ProviderFactory};
pub use types::{
    BackupReport, BackupRun, BackupStatus, ConnectionStatus, MessageKind, MessageSource,
    NormalizedMessage, PlanStatus, PlanTier, StoredMessage, Subscription, SubscriptionStatus,
    User,
};
