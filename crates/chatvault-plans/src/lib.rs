// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plan tiers and usage policy.
//!
//! The catalog is static (two tiers); gating decisions are pure functions
//! over the tier and the active subscription, with [`PlanPolicy`] as the
//! storage-backed wrapper the engine and schedulers use.

pub mod catalog;
pub mod policy;

pub use catalog::{PlanSpec, plan_catalog, plan_for};
pub use policy::{BackupGate, MessageLimit, PlanPolicy, can_create_backup, check_message_limit};
