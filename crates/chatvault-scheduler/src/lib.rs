// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background tasks: per-tier backup schedulers and billing-period
//! rollover.
//!
//! Every task is an ordinary future the binary spawns and cancels via a
//! shared `CancellationToken`; nothing here touches globals.

pub mod rollover;
pub mod tier;

pub use rollover::run_period_rollover;
pub use tier::{BatchSummary, TierScheduler};
