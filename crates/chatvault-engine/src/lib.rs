// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backup run orchestration.
//!
//! [`BackupEngine`] drives one run end to end: credential and plan gates,
//! provider fetch under a timeout, per-message normalization with
//! log-and-skip, deduplicated inserts, and a single transaction that
//! completes the run and applies metered usage.

pub mod engine;

pub use engine::BackupEngine;
