// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for chatvault.
//!
//! A single [`Database`] handle wraps a tokio-rusqlite connection whose
//! background thread serializes all writes. Schema lives in embedded
//! refinery migrations; query modules under [`queries`] cover users,
//! backup runs, messages, and subscriptions.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
