// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge provider adapter for QR-session backups.
//!
//! Express-tier users link a personal account by scanning a QR code; a
//! locally-run bridge process holds the session and exposes a small HTTP
//! API this crate talks to.

pub mod client;
pub mod types;

pub use client::BridgeProvider;
