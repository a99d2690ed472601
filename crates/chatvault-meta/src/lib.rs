// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business API (Meta Graph) provider adapter.
//!
//! Pro-tier backups run over the official Cloud API: bearer-token
//! authentication, cursor pagination via `paging.next`, typed message
//! payloads normalized to plain archive text.

pub mod client;
pub mod types;

pub use client::MetaProvider;
