// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Chatvault provider architecture.
//!
//! Providers use `#[async_trait]` for dynamic dispatch compatibility.

pub mod provider;

pub use provider::{ProviderAdapter, ProviderFactory};
