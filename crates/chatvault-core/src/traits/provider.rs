// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for WhatsApp connection mechanisms.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChatvaultError;
use crate::types::{ConnectionStatus, MessageSource, NormalizedMessage, User};

/// Adapter for one WhatsApp connection mechanism.
///
/// Two variants exist: the business-API client (Pro tier) and the local
/// QR-session bridge client (Express tier). Both expose the same
/// fetch/check contract; normalization from the raw provider payload to
/// the canonical [`NormalizedMessage`] is a pure per-variant function,
/// testable without network access.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Human-readable adapter name for logs.
    fn name(&self) -> &str;

    /// The source tag recorded on runs and messages this adapter produces.
    fn source(&self) -> MessageSource;

    /// Checks whether the underlying connection is usable.
    ///
    /// An unreachable provider is reported as `connected: false` with
    /// detail, not as an error.
    async fn check_connection(&self) -> Result<ConnectionStatus, ChatvaultError>;

    /// Fetches the raw message window, looking back `days_back` days.
    ///
    /// A network or protocol error aborts the fetch and surfaces as
    /// [`ChatvaultError::Provider`]; pages accumulated before a
    /// mid-pagination failure are preserved and returned.
    async fn fetch_messages(
        &self,
        days_back: u32,
    ) -> Result<Vec<serde_json::Value>, ChatvaultError>;

    /// Normalizes one raw provider message into the canonical record.
    ///
    /// Pure: no I/O. A malformed payload is an error the caller skips,
    /// never a reason to abort the whole run.
    fn normalize(&self, raw: &serde_json::Value) -> Result<NormalizedMessage, ChatvaultError>;
}

/// Constructs the provider adapter matching a user's plan tier and
/// stored credentials.
///
/// Injected into the backup engine so schedulers and tests can supply
/// their own wiring.
pub trait ProviderFactory: Send + Sync {
    fn for_user(&self, user: &User) -> Result<Arc<dyn ProviderAdapter>, ChatvaultError>;
}
