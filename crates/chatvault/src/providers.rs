// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The real provider factory: picks the adapter for a user's tier and
//! builds it from the credentials on the user record.

use std::sync::Arc;

use chatvault_bridge::BridgeProvider;
use chatvault_config::model::{BridgeConfig, MetaConfig};
use chatvault_core::ChatvaultError;
use chatvault_core::traits::{ProviderAdapter, ProviderFactory};
use chatvault_core::types::{PlanTier, User};
use chatvault_meta::MetaProvider;

pub struct DefaultProviderFactory {
    meta: MetaConfig,
    bridge: BridgeConfig,
}

impl DefaultProviderFactory {
    pub fn new(meta: MetaConfig, bridge: BridgeConfig) -> Self {
        Self { meta, bridge }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn for_user(&self, user: &User) -> Result<Arc<dyn ProviderAdapter>, ChatvaultError> {
        match user.plan_tier {
            PlanTier::Pro => {
                let phone_id = user.api_phone_id.clone().ok_or_else(|| {
                    ChatvaultError::Config(format!("user {} has no API phone id", user.id))
                })?;
                let token = user.api_access_token.as_deref().ok_or_else(|| {
                    ChatvaultError::Config(format!("user {} has no API access token", user.id))
                })?;
                Ok(Arc::new(MetaProvider::new(phone_id, token, &self.meta)?))
            }
            PlanTier::Express => {
                let session_id = user.bridge_session_id.clone().ok_or_else(|| {
                    ChatvaultError::Config(format!("user {} has no bridge session", user.id))
                })?;
                Ok(Arc::new(BridgeProvider::new(session_id, &self.bridge)?))
            }
        }
    }
}
