// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test support: scripted mock providers and domain fixtures.
//!
//! Only dev-dependencies of other crates should pull this in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatvault_core::ChatvaultError;
use chatvault_core::traits::{ProviderAdapter, ProviderFactory};
use chatvault_core::types::{
    ConnectionStatus, MessageKind, MessageSource, NormalizedMessage, PlanStatus, PlanTier,
    Subscription, SubscriptionStatus, User, now_rfc3339,
};

/// A provider that replays scripted raw messages (or a scripted failure)
/// without any network. Raw objects use the flat bridge-style shape:
/// `{id, from, name, text, timestamp, from_me}`.
pub struct MockProvider {
    source: MessageSource,
    messages: Vec<serde_json::Value>,
    fetch_error: Option<String>,
    connected: bool,
    fetch_calls: Mutex<u32>,
}

impl MockProvider {
    pub fn with_messages(messages: Vec<serde_json::Value>) -> Self {
        Self {
            source: MessageSource::Bridge,
            messages,
            fetch_error: None,
            connected: true,
            fetch_calls: Mutex::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            source: MessageSource::Bridge,
            messages: Vec::new(),
            fetch_error: Some(message.to_string()),
            connected: false,
            fetch_calls: Mutex::new(0),
        }
    }

    pub fn with_source(mut self, source: MessageSource) -> Self {
        self.source = source;
        self
    }

    /// How many times `fetch_messages` ran.
    pub fn fetch_calls(&self) -> u32 {
        *self.fetch_calls.lock().unwrap()
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn source(&self) -> MessageSource {
        self.source
    }

    async fn check_connection(&self) -> Result<ConnectionStatus, ChatvaultError> {
        Ok(ConnectionStatus {
            connected: self.connected,
            detail: None,
        })
    }

    async fn fetch_messages(
        &self,
        _days_back: u32,
    ) -> Result<Vec<serde_json::Value>, ChatvaultError> {
        *self.fetch_calls.lock().unwrap() += 1;
        if let Some(message) = &self.fetch_error {
            return Err(ChatvaultError::Provider {
                message: message.clone(),
                source: None,
            });
        }
        Ok(self.messages.clone())
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<NormalizedMessage, ChatvaultError> {
        let missing = |field: &str| ChatvaultError::Provider {
            message: format!("mock message missing `{field}`"),
            source: None,
        };
        let id = raw
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing("id"))?;
        let from = raw
            .get("from")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing("from"))?;
        let sent_at_epoch = match raw.get("timestamp") {
            Some(serde_json::Value::Number(n)) => n.as_i64().ok_or_else(|| missing("timestamp"))?,
            Some(serde_json::Value::String(s)) => {
                s.parse::<i64>().map_err(|_| ChatvaultError::Provider {
                    message: format!("unparseable timestamp `{s}`"),
                    source: None,
                })?
            }
            _ => return Err(missing("timestamp")),
        };
        Ok(NormalizedMessage {
            provider_message_id: id.to_string(),
            contact_name: raw
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            contact_phone: from.to_string(),
            body: raw
                .get("text")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("")
                .to_string(),
            kind: MessageKind::Text,
            sent_at_epoch,
            is_from_me: raw.get("from_me").and_then(serde_json::Value::as_bool),
        })
    }
}

/// Factory handing out pre-registered providers by user id.
#[derive(Default)]
pub struct MockProviderFactory {
    providers: Mutex<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl MockProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: &str, provider: Arc<dyn ProviderAdapter>) {
        self.providers
            .lock()
            .unwrap()
            .insert(user_id.to_string(), provider);
    }
}

impl ProviderFactory for MockProviderFactory {
    fn for_user(&self, user: &User) -> Result<Arc<dyn ProviderAdapter>, ChatvaultError> {
        self.providers
            .lock()
            .unwrap()
            .get(&user.id)
            .cloned()
            .ok_or_else(|| {
                ChatvaultError::Config(format!("no mock provider registered for user {}", user.id))
            })
    }
}

/// Build a raw bridge-style message object.
pub fn raw_message(id: &str, from: &str, text: &str, timestamp: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "from": from,
        "name": "Contact",
        "text": text,
        "timestamp": timestamp,
        "from_me": false,
    })
}

/// A user with credentials appropriate to the tier.
pub fn make_user(id: &str, tier: PlanTier) -> User {
    let now = now_rfc3339();
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        full_name: Some("Test User".to_string()),
        phone_number: Some("15550001111".to_string()),
        plan_tier: tier,
        plan_status: PlanStatus::Active,
        api_phone_id: match tier {
            PlanTier::Pro => Some("phone-1".to_string()),
            PlanTier::Express => None,
        },
        api_access_token: match tier {
            PlanTier::Pro => Some("token-1".to_string()),
            PlanTier::Express => None,
        },
        bridge_session_id: match tier {
            PlanTier::Express => Some(format!("session-{id}")),
            PlanTier::Pro => None,
        },
        bridge_auth_state: None,
        auto_backup_enabled: true,
        backup_frequency_hours: match tier {
            PlanTier::Express => 12,
            PlanTier::Pro => 24,
        },
        created_at: now.clone(),
        updated_at: now,
    }
}

/// An active subscription for the user with the given usage state.
pub fn make_subscription(user_id: &str, tier: PlanTier, used: u32, max: Option<u32>) -> Subscription {
    Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        plan_tier: tier,
        status: SubscriptionStatus::Active,
        current_period_start: Some(now_rfc3339()),
        current_period_end: None,
        cancel_at_period_end: false,
        price_monthly: None,
        messages_this_period: used,
        max_messages: max,
        created_at: now_rfc3339(),
    }
}
