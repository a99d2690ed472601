// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the bridge process and its [`ProviderAdapter`] impl.

use std::time::Duration;

use async_trait::async_trait;
use chatvault_config::model::BridgeConfig;
use chatvault_core::ChatvaultError;
use chatvault_core::traits::ProviderAdapter;
use chatvault_core::types::{ConnectionStatus, MessageKind, MessageSource, NormalizedMessage};
use tracing::debug;

use crate::types::{FetchMessagesRequest, FetchMessagesResponse, QrResponse, SessionStatus};

/// Provider adapter backed by a QR-linked bridge session.
///
/// The bridge returns the whole requested window in one response; there
/// is no pagination. Messages are flat text objects with an explicit
/// `from_me` flag.
#[derive(Debug, Clone)]
pub struct BridgeProvider {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

fn build_client(config: &BridgeConfig) -> Result<reqwest::Client, ChatvaultError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| ChatvaultError::Provider {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

fn request_error(context: &str, e: reqwest::Error) -> ChatvaultError {
    ChatvaultError::Provider {
        message: format!("{context}: {e}"),
        source: Some(Box::new(e)),
    }
}

impl BridgeProvider {
    pub fn new(session_id: String, config: &BridgeConfig) -> Result<Self, ChatvaultError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_id,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Ask the bridge to start a new session and return its QR code for
    /// the user to scan. No session exists until the scan completes.
    pub async fn generate_qr(config: &BridgeConfig) -> Result<QrResponse, ChatvaultError> {
        let client = build_client(config)?;
        let url = format!("{}/generate-qr", config.base_url.trim_end_matches('/'));
        let response = client
            .post(&url)
            .send()
            .await
            .map_err(|e| request_error("QR generation failed", e))?;
        if !response.status().is_success() {
            return Err(ChatvaultError::Provider {
                message: format!("QR generation rejected: {}", response.status()),
                source: None,
            });
        }
        response
            .json()
            .await
            .map_err(|e| request_error("malformed QR response", e))
    }

    /// Tear down this session on the bridge side.
    pub async fn disconnect(&self) -> Result<(), ChatvaultError> {
        let url = format!("{}/disconnect/{}", self.base_url, self.session_id);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| request_error("disconnect failed", e))?;
        if !response.status().is_success() {
            return Err(ChatvaultError::Provider {
                message: format!("disconnect rejected: {}", response.status()),
                source: None,
            });
        }
        debug!(session_id = %self.session_id, "bridge session disconnected");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for BridgeProvider {
    fn name(&self) -> &str {
        "whatsapp-bridge"
    }

    fn source(&self) -> MessageSource {
        MessageSource::Bridge
    }

    async fn check_connection(&self) -> Result<ConnectionStatus, ChatvaultError> {
        let url = format!("{}/status/{}", self.base_url, self.session_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error("status probe failed", e))?;

        if !response.status().is_success() {
            return Ok(ConnectionStatus {
                connected: false,
                detail: Some(format!("bridge returned {}", response.status())),
            });
        }

        let status: SessionStatus = response
            .json()
            .await
            .map_err(|e| request_error("malformed status response", e))?;
        Ok(ConnectionStatus {
            connected: status.connected,
            detail: status.phone_number,
        })
    }

    async fn fetch_messages(
        &self,
        days_back: u32,
    ) -> Result<Vec<serde_json::Value>, ChatvaultError> {
        let url = format!("{}/fetch-messages", self.base_url);
        let body = FetchMessagesRequest {
            session_id: self.session_id.clone(),
            days_back,
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("message fetch failed", e))?;

        if !response.status().is_success() {
            return Err(ChatvaultError::Provider {
                message: format!("message fetch rejected: {}", response.status()),
                source: None,
            });
        }

        let parsed: FetchMessagesResponse = response
            .json()
            .await
            .map_err(|e| request_error("malformed fetch response", e))?;
        debug!(count = parsed.messages.len(), "fetched bridge messages");
        Ok(parsed.messages)
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<NormalizedMessage, ChatvaultError> {
        let missing = |field: &str| ChatvaultError::Provider {
            message: format!("bridge message missing `{field}`"),
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

        let body = raw
            .get("text")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        let contact_name = raw
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Unknown")
            .to_string();
        let from_me = raw
            .get("from_me")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        Ok(NormalizedMessage {
            provider_message_id: id.to_string(),
            contact_name,
            contact_phone: from.to_string(),
            body,
            kind: MessageKind::Text,
            sent_at_epoch,
            is_from_me: Some(from_me),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            base_url: "http://localhost:3000".to_string(),
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
        }
    }

    fn provider_for(server: &MockServer) -> BridgeProvider {
        BridgeProvider::new("session-1".to_string(), &test_config())
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn normalize_carries_from_me_flag() {
        let provider = BridgeProvider::new("s".into(), &test_config()).unwrap();
        let raw = json!({
            "id": "bridge-msg-1",
            "from": "15550002222",
            "name": "Alice",
            "text": "on my way",
            "timestamp": 1700000000,
            "from_me": true,
        });
        let msg = provider.normalize(&raw).unwrap();
        assert_eq!(msg.provider_message_id, "bridge-msg-1");
        assert_eq!(msg.is_from_me, Some(true));
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.body, "on my way");
        assert_eq!(msg.sent_at_epoch, 1_700_000_000);
    }

    #[test]
    fn normalize_defaults_and_failures() {
        let provider = BridgeProvider::new("s".into(), &test_config()).unwrap();

        // from_me and name are optional; id/from/timestamp are not.
        let minimal = json!({ "id": "m1", "from": "1", "timestamp": "1700000000" });
        let msg = provider.normalize(&minimal).unwrap();
        assert_eq!(msg.is_from_me, Some(false));
        assert_eq!(msg.contact_name, "Unknown");
        assert_eq!(msg.body, "");

        assert!(provider.normalize(&json!({ "from": "1", "timestamp": 1 })).is_err());
        assert!(provider.normalize(&json!({ "id": "m2", "from": "1" })).is_err());
    }

    #[tokio::test]
    async fn fetch_posts_session_and_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fetch-messages"))
            .and(body_partial_json(json!({ "session_id": "session-1", "days_back": 90 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    { "id": "m1", "from": "1", "text": "hi", "timestamp": 1700000000 },
                    { "id": "m2", "from": "1", "text": "there", "timestamp": 1700000060 },
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let messages = provider.fetch_messages(90).await.unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn fetch_surfaces_bridge_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fetch-messages"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.fetch_messages(90).await.is_err());
    }

    #[tokio::test]
    async fn check_connection_reflects_session_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/session-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "connected": true,
                "phone_number": "15550001111",
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let status = provider.check_connection().await.unwrap();
        assert!(status.connected);
        assert_eq!(status.detail, Some("15550001111".to_string()));
    }

    #[tokio::test]
    async fn unknown_session_reports_disconnected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/session-1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let status = provider.check_connection().await.unwrap();
        assert!(!status.connected);
    }

    #[tokio::test]
    async fn generate_qr_and_disconnect_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate-qr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "session_id": "session-new",
                "qr_code": "aGVsbG8=",
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/disconnect/session-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = test_config();
        config.base_url = server.uri();
        let qr = BridgeProvider::generate_qr(&config).await.unwrap();
        assert_eq!(qr.session_id, "session-new");
        assert!(!qr.qr_code.is_empty());

        let provider = provider_for(&server);
        provider.disconnect().await.unwrap();
    }
}
