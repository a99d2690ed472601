// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Graph API and its [`ProviderAdapter`] impl.

use std::time::Duration;

use async_trait::async_trait;
use chatvault_config::model::MetaConfig;
use chatvault_core::ChatvaultError;
use chatvault_core::traits::ProviderAdapter;
use chatvault_core::types::{ConnectionStatus, MessageKind, MessageSource, NormalizedMessage};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{GraphErrorResponse, MessagesPage, PhoneNumberInfo};

/// Provider adapter for the WhatsApp Business (Cloud) API.
///
/// One instance per user; carries that user's phone number id and bearer
/// token. Pagination follows `paging.next` until absent.
#[derive(Debug, Clone)]
pub struct MetaProvider {
    client: reqwest::Client,
    base_url: String,
    phone_id: String,
    page_size: u32,
}

impl MetaProvider {
    pub fn new(
        phone_id: String,
        access_token: &str,
        config: &MetaConfig,
    ) -> Result<Self, ChatvaultError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| ChatvaultError::Config(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ChatvaultError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            phone_id,
            page_size: config.page_size,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a plain text message. Used to verify freshly stored
    /// credentials end to end.
    pub async fn send_test_message(&self, to: &str, body: &str) -> Result<(), ChatvaultError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_id);
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body, "preview_url": false },
        });
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatvaultError::Provider {
                message: format!("test message request failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(graph_status_error("test message", response).await);
        }
        Ok(())
    }
}

/// Turn a non-2xx Graph response into a provider error, preferring the
/// API's own error message when the envelope parses.
async fn graph_status_error(context: &str, response: reqwest::Response) -> ChatvaultError {
    let status = response.status();
    let detail = match response.json::<GraphErrorResponse>().await {
        Ok(envelope) => format!("{} (code {})", envelope.error.message, envelope.error.code),
        Err(_) => status.to_string(),
    };
    ChatvaultError::Provider {
        message: format!("{context}: {detail}"),
        source: None,
    }
}

fn missing_field(field: &str) -> ChatvaultError {
    ChatvaultError::Provider {
        message: format!("message payload missing `{field}`"),
        source: None,
    }
}

#[async_trait]
impl ProviderAdapter for MetaProvider {
    fn name(&self) -> &str {
        "whatsapp-business-api"
    }

    fn source(&self) -> MessageSource {
        MessageSource::Api
    }

    async fn check_connection(&self) -> Result<ConnectionStatus, ChatvaultError> {
        let url = format!(
            "{}/{}?fields=verified_name,display_phone_number",
            self.base_url, self.phone_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatvaultError::Provider {
                message: format!("connection probe failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            let err = graph_status_error("connection probe", response).await;
            return Ok(ConnectionStatus {
                connected: false,
                detail: Some(err.to_string()),
            });
        }

        let info: PhoneNumberInfo = response.json().await.map_err(|e| ChatvaultError::Provider {
            message: format!("malformed phone number info: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(ConnectionStatus {
            connected: true,
            detail: info.verified_name.or(info.display_phone_number),
        })
    }

    async fn fetch_messages(
        &self,
        days_back: u32,
    ) -> Result<Vec<serde_json::Value>, ChatvaultError> {
        let since = chrono::Utc::now().timestamp() - i64::from(days_back) * 86_400;
        let mut url = format!(
            "{}/{}/messages?limit={}&since={}",
            self.base_url, self.phone_id, self.page_size, since
        );
        let mut messages = Vec::new();
        let mut page_index = 0u32;

        loop {
            let result = self.client.get(&url).send().await;
            let response = match result {
                Ok(response) => response,
                Err(e) if page_index > 0 => {
                    // Keep what we already have; the run records a partial
                    // window rather than losing the whole fetch.
                    warn!(page = page_index, error = %e, "message page fetch failed, keeping partial window");
                    break;
                }
                Err(e) => {
                    return Err(ChatvaultError::Provider {
                        message: format!("message fetch failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            };

            if !response.status().is_success() {
                let err = graph_status_error("message fetch", response).await;
                if page_index > 0 {
                    warn!(page = page_index, error = %err, "message page rejected, keeping partial window");
                    break;
                }
                return Err(err);
            }

            let page: MessagesPage =
                response.json().await.map_err(|e| ChatvaultError::Provider {
                    message: format!("malformed message page: {e}"),
                    source: Some(Box::new(e)),
                })?;
            debug!(page = page_index, count = page.data.len(), "fetched message page");
            messages.extend(page.data);

            match page.paging.and_then(|p| p.next) {
                Some(next) => {
                    url = next;
                    page_index += 1;
                }
                None => break,
            }
        }

        Ok(messages)
    }

    fn normalize(&self, raw: &serde_json::Value) -> Result<NormalizedMessage, ChatvaultError> {
        let id = raw
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing_field("id"))?;
        let from = raw
            .get("from")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| missing_field("from"))?;

        let sent_at_epoch = match raw.get("timestamp") {
            Some(serde_json::Value::String(s)) => {
                s.parse::<i64>().map_err(|_| ChatvaultError::Provider {
                    message: format!("unparseable timestamp `{s}`"),
                    source: None,
                })?
            }
            Some(serde_json::Value::Number(n)) => {
                n.as_i64().ok_or_else(|| missing_field("timestamp"))?
            }
            _ => return Err(missing_field("timestamp")),
        };

        let kind_tag = raw
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("text");
        let caption = |key: &str| {
            raw.get(key)
                .and_then(|v| v.get("caption"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        let (kind, body) = match kind_tag {
            "image" => (
                MessageKind::Image,
                match caption("image") {
                    Some(c) => format!("[Image: {c}]"),
                    None => "[Image]".to_string(),
                },
            ),
            "video" => (
                MessageKind::Video,
                match caption("video") {
                    Some(c) => format!("[Video: {c}]"),
                    None => "[Video]".to_string(),
                },
            ),
            "audio" => (MessageKind::Audio, "[Audio message]".to_string()),
            "document" => (
                MessageKind::Document,
                match raw
                    .get("document")
                    .and_then(|v| v.get("filename"))
                    .and_then(serde_json::Value::as_str)
                {
                    Some(name) => format!("[Document: {name}]"),
                    None => "[Document]".to_string(),
                },
            ),
            // Unknown discriminators archive whatever text payload exists.
            _ => (
                MessageKind::Text,
                raw.get("text")
                    .and_then(|v| v.get("body"))
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            ),
        };

        let contact_name = raw
            .get("profile")
            .and_then(|v| v.get("name"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        Ok(NormalizedMessage {
            provider_message_id: id.to_string(),
            contact_name,
            contact_phone: from.to_string(),
            body,
            kind,
            sent_at_epoch,
            is_from_me: None,
        })
    }
}
