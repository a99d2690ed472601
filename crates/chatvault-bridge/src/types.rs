// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the bridge HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /fetch-messages`.
#[derive(Debug, Serialize)]
pub struct FetchMessagesRequest {
    pub session_id: String,
    pub days_back: u32,
}

/// Response of `POST /fetch-messages`.
#[derive(Debug, Deserialize)]
pub struct FetchMessagesResponse {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

/// Response of `GET /status/{session_id}`.
#[derive(Debug, Deserialize)]
pub struct SessionStatus {
    pub connected: bool,
    pub phone_number: Option<String>,
}

/// Response of `POST /generate-qr`.
#[derive(Debug, Deserialize)]
pub struct QrResponse {
    pub session_id: String,
    /// Base64-encoded QR PNG for the user to scan.
    pub qr_code: String,
}
