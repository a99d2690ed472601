// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the Graph API message endpoints.

use serde::Deserialize;

/// One page of the messages listing.
#[derive(Debug, Deserialize)]
pub struct MessagesPage {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    pub paging: Option<Paging>,
}

/// Cursor pagination block. `next` is a complete URL for the next page.
#[derive(Debug, Deserialize)]
pub struct Paging {
    pub next: Option<String>,
}

/// Response of `GET /{phone_id}` used for the connection probe.
#[derive(Debug, Deserialize)]
pub struct PhoneNumberInfo {
    pub verified_name: Option<String>,
    pub display_phone_number: Option<String>,
}

/// Error envelope the Graph API wraps failures in.
#[derive(Debug, Deserialize)]
pub struct GraphErrorResponse {
    pub error: GraphError,
}

#[derive(Debug, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(default)]
    pub code: i64,
}
