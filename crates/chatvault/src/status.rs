// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatvault status`, `history`, and `search` command implementations.

use chatvault_config::ChatvaultConfig;
use chatvault_core::ChatvaultError;
use chatvault_plans::PlanPolicy;
use chatvault_storage::queries::users;

use crate::backup::build_engine;

/// Prints the user's connection state and plan usage.
pub async fn run_status(config: ChatvaultConfig, user_id: &str) -> Result<(), ChatvaultError> {
    let (db, engine) = build_engine(&config).await?;

    let user = users::get_user(&db, user_id)
        .await?
        .ok_or_else(|| ChatvaultError::Config(format!("unknown user {user_id}")))?;
    println!("{} ({})", user.email, user.plan_tier);

    match engine.connection_status(user_id).await {
        Ok(status) => {
            let state = if status.connected { "connected" } else { "disconnected" };
            match status.detail {
                Some(detail) => println!("  provider: {state} ({detail})"),
                None => println!("  provider: {state}"),
            }
        }
        Err(err) => println!("  provider: unavailable ({err})"),
    }

    let limit = PlanPolicy::new(db.clone()).check_message_limit(user_id).await?;
    match limit.remaining {
        Some(remaining) if limit.over_limit => {
            println!("  plan:     message limit reached ({remaining} remaining)");
        }
        Some(remaining) => println!("  plan:     {remaining} messages remaining this period"),
        None => println!("  plan:     unlimited messages"),
    }

    db.close().await
}

/// Prints the user's recent backup runs, newest first.
pub async fn run_history(
    config: ChatvaultConfig,
    user_id: &str,
    limit: u32,
) -> Result<(), ChatvaultError> {
    let (db, engine) = build_engine(&config).await?;

    let runs = engine.history(user_id, limit).await?;
    if runs.is_empty() {
        println!("no backups yet");
    }
    for run in runs {
        let mut line = format!(
            "{}  {}  {}  {} messages, {} contacts",
            run.started_at, run.status, run.source, run.total_messages, run.total_contacts
        );
        if let Some(error) = run.error_message {
            line.push_str(&format!("  ({error})"));
        }
        println!("{line}");
    }

    db.close().await
}

/// Searches the user's archive and prints matches.
pub async fn run_search(
    config: ChatvaultConfig,
    user_id: &str,
    query: &str,
) -> Result<(), ChatvaultError> {
    let (db, engine) = build_engine(&config).await?;

    let matches = engine.search_messages(user_id, query).await?;
    if matches.is_empty() {
        println!("no matches");
    }
    for msg in matches {
        let direction = if msg.is_from_me { "->" } else { "<-" };
        println!(
            "{}  {} {} ({}): {}",
            msg.sent_at, direction, msg.contact_name, msg.contact_phone, msg.body
        );
    }

    db.close().await
}
