// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account lifecycle commands: signup, credential linking, upgrade.

use chatvault_bridge::BridgeProvider;
use chatvault_config::ChatvaultConfig;
use chatvault_core::ChatvaultError;
use chatvault_core::traits::ProviderAdapter;
use chatvault_core::types::{
    PlanStatus, PlanTier, Subscription, SubscriptionStatus, User, now_rfc3339,
};
use chatvault_meta::MetaProvider;
use chatvault_plans::{PlanPolicy, plan_for};
use chatvault_storage::Database;
use chatvault_storage::queries::{subscriptions, users};
use tracing::info;

async fn open_db(config: &ChatvaultConfig) -> Result<Database, ChatvaultError> {
    Database::open_with(&config.storage.database_path, config.storage.wal_mode).await
}

async fn load_user(db: &Database, user_id: &str) -> Result<User, ChatvaultError> {
    users::get_user(db, user_id)
        .await?
        .ok_or_else(|| ChatvaultError::Config(format!("unknown user {user_id}")))
}

/// Creates an express-tier account with a trial subscription.
pub async fn run_signup(
    config: ChatvaultConfig,
    email: &str,
    name: Option<String>,
    phone: Option<String>,
) -> Result<(), ChatvaultError> {
    let db = open_db(&config).await?;

    if users::get_user_by_email(&db, email).await?.is_some() {
        return Err(ChatvaultError::Config(format!(
            "an account for {email} already exists"
        )));
    }

    let spec = plan_for(PlanTier::Express);
    let now = chrono::Utc::now();
    let period_end = now + chrono::Duration::days(30);
    let timestamp = now_rfc3339();

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        full_name: name,
        phone_number: phone,
        plan_tier: PlanTier::Express,
        plan_status: PlanStatus::Trial,
        api_phone_id: None,
        api_access_token: None,
        bridge_session_id: None,
        bridge_auth_state: None,
        auto_backup_enabled: true,
        backup_frequency_hours: spec.backup_frequency_hours,
        created_at: timestamp.clone(),
        updated_at: timestamp.clone(),
    };
    users::create_user(&db, &user).await?;

    let sub = Subscription {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        plan_tier: PlanTier::Express,
        status: SubscriptionStatus::Active,
        current_period_start: Some(timestamp.clone()),
        current_period_end: Some(
            period_end.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        ),
        cancel_at_period_end: false,
        price_monthly: Some(spec.price_monthly),
        messages_this_period: 0,
        max_messages: spec.max_messages,
        created_at: timestamp,
    };
    subscriptions::create_subscription(&db, &sub).await?;

    info!(user_id = %user.id, email, "account created");
    println!("created user {} on the {} plan", user.id, spec.name);
    println!("next: chatvault connect-bridge {}", user.id);

    db.close().await
}

/// Stores business API credentials and verifies them end to end.
pub async fn run_connect_api(
    config: ChatvaultConfig,
    user_id: &str,
    phone_id: &str,
    access_token: &str,
) -> Result<(), ChatvaultError> {
    let db = open_db(&config).await?;
    let user = load_user(&db, user_id).await?;

    let provider = MetaProvider::new(phone_id.to_string(), access_token, &config.meta)?;
    let status = provider.check_connection().await?;
    if !status.connected {
        return Err(ChatvaultError::Provider {
            message: format!(
                "credential check failed: {}",
                status.detail.unwrap_or_else(|| "no detail".to_string())
            ),
            source: None,
        });
    }

    users::set_api_credentials(&db, user_id, phone_id, access_token).await?;
    match status.detail {
        Some(name) => println!("connected to business account: {name}"),
        None => println!("connected"),
    }

    if let Some(phone) = &user.phone_number {
        provider
            .send_test_message(phone, "Chatvault is connected and will back up this account.")
            .await?;
        println!("test message sent to {phone}");
    }

    db.close().await
}

/// Starts a QR-linked bridge session and stores it on the user.
pub async fn run_connect_bridge(
    config: ChatvaultConfig,
    user_id: &str,
) -> Result<(), ChatvaultError> {
    let db = open_db(&config).await?;
    load_user(&db, user_id).await?;

    let qr = BridgeProvider::generate_qr(&config.bridge).await?;
    users::set_bridge_session(&db, user_id, &qr.session_id).await?;

    println!("session {} created", qr.session_id);
    println!("scan this QR code (base64 PNG) in WhatsApp > Linked Devices:");
    println!("{}", qr.qr_code);
    println!("then check linking with: chatvault status {user_id}");

    db.close().await
}

/// Tears down the user's bridge session.
pub async fn run_disconnect(config: ChatvaultConfig, user_id: &str) -> Result<(), ChatvaultError> {
    let db = open_db(&config).await?;
    let user = load_user(&db, user_id).await?;

    let Some(session_id) = user.bridge_session_id else {
        return Err(ChatvaultError::Config(format!(
            "user {user_id} has no bridge session"
        )));
    };
    let provider = BridgeProvider::new(session_id, &config.bridge)?;
    provider.disconnect().await?;
    users::clear_bridge_session(&db, user_id).await?;
    println!("bridge session removed");

    db.close().await
}

/// Moves the user to the pro tier.
pub async fn run_upgrade(config: ChatvaultConfig, user_id: &str) -> Result<(), ChatvaultError> {
    let db = open_db(&config).await?;
    let user = load_user(&db, user_id).await?;
    if user.plan_tier == PlanTier::Pro {
        return Err(ChatvaultError::Config(format!(
            "user {user_id} is already on the pro plan"
        )));
    }

    let sub = PlanPolicy::new(db.clone()).upgrade_to_pro(user_id).await?;
    println!("upgraded to pro (subscription {})", sub.id);
    println!("next: chatvault connect-api {user_id} <phone_id> <access_token>");

    db.close().await
}
