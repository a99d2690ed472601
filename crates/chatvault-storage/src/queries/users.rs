// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use chatvault_core::ChatvaultError;
use chatvault_core::types::{PlanTier, User};
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_text_col;

const USER_COLUMNS: &str = "id, email, full_name, phone_number, plan_tier, plan_status, \
     api_phone_id, api_access_token, bridge_session_id, bridge_auth_state, \
     auto_backup_enabled, backup_frequency_hours, created_at, updated_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        phone_number: row.get(3)?,
        plan_tier: parse_text_col(4, row.get::<_, String>(4)?)?,
        plan_status: parse_text_col(5, row.get::<_, String>(5)?)?,
        api_phone_id: row.get(6)?,
        api_access_token: row.get(7)?,
        bridge_session_id: row.get(8)?,
        bridge_auth_state: row.get(9)?,
        auto_backup_enabled: row.get(10)?,
        backup_frequency_hours: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Insert a new user.
pub async fn create_user(db: &Database, user: &User) -> Result<(), ChatvaultError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, full_name, phone_number, plan_tier, plan_status,
                     api_phone_id, api_access_token, bridge_session_id, bridge_auth_state,
                     auto_backup_enabled, backup_frequency_hours, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    user.id,
                    user.email,
                    user.full_name,
                    user.phone_number,
                    user.plan_tier.to_string(),
                    user.plan_status.to_string(),
                    user.api_phone_id,
                    user.api_access_token,
                    user.bridge_session_id,
                    user.bridge_auth_state,
                    user.auto_backup_enabled,
                    user.backup_frequency_hours,
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, ChatvaultError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_user) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by email.
pub async fn get_user_by_email(db: &Database, email: &str) -> Result<Option<User>, ChatvaultError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
            match stmt.query_row(params![email], row_to_user) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List users eligible for a scheduled backup batch on the given tier:
/// auto-backup enabled and credentials present for the tier's mechanism.
pub async fn list_backup_candidates(
    db: &Database,
    tier: PlanTier,
) -> Result<Vec<User>, ChatvaultError> {
    let credential_predicate = match tier {
        PlanTier::Pro => "api_phone_id IS NOT NULL AND api_access_token IS NOT NULL",
        PlanTier::Express => "bridge_session_id IS NOT NULL",
    };
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE plan_tier = ?1 AND auto_backup_enabled = 1 AND {credential_predicate}
         ORDER BY created_at ASC"
    );
    let tier = tier.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tier], row_to_user)?;
            let mut users = Vec::new();
            for row in rows {
                users.push(row?);
            }
            Ok(users)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store business-API credentials on a user.
pub async fn set_api_credentials(
    db: &Database,
    user_id: &str,
    phone_id: &str,
    access_token: &str,
) -> Result<(), ChatvaultError> {
    let user_id = user_id.to_string();
    let phone_id = phone_id.to_string();
    let access_token = access_token.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET api_phone_id = ?2, api_access_token = ?3,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![user_id, phone_id, access_token],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store a bridge session on a user.
pub async fn set_bridge_session(
    db: &Database,
    user_id: &str,
    session_id: &str,
) -> Result<(), ChatvaultError> {
    let user_id = user_id.to_string();
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET bridge_session_id = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![user_id, session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Clear a user's bridge session and auth state (logout / disconnect).
pub async fn clear_bridge_session(db: &Database, user_id: &str) -> Result<(), ChatvaultError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET bridge_session_id = NULL, bridge_auth_state = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
