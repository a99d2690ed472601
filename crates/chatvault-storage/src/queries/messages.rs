// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence with provider-id dedup.

use chatvault_core::ChatvaultError;
use chatvault_core::types::StoredMessage;
use rusqlite::params;

use crate::database::Database;
use crate::queries::parse_text_col;

const MESSAGE_COLUMNS: &str = "id, user_id, backup_id, provider_message_id, contact_name, \
     contact_phone, body, kind, source, sent_at, is_from_me, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        backup_id: row.get(2)?,
        provider_message_id: row.get(3)?,
        contact_name: row.get(4)?,
        contact_phone: row.get(5)?,
        body: row.get(6)?,
        kind: parse_text_col(7, row.get::<_, String>(7)?)?,
        source: parse_text_col(8, row.get::<_, String>(8)?)?,
        sent_at: row.get(9)?,
        is_from_me: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Insert a message, skipping duplicates by provider message id.
///
/// Returns `true` if a new row was written, `false` if the provider id was
/// already present. The UNIQUE constraint does the dedup; callers count
/// only `true` results toward run totals.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<bool, ChatvaultError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO messages (id, user_id, backup_id, provider_message_id,
                     contact_name, contact_phone, body, kind, source, sent_at,
                     is_from_me, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(provider_message_id) DO NOTHING",
                params![
                    msg.id,
                    msg.user_id,
                    msg.backup_id,
                    msg.provider_message_id,
                    msg.contact_name,
                    msg.contact_phone,
                    msg.body,
                    msg.kind.to_string(),
                    msg.source.to_string(),
                    msg.sent_at,
                    msg.is_from_me,
                    msg.created_at,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of messages attributed to a backup run.
pub async fn count_for_backup(db: &Database, backup_id: &str) -> Result<u32, ChatvaultError> {
    let backup_id = backup_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE backup_id = ?1",
                params![backup_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct contact phone numbers attributed to a backup run.
pub async fn contact_count_for_backup(
    db: &Database,
    backup_id: &str,
) -> Result<u32, ChatvaultError> {
    let backup_id = backup_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(DISTINCT contact_phone) FROM messages WHERE backup_id = ?1",
                params![backup_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Case-insensitive substring search over a user's archived messages,
/// matching body and contact name, newest first.
pub async fn search_messages(
    db: &Database,
    user_id: &str,
    query: &str,
    limit: u32,
) -> Result<Vec<StoredMessage>, ChatvaultError> {
    let user_id = user_id.to_string();
    let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_id = ?1
                   AND (body LIKE ?2 ESCAPE '\\' OR contact_name LIKE ?2 ESCAPE '\\')
                 ORDER BY sent_at DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![user_id, pattern, limit], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A user's messages with one contact, oldest first (conversation order).
pub async fn messages_for_contact(
    db: &Database,
    user_id: &str,
    contact_phone: &str,
) -> Result<Vec<StoredMessage>, ChatvaultError> {
    let user_id = user_id.to_string();
    let contact_phone = contact_phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE user_id = ?1 AND contact_phone = ?2
                 ORDER BY sent_at ASC"
            ))?;
            let rows = stmt.query_map(params![user_id, contact_phone], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users::{self, tests::make_user};
    use chatvault_core::types::{MessageKind, MessageSource, PlanTier, now_rfc3339};
    use tempfile::tempdir;

    pub(crate) fn make_message(user_id: &str, provider_id: &str, body: &str) -> StoredMessage {
        StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            backup_id: None,
            provider_message_id: provider_id.to_string(),
            contact_name: "Alice".to_string(),
            contact_phone: "15550002222".to_string(),
            body: body.to_string(),
            kind: MessageKind::Text,
            source: MessageSource::Bridge,
            sent_at: now_rfc3339(),
            is_from_me: false,
            created_at: now_rfc3339(),
        }
    }

    async fn setup_with_user() -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("messages.db").to_str().unwrap())
            .await
            .unwrap();
        let user = make_user("archiver", PlanTier::Express);
        users::create_user(&db, &user).await.unwrap();
        (db, dir, user.id)
    }

    #[tokio::test]
    async fn insert_dedups_on_provider_message_id() {
        let (db, _dir, user_id) = setup_with_user().await;

        let first = make_message(&user_id, "wamid.1", "hello");
        assert!(insert_message(&db, &first).await.unwrap());

        // Same provider id, different row id: silently skipped.
        let duplicate = make_message(&user_id, "wamid.1", "hello again");
        assert!(!insert_message(&db, &duplicate).await.unwrap());

        let found = search_messages(&db, &user_id, "hello", 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body, "hello");
    }

    #[tokio::test]
    async fn counts_track_backup_attribution() {
        let (db, _dir, user_id) = setup_with_user().await;

        // Attribution goes through a real run row; backup_id is enforced
        // by a foreign key.
        let run = crate::queries::backups::create_run(&db, &user_id, MessageSource::Bridge)
            .await
            .unwrap();

        let mut a = make_message(&user_id, "wamid.a", "one");
        a.backup_id = Some(run.id.clone());
        let mut b = make_message(&user_id, "wamid.b", "two");
        b.backup_id = Some(run.id.clone());
        b.contact_phone = "15550003333".to_string();
        let c = make_message(&user_id, "wamid.c", "unattributed");

        insert_message(&db, &a).await.unwrap();
        insert_message(&db, &b).await.unwrap();
        insert_message(&db, &c).await.unwrap();

        assert_eq!(count_for_backup(&db, &run.id).await.unwrap(), 2);
        assert_eq!(contact_count_for_backup(&db, &run.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn search_matches_body_and_contact_name() {
        let (db, _dir, user_id) = setup_with_user().await;

        insert_message(&db, &make_message(&user_id, "wamid.1", "lunch tomorrow?"))
            .await
            .unwrap();
        let mut from_bob = make_message(&user_id, "wamid.2", "see you");
        from_bob.contact_name = "Bob".to_string();
        insert_message(&db, &from_bob).await.unwrap();

        let by_body = search_messages(&db, &user_id, "lunch", 100).await.unwrap();
        assert_eq!(by_body.len(), 1);

        let by_name = search_messages(&db, &user_id, "bob", 100).await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].contact_name, "Bob");
    }

    #[tokio::test]
    async fn search_escapes_like_wildcards() {
        let (db, _dir, user_id) = setup_with_user().await;
        insert_message(&db, &make_message(&user_id, "wamid.1", "100% sure"))
            .await
            .unwrap();
        insert_message(&db, &make_message(&user_id, "wamid.2", "100 things"))
            .await
            .unwrap();

        let found = search_messages(&db, &user_id, "100%", 100).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body, "100% sure");
    }

    #[tokio::test]
    async fn conversation_view_is_oldest_first() {
        let (db, _dir, user_id) = setup_with_user().await;
        let mut early = make_message(&user_id, "wamid.early", "first");
        early.sent_at = "2026-01-01T00:00:00.000Z".to_string();
        let mut late = make_message(&user_id, "wamid.late", "second");
        late.sent_at = "2026-02-01T00:00:00.000Z".to_string();

        insert_message(&db, &late).await.unwrap();
        insert_message(&db, &early).await.unwrap();

        let convo = messages_for_contact(&db, &user_id, "15550002222").await.unwrap();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].body, "first");
        assert_eq!(convo[1].body, "second");
    }
}
