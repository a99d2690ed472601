// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use chatvault_core::ChatvaultError;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database.
///
/// Cheap to clone; all clones share the same single-writer background
/// thread. Opened with WAL mode, foreign keys, and a busy timeout, and with
/// all pending migrations applied.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode, run pragmas
    /// and migrations.
    pub async fn open(path: &str) -> Result<Self, ChatvaultError> {
        Self::open_with(path, true).await
    }

    /// Like [`Database::open`], with the journal mode made explicit.
    /// `wal_mode: false` keeps SQLite's default rollback journal.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ChatvaultError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ChatvaultError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        // Pragmas and migrations run on a blocking connection before the
        // async handle is opened, so every caller sees a migrated schema.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), ChatvaultError> {
            let mut conn =
                rusqlite::Connection::open(&setup_path).map_err(|e| ChatvaultError::Storage {
                    source: Box::new(e),
                })?;
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))
            .map_err(|e| ChatvaultError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| ChatvaultError::Internal(format!("database setup task failed: {e}")))??;

        // tokio-rusqlite's open surfaces the rusqlite error directly.
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ChatvaultError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying async connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL. Called on graceful shutdown.
    pub async fn close(&self) -> Result<(), ChatvaultError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Simple liveness probe.
    pub async fn health_check(&self) -> Result<(), ChatvaultError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> ChatvaultError {
    ChatvaultError::Storage {
        source: Box::new(e),
    }
}
