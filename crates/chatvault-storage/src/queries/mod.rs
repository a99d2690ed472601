// SPDX-FileCopyrightText: 2026 Chatvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod backups;
pub mod messages;
pub mod subscriptions;
pub mod users;

/// Parse a TEXT column into a string-backed enum inside a row mapper,
/// converting parse failures into rusqlite conversion errors.
pub(crate) fn parse_text_col<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
