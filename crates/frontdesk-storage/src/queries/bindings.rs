// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity-to-ticket bindings used for join deduplication.

use chrono::NaiveDate;
use frontdesk_core::types::{IdentityKey, Scope};
use frontdesk_core::FrontdeskError;
use rusqlite::{params, Connection, OptionalExtension};

use super::day_to_sql;
use crate::database::{map_tr_err, Database};

pub async fn find_binding(
    db: &Database,
    scope: &Scope,
    key: &IdentityKey,
) -> Result<Option<u32>, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let kind = key.kind.to_string();
    let value = key.value.clone();
    db.connection()
        .call(move |conn| -> Result<Option<u32>, rusqlite::Error> {
            conn.query_row(
                "SELECT number FROM identity_bindings
                 WHERE resource_id = ?1 AND day = ?2 AND identity_kind = ?3 AND identity_value = ?4",
                params![resource_id, day, kind, value],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Bind `key` to `number` inside the caller's transaction, replacing an
/// existing binding for the same key.
pub(crate) fn bind_in(
    conn: &Connection,
    resource_id: &str,
    day: &str,
    key: &IdentityKey,
    number: u32,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO identity_bindings (resource_id, day, identity_kind, identity_value, number)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (resource_id, day, identity_kind, identity_value) DO UPDATE SET
             number = excluded.number,
             bound_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
        params![resource_id, day, key.kind.to_string(), key.value, number],
    )?;
    Ok(())
}

pub async fn bind_identity(
    db: &Database,
    scope: &Scope,
    key: &IdentityKey,
    number: u32,
) -> Result<(), FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            bind_in(conn, &resource_id, &day, &key, number)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn purge_bindings_before(db: &Database, day: NaiveDate) -> Result<u64, FrontdeskError> {
    let day = day_to_sql(day);
    db.connection()
        .call(move |conn| -> Result<u64, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM identity_bindings WHERE day < ?1",
                params![day],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}
