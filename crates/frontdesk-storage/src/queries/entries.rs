// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue entry rows, position rewrites, and the compound join and status
//! writes that keep counters and bindings in step with them.

use frontdesk_core::types::{
    EntryId, EntryStatus, IdentityKey, NewJoin, QueueEntry, Scope, StatusChange,
};
use frontdesk_core::FrontdeskError;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    bindings, counters, day_column, day_to_sql, enum_column, opt_ts_column, ts_column, ts_to_sql,
};
use crate::database::{map_tr_err, Database};

const ENTRY_COLUMNS: &str = "id, resource_id, day, number, position, identity_kind, \
     identity_value, display_name, status, source, created_at, called_at";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: EntryId(row.get(0)?),
        scope: Scope {
            resource_id: row.get(1)?,
            day: day_column(row, 2)?,
        },
        number: row.get(3)?,
        position: row.get(4)?,
        identity: IdentityKey {
            kind: enum_column(row, 5)?,
            value: row.get(6)?,
        },
        display_name: row.get(7)?,
        status: enum_column(row, 8)?,
        source: enum_column(row, 9)?,
        created_at: ts_column(row, 10)?,
        called_at: opt_ts_column(row, 11)?,
    })
}

/// Issue a ticket, bind its identities, and insert its entry in one
/// transaction.
///
/// The entry goes after the highest position stored for the scope, so a
/// line with gaps never hands out a slot that is already taken.
pub async fn record_join(db: &Database, join: NewJoin) -> Result<QueueEntry, FrontdeskError> {
    let Some(identity) = join.keys.first().cloned() else {
        return Err(FrontdeskError::Validation(
            "identity requires a phone or chat_id".to_string(),
        ));
    };
    let resource_id = join.scope.resource_id.clone();
    let day = day_to_sql(join.scope.day);
    let kind = identity.kind.to_string();
    let value = identity.value.clone();
    let display_name = join.display_name.clone();
    let source = join.source.to_string();
    let created_at = ts_to_sql(&join.created_at);
    let start_number = join.start_number;
    let keys = join.keys.clone();

    let (id, number, position) = db
        .connection()
        .call(move |conn| -> Result<(i64, u32, u32), rusqlite::Error> {
            let tx = conn.transaction()?;
            let number = counters::issue_in(&tx, &resource_id, &day, start_number)?;
            for key in &keys {
                bindings::bind_in(&tx, &resource_id, &day, key, number)?;
            }
            let position: u32 = tx.query_row(
                "SELECT COALESCE(MAX(position), 0) + 1 FROM queue_entries
                 WHERE resource_id = ?1 AND day = ?2 AND position IS NOT NULL",
                params![resource_id, day],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO queue_entries
                     (resource_id, day, number, position, identity_kind, identity_value,
                      display_name, status, source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'waiting', ?8, ?9)",
                params![
                    resource_id,
                    day,
                    number,
                    position,
                    kind,
                    value,
                    display_name,
                    source,
                    created_at
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok((id, number, position))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(QueueEntry {
        id: EntryId(id),
        scope: join.scope,
        number,
        position: Some(position),
        identity,
        display_name: join.display_name,
        status: EntryStatus::Waiting,
        source: join.source,
        created_at: join.created_at,
        called_at: None,
    })
}

pub async fn get_entry(db: &Database, id: EntryId) -> Result<Option<QueueEntry>, FrontdeskError> {
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1"),
                params![id.0],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn entry_by_number(
    db: &Database,
    scope: &Scope,
    number: u32,
) -> Result<Option<QueueEntry>, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM queue_entries
                     WHERE resource_id = ?1 AND day = ?2 AND number = ?3"
                ),
                params![resource_id, day, number],
                entry_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Positioned entries by position, then terminal entries by ticket number.
pub async fn list_entries(db: &Database, scope: &Scope) -> Result<Vec<QueueEntry>, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    db.connection()
        .call(move |conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM queue_entries
                 WHERE resource_id = ?1 AND day = ?2
                 ORDER BY position IS NULL, position, number"
            ))?;
            let rows = stmt.query_map(params![resource_id, day], entry_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Write a batch of positions inside the caller's transaction.
///
/// New positions are first written negated, then flipped positive, so the
/// partial unique index never sees two rows holding the same slot mid-batch.
/// Returns the first entry that does not belong to the scope; the caller
/// must then drop the transaction.
fn stage_positions(
    conn: &Connection,
    resource_id: &str,
    day: &str,
    changes: &[(EntryId, Option<u32>)],
) -> rusqlite::Result<Option<EntryId>> {
    if changes.is_empty() {
        return Ok(None);
    }
    {
        let mut stmt = conn.prepare(
            "UPDATE queue_entries SET position = ?1
             WHERE id = ?2 AND resource_id = ?3 AND day = ?4",
        )?;
        for (id, position) in changes {
            let staged = position.map(|p| -i64::from(p));
            if stmt.execute(params![staged, id.0, resource_id, day])? == 0 {
                return Ok(Some(*id));
            }
        }
    }
    conn.execute(
        "UPDATE queue_entries SET position = -position
         WHERE resource_id = ?1 AND day = ?2 AND position < 0",
        params![resource_id, day],
    )?;
    Ok(None)
}

fn missing_entry(id: EntryId) -> FrontdeskError {
    FrontdeskError::NotFound {
        what: "entry",
        id: id.to_string(),
    }
}

/// Rewrite positions for a batch of entries in one transaction.
pub async fn set_positions(
    db: &Database,
    scope: &Scope,
    changes: &[(EntryId, Option<u32>)],
) -> Result<(), FrontdeskError> {
    if changes.is_empty() {
        return Ok(());
    }
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let changes = changes.to_vec();

    let missing = db
        .connection()
        .call(move |conn| -> Result<Option<EntryId>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let missing = stage_positions(&tx, &resource_id, &day, &changes)?;
            if missing.is_none() {
                tx.commit()?;
            }
            Ok(missing)
        })
        .await
        .map_err(map_tr_err)?;

    match missing {
        Some(id) => Err(missing_entry(id)),
        None => Ok(()),
    }
}

/// Why a status change was not applied.
enum Refused {
    Missing(EntryId),
    Moved(EntryStatus),
}

/// Apply a status change, its counter shift, and its position rewrite in one
/// transaction.
pub async fn apply_transition(
    db: &Database,
    change: StatusChange,
) -> Result<QueueEntry, FrontdeskError> {
    let StatusChange {
        id,
        scope,
        from,
        to,
        called_at,
        positions,
    } = change;
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let called_at = called_at.as_ref().map(ts_to_sql);

    let outcome = db
        .connection()
        .call(move |conn| -> Result<Result<QueueEntry, Refused>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE queue_entries SET status = ?1, called_at = COALESCE(?2, called_at)
                 WHERE id = ?3 AND resource_id = ?4 AND day = ?5 AND status = ?6",
                params![
                    to.to_string(),
                    called_at,
                    id.0,
                    resource_id,
                    day,
                    from.to_string()
                ],
            )?;
            if changed == 0 {
                let current = tx
                    .query_row(
                        "SELECT status FROM queue_entries
                         WHERE id = ?1 AND resource_id = ?2 AND day = ?3",
                        params![id.0, resource_id, day],
                        |row| enum_column::<EntryStatus>(row, 0),
                    )
                    .optional()?;
                return Ok(Err(match current {
                    Some(status) => Refused::Moved(status),
                    None => Refused::Missing(id),
                }));
            }
            counters::shift_in(&tx, &resource_id, &day, from.bucket(), to.bucket())?;
            if let Some(missing) = stage_positions(&tx, &resource_id, &day, &positions)? {
                return Ok(Err(Refused::Missing(missing)));
            }
            let entry = tx.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM queue_entries WHERE id = ?1"),
                params![id.0],
                entry_from_row,
            )?;
            tx.commit()?;
            Ok(Ok(entry))
        })
        .await
        .map_err(map_tr_err)?;

    outcome.map_err(|refused| match refused {
        Refused::Missing(id) => missing_entry(id),
        Refused::Moved(status) => FrontdeskError::Conflict(format!(
            "entry {id} is {status}, expected {from}"
        )),
    })
}
