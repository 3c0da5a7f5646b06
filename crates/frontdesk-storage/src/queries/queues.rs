// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily queue registry rows.

use chrono::{DateTime, NaiveDate, Utc};
use frontdesk_core::types::{DailyQueue, QueueDefaults, Scope};
use frontdesk_core::FrontdeskError;
use rusqlite::{params, OptionalExtension};

use super::{clock_column, clock_to_sql, day_column, day_to_sql, ts_column, ts_to_sql};
use crate::database::{map_tr_err, Database};

const QUEUE_COLUMNS: &str =
    "resource_id, day, start_number, is_open, opened_at, online_end_time, created_at";

fn queue_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyQueue> {
    Ok(DailyQueue {
        scope: Scope {
            resource_id: row.get(0)?,
            day: day_column(row, 1)?,
        },
        start_number: row.get(2)?,
        is_open: row.get(3)?,
        opened_at: super::opt_ts_column(row, 4)?,
        online_end_time: clock_column(row, 5)?,
        created_at: ts_column(row, 6)?,
    })
}

/// Insert the queue if absent and return the stored row.
///
/// An existing row keeps its original start number and cutoff.
pub async fn ensure_queue(
    db: &Database,
    scope: &Scope,
    defaults: QueueDefaults,
    now: DateTime<Utc>,
) -> Result<DailyQueue, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let end_time = clock_to_sql(defaults.online_end_time);
    let created_at = ts_to_sql(&now);
    db.connection()
        .call(move |conn| -> Result<DailyQueue, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO daily_queues
                     (resource_id, day, start_number, is_open, online_end_time, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4, ?5)",
                params![resource_id, day, defaults.start_number, end_time, created_at],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {QUEUE_COLUMNS} FROM daily_queues WHERE resource_id = ?1 AND day = ?2"
                ),
                params![resource_id, day],
                queue_from_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_queue(db: &Database, scope: &Scope) -> Result<Option<DailyQueue>, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    db.connection()
        .call(move |conn| -> Result<Option<DailyQueue>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {QUEUE_COLUMNS} FROM daily_queues WHERE resource_id = ?1 AND day = ?2"
                ),
                params![resource_id, day],
                queue_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All queues for a day, ordered by resource id.
pub async fn list_queues(db: &Database, day: NaiveDate) -> Result<Vec<DailyQueue>, FrontdeskError> {
    let day = day_to_sql(day);
    db.connection()
        .call(move |conn| -> Result<Vec<DailyQueue>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUEUE_COLUMNS} FROM daily_queues WHERE day = ?1 ORDER BY resource_id"
            ))?;
            let rows = stmt.query_map(params![day], queue_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Start front-desk service: stamp `opened_at` once and close online joining.
pub async fn mark_opened(
    db: &Database,
    scope: &Scope,
    at: DateTime<Utc>,
) -> Result<bool, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    let at = ts_to_sql(&at);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE daily_queues
                 SET opened_at = COALESCE(opened_at, ?3), is_open = 0
                 WHERE resource_id = ?1 AND day = ?2
                   AND (opened_at IS NULL OR is_open = 1)",
                params![resource_id, day, at],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Scheduled close, guarded so it only ever fires once per queue.
pub async fn close_online(db: &Database, scope: &Scope) -> Result<bool, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE daily_queues SET is_open = 0
                 WHERE resource_id = ?1 AND day = ?2 AND is_open = 1 AND opened_at IS NULL",
                params![resource_id, day],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
