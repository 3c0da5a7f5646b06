// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket counter rows: last issued number plus running counters.

use frontdesk_core::types::{CounterBucket, Scope, TicketCounters};
use frontdesk_core::FrontdeskError;
use rusqlite::{params, Connection, OptionalExtension};

use super::day_to_sql;
use crate::database::{map_tr_err, Database};

fn column(bucket: CounterBucket) -> &'static str {
    match bucket {
        CounterBucket::Waiting => "waiting",
        CounterBucket::Serving => "serving",
        CounterBucket::Done => "done",
    }
}

/// Issue the next ticket number inside the caller's transaction.
///
/// The upsert computes `max(last, start_number - 1) + 1` and bumps the
/// waiting counter inside SQLite, so two callers can never read the same
/// last value.
pub(crate) fn issue_in(
    conn: &Connection,
    resource_id: &str,
    day: &str,
    start_number: u32,
) -> rusqlite::Result<u32> {
    conn.query_row(
        "INSERT INTO ticket_counters (resource_id, day, last_ticket, waiting)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT (resource_id, day) DO UPDATE SET
             last_ticket = MAX(COALESCE(last_ticket, ?3 - 1), ?3 - 1) + 1,
             waiting = waiting + 1
         RETURNING last_ticket",
        params![resource_id, day, start_number],
        |row| row.get(0),
    )
}

pub async fn counters(db: &Database, scope: &Scope) -> Result<TicketCounters, FrontdeskError> {
    let resource_id = scope.resource_id.clone();
    let day = day_to_sql(scope.day);
    db.connection()
        .call(move |conn| -> Result<TicketCounters, rusqlite::Error> {
            let row = conn
                .query_row(
                    "SELECT last_ticket, waiting, serving, done
                     FROM ticket_counters WHERE resource_id = ?1 AND day = ?2",
                    params![resource_id, day],
                    |row| {
                        Ok(TicketCounters {
                            last_ticket: row.get(0)?,
                            waiting: row.get(1)?,
                            serving: row.get(2)?,
                            done: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row.unwrap_or_default())
        })
        .await
        .map_err(map_tr_err)
}

/// Move one unit from `from` to `to` inside the caller's transaction.
/// Counters never drop below zero.
pub(crate) fn shift_in(
    conn: &Connection,
    resource_id: &str,
    day: &str,
    from: Option<CounterBucket>,
    to: Option<CounterBucket>,
) -> rusqlite::Result<()> {
    if from == to {
        return Ok(());
    }
    let mut assignments = Vec::with_capacity(2);
    if let Some(from) = from {
        let col = column(from);
        assignments.push(format!("{col} = MAX({col} - 1, 0)"));
    }
    if let Some(to) = to {
        let col = column(to);
        assignments.push(format!("{col} = {col} + 1"));
    }
    conn.execute(
        "INSERT OR IGNORE INTO ticket_counters (resource_id, day) VALUES (?1, ?2)",
        params![resource_id, day],
    )?;
    conn.execute(
        &format!(
            "UPDATE ticket_counters SET {} WHERE resource_id = ?1 AND day = ?2",
            assignments.join(", ")
        ),
        params![resource_id, day],
    )?;
    Ok(())
}
