// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for daily queues, counters, identity bindings, and entries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FrontdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    DailyQueue, EntryId, IdentityKey, NewJoin, QueueDefaults, QueueEntry, Scope, StatusChange,
    TicketCounters,
};

/// Typed persistence for the online queue.
///
/// Counters and identity bindings live in separate typed tables rather than a
/// generic key/value store. Callers serialize mutations per scope.
/// `record_join` and `apply_transition` touch several tables and must commit
/// all of their writes or none of them.
#[async_trait]
pub trait QueueStore: PluginAdapter {
    /// Prepares the backend (migrations, connections).
    async fn initialize(&self) -> Result<(), FrontdeskError>;

    // --- Daily queue registry ---

    /// Returns the queue for `scope`, creating it with `defaults` on first reference.
    async fn ensure_queue(
        &self,
        scope: &Scope,
        defaults: QueueDefaults,
    ) -> Result<DailyQueue, FrontdeskError>;

    /// Returns the queue for `scope` without creating it.
    async fn get_queue(&self, scope: &Scope) -> Result<Option<DailyQueue>, FrontdeskError>;

    /// Lists all queues recorded for `day`.
    async fn list_queues(&self, day: NaiveDate) -> Result<Vec<DailyQueue>, FrontdeskError>;

    /// Marks front-desk service as started: sets `opened_at` (if unset) and
    /// closes online registration. Returns `true` if the row changed.
    async fn mark_opened(&self, scope: &Scope, at: DateTime<Utc>) -> Result<bool, FrontdeskError>;

    /// Closes online registration if it is open and service has not started.
    /// Returns `true` if the row changed; a second call is a no-op.
    async fn close_online(&self, scope: &Scope) -> Result<bool, FrontdeskError>;

    // --- Ticket counters ---

    /// Reads the counters for `scope` (all zero before the first issuance).
    async fn counters(&self, scope: &Scope) -> Result<TicketCounters, FrontdeskError>;

    // --- Identity bindings ---

    /// Looks up the ticket bound to `key` within `scope`.
    async fn find_binding(
        &self,
        scope: &Scope,
        key: &IdentityKey,
    ) -> Result<Option<u32>, FrontdeskError>;

    /// Binds `key` to `number` within `scope`, replacing any previous binding.
    async fn bind_identity(
        &self,
        scope: &Scope,
        key: &IdentityKey,
        number: u32,
    ) -> Result<(), FrontdeskError>;

    /// Deletes bindings for days strictly before `day`. Returns the number removed.
    async fn purge_bindings_before(&self, day: NaiveDate) -> Result<u64, FrontdeskError>;

    // --- Entries ---

    /// Issues the next ticket and records its entry as one unit.
    ///
    /// The number is `max(last, start_number - 1) + 1` and the waiting
    /// counter grows by one. Every key in `join.keys` is bound to the number.
    /// The entry is placed after the highest stored position of the scope.
    /// On any failure nothing is written.
    async fn record_join(&self, join: NewJoin) -> Result<QueueEntry, FrontdeskError>;

    async fn get_entry(&self, id: EntryId) -> Result<Option<QueueEntry>, FrontdeskError>;

    async fn entry_by_number(
        &self,
        scope: &Scope,
        number: u32,
    ) -> Result<Option<QueueEntry>, FrontdeskError>;

    /// Lists every entry in the scope: positioned entries by position, then
    /// terminal entries by ticket number.
    async fn list_entries(&self, scope: &Scope) -> Result<Vec<QueueEntry>, FrontdeskError>;

    /// Applies a batch of position changes as one unit.
    async fn set_positions(
        &self,
        scope: &Scope,
        changes: &[(EntryId, Option<u32>)],
    ) -> Result<(), FrontdeskError>;

    /// Moves an entry from `change.from` to `change.to`, shifts the running
    /// counters between the two buckets, and applies `change.positions`, all
    /// as one unit. Optionally stamps `called_at`.
    ///
    /// Returns `NotFound` for an unknown entry and `Conflict` when the entry
    /// no longer holds `change.from`. On any failure nothing is written.
    async fn apply_transition(&self, change: StatusChange) -> Result<QueueEntry, FrontdeskError>;
}
