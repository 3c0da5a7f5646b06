// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `QueueStore` for deterministic tests.
//!
//! Mirrors the SQLite store's semantics (guarded close, all-or-nothing joins,
//! transitions and position batches) without touching disk.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use frontdesk_core::types::{
    CounterBucket, DailyQueue, EntryId, EntryStatus, HealthStatus, IdentityKey, NewJoin,
    QueueDefaults, QueueEntry, Scope, StatusChange, TicketCounters,
};
use frontdesk_core::{FrontdeskError, PluginAdapter, QueueStore};

#[derive(Default)]
struct State {
    queues: BTreeMap<Scope, DailyQueue>,
    counters: HashMap<Scope, TicketCounters>,
    bindings: HashMap<(Scope, IdentityKey), u32>,
    entries: BTreeMap<EntryId, QueueEntry>,
    next_id: i64,
    fail_next: Option<String>,
    fail_step: Option<(WriteStep, String)>,
}

/// The last write of a compound store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    /// Inserting the entry in `record_join`, after the number is issued and
    /// the identities are bound.
    InsertEntry,
    /// Shifting the counters in `apply_transition`, after the status update.
    ShiftCounter,
}

/// A `QueueStore` held entirely in process memory.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<State>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next store call fail with a storage error.
    pub async fn fail_next(&self, reason: &str) {
        self.state.lock().await.fail_next = Some(reason.to_string());
    }

    /// Make the next compound write fail once it reaches `step`.
    pub async fn fail_at(&self, step: WriteStep, reason: &str) {
        self.state.lock().await.fail_step = Some((step, reason.to_string()));
    }

    /// Number of bindings currently held (all scopes).
    pub async fn binding_count(&self) -> usize {
        self.state.lock().await.bindings.len()
    }
}

fn bucket_mut(counters: &mut TicketCounters, bucket: CounterBucket) -> &mut u32 {
    match bucket {
        CounterBucket::Waiting => &mut counters.waiting,
        CounterBucket::Serving => &mut counters.serving,
        CounterBucket::Done => &mut counters.done,
    }
}

fn shift(counters: &mut TicketCounters, from: Option<CounterBucket>, to: Option<CounterBucket>) {
    if from == to {
        return;
    }
    if let Some(from) = from {
        let slot = bucket_mut(counters, from);
        *slot = slot.saturating_sub(1);
    }
    if let Some(to) = to {
        *bucket_mut(counters, to) += 1;
    }
}

fn missing_entry(id: EntryId) -> FrontdeskError {
    FrontdeskError::NotFound {
        what: "entry",
        id: id.to_string(),
    }
}

impl State {
    fn check(&mut self) -> Result<(), FrontdeskError> {
        match self.fail_next.take() {
            Some(reason) => Err(FrontdeskError::Storage {
                source: reason.into(),
            }),
            None => Ok(()),
        }
    }

    fn check_step(&mut self, step: WriteStep) -> Result<(), FrontdeskError> {
        match self.fail_step.take() {
            Some((armed, reason)) if armed == step => Err(FrontdeskError::Storage {
                source: reason.into(),
            }),
            other => {
                self.fail_step = other;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for MemoryQueueStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, FrontdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FrontdeskError> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn initialize(&self) -> Result<(), FrontdeskError> {
        Ok(())
    }

    async fn ensure_queue(
        &self,
        scope: &Scope,
        defaults: QueueDefaults,
    ) -> Result<DailyQueue, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let queue = state
            .queues
            .entry(scope.clone())
            .or_insert_with(|| DailyQueue {
                scope: scope.clone(),
                start_number: defaults.start_number,
                is_open: true,
                opened_at: None,
                online_end_time: defaults.online_end_time,
                created_at: Utc::now(),
            });
        Ok(queue.clone())
    }

    async fn get_queue(&self, scope: &Scope) -> Result<Option<DailyQueue>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.queues.get(scope).cloned())
    }

    async fn list_queues(&self, day: NaiveDate) -> Result<Vec<DailyQueue>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state
            .queues
            .values()
            .filter(|q| q.scope.day == day)
            .cloned()
            .collect())
    }

    async fn mark_opened(&self, scope: &Scope, at: DateTime<Utc>) -> Result<bool, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let Some(queue) = state.queues.get_mut(scope) else {
            return Ok(false);
        };
        if queue.opened_at.is_some() && !queue.is_open {
            return Ok(false);
        }
        queue.opened_at.get_or_insert(at);
        queue.is_open = false;
        Ok(true)
    }

    async fn close_online(&self, scope: &Scope) -> Result<bool, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        match state.queues.get_mut(scope) {
            Some(queue) if queue.is_open && queue.opened_at.is_none() => {
                queue.is_open = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn counters(&self, scope: &Scope) -> Result<TicketCounters, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.counters.get(scope).copied().unwrap_or_default())
    }

    async fn find_binding(
        &self,
        scope: &Scope,
        key: &IdentityKey,
    ) -> Result<Option<u32>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.bindings.get(&(scope.clone(), key.clone())).copied())
    }

    async fn bind_identity(
        &self,
        scope: &Scope,
        key: &IdentityKey,
        number: u32,
    ) -> Result<(), FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        state.bindings.insert((scope.clone(), key.clone()), number);
        Ok(())
    }

    async fn purge_bindings_before(&self, day: NaiveDate) -> Result<u64, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let before = state.bindings.len();
        state.bindings.retain(|(scope, _), _| scope.day >= day);
        Ok((before - state.bindings.len()) as u64)
    }

    async fn record_join(&self, join: NewJoin) -> Result<QueueEntry, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let Some(identity) = join.keys.first().cloned() else {
            return Err(FrontdeskError::Validation(
                "identity requires a phone or chat_id".to_string(),
            ));
        };

        // Stage every write, then commit them together.
        let mut counters = state.counters.get(&join.scope).copied().unwrap_or_default();
        let floor = join.start_number.saturating_sub(1);
        let number = counters.last_ticket.unwrap_or(floor).max(floor) + 1;
        counters.last_ticket = Some(number);
        counters.waiting += 1;
        let position = state
            .entries
            .values()
            .filter(|e| e.scope == join.scope)
            .filter_map(|e| e.position)
            .max()
            .unwrap_or(0)
            + 1;
        if state
            .entries
            .values()
            .any(|e| e.scope == join.scope && e.number == number)
        {
            return Err(FrontdeskError::Storage {
                source: format!("UNIQUE constraint failed for number {number}").into(),
            });
        }
        state.check_step(WriteStep::InsertEntry)?;

        state.counters.insert(join.scope.clone(), counters);
        for key in join.keys {
            state.bindings.insert((join.scope.clone(), key), number);
        }
        state.next_id += 1;
        let stored = QueueEntry {
            id: EntryId(state.next_id),
            scope: join.scope,
            number,
            position: Some(position),
            identity,
            display_name: join.display_name,
            status: EntryStatus::Waiting,
            source: join.source,
            created_at: join.created_at,
            called_at: None,
        };
        state.entries.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<QueueEntry>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state.entries.get(&id).cloned())
    }

    async fn entry_by_number(
        &self,
        scope: &Scope,
        number: u32,
    ) -> Result<Option<QueueEntry>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        Ok(state
            .entries
            .values()
            .find(|e| &e.scope == scope && e.number == number)
            .cloned())
    }

    async fn list_entries(&self, scope: &Scope) -> Result<Vec<QueueEntry>, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let mut entries: Vec<QueueEntry> = state
            .entries
            .values()
            .filter(|e| &e.scope == scope)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.position.is_none(), e.position, e.number));
        Ok(entries)
    }

    async fn set_positions(
        &self,
        scope: &Scope,
        changes: &[(EntryId, Option<u32>)],
    ) -> Result<(), FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        if let Some((id, _)) = changes
            .iter()
            .find(|(id, _)| !state.entries.get(id).is_some_and(|e| &e.scope == scope))
        {
            return Err(missing_entry(*id));
        }
        for (id, position) in changes {
            if let Some(entry) = state.entries.get_mut(id) {
                entry.position = *position;
            }
        }
        Ok(())
    }

    async fn apply_transition(&self, change: StatusChange) -> Result<QueueEntry, FrontdeskError> {
        let mut state = self.state.lock().await;
        state.check()?;
        let current = state
            .entries
            .get(&change.id)
            .filter(|e| e.scope == change.scope)
            .map(|e| e.status)
            .ok_or_else(|| missing_entry(change.id))?;
        if current != change.from {
            return Err(FrontdeskError::Conflict(format!(
                "entry {} is {current}, expected {}",
                change.id, change.from
            )));
        }
        if let Some((id, _)) = change
            .positions
            .iter()
            .find(|(id, _)| !state.entries.get(id).is_some_and(|e| e.scope == change.scope))
        {
            return Err(missing_entry(*id));
        }

        let mut counters = state.counters.get(&change.scope).copied().unwrap_or_default();
        shift(&mut counters, change.from.bucket(), change.to.bucket());
        state.check_step(WriteStep::ShiftCounter)?;

        state.counters.insert(change.scope.clone(), counters);
        for (id, position) in &change.positions {
            if let Some(entry) = state.entries.get_mut(id) {
                entry.position = *position;
            }
        }
        let entry = state
            .entries
            .get_mut(&change.id)
            .ok_or_else(|| missing_entry(change.id))?;
        entry.status = change.to;
        if change.called_at.is_some() {
            entry.called_at = change.called_at;
        }
        Ok(entry.clone())
    }
}
