// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue facade: join, open-service, stats, reorder, move, and status
//! transitions, each serialized per scope.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use frontdesk_core::types::{
    DailyQueue, EntryId, EntrySource, EntryStatus, IdentityKey, JoinIdentity, NewJoin,
    QueueEntry, QueueStats, Scope, StatusChange,
};
use frontdesk_core::{
    Clock, EmptyDirectory, FrontdeskError, IdentityDirectory, NoopNotifier, QueueNotifier,
    QueueStore, SystemClock,
};

use crate::locks::ScopeLocks;
use crate::positions;
use crate::settings::QueueSettings;
use crate::tokens::{IssuedToken, TokenService};

/// A patient's request to join a daily queue.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub token: String,
    pub identity: JoinIdentity,
    pub display_name: Option<String>,
    pub source: EntrySource,
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub scope: Scope,
    pub number: u32,
    /// The identity already held this ticket; nothing new was issued.
    pub duplicate: bool,
    pub stats: QueueStats,
}

/// Serialized access to every daily queue.
pub struct QueueService {
    store: Arc<dyn QueueStore>,
    settings: QueueSettings,
    tokens: TokenService,
    locks: ScopeLocks,
    notifier: Arc<dyn QueueNotifier>,
    directory: Arc<dyn IdentityDirectory>,
    clock: Arc<dyn Clock>,
}

impl QueueService {
    pub fn new(store: Arc<dyn QueueStore>, settings: QueueSettings, tokens: TokenService) -> Self {
        Self {
            store,
            settings,
            tokens,
            locks: ScopeLocks::new(),
            notifier: Arc::new(NoopNotifier),
            directory: Arc::new(EmptyDirectory),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn QueueNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn IdentityDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn QueueStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The clinic-local day right now.
    pub fn today(&self) -> NaiveDate {
        self.settings.calendar.today(self.clock.now())
    }

    /// Scope for `resource_id` on `day`, defaulting to today.
    pub fn scope(
        &self,
        resource_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Scope, FrontdeskError> {
        Scope::new(resource_id, day.unwrap_or_else(|| self.today()))
    }

    // --- Tokens ---

    pub fn generate_token(&self, scope: &Scope) -> Result<IssuedToken, FrontdeskError> {
        let issued = self.tokens.generate(scope, self.clock.now())?;
        debug!(
            resource_id = %scope.resource_id,
            day = %scope.day_string(),
            expires_at = %issued.expires_at,
            "join token generated"
        );
        Ok(issued)
    }

    pub fn validate_token(&self, token: &str) -> Result<Scope, FrontdeskError> {
        self.tokens.validate(token, self.clock.now())
    }

    // --- Registry ---

    /// Fetch the queue for `scope`, creating it with configured defaults.
    pub async fn ensure_queue(&self, scope: &Scope) -> Result<DailyQueue, FrontdeskError> {
        self.store.ensure_queue(scope, self.settings.defaults).await
    }

    pub async fn get_queue(&self, scope: &Scope) -> Result<Option<DailyQueue>, FrontdeskError> {
        self.store.get_queue(scope).await
    }

    /// Current visible statistics. Does not create the queue.
    pub async fn stats(&self, scope: &Scope) -> Result<QueueStats, FrontdeskError> {
        let start_number = match self.store.get_queue(scope).await? {
            Some(queue) => queue.start_number,
            None => self.settings.defaults.start_number,
        };
        self.stats_with_start(scope, start_number).await
    }

    async fn stats_with_start(
        &self,
        scope: &Scope,
        start_number: u32,
    ) -> Result<QueueStats, FrontdeskError> {
        let counters = self.store.counters(scope).await?;
        Ok(QueueStats::from_counters(start_number, &counters))
    }

    /// Push the scope's stats to viewers. Failures here never undo the change.
    async fn publish(&self, scope: &Scope) {
        match self.stats(scope).await {
            Ok(stats) => self.notifier.queue_changed(scope, &stats),
            Err(e) => {
                warn!(room = %scope.room(), error = %e, "could not read stats to publish");
            }
        }
    }

    // --- Join ---

    /// Admit a patient into the token's queue.
    ///
    /// Admission refusals come back as [`FrontdeskError::Admission`] and
    /// leave no state behind.
    pub async fn join(&self, request: JoinRequest) -> Result<JoinOutcome, FrontdeskError> {
        let now = self.clock.now();
        let scope = self.tokens.validate(&request.token, now)?;
        let keys = request.identity.keys()?;

        // Resolved before locking; directory lookups may be slow.
        let display_name = match request
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            Some(name) => Some(name.to_string()),
            None => self.lookup_name(&keys).await,
        };

        let _guard = self.locks.lock(&scope).await;

        let queue = self.ensure_queue(&scope).await?;
        let stats = self.stats_with_start(&scope, queue.start_number).await?;
        let local_hour = self.settings.calendar.local_hour(now);

        if let Err(rejection) = self
            .settings
            .admission
            .check_window(&queue, &stats, local_hour)
        {
            info!(room = %scope.room(), code = %rejection.code, "join rejected");
            return Err(rejection.into());
        }

        if let Some(number) = self.existing_ticket(&scope, &keys).await? {
            debug!(room = %scope.room(), number, "duplicate join");
            self.notifier.queue_changed(&scope, &stats);
            return Ok(JoinOutcome {
                scope,
                number,
                duplicate: true,
                stats,
            });
        }

        if let Err(rejection) = self.settings.admission.check_capacity(&queue, &stats) {
            info!(
                room = %scope.room(),
                code = %rejection.code,
                issued = rejection.issued,
                max_per_day = rejection.max_per_day,
                "join rejected"
            );
            return Err(rejection.into());
        }

        let entry = self
            .store
            .record_join(NewJoin {
                scope: scope.clone(),
                start_number: queue.start_number,
                keys,
                display_name,
                source: request.source,
                created_at: now,
            })
            .await?;
        let number = entry.number;

        let stats = self.stats_with_start(&scope, queue.start_number).await?;
        self.notifier.queue_changed(&scope, &stats);
        info!(
            resource_id = %scope.resource_id,
            day = %scope.day_string(),
            number,
            position = ?entry.position,
            entry_id = %entry.id,
            source = %request.source,
            "ticket issued"
        );

        Ok(JoinOutcome {
            scope,
            number,
            duplicate: false,
            stats,
        })
    }

    async fn lookup_name(&self, keys: &[IdentityKey]) -> Option<String> {
        for key in keys {
            match self.directory.display_name(key).await {
                Ok(Some(name)) => return Some(name),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        identity_kind = %key.kind,
                        error = %e,
                        "identity directory lookup failed"
                    );
                    return None;
                }
            }
        }
        None
    }

    /// Find a live ticket held by any of `keys`, binding the remaining
    /// unbound keys to it. Bindings to cancelled entries count as absent.
    async fn existing_ticket(
        &self,
        scope: &Scope,
        keys: &[IdentityKey],
    ) -> Result<Option<u32>, FrontdeskError> {
        let mut found = None;
        let mut unbound = Vec::new();
        for key in keys {
            let live = match self.store.find_binding(scope, key).await? {
                Some(number) => self
                    .store
                    .entry_by_number(scope, number)
                    .await?
                    .filter(|entry| entry.status != EntryStatus::Cancelled)
                    .map(|entry| entry.number),
                None => None,
            };
            match (live, found) {
                (Some(number), None) => found = Some(number),
                (Some(_), Some(_)) => {}
                (None, _) => unbound.push(key),
            }
        }

        if let Some(number) = found {
            for key in unbound {
                self.store.bind_identity(scope, key, number).await?;
            }
        }
        Ok(found)
    }

    // --- Open / close ---

    /// Start front-desk service, which closes online registration now.
    pub async fn open_service(&self, scope: &Scope) -> Result<DailyQueue, FrontdeskError> {
        let _guard = self.locks.lock(scope).await;
        self.ensure_queue(scope).await?;
        let changed = self.store.mark_opened(scope, self.clock.now()).await?;
        if changed {
            info!(room = %scope.room(), "service opened, online registration closed");
        }
        self.publish(scope).await;
        self.store
            .get_queue(scope)
            .await?
            .ok_or_else(|| FrontdeskError::NotFound {
                what: "queue",
                id: scope.room(),
            })
    }

    /// Scheduled close of online registration. Returns `true` if it fired.
    pub async fn close_online(&self, scope: &Scope) -> Result<bool, FrontdeskError> {
        let _guard = self.locks.lock(scope).await;
        let closed = self.store.close_online(scope).await?;
        if closed {
            info!(room = %scope.room(), "online registration auto-closed");
            self.publish(scope).await;
        }
        Ok(closed)
    }

    // --- Entries ---

    pub async fn list_entries(&self, scope: &Scope) -> Result<Vec<QueueEntry>, FrontdeskError> {
        self.store.list_entries(scope).await
    }

    pub async fn get_entry(&self, id: EntryId) -> Result<QueueEntry, FrontdeskError> {
        self.store
            .get_entry(id)
            .await?
            .ok_or_else(|| FrontdeskError::NotFound {
                what: "entry",
                id: id.to_string(),
            })
    }

    /// Ids of positioned entries, in position order.
    async fn line(&self, scope: &Scope) -> Result<Vec<EntryId>, FrontdeskError> {
        Ok(self
            .store
            .list_entries(scope)
            .await?
            .into_iter()
            .filter(|entry| entry.position.is_some() && !entry.status.is_terminal())
            .map(|entry| entry.id)
            .collect())
    }

    async fn rewrite_line(
        &self,
        scope: &Scope,
        before: &[EntryId],
        after: &[EntryId],
    ) -> Result<(), FrontdeskError> {
        let changes = positions::position_changes(before, after);
        if !changes.is_empty() {
            self.store.set_positions(scope, &changes).await?;
        }
        Ok(())
    }

    /// Apply an `(entry, new_position)` mapping to the waiting line.
    pub async fn reorder(
        &self,
        scope: &Scope,
        mapping: &[(EntryId, u32)],
    ) -> Result<Vec<QueueEntry>, FrontdeskError> {
        let _guard = self.locks.lock(scope).await;
        let before = self.line(scope).await?;
        let after = positions::plan_reorder(&before, mapping)?;
        self.rewrite_line(scope, &before, &after).await?;
        debug!(room = %scope.room(), moved = mapping.len(), "queue reordered");
        self.publish(scope).await;
        self.store.list_entries(scope).await
    }

    /// Move one entry to `new_position`.
    pub async fn move_entry(
        &self,
        id: EntryId,
        new_position: u32,
    ) -> Result<Vec<QueueEntry>, FrontdeskError> {
        let scope = self.get_entry(id).await?.scope;
        let _guard = self.locks.lock(&scope).await;

        let entry = self.get_entry(id).await?;
        if entry.status.is_terminal() {
            return Err(FrontdeskError::Conflict(format!(
                "entry {id} is {} and has no position",
                entry.status
            )));
        }
        let before = self.line(&scope).await?;
        let after = positions::plan_move(&before, id, new_position)?;
        self.rewrite_line(&scope, &before, &after).await?;
        debug!(room = %scope.room(), entry_id = %id, new_position, "entry moved");
        self.publish(&scope).await;
        self.store.list_entries(&scope).await
    }

    /// Move an entry to a new status, keeping counters and positions in step.
    pub async fn transition(
        &self,
        id: EntryId,
        next: EntryStatus,
    ) -> Result<QueueEntry, FrontdeskError> {
        let scope = self.get_entry(id).await?.scope;
        let _guard = self.locks.lock(&scope).await;

        let entry = self.get_entry(id).await?;
        if !entry.status.can_transition_to(next) {
            return Err(FrontdeskError::Conflict(format!(
                "entry {id} is {}, cannot become {next}",
                entry.status
            )));
        }

        // Plan against the line while the entry still holds its slot.
        let changes = if next.is_terminal() {
            let before = self.line(&scope).await?;
            let after = positions::plan_remove(&before, id);
            positions::position_changes(&before, &after)
        } else {
            Vec::new()
        };

        let updated = self
            .store
            .apply_transition(StatusChange {
                id,
                scope: scope.clone(),
                from: entry.status,
                to: next,
                called_at: (next == EntryStatus::Called).then(|| self.clock.now()),
                positions: changes,
            })
            .await?;

        info!(
            room = %scope.room(),
            entry_id = %id,
            from = %entry.status,
            to = %next,
            "entry status changed"
        );
        self.publish(&scope).await;
        Ok(updated)
    }

    // --- Maintenance ---

    /// Delete identity bindings older than the retention window.
    pub async fn purge_expired_bindings(&self, today: NaiveDate) -> Result<u64, FrontdeskError> {
        let cutoff = today
            .checked_sub_days(Days::new(u64::from(self.settings.binding_retention_days)))
            .unwrap_or(today);
        let removed = self.store.purge_bindings_before(cutoff).await?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "purged expired identity bindings");
        }
        Ok(removed)
    }

    /// Forget per-scope locks for days before `today`.
    pub fn prune_locks(&self, today: NaiveDate) -> usize {
        self.locks.prune_before(today)
    }
}
