// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the QueueStore trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use frontdesk_config::model::StorageConfig;
use frontdesk_core::types::{
    DailyQueue, EntryId, IdentityKey, NewJoin, QueueDefaults, QueueEntry, Scope, StatusChange,
    TicketCounters,
};
use frontdesk_core::{FrontdeskError, HealthStatus, PluginAdapter, QueueStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed queue store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`QueueStore::initialize`].
pub struct SqliteQueueStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteQueueStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until [`QueueStore::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, FrontdeskError> {
        self.db.get().ok_or_else(|| FrontdeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteQueueStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, FrontdeskError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FrontdeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn initialize(&self) -> Result<(), FrontdeskError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FrontdeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite queue store initialized");
        Ok(())
    }

    // --- Daily queue registry ---

    async fn ensure_queue(
        &self,
        scope: &Scope,
        defaults: QueueDefaults,
    ) -> Result<DailyQueue, FrontdeskError> {
        queries::queues::ensure_queue(self.db()?, scope, defaults, Utc::now()).await
    }

    async fn get_queue(&self, scope: &Scope) -> Result<Option<DailyQueue>, FrontdeskError> {
        queries::queues::get_queue(self.db()?, scope).await
    }

    async fn list_queues(&self, day: NaiveDate) -> Result<Vec<DailyQueue>, FrontdeskError> {
        queries::queues::list_queues(self.db()?, day).await
    }

    async fn mark_opened(&self, scope: &Scope, at: DateTime<Utc>) -> Result<bool, FrontdeskError> {
        queries::queues::mark_opened(self.db()?, scope, at).await
    }

    async fn close_online(&self, scope: &Scope) -> Result<bool, FrontdeskError> {
        queries::queues::close_online(self.db()?, scope).await
    }

    // --- Ticket counters ---

    async fn counters(&self, scope: &Scope) -> Result<TicketCounters, FrontdeskError> {
        queries::counters::counters(self.db()?, scope).await
    }

    // --- Identity bindings ---

    async fn find_binding(
        &self,
        scope: &Scope,
        key: &IdentityKey,
    ) -> Result<Option<u32>, FrontdeskError> {
        queries::bindings::find_binding(self.db()?, scope, key).await
    }

    async fn bind_identity(
        &self,
        scope: &Scope,
        key: &IdentityKey,
        number: u32,
    ) -> Result<(), FrontdeskError> {
        queries::bindings::bind_identity(self.db()?, scope, key, number).await
    }

    async fn purge_bindings_before(&self, day: NaiveDate) -> Result<u64, FrontdeskError> {
        queries::bindings::purge_bindings_before(self.db()?, day).await
    }

    // --- Entries ---

    async fn record_join(&self, join: NewJoin) -> Result<QueueEntry, FrontdeskError> {
        queries::entries::record_join(self.db()?, join).await
    }

    async fn get_entry(&self, id: EntryId) -> Result<Option<QueueEntry>, FrontdeskError> {
        queries::entries::get_entry(self.db()?, id).await
    }

    async fn entry_by_number(
        &self,
        scope: &Scope,
        number: u32,
    ) -> Result<Option<QueueEntry>, FrontdeskError> {
        queries::entries::entry_by_number(self.db()?, scope, number).await
    }

    async fn list_entries(&self, scope: &Scope) -> Result<Vec<QueueEntry>, FrontdeskError> {
        queries::entries::list_entries(self.db()?, scope).await
    }

    async fn set_positions(
        &self,
        scope: &Scope,
        changes: &[(EntryId, Option<u32>)],
    ) -> Result<(), FrontdeskError> {
        queries::entries::set_positions(self.db()?, scope, changes).await
    }

    async fn apply_transition(&self, change: StatusChange) -> Result<QueueEntry, FrontdeskError> {
        queries::entries::apply_transition(self.db()?, change).await
    }
}
