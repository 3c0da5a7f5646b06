// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Frontdesk integration tests.
//!
//! Provides in-memory collaborators for fast, deterministic, CI-runnable
//! tests without a database file or real wall clock.
//!
//! # Components
//!
//! - [`MemoryQueueStore`] - `QueueStore` backed by in-process maps, with
//!   injectable failures ([`WriteStep`])
//! - [`ManualClock`] - clock that only moves when told to
//! - [`RecordingNotifier`] - captures every stats notification
//! - [`StaticIdentityDirectory`] - fixed identity-to-name table
//! - [`temp_sqlite_store`] - initialized SQLite store in a temp directory

pub mod clock;
pub mod directory;
pub mod memory_store;
pub mod notifier;

pub use clock::ManualClock;
pub use directory::{FailingDirectory, StaticIdentityDirectory};
pub use memory_store::{MemoryQueueStore, WriteStep};
pub use notifier::RecordingNotifier;

use frontdesk_config::model::StorageConfig;
use frontdesk_core::{FrontdeskError, QueueStore};
use frontdesk_storage::SqliteQueueStore;

/// Open an initialized SQLite store in a fresh temp directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn temp_sqlite_store() -> Result<(tempfile::TempDir, SqliteQueueStore), FrontdeskError> {
    let temp_dir = tempfile::TempDir::new().map_err(FrontdeskError::storage)?;
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteQueueStore::new(StorageConfig {
        database_path: db_path.to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await?;
    Ok((temp_dir, store))
}
