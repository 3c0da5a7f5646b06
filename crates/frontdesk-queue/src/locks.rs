// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-scope mutual exclusion.
//!
//! Every mutation of one `(resource_id, day)` queue runs while holding that
//! scope's lock. Different scopes never contend.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use frontdesk_core::types::Scope;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: DashMap<Scope, Arc<Mutex<()>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `scope`.
    pub async fn lock(&self, scope: &Scope) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop locks for days before `day` that nobody is holding.
    pub fn prune_before(&self, day: NaiveDate) -> usize {
        let before = self.locks.len();
        self.locks
            .retain(|scope, lock| scope.day >= day || Arc::strong_count(lock) > 1);
        before - self.locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
