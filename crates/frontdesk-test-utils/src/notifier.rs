// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that records every stats update for assertions.

use std::sync::{Arc, Mutex};

use frontdesk_core::types::{QueueStats, Scope};
use frontdesk_core::QueueNotifier;

/// Captures `(room, stats)` pairs in publish order. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<(String, QueueStats)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    pub fn events(&self) -> Vec<(String, QueueStats)> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Events recorded for one room.
    pub fn events_for(&self, room: &str) -> Vec<QueueStats> {
        self.events()
            .into_iter()
            .filter(|(r, _)| r == room)
            .map(|(_, stats)| stats)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Most recent stats pushed to `room`.
    pub fn last_for(&self, room: &str) -> Option<QueueStats> {
        self.events_for(room).pop()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl QueueNotifier for RecordingNotifier {
    fn queue_changed(&self, scope: &Scope, stats: &QueueStats) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((scope.room(), *stats));
    }
}
