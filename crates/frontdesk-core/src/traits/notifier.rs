// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification seam between queue mutations and push delivery.

use crate::types::{QueueStats, Scope};

/// Receives the visible stats of a scope after every state change.
///
/// Implementations must not block: the caller holds the scope lock.
pub trait QueueNotifier: Send + Sync + 'static {
    fn queue_changed(&self, scope: &Scope, stats: &QueueStats);
}

/// Notifier that drops every update (CLI tools, offline maintenance).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl QueueNotifier for NoopNotifier {
    fn queue_changed(&self, _scope: &Scope, _stats: &QueueStats) {}
}
