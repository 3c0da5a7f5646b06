// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! Async traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod clock;
pub mod directory;
pub mod notifier;
pub mod store;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use directory::{EmptyDirectory, IdentityDirectory};
pub use notifier::{NoopNotifier, QueueNotifier};
pub use store::QueueStore;
