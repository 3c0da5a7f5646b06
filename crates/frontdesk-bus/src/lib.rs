// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live queue statistics for viewers.
//!
//! A room is one `(resource_id, day)` scope, named `<resource_id>::<day>`.
//! The [`BroadcastHub`] implements [`frontdesk_core::QueueNotifier`], so the
//! queue service publishes into it without knowing about sockets.

pub mod error;
pub mod hub;
pub mod messages;

pub use error::DeliveryError;
pub use hub::{BroadcastHub, ConnectionId, HubSettings, Subscription};
pub use messages::HubMessage;
