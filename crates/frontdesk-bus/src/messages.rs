// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push message shapes sent to room subscribers.
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "connection.accepted", "room": "dr-lee::2026-03-14", "timestamp": "..."}
//! {"type": "queue.update", "room": "dr-lee::2026-03-14", "timestamp": "...",
//!  "stats": {"start_number": 1, "last_ticket": 3, "waiting": 3, "serving": 0, "done": 0}}
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use frontdesk_core::types::QueueStats;

/// A message pushed to viewers of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubMessage {
    /// First frame on every new subscription.
    #[serde(rename = "connection.accepted")]
    ConnectionAccepted {
        room: String,
        timestamp: DateTime<Utc>,
    },
    /// Current statistics for the room's queue.
    #[serde(rename = "queue.update")]
    QueueUpdate {
        room: String,
        timestamp: DateTime<Utc>,
        stats: QueueStats,
    },
}

impl HubMessage {
    pub fn accepted(room: impl Into<String>) -> Self {
        Self::ConnectionAccepted {
            room: room.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn queue_update(room: impl Into<String>, stats: QueueStats) -> Self {
        Self::QueueUpdate {
            room: room.into(),
            timestamp: Utc::now(),
            stats,
        }
    }

    pub fn room(&self) -> &str {
        match self {
            Self::ConnectionAccepted { room, .. } | Self::QueueUpdate { room, .. } => room,
        }
    }

    /// Serialize once; the frame is shared by every recipient.
    pub fn to_frame(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// WebSocket message type constants.
pub mod message_types {
    pub const CONNECTION_ACCEPTED: &str = "connection.accepted";
    pub const QUEUE_UPDATE: &str = "queue.update";
}
