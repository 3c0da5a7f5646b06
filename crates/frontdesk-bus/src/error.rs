// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery failures. These stay inside the hub; callers of `publish` never
//! see them.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's outbound buffer stayed full past the send timeout.
    #[error("send timed out after {0}ms")]
    TimedOut(u64),

    /// The connection's receiver is gone.
    #[error("connection closed")]
    Closed,

    /// The connection's outbound buffer is full.
    #[error("connection buffer full")]
    Full,

    /// No such connection in the room.
    #[error("connection {connection} not subscribed to {room}")]
    UnknownConnection { room: String, connection: String },

    /// The message could not be serialized.
    #[error("encode failed: {0}")]
    Encode(String),
}
