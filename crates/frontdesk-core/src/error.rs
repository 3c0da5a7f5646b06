// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Frontdesk online queue.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across queue operations and collaborator traits.
#[derive(Debug, Error)]
pub enum FrontdeskError {
    /// Malformed input (empty identity, bad position, unknown status).
    /// Rejected synchronously and never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Join token is malformed, forged, expired, or scoped to another queue.
    #[error("invalid or expired join token")]
    InvalidToken,

    /// The admission window refused a new join. This is an expected outcome,
    /// not a failure of the system.
    #[error("admission rejected: {0}")]
    Admission(AdmissionRejection),

    /// The caller acted on a stale view (reorder against a changed entry set,
    /// transition from a status the entry no longer has). Refetch and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced entity does not exist.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Persistence backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors detected at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`FrontdeskError`] used by outer surfaces to pick
/// a response status without inspecting error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidToken,
    Admission,
    Conflict,
    NotFound,
    Infrastructure,
}

impl FrontdeskError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::Admission(_) => ErrorKind::Admission,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage { .. } | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Wrap any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }
}

impl From<AdmissionRejection> for FrontdeskError {
    fn from(rejection: AdmissionRejection) -> Self {
        Self::Admission(rejection)
    }
}

/// Machine-readable reason a join was refused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    /// The local wall clock is before the configured start hour.
    TooEarly,
    /// Online registration for the queue has been closed.
    QueueClosed,
    /// The per-day capacity for the resource is exhausted.
    QueueFull,
}

/// An admission refusal with enough context for a UI to explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRejection {
    pub code: RejectionCode,
    /// Configured daily capacity for the resource.
    pub max_per_day: u32,
    /// Tickets issued so far in the scope.
    pub issued: u32,
    /// Tickets still available (zero when full).
    pub remaining: u32,
    /// Local hour at which online joining opens.
    pub opens_at_hour: u32,
}

impl std::fmt::Display for AdmissionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            RejectionCode::TooEarly => write!(
                f,
                "{}: online queue opens at {:02}:00",
                self.code, self.opens_at_hour
            ),
            RejectionCode::QueueClosed => {
                write!(f, "{}: online registration is closed", self.code)
            }
            RejectionCode::QueueFull => write!(
                f,
                "{}: {} of {} tickets issued",
                self.code, self.issued, self.max_per_day
            ),
        }
    }
}
