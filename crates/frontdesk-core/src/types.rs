// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the queue engine, storage, hub, and gateway.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FrontdeskError;

/// Separator between resource id and day in a room identifier.
pub const ROOM_SEPARATOR: &str = "::";

/// Format used for days in room identifiers, tokens, and storage.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// One daily queue: a `(resource_id, day)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub resource_id: String,
    pub day: NaiveDate,
}

impl Scope {
    /// Build a scope, rejecting resource ids that would make the room
    /// identifier ambiguous.
    pub fn new(resource_id: impl Into<String>, day: NaiveDate) -> Result<Self, FrontdeskError> {
        let resource_id = resource_id.into();
        let trimmed = resource_id.trim();
        if trimmed.is_empty() {
            return Err(FrontdeskError::Validation(
                "resource_id must not be empty".to_string(),
            ));
        }
        if trimmed.contains(ROOM_SEPARATOR) || trimmed.chars().any(char::is_whitespace) {
            return Err(FrontdeskError::Validation(format!(
                "resource_id `{trimmed}` must not contain whitespace or `{ROOM_SEPARATOR}`"
            )));
        }
        Ok(Self {
            resource_id: trimmed.to_string(),
            day,
        })
    }

    /// Build a scope from a resource id and a `YYYY-MM-DD` day string.
    pub fn parse(resource_id: &str, day: &str) -> Result<Self, FrontdeskError> {
        let day = NaiveDate::parse_from_str(day, DAY_FORMAT)
            .map_err(|e| FrontdeskError::Validation(format!("invalid day `{day}`: {e}")))?;
        Self::new(resource_id, day)
    }

    /// Parse a room identifier of the form `<resource_id>::<day>`.
    pub fn from_room(room: &str) -> Result<Self, FrontdeskError> {
        let (resource_id, day) = room.split_once(ROOM_SEPARATOR).ok_or_else(|| {
            FrontdeskError::Validation(format!("room `{room}` is not `<resource_id>::<day>`"))
        })?;
        Self::parse(resource_id, day)
    }

    /// The broadcast room identifier for this scope.
    pub fn room(&self) -> String {
        format!(
            "{}{ROOM_SEPARATOR}{}",
            self.resource_id,
            self.day.format(DAY_FORMAT)
        )
    }

    /// The day formatted as `YYYY-MM-DD`.
    pub fn day_string(&self) -> String {
        self.day.format(DAY_FORMAT).to_string()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.room())
    }
}

/// Unique identifier of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Lifecycle status of a queue entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryStatus {
    Waiting,
    Called,
    Serving,
    Done,
    Cancelled,
    NoShow,
}

impl EntryStatus {
    /// Terminal entries hold no position and accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::NoShow)
    }

    /// The running counter this status contributes to, if any.
    pub fn bucket(self) -> Option<CounterBucket> {
        match self {
            Self::Waiting | Self::Called => Some(CounterBucket::Waiting),
            Self::Serving => Some(CounterBucket::Serving),
            Self::Done => Some(CounterBucket::Done),
            Self::Cancelled | Self::NoShow => None,
        }
    }

    /// Whether an operator may move an entry from `self` to `next`.
    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        use EntryStatus::*;
        matches!(
            (self, next),
            (Waiting, Called | Serving | Cancelled | NoShow)
                | (Called, Waiting | Serving | Cancelled | NoShow)
                | (Serving, Done | Cancelled)
        )
    }
}

/// Running counters kept per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum CounterBucket {
    Waiting,
    Serving,
    Done,
}

/// Channel a join came through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntrySource {
    Desk,
    Qr,
    Bot,
}

/// Which channel an identity key belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IdentityKind {
    Phone,
    Chat,
}

/// A normalized identity used to deduplicate joins within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub kind: IdentityKind,
    pub value: String,
}

/// Minimum number of digits for a phone identity.
const MIN_PHONE_DIGITS: usize = 5;

impl IdentityKey {
    /// Normalize a phone number: keep digits and an optional leading `+`.
    pub fn phone(raw: &str) -> Result<Self, FrontdeskError> {
        let trimmed = raw.trim();
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < MIN_PHONE_DIGITS {
            return Err(FrontdeskError::Validation(format!(
                "phone `{trimmed}` must contain at least {MIN_PHONE_DIGITS} digits"
            )));
        }
        let value = if trimmed.starts_with('+') {
            format!("+{digits}")
        } else {
            digits
        };
        Ok(Self {
            kind: IdentityKind::Phone,
            value,
        })
    }

    /// A chat reference, used verbatim apart from surrounding whitespace.
    pub fn chat(raw: &str) -> Result<Self, FrontdeskError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(FrontdeskError::Validation(
                "chat_id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            kind: IdentityKind::Chat,
            value: value.to_string(),
        })
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// The identity channels supplied by a joining caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinIdentity {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl JoinIdentity {
    /// All identity keys supplied, phone first.
    ///
    /// Blank channels are ignored; an identity with no usable channel is a
    /// validation error.
    pub fn keys(&self) -> Result<Vec<IdentityKey>, FrontdeskError> {
        let mut keys = Vec::with_capacity(2);
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            keys.push(IdentityKey::phone(phone)?);
        }
        if let Some(chat) = self.chat_id.as_deref().filter(|c| !c.trim().is_empty()) {
            keys.push(IdentityKey::chat(chat)?);
        }
        if keys.is_empty() {
            return Err(FrontdeskError::Validation(
                "identity requires a phone or chat_id".to_string(),
            ));
        }
        Ok(keys)
    }
}

/// The per-scope queue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQueue {
    pub scope: Scope,
    /// First ticket number of the day.
    pub start_number: u32,
    /// Online registration currently accepting joins.
    pub is_open: bool,
    /// When front-desk service began (implicitly closes online joining).
    pub opened_at: Option<DateTime<Utc>>,
    /// Scheduled local cutoff for online registration.
    pub online_end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// Defaults applied when a daily queue is created on first reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDefaults {
    pub start_number: u32,
    pub online_end_time: NaiveTime,
}

/// Raw counter row for a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketCounters {
    /// Last issued ticket; `None` before the first issuance.
    pub last_ticket: Option<u32>,
    pub waiting: u32,
    pub serving: u32,
    pub done: u32,
}

/// Visible statistics for a scope, as pushed to viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub start_number: u32,
    pub last_ticket: u32,
    pub waiting: u32,
    pub serving: u32,
    pub done: u32,
}

impl QueueStats {
    /// Combine the queue's start number with its counters.
    ///
    /// Before the first issuance `last_ticket` reads as `start_number - 1`.
    /// Start numbers are at least 1.
    pub fn from_counters(start_number: u32, counters: &TicketCounters) -> Self {
        Self {
            start_number,
            last_ticket: counters
                .last_ticket
                .unwrap_or_else(|| start_number.saturating_sub(1)),
            waiting: counters.waiting,
            serving: counters.serving,
            done: counters.done,
        }
    }

    /// Tickets issued so far: `last_ticket - start_number + 1`, floored at 0.
    pub fn issued(&self) -> u32 {
        (i64::from(self.last_ticket) - i64::from(self.start_number) + 1).max(0) as u32
    }
}

/// A ticket holder in a daily queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub scope: Scope,
    /// Issued ticket number.
    pub number: u32,
    /// 1-based position among non-terminal entries; `None` once terminal.
    pub position: Option<u32>,
    pub identity: IdentityKey,
    pub display_name: Option<String>,
    pub status: EntryStatus,
    pub source: EntrySource,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
}

/// A ticket issuance recorded as one unit: the counter bump, the identity
/// bindings, and the new entry at the back of the waiting line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewJoin {
    pub scope: Scope,
    pub start_number: u32,
    /// Normalized identity keys. The first one is stored on the entry.
    pub keys: Vec<IdentityKey>,
    pub display_name: Option<String>,
    pub source: EntrySource,
    pub created_at: DateTime<Utc>,
}

/// A status change recorded as one unit together with the counter shift and
/// the position rewrite it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: EntryId,
    pub scope: Scope,
    /// Status the entry must still hold when the change is applied.
    pub from: EntryStatus,
    pub to: EntryStatus,
    pub called_at: Option<DateTime<Utc>>,
    pub positions: Vec<(EntryId, Option<u32>)>,
}
