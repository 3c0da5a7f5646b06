// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket issuance for the Frontdesk online queue.
//!
//! [`QueueService`] ties the pieces together: join tokens ([`TokenService`]),
//! the admission window ([`AdmissionPolicy`]), identity deduplication, atomic
//! ticket numbering, and the reorderable waiting line. All mutations of one
//! `(resource_id, day)` scope are serialized by [`ScopeLocks`]; different
//! scopes proceed in parallel.

pub mod admission;
pub mod calendar;
pub mod locks;
pub mod positions;
pub mod service;
pub mod settings;
pub mod tokens;

pub use admission::{AdmissionPolicy, CapacityTable};
pub use calendar::ClinicCalendar;
pub use locks::ScopeLocks;
pub use service::{JoinOutcome, JoinRequest, QueueService};
pub use settings::QueueSettings;
pub use tokens::{IssuedToken, TokenService};
