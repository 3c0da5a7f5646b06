// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic maintenance for daily queues.
//!
//! The [`AutoCloseScheduler`] closes online registration once a queue's
//! `online_end_time` passes, materializes today's queue for every configured
//! resource, and enforces identity-binding retention.

pub mod scheduler;

pub use scheduler::{AutoCloseScheduler, SweepReport};
