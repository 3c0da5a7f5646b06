// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Frontdesk online queue.
//!
//! This crate provides the domain types, error taxonomy, and collaborator
//! traits shared by the queue engine, storage, push hub, and gateway.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{AdmissionRejection, ErrorKind, FrontdeskError, RejectionCode};
pub use types::{
    DailyQueue, EntryId, EntrySource, EntryStatus, HealthStatus, IdentityKey, JoinIdentity,
    QueueEntry, QueueStats, Scope,
};

pub use traits::{
    Clock, EmptyDirectory, IdentityDirectory, NoopNotifier, PluginAdapter, QueueNotifier,
    QueueStore, SystemClock,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_classify_taxonomy() {
        assert_eq!(
            FrontdeskError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(FrontdeskError::InvalidToken.kind(), ErrorKind::InvalidToken);
        assert_eq!(
            FrontdeskError::Conflict("stale".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            FrontdeskError::NotFound {
                what: "entry",
                id: "7".into()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            FrontdeskError::storage(std::io::Error::other("disk")).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            FrontdeskError::Internal("x".into()).kind(),
            ErrorKind::Infrastructure
        );
    }

    #[test]
    fn rejection_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&RejectionCode::QueueFull).unwrap();
        assert_eq!(json, "\"QUEUE_FULL\"");
        assert_eq!(RejectionCode::TooEarly.to_string(), "TOO_EARLY");
    }

    #[test]
    fn admission_rejection_converts_and_displays() {
        let rejection = AdmissionRejection {
            code: RejectionCode::QueueFull,
            max_per_day: 2,
            issued: 2,
            remaining: 0,
            opens_at_hour: 7,
        };
        let err: FrontdeskError = rejection.clone().into();
        assert_eq!(err.kind(), ErrorKind::Admission);
        assert!(err.to_string().contains("2 of 2"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_store<T: QueueStore>() {}
        fn _assert_notifier<T: QueueNotifier>() {}
        fn _assert_directory<T: IdentityDirectory>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_notifier::<NoopNotifier>();
        _assert_directory::<EmptyDirectory>();
        _assert_clock::<SystemClock>();
    }
}
