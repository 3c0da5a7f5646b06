// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the queue service against in-memory and SQLite stores.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use frontdesk_core::types::{EntryId, EntrySource, EntryStatus, JoinIdentity, QueueEntry, Scope};
use frontdesk_core::{Clock, ErrorKind, FrontdeskError, QueueStore, RejectionCode};
use frontdesk_queue::positions::is_dense;
use frontdesk_queue::{
    AdmissionPolicy, CapacityTable, ClinicCalendar, JoinRequest, QueueService, QueueSettings,
    TokenService,
};
use frontdesk_test_utils::{
    temp_sqlite_store, FailingDirectory, ManualClock, MemoryQueueStore, RecordingNotifier,
    StaticIdentityDirectory, WriteStep,
};

const SECRET: &[u8] = b"test-secret-0123456789";

struct Fixture {
    service: Arc<QueueService>,
    store: Arc<MemoryQueueStore>,
    clock: ManualClock,
    notifier: RecordingNotifier,
    scope: Scope,
}

fn settings(max_per_day: u32, start_number: u32) -> QueueSettings {
    let mut settings = QueueSettings::default();
    settings.defaults.start_number = start_number;
    settings.admission = AdmissionPolicy::new(7, CapacityTable::new(max_per_day));
    settings
}

fn fixture_with(settings: QueueSettings) -> Fixture {
    let store = Arc::new(MemoryQueueStore::new());
    let clock = ManualClock::at(2026, 3, 14, 9, 0);
    let notifier = RecordingNotifier::new();
    let tokens = TokenService::new(SECRET.to_vec(), ClinicCalendar::utc(), 6);
    let service = QueueService::new(store.clone(), settings, tokens)
        .with_clock(Arc::new(clock.clone()))
        .with_notifier(Arc::new(notifier.clone()));
    Fixture {
        service: Arc::new(service),
        store,
        clock,
        notifier,
        scope: Scope::parse("dr-lee", "2026-03-14").unwrap(),
    }
}

fn fixture() -> Fixture {
    fixture_with(settings(50, 1))
}

fn phone(raw: &str) -> JoinIdentity {
    JoinIdentity {
        phone: Some(raw.to_string()),
        chat_id: None,
    }
}

impl Fixture {
    fn request(&self, identity: JoinIdentity) -> JoinRequest {
        JoinRequest {
            token: self.service.generate_token(&self.scope).unwrap().token,
            identity,
            display_name: None,
            source: EntrySource::Qr,
        }
    }

    async fn join_phone(&self, raw: &str) -> Result<frontdesk_queue::JoinOutcome, FrontdeskError> {
        self.service.join(self.request(phone(raw))).await
    }

    async fn waiting_line(&self) -> Vec<QueueEntry> {
        self.service
            .list_entries(&self.scope)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.position.is_some())
            .collect()
    }

    async fn ids_by_position(&self) -> Vec<EntryId> {
        self.waiting_line().await.into_iter().map(|e| e.id).collect()
    }
}

fn rejection_code(err: &FrontdeskError) -> Option<RejectionCode> {
    match err {
        FrontdeskError::Admission(rejection) => Some(rejection.code),
        _ => None,
    }
}

// --- Issuance ---

#[tokio::test]
async fn three_sequential_joins_get_one_two_three() {
    let fx = fixture();
    for (expected, raw) in [(1, "5550001"), (2, "5550002"), (3, "5550003")] {
        let outcome = fx.join_phone(raw).await.unwrap();
        assert_eq!(outcome.number, expected);
        assert!(!outcome.duplicate);
    }

    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!(stats.waiting, 3);
    assert_eq!(stats.last_ticket, 3);
    let positions: Vec<u32> = fx
        .waiting_line()
        .await
        .iter()
        .filter_map(|e| e.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn first_ticket_is_start_number() {
    let fx = fixture_with(settings(50, 100));
    assert_eq!(fx.join_phone("5550001").await.unwrap().number, 100);
    assert_eq!(fx.join_phone("5550002").await.unwrap().number, 101);
    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!(stats.start_number, 100);
    assert_eq!(stats.issued(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_have_no_gaps_or_duplicates() {
    let fx = fixture();
    let mut handles = Vec::new();
    for i in 0..30 {
        let service = Arc::clone(&fx.service);
        let request = fx.request(phone(&format!("55500{i:02}")));
        handles.push(tokio::spawn(async move { service.join(request).await }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=30).collect::<Vec<u32>>());

    let positions: Vec<u32> = fx
        .waiting_line()
        .await
        .iter()
        .filter_map(|e| e.position)
        .collect();
    assert!(is_dense(&positions));
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().waiting, 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_against_sqlite() {
    let (_dir, store) = temp_sqlite_store().await.unwrap();
    let store: Arc<dyn QueueStore> = Arc::new(store);
    let clock = ManualClock::at(2026, 3, 14, 9, 0);
    let service = Arc::new(
        QueueService::new(
            store,
            settings(50, 1),
            TokenService::new(SECRET.to_vec(), ClinicCalendar::utc(), 6),
        )
        .with_clock(Arc::new(clock)),
    );
    let scope = Scope::parse("dr-lee", "2026-03-14").unwrap();
    let token = service.generate_token(&scope).unwrap().token;

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = Arc::clone(&service);
        let request = JoinRequest {
            token: token.clone(),
            identity: phone(&format!("55510{i:02}")),
            display_name: None,
            source: EntrySource::Bot,
        };
        handles.push(tokio::spawn(async move { service.join(request).await }));
    }
    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=20).collect::<Vec<u32>>());

    let entries = service.list_entries(&scope).await.unwrap();
    let positions: Vec<u32> = entries.iter().filter_map(|e| e.position).collect();
    assert_eq!(positions, (1..=20).collect::<Vec<u32>>());
}

// --- Deduplication ---

#[tokio::test]
async fn same_identity_twice_is_a_duplicate() {
    let fx = fixture();
    let first = fx.join_phone("+1 (555) 0100").await.unwrap();
    let second = fx.join_phone("+15550100").await.unwrap();

    assert_eq!(first.number, second.number);
    assert!(second.duplicate);
    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.issued(), 1);
}

#[tokio::test]
async fn full_queue_still_returns_existing_ticket() {
    let fx = fixture_with(settings(2, 1));
    assert_eq!(fx.join_phone("5550001").await.unwrap().number, 1);
    assert_eq!(fx.join_phone("5550002").await.unwrap().number, 2);

    let err = fx.join_phone("5550003").await.unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::QueueFull));
    match err {
        FrontdeskError::Admission(rejection) => {
            assert_eq!(rejection.max_per_day, 2);
            assert_eq!(rejection.issued, 2);
            assert_eq!(rejection.remaining, 0);
        }
        other => panic!("unexpected error {other:?}"),
    }

    let again = fx.join_phone("5550001").await.unwrap();
    assert_eq!(again.number, 1);
    assert!(again.duplicate);
}

#[tokio::test]
async fn both_channels_resolve_to_one_ticket() {
    let fx = fixture();
    let first = fx.join_phone("5550001").await.unwrap();

    let both = JoinIdentity {
        phone: Some("5550001".to_string()),
        chat_id: Some("tg:42".to_string()),
    };
    let second = fx.service.join(fx.request(both)).await.unwrap();
    assert!(second.duplicate);
    assert_eq!(second.number, first.number);

    let chat_only = JoinIdentity {
        phone: None,
        chat_id: Some("tg:42".to_string()),
    };
    let third = fx.service.join(fx.request(chat_only)).await.unwrap();
    assert!(third.duplicate);
    assert_eq!(third.number, first.number);
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().issued(), 1);
}

#[tokio::test]
async fn cancelled_identity_may_join_again() {
    let fx = fixture();
    let first = fx.join_phone("5550001").await.unwrap();
    let entry = fx.waiting_line().await[0].clone();
    fx.service
        .transition(entry.id, EntryStatus::Cancelled)
        .await
        .unwrap();

    let second = fx.join_phone("5550001").await.unwrap();
    assert!(!second.duplicate);
    assert_eq!(second.number, first.number + 1);
    assert_eq!(fx.waiting_line().await.len(), 1);
}

// --- Admission window ---

#[tokio::test]
async fn join_before_start_hour_is_too_early() {
    let fx = fixture();
    fx.clock.set(fx.clock.now() - Duration::hours(3));
    let err = fx.join_phone("5550001").await.unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::TooEarly));
    assert_eq!(err.kind(), ErrorKind::Admission);

    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!(stats.issued(), 0);
    assert!(fx.service.list_entries(&fx.scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn open_service_closes_online_joining() {
    let fx = fixture();
    let ticket = fx.join_phone("5550001").await.unwrap();

    let queue = fx.service.open_service(&fx.scope).await.unwrap();
    assert!(!queue.is_open);
    assert!(queue.opened_at.is_some());

    let err = fx.join_phone("5550002").await.unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::QueueClosed));

    // A closed queue refuses even returning identities.
    let err = fx.join_phone("5550001").await.unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::QueueClosed));
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().last_ticket, ticket.number);

    // Scheduled close after service opened is a no-op.
    assert!(!fx.service.close_online(&fx.scope).await.unwrap());
}

#[tokio::test]
async fn scheduled_close_is_idempotent() {
    let fx = fixture();
    fx.service.ensure_queue(&fx.scope).await.unwrap();
    assert!(fx.service.close_online(&fx.scope).await.unwrap());
    assert!(!fx.service.close_online(&fx.scope).await.unwrap());

    let err = fx.join_phone("5550001").await.unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::QueueClosed));
}

// --- Validation and infrastructure ---

#[tokio::test]
async fn bad_tokens_and_identities_are_rejected() {
    let fx = fixture();
    let mut request = fx.request(phone("5550001"));
    request.token = "not-a-token".to_string();
    assert!(matches!(
        fx.service.join(request).await,
        Err(FrontdeskError::InvalidToken)
    ));

    let err = fx
        .service
        .join(fx.request(JoinIdentity::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = fx.join_phone("12").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let fx = fixture();
    let request = fx.request(phone("5550001"));
    fx.clock.advance(Duration::days(2));
    assert!(matches!(
        fx.service.join(request).await,
        Err(FrontdeskError::InvalidToken)
    ));
}

#[tokio::test]
async fn storage_failure_is_infrastructure() {
    let fx = fixture();
    let request = fx.request(phone("5550001"));
    fx.store.fail_next("database is locked").await;
    let err = fx.service.join(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
}

#[tokio::test]
async fn failed_entry_write_leaves_no_number_or_binding_behind() {
    let fx = fixture();
    let request = fx.request(phone("5550001"));
    fx.store.fail_at(WriteStep::InsertEntry, "disk full").await;
    let err = fx.service.join(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);

    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!((stats.last_ticket, stats.waiting), (0, 0));
    assert_eq!(fx.store.binding_count().await, 0);
    assert!(fx.service.list_entries(&fx.scope).await.unwrap().is_empty());

    // The same patient retries and is not mistaken for a duplicate.
    let retry = fx.join_phone("5550001").await.unwrap();
    assert_eq!(retry.number, 1);
    assert!(!retry.duplicate);
    assert_eq!(fx.join_phone("5550002").await.unwrap().number, 2);
    let positions: Vec<u32> = fx
        .waiting_line()
        .await
        .iter()
        .filter_map(|e| e.position)
        .collect();
    assert_eq!(positions, vec![1, 2]);
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().waiting, 2);
}

#[tokio::test]
async fn failed_counter_write_leaves_transition_unapplied() {
    let fx = fixture();
    let ids = five_entries(&fx).await;
    fx.store.fail_at(WriteStep::ShiftCounter, "disk full").await;

    let err = fx
        .service
        .transition(ids[1], EntryStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Infrastructure);
    assert_eq!(
        fx.service.get_entry(ids[1]).await.unwrap().status,
        EntryStatus::Waiting
    );
    assert_eq!(fx.ids_by_position().await, ids);
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().waiting, 5);

    // A retry applies the whole change, and later joins extend a dense line.
    fx.service
        .transition(ids[1], EntryStatus::Cancelled)
        .await
        .unwrap();
    let outcome = fx.join_phone("5550099").await.unwrap();
    assert_eq!(outcome.number, 6);
    let positions: Vec<u32> = fx
        .waiting_line()
        .await
        .iter()
        .filter_map(|e| e.position)
        .collect();
    assert!(is_dense(&positions));
    assert_eq!(positions.len(), 5);
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().waiting, 5);
}

// --- Display names ---

#[tokio::test]
async fn display_name_comes_from_request_or_directory() {
    let store = Arc::new(MemoryQueueStore::new());
    let directory = StaticIdentityDirectory::new().with_phone("555-0001", "Ada");
    let service = QueueService::new(
        store,
        settings(50, 1),
        TokenService::new(SECRET.to_vec(), ClinicCalendar::utc(), 6),
    )
    .with_clock(Arc::new(ManualClock::at(2026, 3, 14, 9, 0)))
    .with_directory(Arc::new(directory));
    let scope = Scope::parse("dr-lee", "2026-03-14").unwrap();
    let token = service.generate_token(&scope).unwrap().token;

    service
        .join(JoinRequest {
            token: token.clone(),
            identity: phone("5550001"),
            display_name: None,
            source: EntrySource::Desk,
        })
        .await
        .unwrap();
    service
        .join(JoinRequest {
            token,
            identity: phone("5550002"),
            display_name: Some("  Grace ".to_string()),
            source: EntrySource::Desk,
        })
        .await
        .unwrap();

    let names: Vec<Option<String>> = service
        .list_entries(&scope)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.display_name)
        .collect();
    assert_eq!(names, vec![Some("Ada".to_string()), Some("Grace".to_string())]);
}

#[tokio::test]
async fn directory_failure_does_not_block_join() {
    let store = Arc::new(MemoryQueueStore::new());
    let service = QueueService::new(
        store,
        settings(50, 1),
        TokenService::new(SECRET.to_vec(), ClinicCalendar::utc(), 6),
    )
    .with_clock(Arc::new(ManualClock::at(2026, 3, 14, 9, 0)))
    .with_directory(Arc::new(FailingDirectory));
    let scope = Scope::parse("dr-lee", "2026-03-14").unwrap();
    let token = service.generate_token(&scope).unwrap().token;

    let outcome = service
        .join(JoinRequest {
            token,
            identity: phone("5550001"),
            display_name: None,
            source: EntrySource::Qr,
        })
        .await
        .unwrap();
    assert_eq!(outcome.number, 1);
    let entry = &service.list_entries(&scope).await.unwrap()[0];
    assert!(entry.display_name.is_none());
}

// --- Reorder and move ---

async fn five_entries(fx: &Fixture) -> Vec<EntryId> {
    for i in 1..=5 {
        fx.join_phone(&format!("555000{i}")).await.unwrap();
    }
    fx.ids_by_position().await
}

#[tokio::test]
async fn move_last_to_second() {
    let fx = fixture();
    let ids = five_entries(&fx).await;

    fx.service.move_entry(ids[4], 2).await.unwrap();
    assert_eq!(
        fx.ids_by_position().await,
        vec![ids[0], ids[4], ids[1], ids[2], ids[3]]
    );
}

#[tokio::test]
async fn move_out_of_range_is_validation() {
    let fx = fixture();
    let ids = five_entries(&fx).await;
    let err = fx.service.move_entry(ids[0], 6).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = fx.service.move_entry(EntryId(999), 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(fx.ids_by_position().await, ids);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_keep_positions_dense() {
    let fx = fixture();
    let ids = five_entries(&fx).await;

    let mut handles = Vec::new();
    for (i, id) in ids.iter().enumerate() {
        let service = Arc::clone(&fx.service);
        let id = *id;
        let target = (5 - i) as u32;
        handles.push(tokio::spawn(async move { service.move_entry(id, target).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let positions: Vec<u32> = fx
        .waiting_line()
        .await
        .iter()
        .filter_map(|e| e.position)
        .collect();
    assert!(is_dense(&positions));
    assert_eq!(positions.len(), 5);
}

#[tokio::test]
async fn reorder_full_and_partial() {
    let fx = fixture();
    let ids = five_entries(&fx).await;

    let mapping: Vec<(EntryId, u32)> = ids
        .iter()
        .rev()
        .enumerate()
        .map(|(i, id)| (*id, i as u32 + 1))
        .collect();
    fx.service.reorder(&fx.scope, &mapping).await.unwrap();
    let reversed: Vec<EntryId> = ids.iter().rev().copied().collect();
    assert_eq!(fx.ids_by_position().await, reversed);

    // Partial: only pin the current last entry to the front.
    fx.service
        .reorder(&fx.scope, &[(ids[0], 1)])
        .await
        .unwrap();
    assert_eq!(
        fx.ids_by_position().await,
        vec![ids[0], ids[4], ids[3], ids[2], ids[1]]
    );
}

#[tokio::test]
async fn reorder_rejects_stale_and_invalid_mappings() {
    let fx = fixture();
    let ids = five_entries(&fx).await;
    fx.service
        .transition(ids[2], EntryStatus::Cancelled)
        .await
        .unwrap();

    let err = fx
        .service
        .reorder(&fx.scope, &[(ids[2], 1)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .service
        .reorder(&fx.scope, &[(ids[0], 5)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = fx
        .service
        .reorder(&fx.scope, &[(ids[0], 2), (ids[1], 2)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// --- Status transitions ---

#[tokio::test]
async fn transitions_move_counters_and_compact_positions() {
    let fx = fixture();
    let ids = five_entries(&fx).await;

    let called = fx
        .service
        .transition(ids[0], EntryStatus::Called)
        .await
        .unwrap();
    assert!(called.called_at.is_some());
    assert_eq!(called.position, Some(1));

    fx.service
        .transition(ids[0], EntryStatus::Serving)
        .await
        .unwrap();
    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!((stats.waiting, stats.serving, stats.done), (4, 1, 0));

    let done = fx
        .service
        .transition(ids[0], EntryStatus::Done)
        .await
        .unwrap();
    assert_eq!(done.position, None);
    let stats = fx.service.stats(&fx.scope).await.unwrap();
    assert_eq!((stats.waiting, stats.serving, stats.done), (4, 0, 1));

    fx.service
        .transition(ids[2], EntryStatus::NoShow)
        .await
        .unwrap();
    let line = fx.waiting_line().await;
    assert_eq!(
        line.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![ids[1], ids[3], ids[4]]
    );
    assert_eq!(
        line.iter().filter_map(|e| e.position).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(fx.service.stats(&fx.scope).await.unwrap().waiting, 3);
}

#[tokio::test]
async fn illegal_transition_is_conflict() {
    let fx = fixture();
    let ids = five_entries(&fx).await;
    fx.service
        .transition(ids[0], EntryStatus::Cancelled)
        .await
        .unwrap();

    let err = fx
        .service
        .transition(ids[0], EntryStatus::Waiting)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx
        .service
        .transition(ids[1], EntryStatus::Done)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = fx.service.move_entry(ids[0], 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

// --- Notifications ---

#[tokio::test]
async fn every_state_change_publishes_to_the_room() {
    let fx = fixture();
    let room = fx.scope.room();
    let ids = five_entries(&fx).await;
    assert_eq!(fx.notifier.events_for(&room).len(), 5);

    fx.join_phone("5550001").await.unwrap();
    fx.service.move_entry(ids[4], 1).await.unwrap();
    fx.service.reorder(&fx.scope, &[(ids[0], 1)]).await.unwrap();
    fx.service
        .transition(ids[1], EntryStatus::Called)
        .await
        .unwrap();
    fx.service.open_service(&fx.scope).await.unwrap();
    assert_eq!(fx.notifier.events_for(&room).len(), 10);

    let last = fx.notifier.last_for(&room).unwrap();
    assert_eq!(last.waiting, 5);
    assert_eq!(last.last_ticket, 5);
}

#[tokio::test]
async fn rejected_joins_publish_nothing() {
    let fx = fixture();
    fx.clock.set(fx.clock.now() - Duration::hours(4));
    let _ = fx.join_phone("5550001").await;
    assert_eq!(fx.notifier.count(), 0);
}

// --- Maintenance ---

#[tokio::test]
async fn bindings_older_than_retention_are_purged() {
    let fx = fixture();
    fx.join_phone("5550001").await.unwrap();
    assert_eq!(fx.store.binding_count().await, 1);

    let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
    assert_eq!(fx.service.purge_expired_bindings(today).await.unwrap(), 0);
    let later = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
    assert_eq!(fx.service.purge_expired_bindings(later).await.unwrap(), 1);
    assert_eq!(fx.store.binding_count().await, 0);
}
