//! Tests for the scheduling coordinator outcomes.

use chrono::NaiveDate;
use hirebot::config::SchedulingConfig;
use hirebot::scheduling::slot::{SlotKey, SlotRequest};
use hirebot::scheduling::store::SlotStore;
use hirebot::scheduling::{FailureKind, SchedulingCoordinator, SchedulingIntent, SchedulingOutcome};

const NAME: Option<&str> = Some("John");
const PHONE: Option<&str> = Some("123-456-7890");

async fn coordinator(slots: &[(&str, &str)]) -> SchedulingCoordinator {
    let pool = hirebot::db::open_in_memory()
        .await
        .expect("in-memory db should open");
    let today = NaiveDate::from_ymd_opt(2025, 9, 1).expect("date");
    let store = SlotStore::new(pool).with_today(today);
    for (raw, position) in slots {
        store
            .insert_slot(SlotKey::parse(raw).expect("slot"), position, true)
            .await
            .expect("insert");
    }
    SchedulingCoordinator::new(store, &SchedulingConfig::default())
}

fn book(raw: &str) -> SchedulingIntent {
    SchedulingIntent::Book {
        position: None,
        slot: SlotRequest::Raw(raw.to_owned()),
    }
}

#[tokio::test]
async fn refuses_unregistered_candidates() {
    let coordinator = coordinator(&[("2025-09-10 10:00", "Python Developer")]).await;

    let no_name = coordinator
        .handle(None, PHONE, book("2025-09-10 10:00"))
        .await;
    assert_eq!(no_name, SchedulingOutcome::NotRegistered);

    let bad_phone = coordinator
        .handle(NAME, Some("12345"), SchedulingIntent::search())
        .await;
    assert_eq!(bad_phone, SchedulingOutcome::NotRegistered);

    // Nothing was booked.
    assert_eq!(
        coordinator.store().count_slots(true).await.expect("count"),
        1
    );
}

#[tokio::test]
async fn search_uses_default_position() {
    let coordinator = coordinator(&[
        ("2025-09-10 10:00", "Python Developer"),
        ("2025-09-10 11:00", "Data Analyst"),
    ])
    .await;

    match coordinator
        .handle(NAME, PHONE, SchedulingIntent::search())
        .await
    {
        SchedulingOutcome::SlotsOffered { position, slots } => {
            assert_eq!(position, "Python Developer");
            assert_eq!(slots.len(), 1);
            assert_eq!(slots[0].key().to_string(), "2025-09-10 10:00");
        }
        other => panic!("expected slots_offered, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_search_is_an_offer_not_an_error() {
    let coordinator = coordinator(&[]).await;
    let outcome = coordinator
        .handle(NAME, PHONE, SchedulingIntent::search())
        .await;
    assert!(matches!(
        &outcome,
        SchedulingOutcome::SlotsOffered { slots, .. } if slots.is_empty()
    ));
    assert!(outcome.message().contains("preferred time range"));
}

#[tokio::test]
async fn book_status_cancel_cycle() {
    let coordinator = coordinator(&[("2025-09-10 10:00", "Python Developer")]).await;

    let confirmed = coordinator
        .handle(NAME, PHONE, book("2025-09-10 10:00"))
        .await;
    let SchedulingOutcome::ScheduleConfirmed(interview) = &confirmed else {
        panic!("expected schedule_confirmed, got {confirmed:?}");
    };
    assert_eq!(interview.candidate_phone, "1234567890");
    assert_eq!(interview.recruiter_phone, "+1-555-0000");
    assert_eq!(confirmed.label(), "schedule_confirmed");

    let status = coordinator
        .handle(NAME, PHONE, SchedulingIntent::Status)
        .await;
    assert!(matches!(
        &status,
        SchedulingOutcome::ScheduleStatus(Some(i)) if i.key().to_string() == "2025-09-10 10:00"
    ));

    let cancelled = coordinator
        .handle(NAME, PHONE, SchedulingIntent::Cancel)
        .await;
    assert_eq!(cancelled, SchedulingOutcome::ScheduleCancelled { released: 1 });

    let status = coordinator
        .handle(NAME, PHONE, SchedulingIntent::Status)
        .await;
    assert_eq!(status, SchedulingOutcome::ScheduleStatus(None));
}

#[tokio::test]
async fn booking_again_replaces_the_previous_interview() {
    let coordinator = coordinator(&[
        ("2025-09-10 10:00", "Python Developer"),
        ("2025-09-11 09:00", "Python Developer"),
    ])
    .await;

    coordinator
        .handle(NAME, PHONE, book("2025-09-10 10:00"))
        .await;
    let second = coordinator
        .handle(NAME, PHONE, book("2025-09-11 09:00"))
        .await;
    assert_eq!(second.label(), "schedule_confirmed");

    let current = coordinator
        .get_schedule("1234567890")
        .await
        .expect("lookup")
        .expect("booking");
    assert_eq!(current.key().to_string(), "2025-09-11 09:00");
    assert_eq!(
        coordinator.store().count_slots(true).await.expect("count"),
        1
    );
}

#[tokio::test]
async fn store_failures_become_typed_errors() {
    let coordinator = coordinator(&[("2025-09-10 10:00", "Python Developer")]).await;

    let invalid = coordinator.handle(NAME, PHONE, book("tomorrow")).await;
    assert!(matches!(
        invalid,
        SchedulingOutcome::Error {
            kind: FailureKind::InvalidSlotFormat,
            ..
        }
    ));

    let taken = coordinator
        .handle(NAME, PHONE, book("2025-09-12 10:00"))
        .await;
    match taken {
        SchedulingOutcome::Error { kind, message } => {
            assert_eq!(kind, FailureKind::SlotNotAvailable);
            assert!(message.contains("no longer available"));
        }
        other => panic!("expected error outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn closed_database_reports_unavailable() {
    let coordinator = coordinator(&[]).await;
    coordinator.store().pool().close().await;

    let outcome = coordinator
        .handle(NAME, PHONE, SchedulingIntent::Status)
        .await;
    assert!(matches!(
        outcome,
        SchedulingOutcome::Error {
            kind: FailureKind::DatabaseUnavailable,
            ..
        }
    ));
}
