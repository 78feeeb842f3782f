//! Integration tests for the Reservations domain
//!
//! These tests use real PostgreSQL via testcontainers to ensure:
//! - The seeded state registry is readable
//! - Guarded writes and the exclusion constraint keep Confirmed ranges apart
//! - Read paths paginate and filter in SQL the same way the in-memory store does
//! - Concurrent confirmations serialize on the product lock

use chrono::NaiveDate;
use domain_reservations::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use test_utils::{TestDataBuilder, TestDatabase, assertions::*};
use uuid::Uuid;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn service(db: &TestDatabase) -> ReservationService<PgReservationRepository> {
    ReservationService::new(
        PgReservationRepository::new(db.connection()),
        Arc::new(PgStateRegistry::new(db.connection())),
        Arc::new(PgUserDirectory::new(db.connection())),
        Arc::new(PgProductCatalog::new(db.connection())),
    )
    .with_clock(Arc::new(FixedClock::at_date(d(2025, 6, 1))))
}

async fn seed(db: &TestDatabase, builder: &TestDataBuilder) -> (Uuid, Uuid) {
    let user = db
        .create_test_user(builder.user_id(), &builder.name("guest", "main"))
        .await;
    let product = db
        .create_test_product(builder.product_id(), &builder.name("cabin", "main"), "120.00")
        .await;
    (user, product)
}

// ============================================================================
// Registry and directories
// ============================================================================

#[tokio::test]
async fn test_seeded_states_are_registered() {
    let db = TestDatabase::new().await;
    let registry = PgStateRegistry::new(db.connection());

    let active = registry.list_active().await.unwrap();
    let names: Vec<_> = active.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Pending", "Confirmed", "Cancelled", "Completed"]);

    let confirmed = registry.find_by_name("Confirmed").await.unwrap();
    assert_eq!(
        assert_some(confirmed, "Confirmed state").status,
        ReservationStatus::Confirmed
    );

    assert!(registry.find_by_name("confirmed").await.unwrap().is_none());
}

#[tokio::test]
async fn test_directories_resolve_seeded_rows() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("directories");
    let (user, product) = seed(&db, &builder).await;

    let users = PgUserDirectory::new(db.connection());
    let products = PgProductCatalog::new(db.connection());

    assert!(users.exists(user).await.unwrap());
    assert!(!users.exists(Uuid::now_v7()).await.unwrap());

    let cabin = products.get(product).await.unwrap();
    assert_uuid_eq(cabin.id, product, "product id");
    assert_eq!(cabin.price, dec!(120.00));

    let err = products.get(Uuid::now_v7()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_create_confirm_complete_roundtrip() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("lifecycle");
    let (user, product) = seed(&db, &builder).await;
    let svc = service(&db);

    let created = svc
        .save_reservation(
            SaveReservation::new(user, product, d(2025, 7, 1), d(2025, 7, 5))
                .with_price(dec!(100.00))
                .with_observations("Two adults"),
        )
        .await
        .unwrap();
    assert_eq!(created.status, ReservationStatus::Pending);

    let confirmed = svc.confirm(created.id).await.unwrap();
    assert!(confirmed.confirmed_at.is_some());

    let stored = assert_some(
        PgReservationRepository::new(db.connection())
            .get_by_id(created.id)
            .await
            .unwrap(),
        "stored reservation",
    );
    assert_eq!(stored.status, ReservationStatus::Confirmed);
    assert_eq!(stored.total_price, dec!(100.00));
    assert_eq!(stored.observations.as_deref(), Some("Two adults"));

    let err = assert_err(svc.complete(created.id).await, "complete before end date");
    assert_eq!(err.kind(), ErrorKind::TooEarly);
}

#[tokio::test]
async fn test_overlapping_confirmation_is_rejected() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("overlap");
    let (user, product) = seed(&db, &builder).await;
    let other = db
        .create_test_user(builder.nth_user_id(1), &builder.name("guest", "other"))
        .await;
    let svc = service(&db);

    let first = svc
        .save_reservation(
            SaveReservation::new(user, product, d(2025, 6, 10), d(2025, 6, 15)).with_price(dec!(1)),
        )
        .await
        .unwrap();
    let second = svc
        .save_reservation(
            SaveReservation::new(other, product, d(2025, 6, 15), d(2025, 6, 20)).with_price(dec!(1)),
        )
        .await
        .unwrap();

    svc.confirm(first.id).await.unwrap();

    // Shares 2025-06-15 with the first one
    let err = assert_err(svc.confirm(second.id).await, "overlapping confirm");
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.to_string().contains("2025-06-10 to 2025-06-15"));
}

#[tokio::test]
async fn test_exclusion_constraint_backs_up_the_guard() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("exclusion");
    let (user, product) = seed(&db, &builder).await;
    let repo = PgReservationRepository::new(db.connection());
    let now = chrono::Utc::now();

    let confirmed = |start: NaiveDate, end: NaiveDate| Reservation {
        id: Uuid::now_v7(),
        user_id: user,
        product_id: product,
        status: ReservationStatus::Confirmed,
        start_date: start,
        end_date: end,
        total_price: dec!(10),
        observations: None,
        confirmed_at: Some(now),
        cancelled_at: None,
        cancellation_reason: None,
        version: 1,
        created_at: now,
        updated_at: now,
    };

    let ghost = confirmed(d(2025, 6, 10), d(2025, 6, 12));
    let outcome = repo
        .write(ghost.clone(), WriteGuard::transition(&ghost))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Missing);

    let outcome = repo
        .write(confirmed(d(2025, 6, 10), d(2025, 6, 12)), WriteGuard::insert())
        .await
        .unwrap();
    assert!(matches!(outcome, WriteOutcome::Written(_)));

    // An insert that skips the overlap check still cannot land
    let result = repo
        .write(
            confirmed(d(2025, 6, 12), d(2025, 6, 14)),
            WriteGuard {
                expected: None,
                check_overlap: false,
            },
        )
        .await;
    match result {
        Ok(WriteOutcome::Conflicts(conflicts)) => assert_eq!(conflicts.len(), 1),
        Err(e) => assert_eq!(e.kind(), ErrorKind::Unavailable),
        other => panic!("overlapping confirmed insert must be refused, got {:?}", other),
    }
}

#[tokio::test]
async fn test_write_from_outdated_read_is_stale() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("outdated_read");
    let (user, product) = seed(&db, &builder).await;
    let svc = service(&db);
    let repo = PgReservationRepository::new(db.connection());

    let read = svc
        .save_reservation(
            SaveReservation::new(user, product, d(2025, 7, 1), d(2025, 7, 5)).with_price(dec!(100)),
        )
        .await
        .unwrap();
    assert_eq!(read.version, 1);

    let moved = svc
        .save_reservation(
            SaveReservation::new(user, product, d(2025, 8, 1), d(2025, 8, 3))
                .with_price(dec!(100))
                .for_existing(read.id),
        )
        .await
        .unwrap();
    assert_eq!(moved.version, 2);

    let confirmed = Reservation {
        status: ReservationStatus::Confirmed,
        ..read.clone()
    };
    let outcome = repo
        .write(confirmed, WriteGuard::transition(&read).with_overlap_check())
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Stale(ReservationStatus::Pending));

    let stored = svc.get_reservation(read.id).await.unwrap();
    assert_eq!((stored.start_date, stored.end_date), (d(2025, 8, 1), d(2025, 8, 3)));
    assert_eq!(stored.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn test_concurrent_confirms_only_one_wins() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("concurrent_confirm");
    let (user, product) = seed(&db, &builder).await;
    let other = db
        .create_test_user(builder.nth_user_id(1), &builder.name("guest", "other"))
        .await;
    let svc = service(&db);

    let a = svc
        .save_reservation(
            SaveReservation::new(user, product, d(2025, 9, 1), d(2025, 9, 5)).with_price(dec!(1)),
        )
        .await
        .unwrap();
    let b = svc
        .save_reservation(
            SaveReservation::new(other, product, d(2025, 9, 3), d(2025, 9, 8)).with_price(dec!(1)),
        )
        .await
        .unwrap();

    let (s1, s2) = (svc.clone(), svc.clone());
    let (r1, r2) = futures::join!(
        tokio::spawn(async move { s1.confirm(a.id).await }),
        tokio::spawn(async move { s2.confirm(b.id).await }),
    );
    let results = [r1.unwrap(), r2.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let lost = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(lost.kind(), ErrorKind::Unavailable);
    assert_eq!(svc.count_by_state("Confirmed").await.unwrap(), 1);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_listing_history_and_upcoming() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("reads");
    let (user, product) = seed(&db, &builder).await;
    let svc = service(&db);

    let mut ids = Vec::new();
    for (start, end) in [(2, 3), (10, 12), (20, 25)] {
        let r = svc
            .save_reservation(
                SaveReservation::new(user, product, d(2025, 6, start), d(2025, 6, end))
                    .with_price(dec!(50)),
            )
            .await
            .unwrap();
        ids.push(r.id);
    }
    svc.confirm(ids[0]).await.unwrap();
    svc.confirm(ids[1]).await.unwrap();

    let page = svc.list_by_user(user, PageRequest::new(2, 0)).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_more());

    let window = svc
        .user_history_filtered(
            user,
            HistoryFilter {
                from: Some(d(2025, 6, 11)),
                to: Some(d(2025, 6, 21)),
                states: vec!["Pending".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(window.items.len(), 1);
    assert_uuid_eq(window.items[0].id, ids[2], "pending reservation in window");

    let upcoming = PgReservationRepository::new(db.connection())
        .find_upcoming(d(2025, 6, 1), 3)
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_uuid_eq(upcoming[0].id, ids[0], "upcoming reservation");

    svc.delete_reservation(ids[2]).await.unwrap();
    assert_eq!(svc.count_by_state("Pending").await.unwrap(), 0);
}
