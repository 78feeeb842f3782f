use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ReservationError, ReservationResult};
use crate::models::{
    HistoryQuery, Page, PageRequest, Reservation, ReservationFilter, ReservationStatus,
};

/// Status and version a reservation had when it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadStamp {
    pub status: ReservationStatus,
    pub version: i32,
}

impl ReadStamp {
    pub fn of(reservation: &Reservation) -> Self {
        Self {
            status: reservation.status,
            version: reservation.version,
        }
    }
}

/// Preconditions a write must satisfy atomically with the write itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteGuard {
    /// What the stored row must still look like; `None` inserts a new row
    pub expected: Option<ReadStamp>,
    /// Refuse the write if a Confirmed reservation of the same product, other
    /// than this one, overlaps its dates
    pub check_overlap: bool,
}

impl WriteGuard {
    pub fn insert() -> Self {
        Self {
            expected: None,
            check_overlap: true,
        }
    }

    /// Overwrite the row `read` was loaded from, provided nothing was written
    /// to it in between
    pub fn transition(read: &Reservation) -> Self {
        Self {
            expected: Some(ReadStamp::of(read)),
            check_overlap: false,
        }
    }

    pub fn with_overlap_check(mut self) -> Self {
        self.check_overlap = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written(Reservation),
    /// Confirmed reservations holding the dates, ordered by start date
    Conflicts(Vec<Reservation>),
    /// The stored row was written since it was read; carries its current status
    Stale(ReservationStatus),
    Missing,
}

/// Persistence for reservations.
///
/// Only the lifecycle engine calls [`ReservationRepository::write`]; every other
/// method is a read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert or update under `guard`. Guard failures are reported as outcomes,
    /// not errors.
    async fn write(&self, reservation: Reservation, guard: WriteGuard)
    -> ReservationResult<WriteOutcome>;

    async fn get_by_id(&self, id: Uuid) -> ReservationResult<Option<Reservation>>;

    /// Reservations of `product_id` in one of `states` intersecting `[start, end]`,
    /// ordered by start date
    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        states: &[ReservationStatus],
    ) -> ReservationResult<Vec<Reservation>>;

    /// Pending or Confirmed reservations of the user that end on or after `today`
    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> ReservationResult<Vec<Reservation>>;

    /// Confirmed reservations starting in `[today, today + within_days]`
    async fn find_upcoming(
        &self,
        today: NaiveDate,
        within_days: u32,
    ) -> ReservationResult<Vec<Reservation>>;

    async fn list(&self, filter: ReservationFilter) -> ReservationResult<Page<Reservation>>;

    async fn history(&self, query: HistoryQuery) -> ReservationResult<Page<Reservation>>;

    async fn count_by_status(&self, status: ReservationStatus) -> ReservationResult<u64>;

    async fn delete(&self, id: Uuid) -> ReservationResult<bool>;
}

/// In-memory implementation of ReservationRepository (for development/testing).
///
/// Guarded writes hold the map's write lock across check and insert, which
/// serializes them the same way the advisory lock does in Postgres.
#[derive(Debug, Default, Clone)]
pub struct InMemoryReservationRepository {
    reservations: Arc<RwLock<HashMap<Uuid, Reservation>>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self {
            reservations: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

fn confirmed_conflicts<'a>(
    reservations: impl Iterator<Item = &'a Reservation>,
    candidate: &Reservation,
) -> Vec<Reservation> {
    let mut conflicts: Vec<Reservation> = reservations
        .filter(|r| {
            r.id != candidate.id
                && r.product_id == candidate.product_id
                && r.status == ReservationStatus::Confirmed
                && r.overlaps(candidate.start_date, candidate.end_date)
        })
        .cloned()
        .collect();
    conflicts.sort_by_key(|r| r.start_date);
    conflicts
}

fn paginate(mut items: Vec<Reservation>, page: PageRequest) -> Page<Reservation> {
    // Newest first; v7 ids break ties between rows created in the same instant
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    Page::new(items, total, page)
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn write(
        &self,
        reservation: Reservation,
        guard: WriteGuard,
    ) -> ReservationResult<WriteOutcome> {
        let mut reservations = self.reservations.write().await;

        let mut reservation = reservation;
        match (guard.expected, reservations.get(&reservation.id)) {
            (None, Some(_)) => {
                return Err(ReservationError::Persistence(format!(
                    "duplicate reservation id {}",
                    reservation.id
                )));
            }
            (None, None) => reservation.version = 1,
            (Some(_), None) => return Ok(WriteOutcome::Missing),
            (Some(expected), Some(stored)) => {
                if ReadStamp::of(stored) != expected {
                    return Ok(WriteOutcome::Stale(stored.status));
                }
                reservation.version = stored.version + 1;
            }
        }

        // Mirrors the exclusion constraint: a Confirmed row is always checked
        if guard.check_overlap || reservation.status == ReservationStatus::Confirmed {
            let conflicts = confirmed_conflicts(reservations.values(), &reservation);
            if !conflicts.is_empty() {
                return Ok(WriteOutcome::Conflicts(conflicts));
            }
        }

        reservations.insert(reservation.id, reservation.clone());

        tracing::info!(
            reservation_id = %reservation.id,
            status = %reservation.status,
            "Stored reservation"
        );
        Ok(WriteOutcome::Written(reservation))
    }

    async fn get_by_id(&self, id: Uuid) -> ReservationResult<Option<Reservation>> {
        let reservations = self.reservations.read().await;
        Ok(reservations.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        states: &[ReservationStatus],
    ) -> ReservationResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;

        let mut result: Vec<Reservation> = reservations
            .values()
            .filter(|r| {
                r.product_id == product_id && states.contains(&r.status) && r.overlaps(start, end)
            })
            .cloned()
            .collect();

        result.sort_by_key(|r| r.start_date);
        Ok(result)
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> ReservationResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;

        let mut result: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.user_id == user_id && r.is_active_on(today))
            .cloned()
            .collect();

        result.sort_by_key(|r| r.start_date);
        Ok(result)
    }

    async fn find_upcoming(
        &self,
        today: NaiveDate,
        within_days: u32,
    ) -> ReservationResult<Vec<Reservation>> {
        let limit = today
            .checked_add_days(Days::new(within_days as u64))
            .unwrap_or(NaiveDate::MAX);

        let reservations = self.reservations.read().await;

        let mut result: Vec<Reservation> = reservations
            .values()
            .filter(|r| {
                r.status == ReservationStatus::Confirmed
                    && r.start_date >= today
                    && r.start_date <= limit
            })
            .cloned()
            .collect();

        result.sort_by_key(|r| r.start_date);
        Ok(result)
    }

    async fn list(&self, filter: ReservationFilter) -> ReservationResult<Page<Reservation>> {
        let reservations = self.reservations.read().await;

        let matching = reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        Ok(paginate(matching, filter.page))
    }

    async fn history(&self, query: HistoryQuery) -> ReservationResult<Page<Reservation>> {
        let reservations = self.reservations.read().await;

        let matching = reservations
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        Ok(paginate(matching, query.page))
    }

    async fn count_by_status(&self, status: ReservationStatus) -> ReservationResult<u64> {
        let reservations = self.reservations.read().await;
        Ok(reservations.values().filter(|r| r.status == status).count() as u64)
    }

    async fn delete(&self, id: Uuid) -> ReservationResult<bool> {
        let mut reservations = self.reservations.write().await;

        if reservations.remove(&id).is_some() {
            tracing::info!(reservation_id = %id, "Deleted reservation");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reservation(
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: ReservationStatus,
    ) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            product_id,
            status,
            start_date: start,
            end_date: end,
            total_price: Decimal::new(5000, 2),
            observations: None,
            confirmed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    async fn stored(repo: &InMemoryReservationRepository, r: Reservation) -> Reservation {
        match repo.write(r, WriteGuard::insert()).await.unwrap() {
            WriteOutcome::Written(r) => r,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryReservationRepository::new();
        let r = stored(
            &repo,
            reservation(Uuid::now_v7(), d(2025, 6, 1), d(2025, 6, 3), ReservationStatus::Pending),
        )
        .await;

        let fetched = repo.get_by_id(r.id).await.unwrap();
        assert_eq!(fetched, Some(r));
    }

    #[tokio::test]
    async fn test_insert_rejects_confirmed_overlap() {
        let repo = InMemoryReservationRepository::new();
        let product = Uuid::now_v7();
        stored(
            &repo,
            reservation(product, d(2025, 6, 10), d(2025, 6, 15), ReservationStatus::Confirmed),
        )
        .await;

        let clash = reservation(product, d(2025, 6, 15), d(2025, 6, 18), ReservationStatus::Pending);
        let outcome = repo.write(clash, WriteGuard::insert()).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Conflicts(ref c) if c.len() == 1));

        let adjacent = reservation(product, d(2025, 6, 16), d(2025, 6, 18), ReservationStatus::Pending);
        let outcome = repo.write(adjacent, WriteGuard::insert()).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Written(_)));
    }

    #[tokio::test]
    async fn test_pending_reservations_do_not_block() {
        let repo = InMemoryReservationRepository::new();
        let product = Uuid::now_v7();
        stored(
            &repo,
            reservation(product, d(2025, 6, 10), d(2025, 6, 15), ReservationStatus::Pending),
        )
        .await;

        let other = reservation(product, d(2025, 6, 12), d(2025, 6, 13), ReservationStatus::Pending);
        let outcome = repo.write(other, WriteGuard::insert()).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::Written(_)));
    }

    #[tokio::test]
    async fn test_transition_detects_stale_and_missing() {
        let repo = InMemoryReservationRepository::new();
        let r = stored(
            &repo,
            reservation(Uuid::now_v7(), d(2025, 6, 1), d(2025, 6, 3), ReservationStatus::Pending),
        )
        .await;

        let mut cancelled = r.clone();
        cancelled.status = ReservationStatus::Cancelled;
        let guard = WriteGuard {
            expected: Some(ReadStamp {
                status: ReservationStatus::Confirmed,
                version: r.version,
            }),
            check_overlap: false,
        };
        let outcome = repo.write(cancelled, guard).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Stale(ReservationStatus::Pending));

        let ghost = reservation(Uuid::now_v7(), d(2025, 6, 1), d(2025, 6, 3), ReservationStatus::Cancelled);
        let outcome = repo
            .write(ghost.clone(), WriteGuard::transition(&ghost))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Missing);
    }

    #[tokio::test]
    async fn test_write_from_outdated_read_is_stale() {
        let repo = InMemoryReservationRepository::new();
        let read = stored(
            &repo,
            reservation(Uuid::now_v7(), d(2025, 7, 1), d(2025, 7, 5), ReservationStatus::Pending),
        )
        .await;
        assert_eq!(read.version, 1);

        // An edit lands after `read` was taken; the status stays Pending
        let mut edited = read.clone();
        edited.start_date = d(2025, 8, 1);
        edited.end_date = d(2025, 8, 3);
        let outcome = repo
            .write(edited, WriteGuard::transition(&read))
            .await
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Written(ref w) if w.version == 2));

        let mut confirmed = read.clone();
        confirmed.status = ReservationStatus::Confirmed;
        let outcome = repo
            .write(confirmed, WriteGuard::transition(&read).with_overlap_check())
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Stale(ReservationStatus::Pending));

        let kept = repo.get_by_id(read.id).await.unwrap().unwrap();
        assert_eq!((kept.start_date, kept.end_date), (d(2025, 8, 1), d(2025, 8, 3)));
        assert_eq!(kept.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_ignores_own_row_in_overlap_check() {
        let repo = InMemoryReservationRepository::new();
        let r = stored(
            &repo,
            reservation(Uuid::now_v7(), d(2025, 6, 10), d(2025, 6, 15), ReservationStatus::Confirmed),
        )
        .await;

        let mut moved = r.clone();
        moved.end_date = d(2025, 6, 16);
        let outcome = repo
            .write(moved, WriteGuard::transition(&r).with_overlap_check())
            .await
            .unwrap();
        assert!(matches!(outcome, WriteOutcome::Written(ref w) if w.end_date == d(2025, 6, 16)));
    }

    #[tokio::test]
    async fn test_find_upcoming_window() {
        let repo = InMemoryReservationRepository::new();
        let today = d(2025, 9, 1);
        let product = Uuid::now_v7();

        for (start, status) in [
            (d(2025, 9, 1), ReservationStatus::Confirmed),
            (d(2025, 9, 4), ReservationStatus::Confirmed),
            (d(2025, 9, 5), ReservationStatus::Confirmed),
            (d(2025, 9, 2), ReservationStatus::Pending),
            (d(2025, 8, 31), ReservationStatus::Confirmed),
        ] {
            stored(&repo, reservation(product, start, start, status)).await;
        }

        let upcoming = repo.find_upcoming(today, 3).await.unwrap();
        let starts: Vec<_> = upcoming.iter().map(|r| r.start_date).collect();
        assert_eq!(starts, vec![d(2025, 9, 1), d(2025, 9, 4)]);
    }

    #[tokio::test]
    async fn test_list_paginates_newest_first() {
        let repo = InMemoryReservationRepository::new();
        let product = Uuid::now_v7();
        let mut ids = Vec::new();
        for day in 1..=5 {
            let r = stored(
                &repo,
                reservation(product, d(2025, 10, day), d(2025, 10, day), ReservationStatus::Pending),
            )
            .await;
            ids.push(r.id);
        }

        let filter = ReservationFilter {
            product_id: Some(product),
            page: PageRequest::new(2, 1),
            ..Default::default()
        };
        let page = repo.list(filter).await.unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, ids[3]);
        assert!(page.has_more());
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let repo = InMemoryReservationRepository::new();
        let r = stored(
            &repo,
            reservation(Uuid::now_v7(), d(2025, 6, 1), d(2025, 6, 3), ReservationStatus::Pending),
        )
        .await;

        assert_eq!(repo.count_by_status(ReservationStatus::Pending).await.unwrap(), 1);
        assert!(repo.delete(r.id).await.unwrap());
        assert!(!repo.delete(r.id).await.unwrap());
        assert_eq!(repo.count_by_status(ReservationStatus::Pending).await.unwrap(), 0);
    }
}
