//! Availability of a product for a date range.
//!
//! Only Confirmed reservations block a product. The checker is a pure range
//! query; date validation is the caller's job.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use observability::ReservationMetrics;

use crate::error::ReservationResult;
use crate::models::{Reservation, ReservationStatus};
use crate::repository::ReservationRepository;

/// Conflicting ranges listed in [`Availability::summary`] before "and K more"
const SUMMARY_RANGES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub available: bool,
    /// Confirmed reservations overlapping the requested dates, by start date
    pub conflicts: Vec<Reservation>,
}

impl Availability {
    pub fn from_conflicts(conflicts: Vec<Reservation>) -> Self {
        Self {
            available: conflicts.is_empty(),
            conflicts,
        }
    }

    /// Human-readable explanation, suitable for direct display
    pub fn summary(&self) -> String {
        if self.available {
            return "Product available on the selected dates".to_string();
        }
        conflict_summary(&self.conflicts)
    }
}

pub(crate) fn conflict_summary(conflicts: &[Reservation]) -> String {
    let booked = conflicts
        .iter()
        .take(SUMMARY_RANGES)
        .map(|r| format!("{} to {}", r.start_date, r.end_date))
        .collect::<Vec<_>>()
        .join(", ");

    let mut summary = format!(
        "Product unavailable: {} confirmed reservation(s) overlap the requested dates. Booked: {}",
        conflicts.len(),
        booked
    );

    if conflicts.len() > SUMMARY_RANGES {
        summary.push_str(&format!(" and {} more", conflicts.len() - SUMMARY_RANGES));
    }

    summary
}

pub struct AvailabilityChecker<R: ReservationRepository> {
    repository: Arc<R>,
}

impl<R: ReservationRepository> Clone for AvailabilityChecker<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ReservationRepository> AvailabilityChecker<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn is_available(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReservationResult<Availability> {
        let started = Instant::now();

        let conflicts = self
            .repository
            .find_overlapping(product_id, start, end, &[ReservationStatus::Confirmed])
            .await?;

        let availability = Availability::from_conflicts(conflicts);
        ReservationMetrics::record_availability_check(
            availability.available,
            availability.conflicts.len(),
            started.elapsed().as_millis() as u64,
        );

        Ok(availability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockReservationRepository;
    use chrono::Utc;
    use mockall::predicate::*;
    use rust_decimal::Decimal;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn confirmed(start: NaiveDate, end: NaiveDate) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            product_id: Uuid::nil(),
            status: ReservationStatus::Confirmed,
            start_date: start,
            end_date: end,
            total_price: Decimal::ONE,
            observations: None,
            confirmed_at: Some(now),
            cancelled_at: None,
            cancellation_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_queries_only_confirmed_reservations() {
        let product = Uuid::now_v7();
        let mut repo = MockReservationRepository::new();
        repo.expect_find_overlapping()
            .with(
                eq(product),
                eq(d(2025, 6, 14)),
                eq(d(2025, 6, 20)),
                function(|states: &[ReservationStatus]| states == [ReservationStatus::Confirmed]),
            )
            .times(1)
            .returning(|_, _, _, _| Ok(vec![confirmed(d(2025, 6, 10), d(2025, 6, 15))]));

        let checker = AvailabilityChecker::new(Arc::new(repo));
        let availability = checker
            .is_available(product, d(2025, 6, 14), d(2025, 6, 20))
            .await
            .unwrap();

        assert!(!availability.available);
        assert_eq!(availability.conflicts.len(), 1);
    }

    #[tokio::test]
    async fn test_available_when_no_conflicts() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_overlapping()
            .returning(|_, _, _, _| Ok(vec![]));

        let checker = AvailabilityChecker::new(Arc::new(repo));
        let availability = checker
            .is_available(Uuid::now_v7(), d(2025, 6, 16), d(2025, 6, 20))
            .await
            .unwrap();

        assert!(availability.available);
        assert_eq!(availability.summary(), "Product available on the selected dates");
    }

    #[test]
    fn test_summary_lists_three_ranges_and_remainder() {
        let conflicts: Vec<_> = (1..=5)
            .map(|day| confirmed(d(2025, 6, day * 2), d(2025, 6, day * 2 + 1)))
            .collect();

        let summary = Availability::from_conflicts(conflicts).summary();

        assert_eq!(
            summary,
            "Product unavailable: 5 confirmed reservation(s) overlap the requested dates. \
             Booked: 2025-06-02 to 2025-06-03, 2025-06-04 to 2025-06-05, 2025-06-06 to 2025-06-07 and 2 more"
        );
    }

    #[test]
    fn test_summary_without_remainder() {
        let summary =
            Availability::from_conflicts(vec![confirmed(d(2025, 6, 10), d(2025, 6, 15))]).summary();

        assert!(summary.ends_with("Booked: 2025-06-10 to 2025-06-15"));
        assert!(!summary.contains("more"));
    }
}
