use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use observability::ReservationMetrics;

use crate::config::ReservationConfig;
use crate::error::ReservationResult;
use crate::notifier::{ReservationNotifier, deliver};
use crate::repository::ReservationRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    /// Confirmed reservations starting within the reminder horizon
    pub scanned: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Sends "your stay starts in N days" reminders for Confirmed reservations.
///
/// A reservation gets a reminder only on the days whose distance to its start
/// date is one of [`ReservationConfig::reminder_days`].
pub struct ReminderJob<R: ReservationRepository> {
    repository: Arc<R>,
    notifier: Arc<dyn ReservationNotifier>,
    config: ReservationConfig,
}

impl<R: ReservationRepository> Clone for ReminderJob<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            notifier: Arc::clone(&self.notifier),
            config: self.config.clone(),
        }
    }
}

impl<R: ReservationRepository> ReminderJob<R> {
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<dyn ReservationNotifier>,
        config: ReservationConfig,
    ) -> Self {
        Self {
            repository,
            notifier,
            config,
        }
    }

    pub fn reminder_days(&self) -> &[u32] {
        &self.config.reminder_days
    }

    #[tracing::instrument(skip(self), fields(%today))]
    pub async fn run(&self, today: NaiveDate) -> ReservationResult<ReminderReport> {
        let started = Instant::now();
        let mut report = ReminderReport::default();

        if self.config.reminder_days.is_empty() {
            tracing::info!("No reminder offsets configured, skipping run");
            return Ok(report);
        }

        let upcoming = self
            .repository
            .find_upcoming(today, self.config.reminder_horizon())
            .await?;
        report.scanned = upcoming.len();

        for reservation in &upcoming {
            let days_remaining = (reservation.start_date - today).num_days();
            let Ok(days_remaining) = u32::try_from(days_remaining) else {
                continue;
            };

            if !self.config.reminder_days.contains(&days_remaining) {
                continue;
            }

            let delivered = deliver(
                "reminder",
                reservation.id,
                self.config.notify_timeout,
                self.notifier.notify_reminder(reservation, days_remaining),
            )
            .await;

            if delivered {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        ReservationMetrics::record_reminder_run(
            report.scanned,
            report.sent,
            report.failed,
            started.elapsed().as_millis() as u64,
        );
        tracing::info!(
            scanned = report.scanned,
            sent = report.sent,
            failed = report.failed,
            "Reminder run finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reservation, ReservationStatus};
    use crate::notifier::{MockReservationNotifier, NotifyError};
    use crate::repository::MockReservationRepository;
    use chrono::{Days, Utc};
    use mockall::predicate::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn starting_in(days: u64) -> Reservation {
        let now = Utc::now();
        let start = today().checked_add_days(Days::new(days)).unwrap();
        Reservation {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            product_id: Uuid::now_v7(),
            status: ReservationStatus::Confirmed,
            start_date: start,
            end_date: start.checked_add_days(Days::new(2)).unwrap(),
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
    async fn test_only_configured_offsets_are_reminded() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_upcoming()
            .with(eq(today()), eq(3))
            .times(1)
            .returning(|_, _| Ok(vec![starting_in(0), starting_in(1), starting_in(2), starting_in(3)]));

        let mut notifier = MockReservationNotifier::new();
        notifier
            .expect_notify_reminder()
            .withf(|_, days| *days == 1 || *days == 3)
            .times(2)
            .returning(|_, _| Ok(()));

        let job = ReminderJob::new(
            Arc::new(repo),
            Arc::new(notifier),
            ReservationConfig::default(),
        );
        let report = job.run(today()).await.unwrap();

        assert_eq!(
            report,
            ReminderReport {
                scanned: 4,
                sent: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_failures_are_counted_not_raised() {
        let mut repo = MockReservationRepository::new();
        repo.expect_find_upcoming()
            .returning(|_, _| Ok(vec![starting_in(1), starting_in(1)]));

        let mut notifier = MockReservationNotifier::new();
        let mut calls = 0;
        notifier.expect_notify_reminder().returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(NotifyError::new("mailbox full"))
            } else {
                Ok(())
            }
        });

        let job = ReminderJob::new(
            Arc::new(repo),
            Arc::new(notifier),
            ReservationConfig::default().with_reminder_days(vec![1]),
        );
        let report = job.run(today()).await.unwrap();

        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_no_offsets_skips_the_scan() {
        // No expectations: scanning would panic
        let job = ReminderJob::new(
            Arc::new(MockReservationRepository::new()),
            Arc::new(MockReservationNotifier::new()),
            ReservationConfig::default().with_reminder_days(vec![]),
        );

        assert_eq!(job.run(today()).await.unwrap(), ReminderReport::default());
    }
}
