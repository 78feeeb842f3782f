//! Outbound notification gateway.
//!
//! Dispatch is best-effort: the engine logs and counts failures but never lets
//! them change the outcome of the operation that triggered them.

use async_trait::async_trait;
use std::fmt::Display;
use thiserror::Error;

use crate::models::{Reservation, ReservationStatus};

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

impl NotifyError {
    pub fn new(err: impl Display) -> Self {
        Self(err.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationNotifier: Send + Sync {
    async fn notify_confirmed(&self, reservation: &Reservation) -> Result<(), NotifyError>;

    async fn notify_state_changed(
        &self,
        reservation: &Reservation,
        previous: ReservationStatus,
    ) -> Result<(), NotifyError>;

    async fn notify_reminder(
        &self,
        reservation: &Reservation,
        days_remaining: u32,
    ) -> Result<(), NotifyError>;
}

/// Logs every notification instead of delivering it
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl ReservationNotifier for TracingNotifier {
    async fn notify_confirmed(&self, reservation: &Reservation) -> Result<(), NotifyError> {
        tracing::info!(
            reservation_id = %reservation.id,
            user_id = %reservation.user_id,
            start_date = %reservation.start_date,
            end_date = %reservation.end_date,
            "Reservation confirmed notification"
        );
        Ok(())
    }

    async fn notify_state_changed(
        &self,
        reservation: &Reservation,
        previous: ReservationStatus,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            reservation_id = %reservation.id,
            user_id = %reservation.user_id,
            previous = %previous,
            current = %reservation.status,
            "Reservation state changed notification"
        );
        Ok(())
    }

    async fn notify_reminder(
        &self,
        reservation: &Reservation,
        days_remaining: u32,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            reservation_id = %reservation.id,
            user_id = %reservation.user_id,
            days_remaining,
            "Reservation reminder notification"
        );
        Ok(())
    }
}

/// Await one notification under `timeout`, logging and counting the outcome.
///
/// Returns whether it was delivered; never fails.
pub(crate) async fn deliver<F>(
    kind: &'static str,
    reservation_id: uuid::Uuid,
    timeout: std::time::Duration,
    send: F,
) -> bool
where
    F: std::future::Future<Output = Result<(), NotifyError>>,
{
    use observability::ReservationMetrics;

    match tokio::time::timeout(timeout, send).await {
        Ok(Ok(())) => {
            ReservationMetrics::record_notification(kind, "sent");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(%reservation_id, kind, error = %e, "Notification failed");
            ReservationMetrics::record_notification(kind, "failed");
            false
        }
        Err(_) => {
            tracing::warn!(
                %reservation_id,
                kind,
                timeout_ms = timeout.as_millis() as u64,
                "Notification timed out"
            );
            ReservationMetrics::record_notification(kind, "timeout");
            false
        }
    }
}
