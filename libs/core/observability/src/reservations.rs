//! Metrics recorded by the reservation lifecycle engine and reminder worker.

use metrics::{counter, gauge, histogram};

/// Reservation metrics recorder
pub struct ReservationMetrics;

impl ReservationMetrics {
    pub fn record_created(state: &str) {
        counter!("reservations_created_total", "state" => state.to_string()).increment(1);
    }

    pub fn record_transition(from: &str, to: &str) {
        counter!(
            "reservation_transitions_total",
            "from" => from.to_string(),
            "to" => to.to_string()
        )
        .increment(1);
    }

    /// `kind` is the error taxonomy label (`validation`, `unavailable`, ...)
    pub fn record_rejection(operation: &'static str, kind: &str) {
        counter!(
            "reservation_rejections_total",
            "operation" => operation,
            "kind" => kind.to_string()
        )
        .increment(1);
    }

    pub fn record_availability_check(available: bool, conflicts: usize, duration_ms: u64) {
        let outcome = if available { "available" } else { "conflict" };
        counter!("reservation_availability_checks_total", "outcome" => outcome).increment(1);
        histogram!("reservation_availability_check_duration_seconds")
            .record(duration_ms as f64 / 1000.0);

        tracing::debug!(available, conflicts, duration_ms, "Checked availability");
    }

    /// `outcome` is one of `sent`, `failed`, `timeout`
    pub fn record_notification(kind: &'static str, outcome: &'static str) {
        counter!(
            "reservation_notifications_total",
            "kind" => kind,
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn record_reminder_run(scanned: usize, sent: usize, failed: usize, duration_ms: u64) {
        counter!("reservation_reminder_runs_total").increment(1);
        gauge!("reservation_reminders_last_run", "outcome" => "sent").set(sent as f64);
        gauge!("reservation_reminders_last_run", "outcome" => "failed").set(failed as f64);
        histogram!("reservation_reminder_run_duration_seconds").record(duration_ms as f64 / 1000.0);

        tracing::info!(scanned, sent, failed, duration_ms, "Reminder run recorded");
    }
}
