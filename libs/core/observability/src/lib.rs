//! Observability utilities for the reservation engine.
//!
//! This crate provides:
//! - A process-wide Prometheus recorder ([`init_metrics`])
//! - An optional scrape endpoint for long-running workers ([`init_metrics_exporter`])
//! - [`ReservationMetrics`], the counters and histograms recorded by the lifecycle engine
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, render_metrics, ReservationMetrics};
//!
//! init_metrics();
//! ReservationMetrics::record_transition("Pending", "Confirmed");
//! println!("{}", render_metrics());
//! ```

pub mod reservations;

pub use reservations::ReservationMetrics;

pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use tracing::{info, warn};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Failed to build Prometheus exporter: {0}")]
    Build(#[from] BuildError),

    #[error("A metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Install the Prometheus recorder without an HTTP listener.
///
/// Idempotent. If some other recorder already owns the global slot, metrics are
/// still collected into a detached handle so [`render_metrics`] keeps working.
pub fn init_metrics() -> &'static PrometheusHandle {
    METRICS_HANDLE.get_or_init(|| {
        let handle = match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder initialized");
                handle
            }
            Err(e) => {
                warn!(error = %e, "Global metrics recorder unavailable, using a detached one");
                PrometheusBuilder::new().build_recorder().handle()
            }
        };

        register_metric_descriptions();
        handle
    })
}

/// Install the recorder and serve `/metrics` on `addr`.
///
/// Must be called from inside a Tokio runtime; the exporter runs as a spawned task.
pub fn init_metrics_exporter(addr: SocketAddr) -> Result<&'static PrometheusHandle, ObservabilityError> {
    if METRICS_HANDLE.get().is_some() {
        return Err(ObservabilityError::AlreadyInstalled);
    }

    let (recorder, exporter) = PrometheusBuilder::new().with_http_listener(addr).build()?;
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|_| ObservabilityError::AlreadyInstalled)?;

    tokio::spawn(async move {
        if let Err(e) = exporter.await {
            warn!(error = ?e, "Prometheus exporter stopped");
        }
    });

    register_metric_descriptions();
    info!(%addr, "Prometheus exporter listening");

    Ok(METRICS_HANDLE.get_or_init(|| handle))
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Prometheus text exposition of everything recorded so far
pub fn render_metrics() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

fn register_metric_descriptions() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        "reservations_created_total",
        "Reservations created, by initial state"
    );
    describe_counter!(
        "reservation_transitions_total",
        "Lifecycle transitions, by previous and next state"
    );
    describe_counter!(
        "reservation_rejections_total",
        "Rejected reservation operations, by operation and error kind"
    );
    describe_histogram!(
        "reservation_availability_check_duration_seconds",
        "Time spent computing product availability"
    );
    describe_counter!(
        "reservation_availability_checks_total",
        "Availability checks, by outcome"
    );
    describe_counter!(
        "reservation_notifications_total",
        "Notification dispatches, by kind and outcome"
    );
    describe_counter!(
        "reservation_reminder_runs_total",
        "Reminder job executions"
    );
    describe_gauge!(
        "reservation_reminders_last_run",
        "Reminders sent and failed in the last reminder run"
    );
    describe_histogram!(
        "reservation_reminder_run_duration_seconds",
        "Reminder job duration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics() as *const PrometheusHandle;
        let second = init_metrics() as *const PrometheusHandle;
        assert_eq!(first, second);
        assert!(get_metrics_handle().is_some());
    }

    #[test]
    fn test_render_includes_recorded_counters() {
        init_metrics();
        ReservationMetrics::record_transition("Pending", "Confirmed");

        let output = render_metrics();
        assert!(output.contains("reservation_transitions_total"));
    }
}
