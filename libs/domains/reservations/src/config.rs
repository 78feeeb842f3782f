use core_config::{ConfigError, FromEnv, env_list, env_parse};
use std::time::Duration;

/// Tunables of the lifecycle engine and reminder job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConfig {
    /// Upper bound on each best-effort notification dispatch
    pub notify_timeout: Duration,
    /// Default lower bound of the filtered history, in days before today
    pub history_lookback_days: u32,
    /// Default upper bound of the filtered history, in days after today
    pub history_lookahead_days: u32,
    /// Days-before-start offsets that get a reminder
    pub reminder_days: Vec<u32>,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_millis(5000),
            history_lookback_days: 365,
            history_lookahead_days: 365,
            reminder_days: vec![3, 1],
        }
    }
}

impl ReservationConfig {
    pub fn with_reminder_days(mut self, days: Vec<u32>) -> Self {
        self.reminder_days = days;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Widest reminder offset, i.e. how far ahead the reminder scan looks
    pub fn reminder_horizon(&self) -> u32 {
        self.reminder_days.iter().copied().max().unwrap_or(0)
    }
}

/// Environment variables:
/// - `RESERVATION_NOTIFY_TIMEOUT_MS` (default: 5000)
/// - `RESERVATION_HISTORY_LOOKBACK_DAYS` (default: 365)
/// - `RESERVATION_HISTORY_LOOKAHEAD_DAYS` (default: 365)
/// - `RESERVATION_REMINDER_DAYS` (default: `3,1`)
impl FromEnv for ReservationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let timeout_ms = env_parse(
            "RESERVATION_NOTIFY_TIMEOUT_MS",
            defaults.notify_timeout.as_millis() as u64,
        )?;

        Ok(Self {
            notify_timeout: Duration::from_millis(timeout_ms),
            history_lookback_days: env_parse(
                "RESERVATION_HISTORY_LOOKBACK_DAYS",
                defaults.history_lookback_days,
            )?,
            history_lookahead_days: env_parse(
                "RESERVATION_HISTORY_LOOKAHEAD_DAYS",
                defaults.history_lookahead_days,
            )?,
            reminder_days: env_list("RESERVATION_REMINDER_DAYS", defaults.reminder_days)?,
        })
    }
}
