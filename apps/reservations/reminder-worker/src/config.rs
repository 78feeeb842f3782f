//! Configuration for the reminder worker

use core_config::FromEnv;
use database::postgres::PostgresConfig;
use domain_notifications::{MailerConfig, SmtpConfig};
use domain_reservations::ReservationConfig;
use eyre::{Result, WrapErr};
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: PostgresConfig,
    pub reservations: ReservationConfig,
    pub smtp: SmtpConfig,
    pub mailer: MailerConfig,
    /// Serve Prometheus metrics here when set (`METRICS_ADDR`)
    pub metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(addr) if !addr.trim().is_empty() => Some(
                addr.trim()
                    .parse()
                    .wrap_err_with(|| format!("METRICS_ADDR is not a socket address: {}", addr))?,
            ),
            _ => None,
        };

        Ok(Config {
            database: <PostgresConfig as FromEnv>::from_env()?,
            reservations: ReservationConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            mailer: MailerConfig::from_env()?,
            metrics_addr,
        })
    }
}
