//! Template data and mailer settings.

use core_config::{ConfigError, FromEnv, env_or_default};
use domain_reservations::{ProductSummary, Reservation, UserSummary};
use serde::Serialize;

/// Branding and links shared by every reservation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailerConfig {
    pub company_name: String,
    /// Base URL of the web app; reservation links are `{frontend_url}/reservations/{id}`
    pub frontend_url: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            company_name: "Rentals".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Environment variables:
/// - `COMPANY_NAME` (default: Rentals)
/// - `FRONTEND_URL` (default: http://localhost:3000)
impl FromEnv for MailerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            company_name: env_or_default("COMPANY_NAME", &defaults.company_name),
            frontend_url: env_or_default("FRONTEND_URL", &defaults.frontend_url)
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

/// Fields every reservation template renders.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationEmailData {
    pub user_name: String,
    pub product_name: String,
    pub reservation_id: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub total_price: String,
    pub status: String,
    pub observations: Option<String>,
    pub reservation_url: String,
    pub company_name: String,
}

impl ReservationEmailData {
    pub fn new(
        reservation: &Reservation,
        user: &UserSummary,
        product: &ProductSummary,
        mailer: &MailerConfig,
    ) -> Self {
        Self {
            user_name: user.name.clone(),
            product_name: product.name.clone(),
            reservation_id: reservation.id.to_string(),
            start_date: reservation.start_date.format("%B %-d, %Y").to_string(),
            end_date: reservation.end_date.format("%B %-d, %Y").to_string(),
            days: reservation.duration_days(),
            total_price: format!("{:.2}", reservation.total_price),
            status: reservation.status.to_string(),
            observations: reservation.observations.clone(),
            reservation_url: format!("{}/reservations/{}", mailer.frontend_url, reservation.id),
            company_name: mailer.company_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateChangedEmailData {
    #[serde(flatten)]
    pub reservation: ReservationEmailData,
    pub previous_state: String,
    pub current_state: String,
    pub cancellation_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderEmailData {
    #[serde(flatten)]
    pub reservation: ReservationEmailData,
    pub days_remaining: u32,
    /// "tomorrow" or "in N days"
    pub starts_in: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use domain_reservations::ReservationStatus;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_mailer_config_from_env_trims_slash() {
        temp_env::with_vars(
            [
                ("COMPANY_NAME", Some("Lakeside Rentals")),
                ("FRONTEND_URL", Some("https://rent.example.com/")),
            ],
            || {
                let config = MailerConfig::from_env().unwrap();
                assert_eq!(config.company_name, "Lakeside Rentals");
                assert_eq!(config.frontend_url, "https://rent.example.com");
            },
        );
    }

    #[test]
    fn test_reservation_data_formats_dates_and_price() {
        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            product_id: Uuid::nil(),
            status: ReservationStatus::Confirmed,
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            total_price: dec!(100),
            observations: None,
            confirmed_at: Some(now),
            cancelled_at: None,
            cancellation_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let user = UserSummary {
            id: Uuid::nil(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        };
        let product = ProductSummary {
            id: Uuid::nil(),
            name: "Lakeside cabin".to_string(),
            price: dec!(25),
        };

        let data = ReservationEmailData::new(&reservation, &user, &product, &MailerConfig::default());

        assert_eq!(data.start_date, "July 1, 2025");
        assert_eq!(data.days, 5);
        assert_eq!(data.total_price, "100.00");
        assert_eq!(
            data.reservation_url,
            "http://localhost:3000/reservations/00000000-0000-0000-0000-000000000000"
        );
    }
}
