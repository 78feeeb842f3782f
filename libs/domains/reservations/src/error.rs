use strum::Display;
use thiserror::Error;
use uuid::Uuid;

/// Name of the Postgres exclusion constraint that keeps Confirmed reservations of
/// one product from sharing a day.
pub const CONFIRMED_OVERLAP_CONSTRAINT: &str = "ex_reservations_confirmed_overlap";

/// Coarse failure classes callers map to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidTransition,
    Unavailable,
    TooEarly,
    PersistenceFailure,
}

/// Every message is meant to be shown to the end user as-is.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    TooEarly(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidTransition(_) => ErrorKind::InvalidTransition,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::TooEarly(_) => ErrorKind::TooEarly,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }

    pub fn reservation_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Reservation not found: {}", id))
    }

    pub fn user_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("User not found: {}", id))
    }

    pub fn product_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Product not found: {}", id))
    }

    pub fn state_not_registered(name: &str) -> Self {
        Self::NotFound(format!("State '{}' is not registered", name))
    }
}

impl From<sea_orm::DbErr> for ReservationError {
    fn from(err: sea_orm::DbErr) -> Self {
        let text = err.to_string();

        // A lost race that slipped past the advisory lock still lands here
        if text.contains(CONFIRMED_OVERLAP_CONSTRAINT) {
            return Self::Unavailable(
                "Product unavailable: another confirmed reservation already holds those dates"
                    .to_string(),
            );
        }

        Self::Persistence(text)
    }
}
