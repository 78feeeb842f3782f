//! Error types for the notifications domain.

use domain_reservations::{NotifyError, ReservationError};
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while building or sending a notification email.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The user or product behind a reservation could not be resolved.
    #[error("Recipient lookup failed: {0}")]
    RecipientLookup(String),

    /// Email provider error.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Template rendering error.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<ReservationError> for NotificationError {
    fn from(err: ReservationError) -> Self {
        NotificationError::RecipientLookup(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::ConfigError(err.to_string())
    }
}

impl From<NotificationError> for NotifyError {
    fn from(err: NotificationError) -> Self {
        NotifyError::new(err)
    }
}
