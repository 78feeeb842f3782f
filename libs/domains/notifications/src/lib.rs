//! Notifications Domain
//!
//! Email delivery for the reservation engine's notification gateway.
//!
//! # Features
//!
//! - Reservation confirmation emails
//! - State change emails (cancelled, completed) with the previous state
//! - Reminder emails ahead of the start date
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  ReservationService  │  ← awaits the gateway under a timeout
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │    EmailNotifier     │  ← resolves guest + product, renders templates
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │    EmailProvider     │  ← SMTP (lettre) or in-memory recording
//! └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{EmailNotifier, MailerConfig, SmtpProvider};
//!
//! let notifier = EmailNotifier::new(users, products, Arc::new(SmtpProvider::from_env()?), MailerConfig::from_env()?)?;
//! let service = service.with_notifier(Arc::new(notifier));
//! ```

pub mod error;
pub mod models;
pub mod notifier;
pub mod providers;
pub mod templates;

// Re-export commonly used types
pub use error::{NotificationError, NotificationResult};
pub use models::MailerConfig;
pub use notifier::EmailNotifier;
pub use providers::{EmailContent, EmailProvider, RecordingProvider, SmtpConfig, SmtpProvider};
pub use templates::TemplateEngine;
