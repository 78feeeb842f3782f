//! Reservations Domain
//!
//! Availability and lifecycle engine for product reservations: who may book which
//! product for which dates, and how a booking moves from Pending to its end.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  ReservationService  │  ← lifecycle engine, validation, notifications
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐   ┌───────────────────────────────┐
//! │ AvailabilityChecker  │   │ StateRegistry / UserDirectory │
//! └──────────┬───────────┘   │ ProductCatalog / Notifier     │
//!            │               └───────────────────────────────┘
//! ┌──────────▼───────────┐
//! │ ReservationRepository│  ← guarded writes (in-memory + Postgres)
//! └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use domain_reservations::{
//!     InMemoryProductCatalog, InMemoryReservationRepository, InMemoryStateRegistry,
//!     InMemoryUserDirectory, ReservationService,
//! };
//!
//! let service = ReservationService::new(
//!     InMemoryReservationRepository::new(),
//!     Arc::new(InMemoryStateRegistry::new()),
//!     Arc::new(InMemoryUserDirectory::new()),
//!     Arc::new(InMemoryProductCatalog::new()),
//! );
//! ```

pub mod availability;
pub mod clock;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod models;
pub mod notifier;
pub mod postgres;
pub mod reminders;
pub mod repository;
pub mod service;
pub mod states;

// Re-export commonly used types
pub use availability::{Availability, AvailabilityChecker};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ReservationConfig;
pub use directory::{
    InMemoryProductCatalog, InMemoryUserDirectory, ProductCatalog, ProductSummary,
    UserDirectory, UserSummary,
};
pub use error::{ErrorKind, ReservationError, ReservationResult};
pub use models::{
    Eligibility, HistoryFilter, HistoryQuery, Page, PageRequest, Reservation, ReservationFilter,
    ReservationState, ReservationStatus, SaveReservation,
};
pub use notifier::{NotifyError, ReservationNotifier, TracingNotifier};
pub use postgres::{PgProductCatalog, PgReservationRepository, PgStateRegistry, PgUserDirectory};
pub use reminders::{ReminderJob, ReminderReport};
pub use repository::{
    InMemoryReservationRepository, ReadStamp, ReservationRepository, WriteGuard, WriteOutcome,
};
pub use service::ReservationService;
pub use states::{InMemoryStateRegistry, StateRegistry};
