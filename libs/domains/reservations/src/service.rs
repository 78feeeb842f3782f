use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use observability::ReservationMetrics;

use crate::availability::{Availability, AvailabilityChecker, conflict_summary};
use crate::clock::{Clock, SystemClock};
use crate::config::ReservationConfig;
use crate::directory::{ProductCatalog, UserDirectory};
use crate::error::{ErrorKind, ReservationError, ReservationResult};
use crate::models::{
    Eligibility, HistoryFilter, HistoryQuery, Page, PageRequest, Reservation, ReservationFilter,
    ReservationStatus, SaveReservation,
};
use crate::notifier::{ReservationNotifier, TracingNotifier, deliver};
use crate::reminders::ReminderJob;
use crate::repository::{ReservationRepository, WriteGuard, WriteOutcome};
use crate::states::StateRegistry;

/// The reservation lifecycle engine.
///
/// Owns every write of a reservation's state: creation, confirm, cancel and
/// complete all reload the stored row, check the transition, and write with a
/// guard on the status and version they read. Notifications are best-effort and never change
/// the outcome of the operation that triggered them.
pub struct ReservationService<R: ReservationRepository> {
    repository: Arc<R>,
    availability: AvailabilityChecker<R>,
    states: Arc<dyn StateRegistry>,
    users: Arc<dyn UserDirectory>,
    products: Arc<dyn ProductCatalog>,
    notifier: Arc<dyn ReservationNotifier>,
    clock: Arc<dyn Clock>,
    config: ReservationConfig,
}

impl<R: ReservationRepository> Clone for ReservationService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            availability: self.availability.clone(),
            states: Arc::clone(&self.states),
            users: Arc::clone(&self.users),
            products: Arc::clone(&self.products),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<R: ReservationRepository> ReservationService<R> {
    /// Logs notifications instead of sending them and uses the system clock
    /// until configured otherwise.
    pub fn new(
        repository: R,
        states: Arc<dyn StateRegistry>,
        users: Arc<dyn UserDirectory>,
        products: Arc<dyn ProductCatalog>,
    ) -> Self {
        let repository = Arc::new(repository);
        Self {
            availability: AvailabilityChecker::new(Arc::clone(&repository)),
            repository,
            states,
            users,
            products,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            config: ReservationConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReservationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: ReservationConfig) -> Self {
        self.config = config;
        self
    }

    /// Reminder job sharing this engine's store, notifier, clock and config
    pub fn reminder_job(&self) -> ReminderJob<R> {
        ReminderJob::new(
            Arc::clone(&self.repository),
            Arc::clone(&self.notifier),
            self.config.clone(),
        )
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a reservation (`input.id` is `None`) or edit an existing one.
    #[instrument(skip(self, input), fields(reservation_id = ?input.id, product_id = ?input.product_id, user_id = ?input.user_id))]
    pub async fn save_reservation(&self, input: SaveReservation) -> ReservationResult<Reservation> {
        observe("save", self.save_inner(input).await)
    }

    /// Pending → Confirmed, re-checking availability against reservations
    /// confirmed since this one was created.
    #[instrument(skip(self), fields(reservation_id = %id))]
    pub async fn confirm(&self, id: Uuid) -> ReservationResult<Reservation> {
        observe("confirm", self.confirm_inner(id).await)
    }

    /// Pending or Confirmed → Cancelled
    #[instrument(skip(self, reason), fields(reservation_id = %id))]
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> ReservationResult<Reservation> {
        observe("cancel", self.cancel_inner(id, reason).await)
    }

    /// Confirmed → Completed, once the stay has ended
    #[instrument(skip(self), fields(reservation_id = %id))]
    pub async fn complete(&self, id: Uuid) -> ReservationResult<Reservation> {
        observe("complete", self.complete_inner(id).await)
    }

    async fn save_inner(&self, input: SaveReservation) -> ReservationResult<Reservation> {
        input
            .validate()
            .map_err(|e| ReservationError::Validation(e.to_string()))?;

        let (start, end) = self.validate_dates(input.start_date, input.end_date)?;

        let total_price = input
            .total_price
            .ok_or_else(|| ReservationError::Validation("Total price is required".to_string()))?;
        if total_price <= Decimal::ZERO {
            return Err(ReservationError::Validation(
                "Total price must be greater than zero".to_string(),
            ));
        }

        let user_id = input
            .user_id
            .ok_or_else(|| ReservationError::Validation("User is required".to_string()))?;
        let product_id = input
            .product_id
            .ok_or_else(|| ReservationError::Validation("Product is required".to_string()))?;

        self.ensure_user(user_id).await?;
        self.ensure_product(product_id).await?;

        let draft = Draft {
            user_id,
            product_id,
            start,
            end,
            total_price,
            observations: input.observations,
        };

        match input.id {
            None => {
                let status = self.resolve_initial_state(input.state.as_deref()).await?;
                self.create_new(draft, status).await
            }
            Some(id) => self.update_existing(id, draft, input.state.as_deref()).await,
        }
    }

    async fn create_new(
        &self,
        draft: Draft,
        status: ReservationStatus,
    ) -> ReservationResult<Reservation> {
        let availability = self
            .availability
            .is_available(draft.product_id, draft.start, draft.end)
            .await?;
        if !availability.available {
            return Err(ReservationError::Unavailable(availability.summary()));
        }

        let now = self.clock.now();
        let reservation = Reservation {
            id: Uuid::now_v7(),
            user_id: draft.user_id,
            product_id: draft.product_id,
            status,
            start_date: draft.start,
            end_date: draft.end,
            total_price: draft.total_price,
            observations: draft.observations,
            confirmed_at: (status == ReservationStatus::Confirmed).then_some(now),
            cancelled_at: (status == ReservationStatus::Cancelled).then_some(now),
            cancellation_reason: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let id = reservation.id;

        let saved = written(
            self.repository
                .write(reservation, WriteGuard::insert())
                .await?,
            id,
            conflict_summary,
        )?;

        ReservationMetrics::record_created(&saved.status.to_string());
        tracing::info!(
            reservation_id = %saved.id,
            status = %saved.status,
            days = saved.duration_days(),
            "Created reservation"
        );

        if saved.status == ReservationStatus::Confirmed {
            self.notify_confirmed(&saved).await;
        }

        Ok(saved)
    }

    async fn update_existing(
        &self,
        id: Uuid,
        draft: Draft,
        requested_state: Option<&str>,
    ) -> ReservationResult<Reservation> {
        let current = self.load(id).await?;

        if current.user_id != draft.user_id || current.product_id != draft.product_id {
            return Err(ReservationError::Validation(
                "The user and product of a reservation cannot be changed".to_string(),
            ));
        }

        if let Some(name) = requested_state {
            let requested = self.registered(name).await?;
            if requested != current.status {
                return Err(ReservationError::InvalidTransition(format!(
                    "Cannot move a reservation from {} to {} by editing it; use confirm, cancel or complete",
                    current.status, requested
                )));
            }
        }

        if current.status.is_terminal() {
            return Err(ReservationError::InvalidTransition(format!(
                "A {} reservation can no longer be edited",
                current.status
            )));
        }

        let guard = WriteGuard::transition(&current).with_overlap_check();
        let next = Reservation {
            start_date: draft.start,
            end_date: draft.end,
            total_price: draft.total_price,
            observations: draft.observations,
            updated_at: self.clock.now(),
            ..current
        };

        let saved = written(
            self.repository
                .write(next, guard)
                .await?,
            id,
            |_| {
                "Cannot update reservation: conflicts with other confirmed reservations in those dates"
                    .to_string()
            },
        )?;

        tracing::info!(reservation_id = %id, "Updated reservation");
        Ok(saved)
    }

    async fn confirm_inner(&self, id: Uuid) -> ReservationResult<Reservation> {
        let current = self.load(id).await?;

        if current.status != ReservationStatus::Pending {
            return Err(ReservationError::InvalidTransition(format!(
                "Only Pending reservations can be confirmed (reservation is {})",
                current.status
            )));
        }

        let availability = self
            .availability
            .is_available(current.product_id, current.start_date, current.end_date)
            .await?;
        if !availability.available {
            return Err(ReservationError::Unavailable(availability.summary()));
        }

        self.target_state(ReservationStatus::Confirmed).await?;

        let guard = WriteGuard::transition(&current).with_overlap_check();
        let now = self.clock.now();
        let next = Reservation {
            status: ReservationStatus::Confirmed,
            confirmed_at: Some(now),
            updated_at: now,
            ..current
        };

        // The overlap check is repeated under the write lock: another
        // confirmation may have landed since the read above.
        let saved = written(
            self.repository
                .write(next, guard)
                .await?,
            id,
            conflict_summary,
        )?;

        ReservationMetrics::record_transition("Pending", "Confirmed");
        tracing::info!(reservation_id = %id, product_id = %saved.product_id, "Confirmed reservation");

        self.notify_confirmed(&saved).await;
        Ok(saved)
    }

    async fn cancel_inner(&self, id: Uuid, reason: Option<String>) -> ReservationResult<Reservation> {
        let current = self.load(id).await?;

        match current.status {
            ReservationStatus::Cancelled => {
                return Err(ReservationError::InvalidTransition(
                    "Reservation is already cancelled".to_string(),
                ));
            }
            ReservationStatus::Completed => {
                return Err(ReservationError::InvalidTransition(
                    "A completed reservation cannot be cancelled".to_string(),
                ));
            }
            ReservationStatus::Pending | ReservationStatus::Confirmed => {}
        }

        self.target_state(ReservationStatus::Cancelled).await?;

        let previous = current.status;
        let guard = WriteGuard::transition(&current);
        let now = self.clock.now();
        let next = Reservation {
            status: ReservationStatus::Cancelled,
            cancelled_at: Some(now),
            cancellation_reason: reason,
            updated_at: now,
            ..current
        };

        let saved = written(
            self.repository
                .write(next, guard)
                .await?,
            id,
            conflict_summary,
        )?;

        ReservationMetrics::record_transition(&previous.to_string(), "Cancelled");
        tracing::info!(reservation_id = %id, previous = %previous, "Cancelled reservation");

        self.notify_state_changed(&saved, previous).await;
        Ok(saved)
    }

    async fn complete_inner(&self, id: Uuid) -> ReservationResult<Reservation> {
        let current = self.load(id).await?;

        if current.status != ReservationStatus::Confirmed {
            return Err(ReservationError::InvalidTransition(format!(
                "Only Confirmed reservations can be completed (reservation is {})",
                current.status
            )));
        }

        if current.end_date > self.clock.today() {
            return Err(ReservationError::TooEarly(format!(
                "A reservation cannot be completed before its end date ({})",
                current.end_date
            )));
        }

        self.target_state(ReservationStatus::Completed).await?;

        let guard = WriteGuard::transition(&current);
        let next = Reservation {
            status: ReservationStatus::Completed,
            updated_at: self.clock.now(),
            ..current
        };

        let saved = written(
            self.repository
                .write(next, guard)
                .await?,
            id,
            conflict_summary,
        )?;

        ReservationMetrics::record_transition("Confirmed", "Completed");
        tracing::info!(reservation_id = %id, "Completed reservation");

        self.notify_state_changed(&saved, ReservationStatus::Confirmed)
            .await;
        Ok(saved)
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Caller-facing availability check: validates the dates and the product first.
    #[instrument(skip(self), fields(product_id = %product_id, %start, %end))]
    pub async fn check_availability(
        &self,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReservationResult<Availability> {
        let result = async {
            self.validate_dates(Some(start), Some(end))?;
            self.ensure_product(product_id).await?;
            self.availability.is_available(product_id, start, end).await
        }
        .await;

        observe("check_availability", result)
    }

    /// Whether `user_id` may book `product_id` for `[start, end]`.
    ///
    /// Besides the product's own availability, the user must not hold another
    /// active reservation overlapping those dates, for any product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn can_user_reserve(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReservationResult<Eligibility> {
        if !self.users.exists(user_id).await? {
            return Ok(Eligibility::denied("The user does not exist"));
        }

        if !self.products.exists(product_id).await? {
            return Ok(Eligibility::denied("The product does not exist"));
        }

        if let Err(e) = self.validate_dates(Some(start), Some(end)) {
            return Ok(Eligibility::denied(e.to_string()));
        }

        let availability = self.availability.is_available(product_id, start, end).await?;
        if !availability.available {
            return Ok(Eligibility::denied(availability.summary()));
        }

        let today = self.clock.today();
        let active = self.repository.find_active_by_user(user_id, today).await?;
        if active.iter().any(|r| r.overlaps(start, end)) {
            return Ok(Eligibility::denied(
                "The user already has active reservations overlapping the requested dates",
            ));
        }

        Ok(Eligibility::allowed())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_reservation(&self, id: Uuid) -> ReservationResult<Reservation> {
        self.load(id).await
    }

    pub async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> ReservationResult<Page<Reservation>> {
        self.repository.list(filter).await
    }

    pub async fn list_by_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        self.repository
            .list(ReservationFilter {
                user_id: Some(user_id),
                page,
                ..Default::default()
            })
            .await
    }

    pub async fn list_by_product(
        &self,
        product_id: Uuid,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        self.repository
            .list(ReservationFilter {
                product_id: Some(product_id),
                page,
                ..Default::default()
            })
            .await
    }

    /// Fails `NotFound` for a state name the registry does not know
    pub async fn list_by_state(
        &self,
        state: &str,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        let status = self.registered(state).await?;

        self.repository
            .list(ReservationFilter {
                status: Some(status),
                page,
                ..Default::default()
            })
            .await
    }

    pub async fn list_by_user_and_state(
        &self,
        user_id: Uuid,
        state: &str,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        self.ensure_user(user_id).await?;
        let status = self.registered(state).await?;

        self.repository
            .list(ReservationFilter {
                user_id: Some(user_id),
                status: Some(status),
                page,
                ..Default::default()
            })
            .await
    }

    /// Every reservation of the user, newest first
    pub async fn user_history(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ReservationResult<Page<Reservation>> {
        self.ensure_user(user_id).await?;
        self.list_by_user(user_id, page).await
    }

    /// Reservations of the user starting or ending within the window, optionally
    /// restricted to some states. Missing bounds default to the configured
    /// lookback and lookahead around today.
    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub async fn user_history_filtered(
        &self,
        user_id: Uuid,
        filter: HistoryFilter,
    ) -> ReservationResult<Page<Reservation>> {
        self.ensure_user(user_id).await?;

        let today = self.clock.today();
        let from = match filter.from {
            Some(from) => from,
            None => today
                .checked_sub_days(Days::new(self.config.history_lookback_days as u64))
                .unwrap_or(NaiveDate::MIN),
        };
        let to = match filter.to {
            Some(to) => to,
            None => today
                .checked_add_days(Days::new(self.config.history_lookahead_days as u64))
                .unwrap_or(NaiveDate::MAX),
        };

        if from > to {
            return Err(ReservationError::Validation(
                "History start date cannot be after its end date".to_string(),
            ));
        }

        let mut states = Vec::with_capacity(filter.states.len());
        for name in &filter.states {
            states.push(self.registered(name).await?);
        }

        self.repository
            .history(HistoryQuery {
                user_id,
                from,
                to,
                states,
                page: filter.page,
            })
            .await
    }

    pub async fn count_by_state(&self, state: &str) -> ReservationResult<u64> {
        let status = self.registered(state).await?;
        self.repository.count_by_status(status).await
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Remove a reservation whatever its state. Removing rows cannot create an
    /// overlap, so no guard is needed.
    #[instrument(skip(self), fields(reservation_id = %id))]
    pub async fn delete_reservation(&self, id: Uuid) -> ReservationResult<()> {
        let deleted = self.repository.delete(id).await?;

        if !deleted {
            return Err(ReservationError::reservation_not_found(id));
        }

        tracing::info!(reservation_id = %id, "Deleted reservation (admin)");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn load(&self, id: Uuid) -> ReservationResult<Reservation> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| ReservationError::reservation_not_found(id))
    }

    fn validate_dates(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ReservationResult<(NaiveDate, NaiveDate)> {
        let (Some(start), Some(end)) = (start, end) else {
            return Err(ReservationError::Validation(
                "Start and end dates are required".to_string(),
            ));
        };

        if start > end {
            return Err(ReservationError::Validation(
                "Start date cannot be after end date".to_string(),
            ));
        }

        if start < self.clock.today() {
            return Err(ReservationError::Validation(
                "Start date cannot be before today".to_string(),
            ));
        }

        Ok((start, end))
    }

    async fn ensure_user(&self, id: Uuid) -> ReservationResult<()> {
        if self.users.exists(id).await? {
            Ok(())
        } else {
            Err(ReservationError::user_not_found(id))
        }
    }

    async fn ensure_product(&self, id: Uuid) -> ReservationResult<()> {
        if self.products.exists(id).await? {
            Ok(())
        } else {
            Err(ReservationError::product_not_found(id))
        }
    }

    /// Registry lookup by name; unknown names fail `NotFound`
    async fn registered(&self, name: &str) -> ReservationResult<ReservationStatus> {
        self.states
            .find_by_name(name)
            .await?
            .map(|state| state.status)
            .ok_or_else(|| ReservationError::state_not_registered(name))
    }

    async fn target_state(&self, status: ReservationStatus) -> ReservationResult<()> {
        self.registered(&status.to_string()).await.map(|_| ())
    }

    async fn resolve_initial_state(
        &self,
        requested: Option<&str>,
    ) -> ReservationResult<ReservationStatus> {
        let name = requested.unwrap_or("Pending");

        let state = self
            .states
            .find_by_name(name)
            .await?
            .ok_or_else(|| ReservationError::state_not_registered(name))?;

        if !state.active {
            return Err(ReservationError::Validation(format!(
                "State '{}' is not active",
                name
            )));
        }

        Ok(state.status)
    }

    async fn notify_confirmed(&self, reservation: &Reservation) {
        deliver(
            "confirmed",
            reservation.id,
            self.config.notify_timeout,
            self.notifier.notify_confirmed(reservation),
        )
        .await;
    }

    async fn notify_state_changed(&self, reservation: &Reservation, previous: ReservationStatus) {
        deliver(
            "state_changed",
            reservation.id,
            self.config.notify_timeout,
            self.notifier.notify_state_changed(reservation, previous),
        )
        .await;
    }
}

/// Validated fields shared by the create and update paths
struct Draft {
    user_id: Uuid,
    product_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    total_price: Decimal,
    observations: Option<String>,
}

/// Turn a guarded write's outcome into the operation result
fn written(
    outcome: WriteOutcome,
    id: Uuid,
    on_conflict: impl FnOnce(&[Reservation]) -> String,
) -> ReservationResult<Reservation> {
    match outcome {
        WriteOutcome::Written(reservation) => Ok(reservation),
        WriteOutcome::Conflicts(conflicts) => {
            Err(ReservationError::Unavailable(on_conflict(&conflicts)))
        }
        WriteOutcome::Stale(actual) => Err(ReservationError::InvalidTransition(format!(
            "Reservation {} was modified concurrently (now {}); reload and retry",
            id, actual
        ))),
        WriteOutcome::Missing => Err(ReservationError::reservation_not_found(id)),
    }
}

/// Count and log a rejected operation
fn observe<T>(operation: &'static str, result: ReservationResult<T>) -> ReservationResult<T> {
    if let Err(e) = &result {
        let kind = e.kind();
        ReservationMetrics::record_rejection(operation, &kind.to_string());

        match kind {
            ErrorKind::PersistenceFailure => {
                tracing::error!(operation, error = %e, "Reservation operation failed")
            }
            ErrorKind::Validation | ErrorKind::NotFound => {
                tracing::debug!(operation, %kind, error = %e, "Reservation operation rejected")
            }
            _ => tracing::warn!(operation, %kind, error = %e, "Reservation operation rejected"),
        }
    }
    result
}
