use async_trait::async_trait;
use domain_reservations::{
    NotifyError, ProductCatalog, Reservation, ReservationNotifier, ReservationStatus,
    UserDirectory, UserSummary,
};
use std::sync::Arc;
use tracing::instrument;

use crate::error::NotificationResult;
use crate::models::{MailerConfig, ReminderEmailData, ReservationEmailData, StateChangedEmailData};
use crate::providers::{EmailContent, EmailProvider};
use crate::templates::{RenderedEmail, TemplateEngine};

/// Delivers reservation notifications by email.
///
/// The guest and product are looked up by id for every message.
#[derive(Clone)]
pub struct EmailNotifier {
    users: Arc<dyn UserDirectory>,
    products: Arc<dyn ProductCatalog>,
    provider: Arc<dyn EmailProvider>,
    templates: TemplateEngine,
    mailer: MailerConfig,
}

impl EmailNotifier {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        products: Arc<dyn ProductCatalog>,
        provider: Arc<dyn EmailProvider>,
        mailer: MailerConfig,
    ) -> NotificationResult<Self> {
        Ok(Self {
            users,
            products,
            provider,
            templates: TemplateEngine::new()?,
            mailer,
        })
    }

    async fn reservation_data(
        &self,
        reservation: &Reservation,
    ) -> NotificationResult<(UserSummary, ReservationEmailData)> {
        let user = self.users.get(reservation.user_id).await?;
        let product = self.products.get(reservation.product_id).await?;
        let data = ReservationEmailData::new(reservation, &user, &product, &self.mailer);
        Ok((user, data))
    }

    async fn send(&self, to: &UserSummary, rendered: RenderedEmail) -> NotificationResult<()> {
        let email = EmailContent {
            to_email: to.email.clone(),
            to_name: to.name.clone(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
            reply_to: None,
        };

        let sent = self.provider.send(&email).await?;
        tracing::debug!(
            provider = self.provider.name(),
            message_id = ?sent.message_id,
            "Reservation email handed to provider"
        );
        Ok(())
    }

    async fn confirmed(&self, reservation: &Reservation) -> NotificationResult<()> {
        let (user, data) = self.reservation_data(reservation).await?;
        let rendered = self.templates.render_confirmation(&data)?;
        self.send(&user, rendered).await
    }

    async fn state_changed(
        &self,
        reservation: &Reservation,
        previous: ReservationStatus,
    ) -> NotificationResult<()> {
        let (user, data) = self.reservation_data(reservation).await?;
        let rendered = self.templates.render_state_changed(&StateChangedEmailData {
            reservation: data,
            previous_state: previous.to_string(),
            current_state: reservation.status.to_string(),
            cancellation_reason: reservation.cancellation_reason.clone(),
        })?;
        self.send(&user, rendered).await
    }

    async fn reminder(&self, reservation: &Reservation, days_remaining: u32) -> NotificationResult<()> {
        let (user, data) = self.reservation_data(reservation).await?;
        let starts_in = match days_remaining {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        };
        let rendered = self.templates.render_reminder(&ReminderEmailData {
            reservation: data,
            days_remaining,
            starts_in,
        })?;
        self.send(&user, rendered).await
    }
}

#[async_trait]
impl ReservationNotifier for EmailNotifier {
    #[instrument(skip_all, fields(reservation_id = %reservation.id))]
    async fn notify_confirmed(&self, reservation: &Reservation) -> Result<(), NotifyError> {
        Ok(self.confirmed(reservation).await?)
    }

    #[instrument(skip_all, fields(reservation_id = %reservation.id, %previous))]
    async fn notify_state_changed(
        &self,
        reservation: &Reservation,
        previous: ReservationStatus,
    ) -> Result<(), NotifyError> {
        Ok(self.state_changed(reservation, previous).await?)
    }

    #[instrument(skip_all, fields(reservation_id = %reservation.id, days_remaining = days_remaining))]
    async fn notify_reminder(
        &self,
        reservation: &Reservation,
        days_remaining: u32,
    ) -> Result<(), NotifyError> {
        Ok(self.reminder(reservation, days_remaining).await?)
    }
}
