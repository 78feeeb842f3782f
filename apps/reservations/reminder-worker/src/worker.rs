//! Reminder scan wiring and scheduling

use chrono::NaiveDate;
use database::postgres::check_health_detailed;
use domain_notifications::{EmailNotifier, SmtpProvider};
use domain_reservations::{
    PgProductCatalog, PgReservationRepository, PgStateRegistry, PgUserDirectory, ReminderReport,
    ReservationService,
};
use eyre::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::Config;

pub struct ReminderWorker {
    db: DatabaseConnection,
    service: ReservationService<PgReservationRepository>,
}

#[derive(Debug, Serialize)]
pub struct WorkerStatus {
    pub database_healthy: bool,
    pub database_message: Option<String>,
    pub database_response_time_ms: u64,
    pub smtp_host: String,
    pub reminder_days: Vec<u32>,
    pub today: NaiveDate,
}

impl ReminderWorker {
    pub fn new(db: DatabaseConnection, config: &Config, days: Option<Vec<u32>>) -> Result<Self> {
        let users = Arc::new(PgUserDirectory::new(db.clone()));
        let products = Arc::new(PgProductCatalog::new(db.clone()));

        let provider = SmtpProvider::new(config.smtp.clone())?;
        let notifier = EmailNotifier::new(
            users.clone(),
            products.clone(),
            Arc::new(provider),
            config.mailer.clone(),
        )?;

        let mut reservations = config.reservations.clone();
        if let Some(days) = days {
            reservations = reservations.with_reminder_days(days);
        }

        let service = ReservationService::new(
            PgReservationRepository::new(db.clone()),
            Arc::new(PgStateRegistry::new(db.clone())),
            users,
            products,
        )
        .with_notifier(Arc::new(notifier))
        .with_config(reservations);

        Ok(Self { db, service })
    }

    /// One reminder pass for today's date
    pub async fn run_once(&self) -> Result<ReminderReport> {
        let report = self.service.reminder_job().run(self.service.today()).await?;
        Ok(report)
    }

    pub async fn run_scheduled(&self, cron_expr: &str) -> Result<()> {
        info!(cron = cron_expr, "Starting scheduled reminders");

        let sched = JobScheduler::new().await?;
        let service = self.service.clone();

        let job = Job::new_async(cron_expr, move |_uuid, _l| {
            let service = service.clone();

            Box::pin(async move {
                info!("Running scheduled reminder pass");

                match service.reminder_job().run(service.today()).await {
                    Ok(report) => {
                        info!(
                            scanned = report.scanned,
                            sent = report.sent,
                            failed = report.failed,
                            "Scheduled reminder pass complete"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "Scheduled reminder pass failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Scheduler started, waiting for jobs...");
        tokio::signal::ctrl_c().await?;
        info!("Shutting down reminder scheduler");

        Ok(())
    }

    pub async fn status(&self, config: &Config) -> WorkerStatus {
        let health = check_health_detailed(&self.db).await;

        WorkerStatus {
            database_healthy: health.healthy,
            database_message: health.message,
            database_response_time_ms: health.response_time_ms,
            smtp_host: config.smtp.host.clone(),
            reminder_days: self.service.reminder_job().reminder_days().to_vec(),
            today: self.service.today(),
        }
    }
}
