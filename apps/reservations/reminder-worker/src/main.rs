//! Reminder Worker
//!
//! Emails guests ahead of their confirmed stays. Runs one pass and exits, or
//! stays up and runs on a cron schedule.

use clap::{Parser, Subcommand};
use core_config::Environment;
use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::Result;
use tracing::info;

mod config;
mod worker;

use config::Config;
use worker::ReminderWorker;

#[derive(Parser, Debug)]
#[command(name = "reminder-worker")]
#[command(about = "Send reminders for upcoming confirmed reservations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run a single reminder pass
    Run {
        /// Days-before-start offsets to remind at. Defaults to RESERVATION_REMINDER_DAYS.
        #[arg(short, long, value_delimiter = ',')]
        days: Option<Vec<u32>>,

        /// Print the Prometheus metrics recorded during the pass
        #[arg(long)]
        print_metrics: bool,
    },

    /// Run as a scheduled service
    Schedule {
        /// Cron expression for scheduling (default: daily at 09:00 UTC)
        #[arg(short, long, default_value = "0 0 9 * * *")]
        cron: String,
    },

    /// Apply pending database migrations
    Migrate,

    /// Show worker status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    let environment = Environment::from_env();
    init_tracing(&environment);

    match config.metrics_addr {
        Some(addr) => {
            observability::init_metrics_exporter(addr)?;
        }
        None => {
            observability::init_metrics();
        }
    }

    let cli = Cli::parse();

    info!("Connecting to database...");
    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("Database connection failed: {}", e))?;

    match cli.command {
        Commands::Migrate => {
            database::postgres::run_migrations::<migration::Migrator>(&db, "reminder-worker")
                .await?;
        }

        Commands::Run {
            days,
            print_metrics,
        } => {
            let worker = ReminderWorker::new(db, &config, days)?;
            let report = worker.run_once().await?;

            info!(
                "Reminder pass complete: {} scanned, {} sent, {} failed",
                report.scanned, report.sent, report.failed
            );
            println!("{}", serde_json::to_string_pretty(&report)?);

            if print_metrics {
                print!("{}", observability::render_metrics());
            }
        }

        Commands::Schedule { cron } => {
            info!("Starting scheduled reminders with cron: {}", cron);
            let worker = ReminderWorker::new(db, &config, None)?;
            worker.run_scheduled(&cron).await?;
        }

        Commands::Status => {
            let worker = ReminderWorker::new(db, &config, None)?;
            let status = worker.status(&config).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_accepts_day_list() {
        let cli = Cli::try_parse_from(["reminder-worker", "run", "--days", "7,3,1"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                days: Some(vec![7, 3, 1]),
                print_metrics: false,
            }
        );
    }

    #[test]
    fn test_run_can_print_metrics() {
        let cli = Cli::try_parse_from(["reminder-worker", "run", "--print-metrics"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                days: None,
                print_metrics: true,
            }
        );
    }

    #[test]
    fn test_schedule_default_cron() {
        let cli = Cli::try_parse_from(["reminder-worker", "schedule"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Schedule {
                cron: "0 0 9 * * *".to_string()
            }
        );
    }

    #[test]
    fn test_negative_day_is_rejected() {
        assert!(Cli::try_parse_from(["reminder-worker", "run", "-d", "-1"]).is_err());
    }
}
