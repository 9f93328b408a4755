// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tollgate - quota-and-cache control plane for costly AI calls.
//!
//! Operational CLI over the stored control-plane state. There is no daemon
//! loop here: sweeps and resets run once per invocation, driven by an
//! external scheduler.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tollgate_cache::ResultCache;
use tollgate_core::types::JobFilter;
use tollgate_core::{Clock, SystemClock, TollgateError};
use tollgate_jobs::JobOrchestrator;
use tollgate_quota::QuotaLimiter;
use tollgate_storage::{Database, SqliteCacheStore, SqliteJobStore, SqliteQuotaStore};

/// Tollgate - quota-and-cache control plane for costly AI calls.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show rate-limit counters for one identifier.
    Status {
        /// Identifier to inspect, e.g. "arxiv:classify".
        identifier: String,
    },
    /// Delete expired cache entries, one batch per invocation.
    SweepCache {
        /// Maximum entries to delete in this batch.
        #[arg(long)]
        batch: Option<u32>,
    },
    /// Delete rate-limit records idle for longer than the retention window.
    SweepIdle {
        /// Idle threshold in hours; defaults to the configured retention.
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Zero the daily counters, optionally for one identifier prefix.
    ResetDaily {
        /// Identifier prefix to match, e.g. "arxiv:"; all records if omitted.
        #[arg(long)]
        filter: Option<String>,
    },
    /// List recent jobs of one type, newest first.
    Jobs {
        /// Job type to list, e.g. "classification".
        job_type: String,
        /// Maximum number of jobs to show.
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match tollgate_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            for e in &errors {
                eprintln!("tollgate: config error: {}: {}", e.field, e.message);
            }
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone())),
        )
        .init();

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tollgate: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &tollgate_config::TollgateConfig,
) -> Result<(), TollgateError> {
    let db = Arc::new(Database::open(&config.storage.database_path).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let io_timeout = config.storage.io_timeout();

    let result = dispatch(command, config, db.clone(), clock, io_timeout).await;
    db.close().await?;
    result
}

async fn dispatch(
    command: Commands,
    config: &tollgate_config::TollgateConfig,
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    io_timeout: std::time::Duration,
) -> Result<(), TollgateError> {
    match command {
        Commands::Status { identifier } => {
            let limiter = QuotaLimiter::with_io_timeout(
                Arc::new(SqliteQuotaStore::new(db)),
                clock,
                io_timeout,
            );
            match limiter.get_status(&identifier).await? {
                Some(record) => {
                    println!("identifier:      {}", record.identifier);
                    println!(
                        "hourly:          {}/{} since {}",
                        record.hourly_count, record.requests_per_hour_cap, record.hour_window_start
                    );
                    println!(
                        "daily tokens:    {}/{} since {}",
                        record.daily_tokens, record.tokens_per_day_cap, record.day_window_start
                    );
                    println!("daily requests:  {}", record.daily_count);
                    println!("last request:    {}", record.last_request_at);
                }
                None => println!("no rate-limit record for '{identifier}'"),
            }
        }
        Commands::SweepCache { batch } => {
            let cache = ResultCache::with_io_timeout(
                Arc::new(SqliteCacheStore::new(db)),
                clock,
                io_timeout,
            );
            let batch = batch.unwrap_or(config.cache.sweep_batch_size);
            let removed = cache.expire_sweep(batch).await?;
            println!("removed {removed} expired cache entries (batch size {batch})");
        }
        Commands::SweepIdle { hours } => {
            let limiter = QuotaLimiter::with_io_timeout(
                Arc::new(SqliteQuotaStore::new(db)),
                clock,
                io_timeout,
            );
            let hours = hours.unwrap_or(config.quota.idle_retention_hours);
            let removed = limiter.sweep_idle(TimeDelta::hours(i64::from(hours))).await?;
            println!("removed {removed} rate-limit records idle for over {hours}h");
        }
        Commands::ResetDaily { filter } => {
            let limiter = QuotaLimiter::with_io_timeout(
                Arc::new(SqliteQuotaStore::new(db)),
                clock,
                io_timeout,
            );
            let touched = limiter.reset_daily(filter.as_deref()).await?;
            match filter {
                Some(prefix) => println!("reset daily counters on {touched} records matching '{prefix}'"),
                None => println!("reset daily counters on {touched} records"),
            }
        }
        Commands::Jobs { job_type, limit } => {
            let jobs = JobOrchestrator::with_options(
                Arc::new(SqliteJobStore::new(db)),
                clock,
                io_timeout,
                config.jobs.max_retries,
            );
            let filter = JobFilter {
                job_type: Some(job_type.clone()),
                ..Default::default()
            };
            let listed = jobs.history(&filter, limit).await?;
            if listed.is_empty() {
                println!("no '{job_type}' jobs recorded");
                return Ok(());
            }
            for job in listed {
                println!(
                    "{}  {:<9}  retries {}/{}  progress {:>5.1}%  created {}{}",
                    job.id,
                    job.status,
                    job.retry_count,
                    job.max_retries,
                    f64::from(job.progress) * 100.0,
                    job.created_at,
                    job.error_message
                        .map(|m| format!("  error: {m}"))
                        .unwrap_or_default(),
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parses_all_subcommands() {
        for args in [
            vec!["tollgate", "status", "arxiv:classify"],
            vec!["tollgate", "sweep-cache", "--batch", "50"],
            vec!["tollgate", "sweep-idle", "--hours", "48"],
            vec!["tollgate", "reset-daily", "--filter", "arxiv:"],
            vec!["tollgate", "jobs", "classification", "--limit", "5"],
        ] {
            Cli::try_parse_from(args).expect("subcommand parses");
        }
    }

    #[test]
    fn status_column_pads_via_display() {
        use tollgate_core::types::JobStatus;
        // The listing aligns on a 9-wide status column straight from the
        // enum's Display impl.
        assert_eq!(format!("{:<9}", JobStatus::Pending), "pending  ");
        assert_eq!(format!("{:<9}", JobStatus::Cancelled), "cancelled");
    }

    #[test]
    fn jobs_limit_defaults_to_twenty() {
        let cli = Cli::try_parse_from(["tollgate", "jobs", "classification"]).unwrap();
        let Commands::Jobs { limit, .. } = cli.command else {
            panic!("expected jobs command");
        };
        assert_eq!(limit, 20);
    }
}
