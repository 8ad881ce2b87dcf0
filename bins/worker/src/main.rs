//! Leavewise worker
//!
//! Wires the leave engine together and runs the escalation, reminder and
//! year-end jobs on their schedule. A job name on the command line runs that
//! job once and exits:
//!
//! ```text
//! leavewise                  # run the scheduler until Ctrl-C
//! leavewise escalate
//! leavewise remind
//! leavewise year-end [YEAR]  # defaults to the current year
//! ```
//!
//! Employees, holidays and policy overrides come from the seed file named by
//! `storage.seed_path`. Requests, chronology and ledger rows are restored from
//! `storage.snapshot_path` at startup and written back on every checkpoint and
//! before exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Datelike;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leavewise_core::calendar::HolidayRegistry;
use leavewise_core::collaborators::EntitlementConfigStore;
use leavewise_core::entitlement::EntitlementCalculator;
use leavewise_core::events::EventOutbox;
use leavewise_db::{
    BalanceRepository, CachedEntitlementConfigStore, EventDispatcher, InMemoryAuditLog,
    InMemoryEmployeeDirectory, InMemoryEntitlementConfigStore, LeaveRepository, LeaveStore,
    SeedData, StoreArchiver, StoreSnapshot, TracingNotificationSink,
};
use leavewise_jobs::{EscalationScheduler, JobScheduler, YearEndProcessor};
use leavewise_shared::{AppConfig, Clock, StorageConfig, SystemClock};

enum Command {
    Serve,
    Escalate,
    Remind,
    YearEnd(Option<i32>),
}

fn parse_command(mut args: impl Iterator<Item = String>) -> anyhow::Result<Command> {
    let Some(name) = args.next() else {
        return Ok(Command::Serve);
    };
    match name.as_str() {
        "escalate" => Ok(Command::Escalate),
        "remind" => Ok(Command::Remind),
        "year-end" => {
            let year = args
                .next()
                .map(|y| y.parse::<i32>().with_context(|| format!("invalid year: {y}")))
                .transpose()?;
            Ok(Command::YearEnd(year))
        }
        other => bail!("unknown command: {other}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leavewise=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = parse_command(std::env::args().skip(1))?;
    let config = AppConfig::load().context("Failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let configs = CachedEntitlementConfigStore::new(
        InMemoryEntitlementConfigStore::new(),
        &config.cache,
    );
    let holidays = Arc::new(HolidayRegistry::new());
    let directory = Arc::new(InMemoryEmployeeDirectory::with_default_region(
        config.policy.default_region.clone(),
    ));
    if let Some(path) = &config.storage.seed_path {
        SeedData::load(path)
            .with_context(|| format!("Failed to load seed data from {}", path.display()))?
            .apply(&directory, &holidays, &configs);
    } else {
        let seeded = configs.seed_defaults_if_empty();
        info!(seeded, "No seed file configured; using built-in policy only");
    }

    let calculator = Arc::new(EntitlementCalculator::new(holidays, Arc::new(configs)));
    let store = Arc::new(open_store(&config.storage)?);
    let (outbox, events) = EventOutbox::channel();

    let balances = BalanceRepository::new(
        store.clone(),
        calculator.clone(),
        directory.clone(),
        outbox.clone(),
        clock.clone(),
    );
    let leave = LeaveRepository::new(
        store.clone(),
        balances.clone(),
        calculator.clone(),
        directory,
        outbox.clone(),
        clock.clone(),
    );

    let dispatcher = EventDispatcher::new(
        Arc::new(TracingNotificationSink::new(config.policy.hr_recipient.clone())),
        Arc::new(InMemoryAuditLog::new()),
    );
    let dispatching = tokio::spawn(dispatcher.run(events));

    let escalation = EscalationScheduler::new(leave, outbox, clock.clone(), &config.policy);
    let year_end = YearEndProcessor::new(
        balances,
        calculator,
        Arc::new(StoreArchiver::new(store.clone())),
        clock.clone(),
        config.policy.retention_years,
    );
    let scheduler = JobScheduler::new(escalation, year_end, config.schedule, clock.clone())?;

    match command {
        Command::Serve => {
            let (stop, stopped) = watch::channel(false);
            let checkpoints = tokio::spawn(checkpoint_loop(
                store.clone(),
                config.storage.clone(),
                stopped.clone(),
            ));
            let running = scheduler.run(stopped);
            tokio::pin!(running);
            tokio::select! {
                () = &mut running => {}
                signal = tokio::signal::ctrl_c() => {
                    signal?;
                    info!("Shutdown requested");
                    stop.send_replace(true);
                    (&mut running).await;
                }
            }
            stop.send_replace(true);
            checkpoints.await?;
        }
        Command::Escalate => {
            let report = scheduler.run_escalation_now().await?;
            info!(?report, "Escalation run complete");
        }
        Command::Remind => {
            let report = scheduler.run_reminders_now().await?;
            info!(?report, "Reminder run complete");
        }
        Command::YearEnd(year) => {
            let year = year.unwrap_or_else(|| clock.today().year());
            let report = scheduler.run_year_end_now(year).await?;
            info!(?report, "Year-end run complete");
        }
    }

    // Every outbox handle lives in the scheduler; dropping it lets the
    // dispatcher drain the queue and stop.
    drop(scheduler);
    let stats = dispatching.await?;
    if let Some(path) = config.storage.snapshot_path.clone() {
        save_snapshot(store, path).await?;
    }
    info!(
        delivered = stats.delivered,
        failed = stats.failed,
        "Worker stopped"
    );

    Ok(())
}

/// Restores the store from the configured snapshot, or starts empty.
fn open_store(storage: &StorageConfig) -> anyhow::Result<LeaveStore> {
    let Some(path) = storage.snapshot_path.as_deref() else {
        return Ok(LeaveStore::new());
    };
    let snapshot = StoreSnapshot::load(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    Ok(match snapshot {
        Some(snapshot) => {
            let store = LeaveStore::restore(snapshot);
            info!(
                path = %path.display(),
                requests = store.request_count(),
                archived = store.archived_count(),
                "Store restored"
            );
            store
        }
        None => {
            info!(path = %path.display(), "No snapshot yet; starting empty");
            LeaveStore::new()
        }
    })
}

async fn save_snapshot(store: Arc<LeaveStore>, path: PathBuf) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || store.snapshot().save(&path))
        .await?
        .context("Failed to write snapshot")
}

/// Writes a snapshot every `checkpoint_secs` until shutdown is signalled.
async fn checkpoint_loop(
    store: Arc<LeaveStore>,
    storage: StorageConfig,
    mut stopped: watch::Receiver<bool>,
) {
    let Some(path) = storage.snapshot_path else {
        return;
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(storage.checkpoint_secs.max(1)));
    // The first tick completes immediately; the store was just restored.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = save_snapshot(store.clone(), path.clone()).await {
                    tracing::warn!(path = %path.display(), error = %err, "Checkpoint failed");
                }
            }
            changed = stopped.changed() => {
                if changed.is_err() || *stopped.borrow() {
                    return;
                }
            }
        }
    }
}
