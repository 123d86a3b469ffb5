//! Reminder commands: one tick, the tick loop, and message preview.

use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use habitloop_core::notify::telegram::resolve_token;
use habitloop_core::reminder::{compose, ReminderTime};
use habitloop_core::{
    Config, CoreError, Database, HabitId, Notifier, NotifyError, ReminderRunner, TelegramNotifier,
    Tick, TickReport,
};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Run one reminder tick now
    Tick {
        /// Compose reminders without sending or recording them
        #[arg(long)]
        dry_run: bool,
        /// Evaluate at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// Run ticks forever at the configured interval
    Run {
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the reminder text for a habit
    Preview {
        id: HabitId,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

/// Notifier used for dry runs when no bot token is configured.
struct Disabled;

impl Notifier for Disabled {
    fn channel(&self) -> &str {
        "disabled"
    }

    fn send(&self, _recipient: &str, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured {
            channel: "telegram".into(),
            message: "dry run".into(),
        })
    }
}

/// Printable result of one tick; a failed scan shows its error instead.
#[derive(Serialize)]
struct TickOutput {
    tick: Tick,
    weekly: ScanOutput,
    interval: ScanOutput,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ScanOutput {
    Report(TickReport),
    Error { error: String },
}

impl TickOutput {
    fn failed(&self) -> bool {
        matches!(self.weekly, ScanOutput::Error { .. }) || matches!(self.interval, ScanOutput::Error { .. })
    }
}

fn scan(result: habitloop_core::Result<TickReport>) -> ScanOutput {
    match result {
        Ok(report) => ScanOutput::Report(report),
        Err(e) => ScanOutput::Error {
            error: e.to_string(),
        },
    }
}

fn notifier(config: &Config, dry_run: bool) -> Result<Box<dyn Notifier>, NotifyError> {
    match TelegramNotifier::from_config(&config.telegram) {
        Ok(n) => Ok(Box::new(n)),
        Err(e) if dry_run => {
            warn!(error = %e, "no usable notifier, dry run continues without one");
            Ok(Box::new(Disabled))
        }
        Err(e) => Err(e),
    }
}

/// One tick: open the store, build the notifier, run both scans.
fn run_once(config: &Config, at: Option<DateTime<Utc>>, dry_run: bool) -> Result<TickOutput, CoreError> {
    let offset = config.scheduler.offset();
    let tick = at.map_or_else(|| Tick::now(offset), |at| Tick::new(at, offset));

    let db = Database::open()?;
    let notifier = notifier(config, dry_run)?;
    let runner = if dry_run {
        ReminderRunner::dry_run(&db, &*notifier)
    } else {
        ReminderRunner::new(&db, &*notifier)
    };
    let summary = runner.run_tick(&tick);
    Ok(TickOutput {
        tick,
        weekly: scan(summary.weekly),
        interval: scan(summary.interval),
    })
}

pub fn run(action: RemindAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        RemindAction::Tick { dry_run, at } => {
            let config = Config::load()?;
            let output = run_once(&config, at, dry_run)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            if output.failed() {
                return Err("reminder scan failed".into());
            }
        }
        RemindAction::Run { dry_run } => {
            let config = Config::load()?;
            if !dry_run && resolve_token()?.is_none() {
                return Err(NotifyError::NotConfigured {
                    channel: "telegram".into(),
                    message: "no bot token; run `habitloop auth telegram login`".into(),
                }
                .into());
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_loop(config, dry_run));
        }
        RemindAction::Preview { id, at } => {
            let config = Config::load()?;
            let db = Database::open()?;
            let offset = config.scheduler.offset();
            let tick = at.map_or_else(|| Tick::now(offset), |at| Tick::new(at, offset));

            let habit = db.get_habit(id)?;
            let related = match habit.related_habit {
                Some(rel) => db.find_habit(rel)?.map(|h| h.description()),
                None => None,
            };
            let when = ReminderTime::for_tick(&habit, &tick).unwrap_or(ReminderTime::Now(tick.time()));
            println!("{}", compose(&habit, related.as_deref(), when));
        }
    }
    Ok(())
}

/// Tick loop. Each tick runs on a blocking worker and is awaited before the
/// next one is scheduled, so ticks never overlap.
async fn run_loop(config: Config, dry_run: bool) {
    let period = Duration::from_secs(config.scheduler.tick_interval_secs);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(every_secs = period.as_secs(), dry_run, "reminder loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let config = config.clone();
                let handle = tokio::task::spawn_blocking(move || run_once(&config, None, dry_run));
                match handle.await {
                    Ok(Ok(output)) => log_tick(&output),
                    Ok(Err(e)) => warn!(error = %e, "tick failed"),
                    Err(e) => error!(error = %e, "tick worker panicked"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("reminder loop stopped");
                break;
            }
        }
    }
}

fn log_tick(output: &TickOutput) {
    for result in [&output.weekly, &output.interval] {
        match result {
            ScanOutput::Report(report) if report.sent_count() > 0 || report.failure_count() > 0 => {
                info!(
                    kind = %report.kind,
                    sent = report.sent_count(),
                    failed = report.failure_count(),
                    not_due = report.not_due_count(),
                    "tick complete"
                );
            }
            ScanOutput::Report(_) => {}
            ScanOutput::Error { error } => warn!(%error, "scan failed"),
        }
    }
}
