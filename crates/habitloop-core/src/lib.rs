//! # Habitloop Core Library
//!
//! This library provides the core logic for habitloop, a habit tracker that
//! reminds you to perform your habits over a messaging channel. All operations
//! are available through the standalone `habitloop` CLI, which is a thin layer
//! over this crate.
//!
//! ## Architecture
//!
//! - **Recurrence**: weekly day/time schedules and fixed intervals with an
//!   optional daily active window
//! - **Reminder engine**: per-tick eligibility checks, message composition,
//!   delivery and last-fired bookkeeping
//! - **Storage**: SQLite-based habit storage and TOML-based configuration
//! - **Notify**: delivery channels (Telegram Bot API)
//!
//! ## Key Components
//!
//! - [`ReminderRunner`]: runs the weekly and interval scans for one [`Tick`]
//! - [`Database`]: habit persistence, implements [`HabitStore`]
//! - [`Config`]: application configuration management
//! - [`Notifier`]: trait for delivery channels

pub mod clock;
pub mod error;
pub mod habit;
pub mod notify;
pub mod recurrence;
pub mod reminder;
pub mod storage;

pub use clock::Tick;
pub use error::{ConfigError, CoreError, DatabaseError, NotifyError, Result, ValidationError};
pub use habit::{Habit, HabitDraft, HabitId, HabitPatch, Violation};
pub use notify::{Notifier, TelegramNotifier};
pub use recurrence::{ActiveWindow, Recurrence, RecurrenceKind, RecurringInterval, WeeklySchedule};
pub use reminder::{
    DeliveryStatus, HabitStore, ReminderCandidate, ReminderRunner, TickReport, TickSummary,
};
pub use storage::{Config, Database};
