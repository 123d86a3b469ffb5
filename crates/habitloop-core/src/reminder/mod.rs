//! Reminder engine.
//!
//! Once per tick the [`ReminderRunner`] asks the store for candidate habits,
//! decides with the eligibility functions whether each one is due, composes
//! the message, hands it to the notifier and records the firing.

pub mod compose;
pub mod eligibility;
mod report;
mod runner;
pub mod tracker;

pub use compose::{compose, ReminderTime};
pub use eligibility::{interval_due, is_due, weekly_due};
pub use report::{DeliveryStatus, ReminderOutcome, TickReport};
pub use runner::{ReminderRunner, TickSummary};

use chrono::{DateTime, NaiveDate, Utc, Weekday};

use crate::error::Result;
use crate::habit::{Habit, HabitId};

/// A habit selected by the store for one scan, with what the engine needs
/// to message it.
#[derive(Debug, Clone)]
pub struct ReminderCandidate {
    pub habit: Habit,
    pub recipient: String,
    /// Description of the related enjoyable habit, used as the reward line.
    pub related_description: Option<String>,
}

impl ReminderCandidate {
    /// Build from a habit; `None` when the habit has no usable recipient.
    pub fn new(habit: Habit, related_description: Option<String>) -> Option<Self> {
        let recipient = habit
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())?
            .to_string();
        Some(Self {
            habit,
            recipient,
            related_description,
        })
    }
}

/// Queries and updates the reminder engine needs from persistence.
pub trait HabitStore {
    /// Habits with a recipient and a weekly time set for `weekday`, excluding
    /// those already marked fired on `today`.
    fn weekly_candidates(&self, weekday: Weekday, today: NaiveDate)
        -> Result<Vec<ReminderCandidate>>;

    /// Habits with a recipient and an interval recurrence.
    fn interval_candidates(&self) -> Result<Vec<ReminderCandidate>>;

    fn record_weekly_fired(&self, habit_id: HabitId, date: NaiveDate) -> Result<()>;

    fn record_interval_fired(&self, habit_id: HabitId, at: DateTime<Utc>) -> Result<()>;
}
