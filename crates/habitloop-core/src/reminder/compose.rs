//! Reminder message text.

use chrono::NaiveTime;

use crate::clock::Tick;
use crate::habit::{non_blank, Habit};
use crate::recurrence::Recurrence;

const HEADER: &str = "Reminder! You are building a habit, here is the plan";
const CLOSING: &str = "Good luck!";

/// The "when" line of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderTime {
    /// Weekly habits: today's scheduled time.
    Today(NaiveTime),
    /// Interval habits: the time the reminder goes out.
    Now(NaiveTime),
}

impl ReminderTime {
    /// Pick the "when" line for `habit` at `tick`. `None` for a weekly habit
    /// with nothing scheduled today, or a habit without recurrence.
    pub fn for_tick(habit: &Habit, tick: &Tick) -> Option<Self> {
        match &habit.recurrence {
            Some(Recurrence::Weekly(schedule)) => schedule.time_for(tick.weekday()).map(Self::Today),
            Some(Recurrence::Interval(_)) => Some(Self::Now(tick.time())),
            None => None,
        }
    }

    fn line(self) -> String {
        match self {
            ReminderTime::Today(t) => format!("When: today at {}", t.format("%H:%M")),
            ReminderTime::Now(t) => format!("When: now, at {}", t.format("%H:%M")),
        }
    }
}

/// Render the reminder body. The reward line shows the habit's own reward,
/// else the related habit's description, else nothing.
pub fn compose(habit: &Habit, related_description: Option<&str>, when: ReminderTime) -> String {
    let mut action = habit.operation.trim().to_string();
    if let Some(place) = non_blank(habit.place.as_deref()) {
        action.push(' ');
        action.push_str(place);
    }

    let mut lines = vec![HEADER.to_string(), String::new(), when.line()];
    lines.push(format!("What to do: {action}"));
    if let Some(lead) = habit.lead_time_text() {
        lines.push(format!("Complete it {lead}"));
    }
    let reward = non_blank(habit.reward.as_deref()).or(non_blank(related_description));
    if let Some(reward) = reward {
        lines.push(format!("Your reward: {reward}"));
    }
    lines.push(CLOSING.to_string());
    lines.join("\n")
}
