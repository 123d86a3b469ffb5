//! Due-now decisions. Pure functions of the tick and the recurrence state.

use chrono::{NaiveTime, Timelike};

use crate::clock::Tick;
use crate::recurrence::{Recurrence, RecurringInterval, WeeklySchedule};

/// Weekly reminders fire in the minute of today's scheduled time, once per day.
pub fn weekly_due(tick: &Tick, schedule: &WeeklySchedule) -> bool {
    if schedule.fired_on(tick.date()) {
        return false;
    }
    schedule
        .time_for(tick.weekday())
        .is_some_and(|at| same_minute(at, tick.time()))
}

/// Interval reminders fire inside the active window once the interval has
/// elapsed since the last firing (or immediately if they never fired).
pub fn interval_due(tick: &Tick, interval: &RecurringInterval) -> bool {
    if let Some(window) = &interval.window {
        if !window.contains(tick.time()) {
            return false;
        }
    }
    interval
        .next_allowed_at()
        .map_or(true, |next| next <= tick.at)
}

/// Dispatch on the recurrence kind; no recurrence is never due.
pub fn is_due(tick: &Tick, recurrence: Option<&Recurrence>) -> bool {
    match recurrence {
        Some(Recurrence::Weekly(schedule)) => weekly_due(tick, schedule),
        Some(Recurrence::Interval(interval)) => interval_due(tick, interval),
        None => false,
    }
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}
