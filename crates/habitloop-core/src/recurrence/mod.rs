//! Recurrence model for habit reminders.
//!
//! A habit recurs either on a weekly day/time schedule or every fixed
//! interval, optionally restricted to a daily active window. Both variants
//! carry their own last-fired bookkeeping, which the reminder tracker
//! updates after a successful send.

mod parse;
mod window;

pub use parse::{format_period, parse_period, parse_time, parse_weekly_slots, parse_window};
pub use window::ActiveWindow;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weekdays in schedule order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Longest interval a habit may be configured with.
pub const MAX_INTERVAL_SECS: i64 = 7 * 24 * 60 * 60;

/// Short lowercase label used in listings and the weekly slot syntax.
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Weekly day/time schedule. At most one reminder per calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    /// Time of day per weekday, Monday first.
    slots: [Option<NaiveTime>; 7],
    /// Local date of the last reminder sent for this schedule.
    #[serde(default)]
    pub last_fired_date: Option<NaiveDate>,
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style slot assignment.
    pub fn with(mut self, day: Weekday, time: NaiveTime) -> Self {
        self.set(day, Some(time));
        self
    }

    pub fn set(&mut self, day: Weekday, time: Option<NaiveTime>) {
        self.slots[day.num_days_from_monday() as usize] = time;
    }

    /// Scheduled time of day for `day`, if any.
    pub fn time_for(&self, day: Weekday) -> Option<NaiveTime> {
        self.slots[day.num_days_from_monday() as usize]
    }

    /// Set slots in weekday order.
    pub fn slots(&self) -> impl Iterator<Item = (Weekday, NaiveTime)> + '_ {
        WEEKDAYS
            .iter()
            .filter_map(|&day| self.time_for(day).map(|t| (day, t)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn fired_on(&self, date: NaiveDate) -> bool {
        self.last_fired_date == Some(date)
    }
}

impl fmt::Display for WeeklySchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .slots()
            .map(|(day, time)| format!("{}: {}", weekday_label(day), time.format("%H:%M:%S")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Fixed-period recurrence with an optional daily active window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringInterval {
    /// Period between reminders, in seconds.
    pub interval_secs: i64,
    #[serde(default)]
    pub window: Option<ActiveWindow>,
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl RecurringInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_secs: interval.num_seconds(),
            window: None,
            last_fired_at: None,
        }
    }

    pub fn with_window(mut self, window: ActiveWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_secs)
    }

    /// Earliest instant the next reminder may go out, if one was ever sent.
    pub fn next_allowed_at(&self) -> Option<DateTime<Utc>> {
        self.last_fired_at.map(|at| at + self.interval())
    }
}

impl fmt::Display for RecurringInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "every {}", format_period(self.interval_secs))
    }
}

/// The recurrence attached to a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Recurrence {
    Weekly(WeeklySchedule),
    Interval(RecurringInterval),
}

impl Recurrence {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Recurrence::Weekly(_) => RecurrenceKind::Weekly,
            Recurrence::Interval(_) => RecurrenceKind::Interval,
        }
    }

    /// Copy last-fired bookkeeping from `previous` when the kind is unchanged.
    pub fn inherit_state(&mut self, previous: &Recurrence) {
        match (self, previous) {
            (Recurrence::Weekly(new), Recurrence::Weekly(old)) => {
                new.last_fired_date = old.last_fired_date;
            }
            (Recurrence::Interval(new), Recurrence::Interval(old)) => {
                new.last_fired_at = old.last_fired_at;
            }
            _ => {}
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Weekly(s) => s.fmt(f),
            Recurrence::Interval(i) => i.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Weekly,
    Interval,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceKind::Weekly => write!(f, "weekly"),
            RecurrenceKind::Interval => write!(f, "interval"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekly_display_lists_days_in_order() {
        let s = WeeklySchedule::new()
            .with(Weekday::Fri, t(17, 0))
            .with(Weekday::Mon, t(14, 0));
        assert_eq!(s.to_string(), "mon: 14:00:00, fri: 17:00:00");
    }

    #[test]
    fn weekly_slot_lookup() {
        let s = WeeklySchedule::new().with(Weekday::Wed, t(9, 30));
        assert_eq!(s.time_for(Weekday::Wed), Some(t(9, 30)));
        assert_eq!(s.time_for(Weekday::Thu), None);
        assert!(!s.is_empty());
        assert!(WeeklySchedule::new().is_empty());
    }

    #[test]
    fn interval_display_uses_hours_when_whole() {
        let i = RecurringInterval::new(Duration::hours(3));
        assert_eq!(i.to_string(), "every 3 hours");
        let i = RecurringInterval::new(Duration::minutes(90));
        assert_eq!(i.to_string(), "every 90 minutes");
    }

    #[test]
    fn next_allowed_at_adds_interval() {
        let fired = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut i = RecurringInterval::new(Duration::hours(2));
        assert_eq!(i.next_allowed_at(), None);
        i.last_fired_at = Some(fired);
        assert_eq!(i.next_allowed_at(), Some(fired + Duration::hours(2)));
    }

    #[test]
    fn inherit_state_only_within_same_kind() {
        let fired = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let old = Recurrence::Weekly(WeeklySchedule {
            last_fired_date: Some(fired),
            ..WeeklySchedule::new().with(Weekday::Mon, t(8, 0))
        });

        let mut same = Recurrence::Weekly(WeeklySchedule::new().with(Weekday::Tue, t(8, 0)));
        same.inherit_state(&old);
        match same {
            Recurrence::Weekly(s) => assert_eq!(s.last_fired_date, Some(fired)),
            Recurrence::Interval(_) => unreachable!(),
        }

        let mut other = Recurrence::Interval(RecurringInterval::new(Duration::hours(1)));
        other.inherit_state(&old);
        match other {
            Recurrence::Interval(i) => assert_eq!(i.last_fired_at, None),
            Recurrence::Weekly(_) => unreachable!(),
        }
    }
}
