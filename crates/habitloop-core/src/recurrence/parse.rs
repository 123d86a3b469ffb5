//! Text forms for recurrence settings, as typed on the command line.

use chrono::{NaiveTime, Weekday};

use super::{weekday_label, ActiveWindow, WeeklySchedule, WEEKDAYS};
use crate::error::ValidationError;

/// Parse a compact period like `"30m"`, `"3h"`, `"1h30m"`, `"2d"`, `"1w"`
/// into seconds. A bare number is read as hours.
pub fn parse_period(text: &str) -> Result<i64, ValidationError> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Err(ValidationError::invalid("interval", "empty period"));
    }
    if let Ok(hours) = text.parse::<i64>() {
        return hours
            .checked_mul(3600)
            .ok_or_else(|| ValidationError::invalid("interval", "period too large"));
    }

    let mut total: i64 = 0;
    let mut current = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            current.push(c);
            continue;
        }
        if current.is_empty() {
            return Err(ValidationError::invalid(
                "interval",
                format!("expected a number before '{c}' in '{text}'"),
            ));
        }
        let value: i64 = current
            .parse()
            .map_err(|_| ValidationError::invalid("interval", format!("bad number in '{text}'")))?;
        current.clear();

        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 60 * 60 * 24,
            'w' => 60 * 60 * 24 * 7,
            _ => {
                return Err(ValidationError::invalid(
                    "interval",
                    format!("unknown unit '{c}' in '{text}'"),
                ))
            }
        };
        total = value
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| ValidationError::invalid("interval", "period too large"))?;
    }
    if !current.is_empty() {
        return Err(ValidationError::invalid(
            "interval",
            format!("missing unit after '{current}' in '{text}'"),
        ));
    }
    Ok(total)
}

/// Human-readable period: whole hours when possible, then minutes, then seconds.
pub fn format_period(secs: i64) -> String {
    let (value, unit) = if secs != 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs != 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    format!("{value} {unit}{}", if value == 1 { "" } else { "s" })
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(text: &str) -> Result<NaiveTime, ValidationError> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| ValidationError::invalid("time", format!("'{text}' is not HH:MM")))
}

/// Parse an active window written as `HH:MM-HH:MM`.
pub fn parse_window(text: &str) -> Result<ActiveWindow, ValidationError> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| ValidationError::invalid("window", format!("'{text}' is not HH:MM-HH:MM")))?;
    Ok(ActiveWindow::new(parse_time(start)?, parse_time(end)?))
}

/// Parse weekly slots written as `mon=14:00,fri=20:00`.
pub fn parse_weekly_slots(text: &str) -> Result<WeeklySchedule, ValidationError> {
    let mut schedule = WeeklySchedule::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (day, time) = entry.split_once('=').ok_or_else(|| {
            ValidationError::invalid("weekly", format!("'{entry}' is not day=HH:MM"))
        })?;
        let day = parse_weekday(day)?;
        if schedule.time_for(day).is_some() {
            return Err(ValidationError::invalid(
                "weekly",
                format!("{} listed twice", weekday_label(day)),
            ));
        }
        schedule.set(day, Some(parse_time(time)?));
    }
    Ok(schedule)
}

fn parse_weekday(text: &str) -> Result<Weekday, ValidationError> {
    let lower = text.trim().to_lowercase();
    WEEKDAYS
        .iter()
        .copied()
        .find(|&day| {
            let label = weekday_label(day);
            lower == label || (lower.len() > 3 && day_name(day).starts_with(&lower))
        })
        .ok_or_else(|| ValidationError::invalid("weekly", format!("unknown weekday '{text}'")))
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
