//! Clock tick handed to the reminder engine.
//!
//! Every comparison the engine makes goes through one `Tick`, so the
//! instant and its local date, time of day and weekday always agree.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc, Weekday,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tick {
    /// Absolute instant of the tick.
    pub at: DateTime<Utc>,
    /// Wall clock in the configured zone.
    pub local: NaiveDateTime,
}

impl Tick {
    pub fn new(at: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            at,
            local: at.with_timezone(&offset).naive_local(),
        }
    }

    /// Tick for a UTC-configured deployment.
    pub fn utc(at: DateTime<Utc>) -> Self {
        Self {
            at,
            local: at.naive_utc(),
        }
    }

    pub fn now(offset: FixedOffset) -> Self {
        Self::new(Utc::now(), offset)
    }

    pub fn date(&self) -> NaiveDate {
        self.local.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.local.time()
    }

    pub fn weekday(&self) -> Weekday {
        self.local.weekday()
    }
}

/// Fixed offset from whole minutes east of UTC; out-of-range values fall back to UTC.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
