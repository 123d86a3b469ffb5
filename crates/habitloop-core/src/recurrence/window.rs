use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::habit::Violation;

/// Daily time-of-day range during which interval reminders may fire.
///
/// `start < end` is an ordinary daytime range `[start, end)`. `start > end`
/// crosses midnight: active from `start` through `end` inclusive, inactive
/// only on the open gap between them. `start == end` places no restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build a window from separately supplied bounds; both or neither.
    pub fn from_bounds(
        start: Option<NaiveTime>,
        end: Option<NaiveTime>,
    ) -> Result<Option<Self>, ValidationError> {
        match (start, end) {
            (Some(start), Some(end)) => Ok(Some(Self::new(start, end))),
            (None, None) => Ok(None),
            _ => Err(ValidationError::Rejected(vec![Violation::HalfOpenWindow])),
        }
    }

    pub fn contains(&self, current: NaiveTime) -> bool {
        if self.start == self.end {
            true
        } else if self.wraps_midnight() {
            current >= self.start || current <= self.end
        } else {
            self.start <= current && current < self.end
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}
