//! Cross-field validation for habit records.
//!
//! Runs once over the whole record and reports every broken rule, in a
//! fixed order, so the caller can show all problems at once.

use serde::Serialize;
use std::fmt;

use super::{non_blank, Habit, HabitDraft, HabitId};
use crate::error::ValidationError;
use crate::recurrence::{Recurrence, MAX_INTERVAL_SECS};

pub const MAX_LEAD_TIME_SECS: i64 = 120;
const MAX_OPERATION_LEN: usize = 200;
const MAX_PLACE_LEN: usize = 200;
const MAX_REWARD_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    OperationMissing,
    TooLong { field: &'static str, max: usize },
    LeadTimeOutOfRange { secs: i64 },
    RecurrenceChoice,
    EmptyWeeklySchedule,
    IntervalOutOfRange { secs: i64 },
    HalfOpenWindow,
    RewardAndRelated,
    RelatedMissing { id: HabitId },
    RelatedNotEnjoyable { id: HabitId },
    EnjoyableWithRecurrence,
    EnjoyableWithReward,
    /// Only checked on update: other habits still use this one as their reward.
    ReferencedAsReward { ids: Vec<HabitId> },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::OperationMissing => write!(f, "the action must not be empty"),
            Violation::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Violation::LeadTimeOutOfRange { secs } => write!(
                f,
                "lead time must be between 1 and {MAX_LEAD_TIME_SECS} seconds, got {secs}"
            ),
            Violation::RecurrenceChoice => {
                write!(f, "choose exactly one: a weekly schedule or an interval")
            }
            Violation::EmptyWeeklySchedule => {
                write!(f, "a weekly schedule needs a time for at least one weekday")
            }
            Violation::IntervalOutOfRange { secs } => write!(
                f,
                "the interval must be longer than zero and at most one week, got {secs} seconds"
            ),
            Violation::HalfOpenWindow => write!(
                f,
                "set both the start and the end of the active window, or neither"
            ),
            Violation::RewardAndRelated => {
                write!(f, "set either a reward or a related habit, not both")
            }
            Violation::RelatedMissing { id } => write!(f, "related habit #{id} does not exist"),
            Violation::RelatedNotEnjoyable { id } => {
                write!(f, "related habit #{id} must be an enjoyable habit")
            }
            Violation::EnjoyableWithRecurrence => {
                write!(f, "an enjoyable habit cannot have its own schedule")
            }
            Violation::EnjoyableWithReward => write!(
                f,
                "an enjoyable habit cannot have a reward or a related habit"
            ),
            Violation::ReferencedAsReward { ids } => {
                let ids: Vec<String> = ids.iter().map(|id| format!("#{id}")).collect();
                write!(
                    f,
                    "habit is the reward of {}, so it must stay enjoyable",
                    ids.join(", ")
                )
            }
        }
    }
}

/// Check `draft` against every habit rule. `related` is the habit referenced
/// by `draft.related_habit`, if the caller could load it.
pub fn validate(draft: &HabitDraft, related: Option<&Habit>) -> Vec<Violation> {
    let mut violations = Vec::new();

    if non_blank(Some(&draft.operation)).is_none() {
        violations.push(Violation::OperationMissing);
    }
    check_len(&mut violations, "operation", Some(&draft.operation), MAX_OPERATION_LEN);
    check_len(&mut violations, "place", draft.place.as_deref(), MAX_PLACE_LEN);
    check_len(&mut violations, "reward", draft.reward.as_deref(), MAX_REWARD_LEN);

    if let Some(secs) = draft.lead_time_secs {
        if !(1..=MAX_LEAD_TIME_SECS).contains(&secs) {
            violations.push(Violation::LeadTimeOutOfRange { secs });
        }
    }

    match &draft.recurrence {
        None if !draft.is_enjoyable => violations.push(Violation::RecurrenceChoice),
        None => {}
        Some(Recurrence::Weekly(schedule)) => {
            if schedule.is_empty() {
                violations.push(Violation::EmptyWeeklySchedule);
            }
        }
        Some(Recurrence::Interval(interval)) => {
            if !(1..=MAX_INTERVAL_SECS).contains(&interval.interval_secs) {
                violations.push(Violation::IntervalOutOfRange {
                    secs: interval.interval_secs,
                });
            }
        }
    }

    let reward = non_blank(draft.reward.as_deref());
    if let Some(id) = draft.related_habit {
        if reward.is_some() {
            violations.push(Violation::RewardAndRelated);
        }
        match related {
            Some(habit) if habit.id == id => {
                if !habit.is_enjoyable {
                    violations.push(Violation::RelatedNotEnjoyable { id });
                }
            }
            _ => violations.push(Violation::RelatedMissing { id }),
        }
    }

    if draft.is_enjoyable {
        if draft.recurrence.is_some() {
            violations.push(Violation::EnjoyableWithRecurrence);
        }
        if reward.is_some() || draft.related_habit.is_some() {
            violations.push(Violation::EnjoyableWithReward);
        }
    }

    violations
}

/// [`validate`], turned into an error when anything is wrong.
pub fn ensure_valid(draft: &HabitDraft, related: Option<&Habit>) -> Result<(), ValidationError> {
    let violations = validate(draft, related);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Rejected(violations))
    }
}

fn check_len(
    violations: &mut Vec<Violation>,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) {
    if value.is_some_and(|v| v.chars().count() > max) {
        violations.push(Violation::TooLong { field, max });
    }
}
