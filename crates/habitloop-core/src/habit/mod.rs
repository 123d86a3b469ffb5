//! Habit records.
//!
//! A habit is an action ("practice kata") with optional place, duration,
//! reward and recurrence. Enjoyable habits have no recurrence of their own;
//! they exist to be referenced as the reward of another habit.

mod validation;

pub use validation::{ensure_valid, validate, Violation, MAX_LEAD_TIME_SECS};

use serde::{Deserialize, Serialize};

use crate::recurrence::Recurrence;

pub type HabitId = i64;

/// Habit fields as entered, before the store assigns an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub operation: String,
    #[serde(default)]
    pub place: Option<String>,
    /// Expected duration of the action, in seconds.
    #[serde(default)]
    pub lead_time_secs: Option<i64>,
    #[serde(default)]
    pub reward: Option<String>,
    #[serde(default)]
    pub related_habit: Option<HabitId>,
    #[serde(default)]
    pub is_enjoyable: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    /// Chat identifier on the messaging channel.
    #[serde(default)]
    pub recipient: Option<String>,
}

impl HabitDraft {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    /// Trim the action and recipient as stored; a blank recipient is unset.
    pub fn normalize(&mut self) {
        self.operation = self.operation.trim().to_string();
        self.recipient = non_blank(self.recipient.as_deref()).map(str::to_string);
    }

    /// Apply a partial update. Fields left as `None` in the patch are kept.
    pub fn apply(&mut self, patch: HabitPatch) {
        if let Some(operation) = patch.operation {
            self.operation = operation;
        }
        if let Some(place) = patch.place {
            self.place = place;
        }
        if let Some(lead_time) = patch.lead_time_secs {
            self.lead_time_secs = lead_time;
        }
        if let Some(reward) = patch.reward {
            self.reward = reward;
        }
        if let Some(related) = patch.related_habit {
            self.related_habit = related;
        }
        if let Some(enjoyable) = patch.is_enjoyable {
            self.is_enjoyable = enjoyable;
        }
        if let Some(public) = patch.is_public {
            self.is_public = public;
        }
        if let Some(recurrence) = patch.recurrence {
            self.recurrence = match (recurrence, &self.recurrence) {
                (Some(mut new), Some(old)) => {
                    new.inherit_state(old);
                    Some(new)
                }
                (new, _) => new,
            };
        }
        if let Some(recipient) = patch.recipient {
            self.recipient = recipient;
        }
    }
}

/// Partial update. The outer `Option` means "leave unchanged"; an inner
/// `None` clears the field.
#[derive(Debug, Clone, Default)]
pub struct HabitPatch {
    pub operation: Option<String>,
    pub place: Option<Option<String>>,
    pub lead_time_secs: Option<Option<i64>>,
    pub reward: Option<Option<String>>,
    pub related_habit: Option<Option<HabitId>>,
    pub is_enjoyable: Option<bool>,
    pub is_public: Option<bool>,
    pub recurrence: Option<Option<Recurrence>>,
    pub recipient: Option<Option<String>>,
}

/// A stored habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub operation: String,
    pub place: Option<String>,
    pub lead_time_secs: Option<i64>,
    pub reward: Option<String>,
    pub related_habit: Option<HabitId>,
    pub is_enjoyable: bool,
    pub is_public: bool,
    pub recurrence: Option<Recurrence>,
    pub recipient: Option<String>,
}

impl Habit {
    pub fn from_draft(id: HabitId, draft: HabitDraft) -> Self {
        Self {
            id,
            operation: draft.operation,
            place: draft.place,
            lead_time_secs: draft.lead_time_secs,
            reward: draft.reward,
            related_habit: draft.related_habit,
            is_enjoyable: draft.is_enjoyable,
            is_public: draft.is_public,
            recurrence: draft.recurrence,
            recipient: draft.recipient,
        }
    }

    pub fn to_draft(&self) -> HabitDraft {
        HabitDraft {
            operation: self.operation.clone(),
            place: self.place.clone(),
            lead_time_secs: self.lead_time_secs,
            reward: self.reward.clone(),
            related_habit: self.related_habit,
            is_enjoyable: self.is_enjoyable,
            is_public: self.is_public,
            recurrence: self.recurrence.clone(),
            recipient: self.recipient.clone(),
        }
    }

    /// One-line description: operation, recurrence, place.
    ///
    /// `"Meditate every 3 hours in the armchair"`
    pub fn description(&self) -> String {
        let mut parts = vec![self.operation.trim().to_string()];
        if let Some(recurrence) = &self.recurrence {
            parts.push(recurrence.to_string());
        }
        if let Some(place) = non_blank(self.place.as_deref()) {
            parts.push(place.to_string());
        }
        capitalize(&parts.join(" "))
    }

    /// `"within 60 seconds"` when a lead time is set.
    pub fn lead_time_text(&self) -> Option<String> {
        self.lead_time_secs.map(|secs| format!("within {secs} seconds"))
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::{RecurringInterval, WeeklySchedule};
    use chrono::{Duration, NaiveTime, Weekday};

    fn habit(draft: HabitDraft) -> Habit {
        Habit::from_draft(1, draft)
    }

    #[test]
    fn description_with_interval_and_place() {
        let h = habit(HabitDraft {
            place: Some("in the armchair".into()),
            recurrence: Some(Recurrence::Interval(RecurringInterval::new(Duration::hours(3)))),
            ..HabitDraft::new("meditate")
        });
        assert_eq!(h.description(), "Meditate every 3 hours in the armchair");
    }

    #[test]
    fn description_with_weekly_schedule() {
        let schedule = WeeklySchedule::new()
            .with(Weekday::Mon, NaiveTime::from_hms_opt(9, 0, 0).unwrap())
            .with(Weekday::Wed, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let h = habit(HabitDraft {
            place: Some("on the way".into()),
            recurrence: Some(Recurrence::Weekly(schedule)),
            ..HabitDraft::new("do a somersault")
        });
        assert_eq!(
            h.description(),
            "Do a somersault mon: 09:00:00, wed: 09:00:00 on the way"
        );
    }

    #[test]
    fn description_of_enjoyable_habit() {
        let h = habit(HabitDraft {
            place: Some("at home".into()),
            is_enjoyable: true,
            ..HabitDraft::new("rest")
        });
        assert_eq!(h.description(), "Rest at home");

        let h = habit(HabitDraft::new("eat an avocado"));
        assert_eq!(h.description(), "Eat an avocado");
    }

    #[test]
    fn normalize_trims_operation_and_recipient() {
        let mut draft = HabitDraft {
            recipient: Some("  -1001 ".into()),
            ..HabitDraft::new("  walk ")
        };
        draft.normalize();
        assert_eq!(draft.operation, "walk");
        assert_eq!(draft.recipient.as_deref(), Some("-1001"));

        draft.recipient = Some("   ".into());
        draft.normalize();
        assert_eq!(draft.recipient, None);
    }

    #[test]
    fn patch_replaces_and_clears_fields() {
        let mut draft = HabitDraft {
            place: Some("home".into()),
            reward: Some("tea".into()),
            ..HabitDraft::new("read")
        };
        draft.apply(HabitPatch {
            place: Some(None),
            operation: Some("read a chapter".into()),
            ..HabitPatch::default()
        });
        assert_eq!(draft.operation, "read a chapter");
        assert_eq!(draft.place, None);
        assert_eq!(draft.reward.as_deref(), Some("tea"));
    }

    #[test]
    fn patch_keeps_last_fired_for_same_recurrence_kind() {
        let fired = chrono::Utc::now();
        let mut old = RecurringInterval::new(Duration::hours(2));
        old.last_fired_at = Some(fired);
        let mut draft = HabitDraft {
            recurrence: Some(Recurrence::Interval(old)),
            ..HabitDraft::new("stretch")
        };
        draft.apply(HabitPatch {
            recurrence: Some(Some(Recurrence::Interval(RecurringInterval::new(
                Duration::hours(4),
            )))),
            ..HabitPatch::default()
        });
        match draft.recurrence {
            Some(Recurrence::Interval(i)) => {
                assert_eq!(i.interval_secs, 4 * 3600);
                assert_eq!(i.last_fired_at, Some(fired));
            }
            other => panic!("unexpected recurrence {other:?}"),
        }
    }
}
