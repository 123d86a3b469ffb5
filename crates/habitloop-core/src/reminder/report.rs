//! Per-tick delivery log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::habit::HabitId;
use crate::recurrence::RecurrenceKind;

/// What happened to one candidate habit during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderOutcome {
    pub habit_id: HabitId,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Message delivered and firing recorded
    Sent,
    /// Not due at this tick
    NotDue,
    /// Due, but dry-run mode: composed only
    DryRun { text: String },
    /// The notifier failed; last-fired state left untouched
    Failed { reason: String },
    /// Delivered, but the firing could not be recorded
    RecordFailed { reason: String },
}

/// Log of one weekly or interval scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub kind: RecurrenceKind,
    pub tick_at: DateTime<Utc>,
    pub outcomes: Vec<ReminderOutcome>,
}

impl TickReport {
    pub fn new(kind: RecurrenceKind, tick_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            tick_at,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, habit_id: HabitId, status: DeliveryStatus) {
        self.outcomes.push(ReminderOutcome { habit_id, status });
    }

    pub fn candidate_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Messages that reached the notifier successfully (recorded or not).
    pub fn sent_count(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Sent | DeliveryStatus::RecordFailed { .. }))
    }

    pub fn failure_count(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Failed { .. }))
    }

    pub fn record_failure_count(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::RecordFailed { .. }))
    }

    pub fn not_due_count(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::NotDue))
    }

    pub fn status_of(&self, habit_id: HabitId) -> Option<&DeliveryStatus> {
        self.outcomes
            .iter()
            .find(|o| o.habit_id == habit_id)
            .map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = TickReport::new(RecurrenceKind::Interval, Utc::now());
        report.push(1, DeliveryStatus::Sent);
        report.push(2, DeliveryStatus::NotDue);
        report.push(
            3,
            DeliveryStatus::Failed {
                reason: "timeout".into(),
            },
        );
        report.push(
            4,
            DeliveryStatus::RecordFailed {
                reason: "locked".into(),
            },
        );

        assert_eq!(report.candidate_count(), 4);
        assert_eq!(report.sent_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.record_failure_count(), 1);
        assert_eq!(report.not_due_count(), 1);
        assert_eq!(report.status_of(2), Some(&DeliveryStatus::NotDue));
        assert_eq!(report.status_of(99), None);
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(DeliveryStatus::Failed {
            reason: "HTTP 403".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 403");
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = ReminderOutcome {
            habit_id: 3,
            status: DeliveryStatus::DryRun {
                text: "Reminder!".into(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"habit_id": 3, "status": "dry_run", "text": "Reminder!"})
        );

        let back: ReminderOutcome =
            serde_json::from_value(serde_json::json!({"habit_id": 5, "status": "not_due"})).unwrap();
        assert_eq!(back.habit_id, 5);
        assert_eq!(back.status, DeliveryStatus::NotDue);
    }
}
