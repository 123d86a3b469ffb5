//! Batch reminder runs.
//!
//! One scan per recurrence kind. A failure on one habit never stops the
//! rest of the batch; it is logged and written into the [`TickReport`].

use tracing::{debug, info, warn};

use crate::clock::Tick;
use crate::error::Result;
use crate::notify::Notifier;
use crate::recurrence::{Recurrence, RecurrenceKind};

use super::compose::{compose, ReminderTime};
use super::eligibility::{interval_due, weekly_due};
use super::report::{DeliveryStatus, TickReport};
use super::tracker::record_firing;
use super::{HabitStore, ReminderCandidate};

/// Runs the weekly and interval scans against a store and a notifier.
pub struct ReminderRunner<'a, S: ?Sized, N: ?Sized> {
    store: &'a S,
    notifier: &'a N,
    /// Compose but neither send nor record
    dry_run: bool,
}

/// Both scans of one tick. Each is independent: a store failure in one
/// leaves the other intact.
#[derive(Debug)]
pub struct TickSummary {
    pub weekly: Result<TickReport>,
    pub interval: Result<TickReport>,
}

impl<'a, S, N> ReminderRunner<'a, S, N>
where
    S: HabitStore + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(store: &'a S, notifier: &'a N) -> Self {
        Self {
            store,
            notifier,
            dry_run: false,
        }
    }

    /// Runner that reports what would be sent without side effects.
    pub fn dry_run(store: &'a S, notifier: &'a N) -> Self {
        Self {
            store,
            notifier,
            dry_run: true,
        }
    }

    /// Remind every weekly habit scheduled for the tick's minute.
    pub fn run_weekly(&self, tick: &Tick) -> Result<TickReport> {
        let candidates = self.store.weekly_candidates(tick.weekday(), tick.date())?;
        debug!(count = candidates.len(), weekday = %tick.weekday(), "weekly candidates loaded");
        Ok(self.run_batch(RecurrenceKind::Weekly, candidates, tick))
    }

    /// Remind every interval habit whose interval has elapsed inside its window.
    pub fn run_interval(&self, tick: &Tick) -> Result<TickReport> {
        let candidates = self.store.interval_candidates()?;
        debug!(count = candidates.len(), "interval candidates loaded");
        Ok(self.run_batch(RecurrenceKind::Interval, candidates, tick))
    }

    pub fn run_tick(&self, tick: &Tick) -> TickSummary {
        let weekly = self.run_weekly(tick);
        if let Err(e) = &weekly {
            warn!(error = %e, "weekly scan failed");
        }
        let interval = self.run_interval(tick);
        if let Err(e) = &interval {
            warn!(error = %e, "interval scan failed");
        }
        TickSummary { weekly, interval }
    }

    fn run_batch(
        &self,
        kind: RecurrenceKind,
        candidates: Vec<ReminderCandidate>,
        tick: &Tick,
    ) -> TickReport {
        let mut report = TickReport::new(kind, tick.at);
        for candidate in candidates {
            let habit_id = candidate.habit.id;
            let status = self.process(kind, candidate, tick);
            report.push(habit_id, status);
        }
        if report.sent_count() > 0 || report.failure_count() > 0 {
            info!(
                kind = %kind,
                sent = report.sent_count(),
                failed = report.failure_count(),
                "reminder scan finished"
            );
        }
        report
    }

    fn process(&self, kind: RecurrenceKind, candidate: ReminderCandidate, tick: &Tick) -> DeliveryStatus {
        let ReminderCandidate {
            mut habit,
            recipient,
            related_description,
        } = candidate;

        let due = match (&habit.recurrence, kind) {
            (Some(Recurrence::Weekly(schedule)), RecurrenceKind::Weekly) => weekly_due(tick, schedule),
            (Some(Recurrence::Interval(interval)), RecurrenceKind::Interval) => {
                interval_due(tick, interval)
            }
            _ => {
                debug!(habit_id = habit.id, kind = %kind, "candidate has no matching recurrence");
                false
            }
        };
        if !due {
            return DeliveryStatus::NotDue;
        }

        let when = ReminderTime::for_tick(&habit, tick).unwrap_or(ReminderTime::Now(tick.time()));
        let text = compose(&habit, related_description.as_deref(), when);

        if self.dry_run {
            debug!(habit_id = habit.id, "dry run, reminder not sent");
            return DeliveryStatus::DryRun { text };
        }

        if let Err(e) = self.notifier.send(&recipient, &text) {
            warn!(
                habit_id = habit.id,
                channel = self.notifier.channel(),
                error = %e,
                "reminder delivery failed"
            );
            return DeliveryStatus::Failed {
                reason: e.to_string(),
            };
        }

        match record_firing(self.store, &mut habit, tick) {
            Ok(()) => {
                info!(habit_id = habit.id, recipient = %recipient, "reminder sent");
                DeliveryStatus::Sent
            }
            Err(e) => {
                warn!(habit_id = habit.id, error = %e, "reminder sent but firing not recorded");
                DeliveryStatus::RecordFailed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, DatabaseError, NotifyError};
    use crate::habit::{Habit, HabitDraft, HabitId};
    use crate::recurrence::{RecurringInterval, WeeklySchedule};
    use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc, Weekday};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        weekly: Vec<ReminderCandidate>,
        interval: Vec<ReminderCandidate>,
        fired: Mutex<Vec<HabitId>>,
        fail_record: bool,
    }

    impl HabitStore for FakeStore {
        fn weekly_candidates(&self, _: Weekday, _: NaiveDate) -> Result<Vec<ReminderCandidate>> {
            Ok(self.weekly.clone())
        }
        fn interval_candidates(&self) -> Result<Vec<ReminderCandidate>> {
            Ok(self.interval.clone())
        }
        fn record_weekly_fired(&self, id: HabitId, _: NaiveDate) -> Result<()> {
            self.record(id)
        }
        fn record_interval_fired(&self, id: HabitId, _: DateTime<Utc>) -> Result<()> {
            self.record(id)
        }
    }

    impl FakeStore {
        fn record(&self, id: HabitId) -> Result<()> {
            if self.fail_record {
                return Err(CoreError::Database(DatabaseError::Locked));
            }
            self.fired.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(String, String)>>,
        refuse: Option<&'static str>,
    }

    impl Notifier for Outbox {
        fn channel(&self) -> &str {
            "outbox"
        }
        fn send(&self, recipient: &str, text: &str) -> std::result::Result<(), NotifyError> {
            if let Some(r) = self.refuse.filter(|r| *r == recipient) {
                return Err(NotifyError::Rejected(format!("chat {r} not found")));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn tick(text: &str) -> Tick {
        Tick::utc(DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc))
    }

    fn weekly(id: HabitId, recipient: &str) -> ReminderCandidate {
        let draft = HabitDraft {
            recipient: Some(recipient.into()),
            recurrence: Some(Recurrence::Weekly(
                WeeklySchedule::new().with(Weekday::Mon, NaiveTime::from_hms_opt(14, 0, 0).unwrap()),
            )),
            ..HabitDraft::new("practice kata")
        };
        ReminderCandidate::new(Habit::from_draft(id, draft), None).unwrap()
    }

    fn interval(id: HabitId, recipient: &str) -> ReminderCandidate {
        let draft = HabitDraft {
            recipient: Some(recipient.into()),
            recurrence: Some(Recurrence::Interval(RecurringInterval::new(Duration::hours(3)))),
            ..HabitDraft::new("meditate")
        };
        ReminderCandidate::new(Habit::from_draft(id, draft), Some("Eat an avocado".into())).unwrap()
    }

    #[test]
    fn weekly_sends_and_records() {
        let store = FakeStore {
            weekly: vec![weekly(1, "42")],
            ..FakeStore::default()
        };
        let outbox = Outbox::default();
        let report = ReminderRunner::new(&store, &outbox)
            .run_weekly(&tick("2024-01-01T14:00:05Z"))
            .unwrap();

        assert_eq!(report.status_of(1), Some(&DeliveryStatus::Sent));
        assert_eq!(*store.fired.lock().unwrap(), vec![1]);
        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent[0].0, "42");
        assert!(sent[0].1.contains("When: today at 14:00"));
    }

    #[test]
    fn weekly_outside_minute_is_not_due() {
        let store = FakeStore {
            weekly: vec![weekly(1, "42")],
            ..FakeStore::default()
        };
        let outbox = Outbox::default();
        let report = ReminderRunner::new(&store, &outbox)
            .run_weekly(&tick("2024-01-01T14:01:00Z"))
            .unwrap();
        assert_eq!(report.status_of(1), Some(&DeliveryStatus::NotDue));
        assert!(outbox.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_send_is_isolated_and_unrecorded() {
        let store = FakeStore {
            interval: vec![interval(1, "bad"), interval(2, "good")],
            ..FakeStore::default()
        };
        let outbox = Outbox {
            refuse: Some("bad"),
            ..Outbox::default()
        };
        let report = ReminderRunner::new(&store, &outbox)
            .run_interval(&tick("2024-01-01T09:00:00Z"))
            .unwrap();

        assert!(matches!(report.status_of(1), Some(DeliveryStatus::Failed { .. })));
        assert_eq!(report.status_of(2), Some(&DeliveryStatus::Sent));
        assert_eq!(*store.fired.lock().unwrap(), vec![2]);
        assert!(outbox.sent.lock().unwrap()[0].1.contains("Your reward: Eat an avocado"));
    }

    #[test]
    fn record_failure_does_not_stop_batch() {
        let store = FakeStore {
            interval: vec![interval(1, "a"), interval(2, "b")],
            fail_record: true,
            ..FakeStore::default()
        };
        let outbox = Outbox::default();
        let report = ReminderRunner::new(&store, &outbox)
            .run_interval(&tick("2024-01-01T09:00:00Z"))
            .unwrap();

        assert_eq!(report.record_failure_count(), 2);
        assert_eq!(outbox.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn dry_run_composes_without_side_effects() {
        let store = FakeStore {
            weekly: vec![weekly(1, "42")],
            interval: vec![interval(2, "42")],
            ..FakeStore::default()
        };
        let outbox = Outbox::default();
        let runner = ReminderRunner::dry_run(&store, &outbox);
        let summary = runner.run_tick(&tick("2024-01-01T14:00:00Z"));

        let weekly = summary.weekly.unwrap();
        let interval = summary.interval.unwrap();
        assert!(matches!(weekly.status_of(1), Some(DeliveryStatus::DryRun { .. })));
        match interval.status_of(2) {
            Some(DeliveryStatus::DryRun { text }) => assert!(text.contains("When: now, at 14:00")),
            other => panic!("unexpected status {other:?}"),
        }
        assert!(outbox.sent.lock().unwrap().is_empty());
        assert!(store.fired.lock().unwrap().is_empty());
    }

    #[test]
    fn mismatched_kind_is_not_due() {
        let store = FakeStore {
            weekly: vec![interval(7, "42")],
            ..FakeStore::default()
        };
        let outbox = Outbox::default();
        let report = ReminderRunner::new(&store, &outbox)
            .run_weekly(&tick("2024-01-01T14:00:00Z"))
            .unwrap();
        assert_eq!(report.status_of(7), Some(&DeliveryStatus::NotDue));
        assert!(outbox.sent.lock().unwrap().is_empty());
    }
}
