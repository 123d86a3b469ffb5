//! End-to-end reminder runs against an in-memory database.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use habitloop_core::clock::offset_from_minutes;
use habitloop_core::{
    ActiveWindow, Database, DeliveryStatus, HabitDraft, HabitStore, Notifier, NotifyError,
    Recurrence, RecurringInterval, ReminderRunner, Tick, WeeklySchedule,
};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl Notifier for RecordingNotifier {
    fn channel(&self) -> &str {
        "recording"
    }

    fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Transport("connection reset".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn utc(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
}

fn seed(db: &Database) -> (i64, i64) {
    let avocado = db
        .insert_habit(HabitDraft {
            is_enjoyable: true,
            ..HabitDraft::new("eat an avocado")
        })
        .unwrap();
    let kata = db
        .insert_habit(HabitDraft {
            place: Some("home".into()),
            lead_time_secs: Some(60),
            reward: Some("watch a video".into()),
            recipient: Some("42".into()),
            recurrence: Some(Recurrence::Weekly(
                WeeklySchedule::new().with(Weekday::Mon, t(14, 0)),
            )),
            ..HabitDraft::new("practice kata")
        })
        .unwrap();
    let meditate = db
        .insert_habit(HabitDraft {
            place: Some("in the armchair".into()),
            related_habit: Some(avocado.id),
            recipient: Some("42".into()),
            recurrence: Some(Recurrence::Interval(RecurringInterval::new(Duration::hours(3)))),
            ..HabitDraft::new("meditate")
        })
        .unwrap();
    (kata.id, meditate.id)
}

#[test]
fn weekly_reminder_fires_once_per_day() {
    let db = Database::open_memory().unwrap();
    let (kata, _) = seed(&db);
    let notifier = RecordingNotifier::default();
    let runner = ReminderRunner::new(&db, &notifier);

    // 2024-01-01 is a Monday
    let report = runner.run_weekly(&Tick::utc(utc("2024-01-01T14:00:10Z"))).unwrap();
    assert_eq!(report.status_of(kata), Some(&DeliveryStatus::Sent));

    let text = notifier.sent.lock().unwrap()[0].1.clone();
    assert!(text.contains("When: today at 14:00"));
    assert!(text.contains("What to do: practice kata home"));
    assert!(text.contains("Complete it within 60 seconds"));
    assert!(text.contains("Your reward: watch a video"));

    // same minute again, and the rest of the day: already fired
    let report = runner.run_weekly(&Tick::utc(utc("2024-01-01T14:00:50Z"))).unwrap();
    assert_eq!(report.candidate_count(), 0);
    assert_eq!(notifier.count(), 1);

    // next Monday it fires again
    let report = runner.run_weekly(&Tick::utc(utc("2024-01-08T14:00:00Z"))).unwrap();
    assert_eq!(report.sent_count(), 1);
}

#[test]
fn interval_reminder_respects_elapsed_time() {
    let db = Database::open_memory().unwrap();
    let (_, meditate) = seed(&db);
    let notifier = RecordingNotifier::default();
    let runner = ReminderRunner::new(&db, &notifier);

    let report = runner.run_interval(&Tick::utc(utc("2024-01-01T09:05:00Z"))).unwrap();
    assert_eq!(report.status_of(meditate), Some(&DeliveryStatus::Sent));
    let text = notifier.sent.lock().unwrap()[0].1.clone();
    assert!(text.contains("When: now, at 09:05"));
    assert!(text.contains("Your reward: Eat an avocado"));

    let report = runner.run_interval(&Tick::utc(utc("2024-01-01T12:04:59Z"))).unwrap();
    assert_eq!(report.status_of(meditate), Some(&DeliveryStatus::NotDue));

    let report = runner.run_interval(&Tick::utc(utc("2024-01-01T12:05:00Z"))).unwrap();
    assert_eq!(report.status_of(meditate), Some(&DeliveryStatus::Sent));
    assert_eq!(notifier.count(), 2);
}

#[test]
fn failed_send_leaves_state_for_next_tick() {
    let db = Database::open_memory().unwrap();
    let (_, meditate) = seed(&db);

    let broken = RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    };
    let report = ReminderRunner::new(&db, &broken)
        .run_interval(&Tick::utc(utc("2024-01-01T09:00:00Z")))
        .unwrap();
    assert_eq!(report.failure_count(), 1);
    match db.get_habit(meditate).unwrap().recurrence {
        Some(Recurrence::Interval(i)) => assert_eq!(i.last_fired_at, None),
        other => panic!("unexpected recurrence {other:?}"),
    }

    let working = RecordingNotifier::default();
    let report = ReminderRunner::new(&db, &working)
        .run_interval(&Tick::utc(utc("2024-01-01T09:01:00Z")))
        .unwrap();
    assert_eq!(report.sent_count(), 1);
}

#[test]
fn window_wraparound_with_local_offset() {
    let db = Database::open_memory().unwrap();
    let night = db
        .insert_habit(HabitDraft {
            recipient: Some("7".into()),
            recurrence: Some(Recurrence::Interval(
                RecurringInterval::new(Duration::hours(1))
                    .with_window(ActiveWindow::new(t(21, 0), t(6, 0))),
            )),
            ..HabitDraft::new("stretch")
        })
        .unwrap();
    let notifier = RecordingNotifier::default();
    let runner = ReminderRunner::new(&db, &notifier);
    let offset = offset_from_minutes(120);

    // 12:00 UTC is 14:00 local: outside the window
    let report = runner.run_interval(&Tick::new(utc("2024-01-01T12:00:00Z"), offset)).unwrap();
    assert_eq!(report.status_of(night.id), Some(&DeliveryStatus::NotDue));

    // 21:00 UTC is 23:00 local: inside
    let report = runner.run_interval(&Tick::new(utc("2024-01-01T21:00:00Z"), offset)).unwrap();
    assert_eq!(report.status_of(night.id), Some(&DeliveryStatus::Sent));
    assert!(notifier.sent.lock().unwrap()[0].1.contains("When: now, at 23:00"));
}

#[test]
fn habits_without_recipient_never_reach_notifier() {
    let db = Database::open_memory().unwrap();
    db.insert_habit(HabitDraft {
        recurrence: Some(Recurrence::Interval(RecurringInterval::new(Duration::hours(1)))),
        ..HabitDraft::new("drink water")
    })
    .unwrap();
    let notifier = RecordingNotifier::default();
    let summary = ReminderRunner::new(&db, &notifier).run_tick(&Tick::utc(utc("2024-01-01T10:00:00Z")));

    assert_eq!(summary.interval.unwrap().candidate_count(), 0);
    assert_eq!(summary.weekly.unwrap().candidate_count(), 0);
    assert_eq!(notifier.count(), 0);
}

#[test]
fn dry_run_sends_and_records_nothing() {
    let db = Database::open_memory().unwrap();
    let (kata, meditate) = seed(&db);
    let notifier = RecordingNotifier::default();
    let summary = ReminderRunner::dry_run(&db, &notifier).run_tick(&Tick::utc(utc("2024-01-01T14:00:00Z")));

    let weekly = summary.weekly.unwrap();
    let interval = summary.interval.unwrap();
    assert!(matches!(weekly.status_of(kata), Some(DeliveryStatus::DryRun { .. })));
    assert!(matches!(interval.status_of(meditate), Some(DeliveryStatus::DryRun { .. })));
    assert_eq!(notifier.count(), 0);

    // nothing recorded: still a candidate
    let candidates = db
        .weekly_candidates(Weekday::Mon, utc("2024-01-01T14:00:00Z").date_naive())
        .unwrap();
    assert_eq!(candidates.len(), 1);
}
