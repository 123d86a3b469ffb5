//! SQLite-based habit storage.
//!
//! Provides persistent storage for:
//! - Habit records
//! - Weekly schedules and recurring intervals, one table each
//! - Last-fired bookkeeping used by the reminder engine

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::{debug, warn};

use super::data_dir;
use super::migrations;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::habit::{ensure_valid, validate, Habit, HabitDraft, HabitId, HabitPatch, Violation};
use crate::recurrence::{ActiveWindow, Recurrence, RecurringInterval, WeeklySchedule, WEEKDAYS};
use crate::reminder::{HabitStore, ReminderCandidate};

const DB_FILE: &str = "habitloop.db";

const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const HABIT_SELECT: &str = "SELECT h.id, h.operation, h.place, h.lead_time_secs, h.reward,
        h.related_habit, h.is_enjoyable, h.is_public, h.recipient,
        w.habit_id, w.monday, w.tuesday, w.wednesday, w.thursday, w.friday,
        w.saturday, w.sunday, w.last_fired_date,
        i.habit_id, i.interval_secs, i.window_start, i.window_end, i.last_fired_at
    FROM habits h
    LEFT JOIN weekly_schedules w ON w.habit_id = h.id
    LEFT JOIN intervals i ON i.habit_id = h.id";

const HAS_RECIPIENT: &str = "h.recipient IS NOT NULL AND trim(h.recipient) <> ''";

/// SQLite database for habits and their recurrences.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/habitloop.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join(DB_FILE))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database (tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Validate and store a new habit.
    pub fn insert_habit(&self, mut draft: HabitDraft) -> Result<Habit> {
        draft.normalize();
        let related = self.related_of(&draft)?;
        ensure_valid(&draft, related.as_ref())?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO habits (operation, place, lead_time_secs, reward, related_habit,
                                 is_enjoyable, is_public, recipient)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                draft.operation,
                draft.place,
                draft.lead_time_secs,
                draft.reward,
                draft.related_habit,
                draft.is_enjoyable,
                draft.is_public,
                draft.recipient,
            ],
        )?;
        let id = tx.last_insert_rowid();
        write_recurrence(&tx, id, draft.recurrence.as_ref())?;
        tx.commit()?;

        debug!(habit_id = id, "habit created");
        Ok(Habit::from_draft(id, draft))
    }

    pub fn find_habit(&self, id: HabitId) -> Result<Option<Habit>> {
        let row = self
            .conn
            .query_row(&format!("{HABIT_SELECT} WHERE h.id = ?1"), [id], HabitRow::read)
            .optional()?;
        row.map(HabitRow::into_habit).transpose()
    }

    pub fn get_habit(&self, id: HabitId) -> Result<Habit> {
        self.find_habit(id)?
            .ok_or_else(|| DatabaseError::NotFound(id).into())
    }

    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        self.query_habits(&format!("{HABIT_SELECT} ORDER BY h.id"), [])
    }

    /// Habits their owners marked as visible to others.
    pub fn list_public_habits(&self) -> Result<Vec<Habit>> {
        self.query_habits(&format!("{HABIT_SELECT} WHERE h.is_public = 1 ORDER BY h.id"), [])
    }

    /// Apply `patch` to a stored habit. The merged record is validated as a
    /// whole; switching recurrence kind drops the previous recurrence row.
    /// A habit other habits use as their reward must stay enjoyable.
    pub fn update_habit(&self, id: HabitId, patch: HabitPatch) -> Result<Habit> {
        let existing = self.get_habit(id)?;
        let mut draft = existing.to_draft();
        draft.apply(patch);
        draft.normalize();

        let related = self.related_of(&draft)?;
        let mut violations = validate(&draft, related.as_ref());
        if !draft.is_enjoyable {
            let ids = self.reward_referrers(id)?;
            if !ids.is_empty() {
                violations.push(Violation::ReferencedAsReward { ids });
            }
        }
        if !violations.is_empty() {
            return Err(ValidationError::Rejected(violations).into());
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE habits SET operation = ?2, place = ?3, lead_time_secs = ?4, reward = ?5,
                    related_habit = ?6, is_enjoyable = ?7, is_public = ?8, recipient = ?9
             WHERE id = ?1",
            params![
                id,
                draft.operation,
                draft.place,
                draft.lead_time_secs,
                draft.reward,
                draft.related_habit,
                draft.is_enjoyable,
                draft.is_public,
                draft.recipient,
            ],
        )?;
        write_recurrence(&tx, id, draft.recurrence.as_ref())?;
        tx.commit()?;

        debug!(habit_id = id, "habit updated");
        Ok(Habit::from_draft(id, draft))
    }

    /// Delete a habit and its recurrence. Habits that used it as their
    /// reward lose the reference.
    pub fn delete_habit(&self, id: HabitId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM habits WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound(id).into());
        }
        debug!(habit_id = id, "habit deleted");
        Ok(())
    }

    /// Bind (or clear) the chat that receives this habit's reminders.
    pub fn set_recipient(&self, id: HabitId, recipient: Option<String>) -> Result<Habit> {
        self.update_habit(
            id,
            HabitPatch {
                recipient: Some(recipient),
                ..HabitPatch::default()
            },
        )
    }

    fn related_of(&self, draft: &HabitDraft) -> Result<Option<Habit>> {
        match draft.related_habit {
            Some(id) => self.find_habit(id),
            None => Ok(None),
        }
    }

    /// Ids of habits that use `id` as their reward.
    fn reward_referrers(&self, id: HabitId) -> Result<Vec<HabitId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM habits WHERE related_habit = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<HabitId>>>()?;
        Ok(ids)
    }

    fn query_habits<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, HabitRow::read)?;
        let mut habits = Vec::new();
        for row in rows {
            habits.push(row?.into_habit()?);
        }
        Ok(habits)
    }

    /// Rows are decoded one at a time. A habit whose row or related habit
    /// cannot be decoded is logged and left out; the rest of the scan runs.
    fn candidates<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<ReminderCandidate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, HabitRow::read)?;
        let mut out = Vec::new();
        for row in rows {
            let row = row?;
            let habit_id = row.id;
            let habit = match row.into_habit() {
                Ok(habit) => habit,
                Err(e) => {
                    warn!(habit_id, error = %e, "skipping habit with undecodable row");
                    continue;
                }
            };
            let related = match habit.related_habit.map(|id| self.find_habit(id)).transpose() {
                Ok(found) => found.flatten().map(|h| h.description()),
                Err(e) => {
                    warn!(habit_id, error = %e, "skipping habit whose reward habit failed to load");
                    continue;
                }
            };
            if let Some(candidate) = ReminderCandidate::new(habit, related) {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

impl HabitStore for Database {
    fn weekly_candidates(&self, weekday: Weekday, today: NaiveDate) -> Result<Vec<ReminderCandidate>> {
        let column = weekday_column(weekday);
        let sql = format!(
            "{HABIT_SELECT}
             WHERE w.{column} IS NOT NULL
               AND (w.last_fired_date IS NULL OR w.last_fired_date <> ?1)
               AND {HAS_RECIPIENT}
             ORDER BY h.id"
        );
        self.candidates(&sql, [today.format(DATE_FORMAT).to_string()])
    }

    fn interval_candidates(&self) -> Result<Vec<ReminderCandidate>> {
        let sql = format!("{HABIT_SELECT} WHERE i.habit_id IS NOT NULL AND {HAS_RECIPIENT} ORDER BY h.id");
        self.candidates(&sql, [])
    }

    fn record_weekly_fired(&self, habit_id: HabitId, date: NaiveDate) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE weekly_schedules SET last_fired_date = ?2 WHERE habit_id = ?1",
            params![habit_id, date.format(DATE_FORMAT).to_string()],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(habit_id).into());
        }
        Ok(())
    }

    fn record_interval_fired(&self, habit_id: HabitId, at: DateTime<Utc>) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE intervals SET last_fired_at = ?2 WHERE habit_id = ?1",
            params![habit_id, at.to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(habit_id).into());
        }
        Ok(())
    }
}

fn weekday_column(day: Weekday) -> &'static str {
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

/// Replace whatever recurrence row the habit had with `recurrence`.
fn write_recurrence(tx: &Transaction<'_>, id: HabitId, recurrence: Option<&Recurrence>) -> Result<()> {
    tx.execute("DELETE FROM weekly_schedules WHERE habit_id = ?1", [id])?;
    tx.execute("DELETE FROM intervals WHERE habit_id = ?1", [id])?;

    match recurrence {
        Some(Recurrence::Weekly(schedule)) => {
            let slot = |day| {
                schedule
                    .time_for(day)
                    .map(|t| t.format(TIME_FORMAT).to_string())
            };
            tx.execute(
                "INSERT INTO weekly_schedules (habit_id, monday, tuesday, wednesday, thursday,
                                               friday, saturday, sunday, last_fired_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    slot(Weekday::Mon),
                    slot(Weekday::Tue),
                    slot(Weekday::Wed),
                    slot(Weekday::Thu),
                    slot(Weekday::Fri),
                    slot(Weekday::Sat),
                    slot(Weekday::Sun),
                    schedule
                        .last_fired_date
                        .map(|d| d.format(DATE_FORMAT).to_string()),
                ],
            )?;
        }
        Some(Recurrence::Interval(interval)) => {
            let (start, end) = match interval.window {
                Some(w) => (
                    Some(w.start.format(TIME_FORMAT).to_string()),
                    Some(w.end.format(TIME_FORMAT).to_string()),
                ),
                None => (None, None),
            };
            tx.execute(
                "INSERT INTO intervals (habit_id, interval_secs, window_start, window_end, last_fired_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    interval.interval_secs,
                    start,
                    end,
                    interval.last_fired_at.map(|at| at.to_rfc3339()),
                ],
            )?;
        }
        None => {}
    }
    Ok(())
}

/// Raw joined row; text columns are decoded in [`HabitRow::into_habit`].
struct HabitRow {
    id: HabitId,
    operation: String,
    place: Option<String>,
    lead_time_secs: Option<i64>,
    reward: Option<String>,
    related_habit: Option<HabitId>,
    is_enjoyable: bool,
    is_public: bool,
    recipient: Option<String>,
    weekly: Option<WeeklyRow>,
    interval: Option<IntervalRow>,
}

struct WeeklyRow {
    slots: [Option<String>; 7],
    last_fired_date: Option<String>,
}

struct IntervalRow {
    interval_secs: i64,
    window_start: Option<String>,
    window_end: Option<String>,
    last_fired_at: Option<String>,
}

impl HabitRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        let weekly = match row.get::<_, Option<i64>>(9)? {
            Some(_) => Some(WeeklyRow {
                slots: [
                    row.get(10)?,
                    row.get(11)?,
                    row.get(12)?,
                    row.get(13)?,
                    row.get(14)?,
                    row.get(15)?,
                    row.get(16)?,
                ],
                last_fired_date: row.get(17)?,
            }),
            None => None,
        };
        let interval = match row.get::<_, Option<i64>>(18)? {
            Some(_) => Some(IntervalRow {
                interval_secs: row.get(19)?,
                window_start: row.get(20)?,
                window_end: row.get(21)?,
                last_fired_at: row.get(22)?,
            }),
            None => None,
        };
        Ok(Self {
            id: row.get(0)?,
            operation: row.get(1)?,
            place: row.get(2)?,
            lead_time_secs: row.get(3)?,
            reward: row.get(4)?,
            related_habit: row.get(5)?,
            is_enjoyable: row.get(6)?,
            is_public: row.get(7)?,
            recipient: row.get(8)?,
            weekly,
            interval,
        })
    }

    fn into_habit(self) -> Result<Habit> {
        let recurrence = match (self.weekly, self.interval) {
            (Some(weekly), None) => Some(Recurrence::Weekly(weekly.decode()?)),
            (None, Some(interval)) => Some(Recurrence::Interval(interval.decode()?)),
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(corrupt("recurrence", &format!("habit #{} has two recurrences", self.id)))
            }
        };
        Ok(Habit {
            id: self.id,
            operation: self.operation,
            place: self.place,
            lead_time_secs: self.lead_time_secs,
            reward: self.reward,
            related_habit: self.related_habit,
            is_enjoyable: self.is_enjoyable,
            is_public: self.is_public,
            recurrence,
            recipient: self.recipient,
        })
    }
}

impl WeeklyRow {
    fn decode(self) -> Result<WeeklySchedule> {
        let mut schedule = WeeklySchedule::new();
        for (day, slot) in WEEKDAYS.iter().zip(self.slots.iter()) {
            if let Some(text) = slot {
                schedule.set(*day, Some(parse_time_column(weekday_column(*day), text)?));
            }
        }
        schedule.last_fired_date = self
            .last_fired_date
            .map(|text| {
                NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map_err(|_| corrupt("last_fired_date", &text))
            })
            .transpose()?;
        Ok(schedule)
    }
}

impl IntervalRow {
    fn decode(self) -> Result<RecurringInterval> {
        let window = match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => Some(ActiveWindow::new(
                parse_time_column("window_start", &start)?,
                parse_time_column("window_end", &end)?,
            )),
            _ => None,
        };
        let last_fired_at = self
            .last_fired_at
            .map(|text| {
                DateTime::parse_from_rfc3339(&text)
                    .map(|at| at.with_timezone(&Utc))
                    .map_err(|_| corrupt("last_fired_at", &text))
            })
            .transpose()?;
        Ok(RecurringInterval {
            interval_secs: self.interval_secs,
            window,
            last_fired_at,
        })
    }
}

fn parse_time_column(column: &str, text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, TIME_FORMAT).map_err(|_| corrupt(column, text))
}

fn corrupt(column: &str, value: &str) -> crate::error::CoreError {
    DatabaseError::CorruptValue {
        column: column.to_string(),
        value: value.to_string(),
    }
    .into()
}
