//! Database schema migrations for habitloop.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::warn;

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (fresh database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: habits plus one table per recurrence kind.
///
/// A habit owns at most one row in `weekly_schedules` or `intervals`; the
/// writer enforces "not both". Weekday columns hold `HH:MM:SS` or NULL.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            operation       TEXT NOT NULL CHECK (length(operation) <= 200),
            place           TEXT CHECK (place IS NULL OR length(place) <= 200),
            lead_time_secs  INTEGER CHECK (lead_time_secs IS NULL OR lead_time_secs BETWEEN 1 AND 120),
            reward          TEXT CHECK (reward IS NULL OR length(reward) <= 100),
            related_habit   INTEGER REFERENCES habits(id) ON DELETE SET NULL,
            is_enjoyable    INTEGER NOT NULL DEFAULT 0,
            is_public       INTEGER NOT NULL DEFAULT 0,
            recipient       TEXT
        );

        CREATE TABLE IF NOT EXISTS weekly_schedules (
            habit_id        INTEGER PRIMARY KEY REFERENCES habits(id) ON DELETE CASCADE,
            monday          TEXT,
            tuesday         TEXT,
            wednesday       TEXT,
            thursday        TEXT,
            friday          TEXT,
            saturday        TEXT,
            sunday          TEXT,
            last_fired_date TEXT
        );

        CREATE TABLE IF NOT EXISTS intervals (
            habit_id        INTEGER PRIMARY KEY REFERENCES habits(id) ON DELETE CASCADE,
            interval_secs   INTEGER NOT NULL CHECK (interval_secs > 0 AND interval_secs <= 604800),
            window_start    TEXT,
            window_end      TEXT,
            last_fired_at   TEXT,
            CHECK ((window_start IS NULL) = (window_end IS NULL))
        );",
    )?;
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: indexes for the reminder scans and related-habit lookups.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_habits_recipient ON habits(recipient);
         CREATE INDEX IF NOT EXISTS idx_habits_related ON habits(related_habit);",
    )?;
    set_schema_version(conn, 2)?;
    Ok(())
}
