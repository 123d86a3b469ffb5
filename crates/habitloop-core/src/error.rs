//! Core error types for habitloop-core.
//!
//! One enum per concern, all folded into [`CoreError`] through `#[from]`
//! conversions so callers can use `?` across module boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::habit::Violation;

/// Core error type for habitloop-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rejected habit or recurrence records
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Outbound message delivery errors
    #[error("Notifier error: {0}")]
    Notify(#[from] NotifyError),

}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded
    #[error("Corrupt value in column '{column}': {value}")]
    CorruptValue { column: String, value: String },

    /// Record does not exist
    #[error("Habit #{0} not found")]
    NotFound(i64),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Failed to prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

/// Write-time validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A single malformed input value (durations, times, weekday slots)
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// The record breaks one or more business rules, in evaluation order
    #[error("{}", join_violations(.0))]
    Rejected(Vec<Violation>),
}

impl ValidationError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Violations carried by this error (empty for single-value errors).
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationError::Rejected(v) => v,
            ValidationError::InvalidValue { .. } => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Notifier errors. Always isolated to the reminder being sent.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No credentials configured for the channel
    #[error("{channel} is not configured: {message}")]
    NotConfigured { channel: String, message: String },

    /// Network failure or timeout
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The API answered but refused the message
    #[error("Rejected by API: {0}")]
    Rejected(String),

    /// Keyring access failed
    #[error("Credential store error: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

impl From<keyring::Error> for NotifyError {
    fn from(err: keyring::Error) -> Self {
        NotifyError::Credentials(err.to_string())
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_lists_violations_in_order() {
        let err = ValidationError::Rejected(vec![
            Violation::RecurrenceChoice,
            Violation::RewardAndRelated,
        ]);
        let text = err.to_string();
        let first = text.find("schedule or an interval").unwrap();
        let second = text.find("reward or a related habit").unwrap();
        assert!(first < second);
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn locked_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        // BUSY is not LOCKED; only DatabaseLocked maps to Locked
        assert!(matches!(DatabaseError::from(err), DatabaseError::QueryFailed(_)));

        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }
}
