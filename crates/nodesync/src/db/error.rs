//! Store error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from job and node store operations.
///
/// Any of these fails the calling query as a whole; stores never hand back
/// partial results.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// The addressed record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A terminal job was asked to change status.
    #[error("Job {id} is already terminal ({status})")]
    TerminalJob { id: i64, status: String },

    /// A stored value could not be decoded.
    #[error("Corrupt {column} value '{value}'")]
    Corrupt { column: &'static str, value: String },
}
