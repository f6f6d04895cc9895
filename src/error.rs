//! Error types for the facade.
//!
//! Engine-side failures (connection, malformed statements, constraint
//! violations, type mismatches) all surface as the single `Engine` variant;
//! the remaining variants are produced by this crate's own validation before
//! anything reaches SQLite.

use thiserror::Error;

/// Result alias used by every facade operation.
pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The facade has no live connection (never connected, a failed
    /// `connect`, or after `disconnect`).
    #[error("database is not connected")]
    NotConnected,

    /// A caller-supplied table or column name failed the identifier check.
    /// Identifiers must match `[A-Za-z_][A-Za-z0-9_]*`.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// `create_table` was given an empty column map.
    #[error("table {0:?} needs at least one column")]
    EmptySchema(String),

    /// An insert or update payload carried no columns.
    #[error("empty record: at least one column/value pair is required")]
    EmptyRecord,

    /// `update` or `delete` was called with an empty condition set, which
    /// would silently affect every row in the table.
    #[error("empty condition set would affect every row of {0:?}")]
    EmptyConditions(String),

    /// A `bulk_insert` record's key set differs from the column set fixed
    /// by the first record of the batch. Nothing was written.
    #[error("record at index {index} does not match the batch column set")]
    MismatchedColumns { index: usize },

    /// Any error reported by the SQLite engine itself.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
}
