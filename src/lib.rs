//! Embedded SQLite data-access facade.
//!
//! # Intention
//!
//! - Provide a structured CRUD API over a single SQLite database file:
//!   table creation, single and bulk insert, conditional select, update,
//!   delete, table enumeration, and a raw-statement escape hatch.
//! - Translate column/value mappings into parameterized statements and
//!   normalize result rows into ordered column-name → value mappings.
//!
//! # Architectural Boundaries
//!
//! - Only SQLite/database code belongs here. No business logic.
//! - One exclusively-owned connection per facade instance. No pooling,
//!   no cross-call transactions, no concurrency control.
//! - Values are always bound positionally; identifiers are validated
//!   before being interpolated into statement text.
//! - Diagnostics (row ids, affected-row counts) are emitted as `tracing`
//!   events, never as part of the structural return values.

pub mod error;
pub mod sqlite;
pub mod value;

pub use error::{DbError, DbResult};
pub use sqlite::{Conditions, Record, Schema, SqliteConfig, SqliteService};
pub use value::Value;
