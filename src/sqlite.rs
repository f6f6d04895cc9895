//! The data-access facade: configuration, connection lifecycle, structured
//! CRUD operations and the raw-statement escape hatch.
//!
//! All value-bearing clauses use positional parameter binding. Table and
//! column names are interpolated into statement text, so every
//! caller-supplied identifier is validated first (see `check_identifier`).

use indexmap::IndexMap;
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::value::Value;

/// One row's data: column name → value, iteration order = insertion order.
///
/// Used both as insert/update payload and as query result row.
pub type Record = IndexMap<String, Value>;

/// Equality-based, AND-combined filter for WHERE clauses.
pub type Conditions = IndexMap<String, Value>;

/// Table schema descriptor: column name → type/constraint clause
/// (e.g. `"INTEGER PRIMARY KEY AUTOINCREMENT"`). Used only at creation time.
pub type Schema = IndexMap<String, String>;

/// SQLite facade configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file (created if absent on connect).
    pub db_path: String,
}

impl SqliteConfig {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// Data-access facade owning a single connection to one database file.
///
/// Synchronous and single-threaded: every operation runs to completion on
/// the calling thread, and the connection must not be shared across
/// concurrent callers. Each mutating operation autocommits; there is no
/// transaction spanning multiple facade calls.
pub struct SqliteService {
    config: SqliteConfig,
    connection: Option<Connection>,
}

impl SqliteService {
    /// Create a facade without connecting. Call [`connect`](Self::connect)
    /// before issuing operations.
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    /// Create a facade and connect to the database file at `db_path`.
    pub fn open(db_path: impl Into<String>) -> DbResult<Self> {
        let mut service = Self::new(SqliteConfig::new(db_path));
        service.connect()?;
        Ok(service)
    }

    /// Open (or create) the database file from the configured path.
    ///
    /// On failure the facade stays connectionless and subsequent operations
    /// fail with [`DbError::NotConnected`]. Reconnecting over a live
    /// connection replaces it.
    pub fn connect(&mut self) -> DbResult<()> {
        let connection = Connection::open(&self.config.db_path)?;
        debug!("connected to database at {}", self.config.db_path);
        self.connection = Some(connection);
        Ok(())
    }

    /// Release the connection. Idempotent.
    pub fn disconnect(&mut self) -> DbResult<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().map_err(|(_, e)| DbError::Engine(e))?;
            debug!("database connection closed");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn conn(&self) -> DbResult<&Connection> {
        self.connection.as_ref().ok_or(DbError::NotConnected)
    }

    /// Create a table if it does not already exist.
    ///
    /// Column order follows the schema descriptor's insertion order. The
    /// type/constraint clause is trusted DDL text from the embedding
    /// application; column and table names are identifier-checked.
    /// Re-invocation with an existing table name is a no-op success.
    pub fn create_table(&self, table: &str, columns: &Schema) -> DbResult<()> {
        let conn = self.conn()?;
        check_identifier(table)?;
        if columns.is_empty() {
            return Err(DbError::EmptySchema(table.to_string()));
        }
        let mut defs = Vec::with_capacity(columns.len());
        for (name, clause) in columns {
            check_identifier(name)?;
            defs.push(format!("{} {}", name, clause));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            defs.join(", ")
        );
        conn.execute(&sql, [])?;
        debug!("table {} ensured", table);
        Ok(())
    }

    /// Insert one record. Values are bound positionally in the record's
    /// insertion order. The new rowid is reported on the diagnostic channel
    /// only.
    pub fn insert(&self, table: &str, record: &Record) -> DbResult<()> {
        let conn = self.conn()?;
        check_identifier(table)?;
        if record.is_empty() {
            return Err(DbError::EmptyRecord);
        }
        for key in record.keys() {
            check_identifier(key)?;
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            record.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
            placeholders(record.len())
        );
        conn.execute(&sql, params_from_iter(record.values()))?;
        debug!(
            "inserted row into {} (rowid {})",
            table,
            conn.last_insert_rowid()
        );
        Ok(())
    }

    /// Insert a batch of records sharing one column set.
    ///
    /// The first record fixes the canonical column list; every record's key
    /// set is validated against it before anything is written, and values
    /// are bound by column lookup rather than per-record iteration order.
    /// An empty batch is a trivial success.
    ///
    /// One prepared statement is executed per record with autocommit, so a
    /// mid-batch engine error leaves earlier rows in place (best-effort
    /// batch, not a transaction).
    pub fn bulk_insert(&self, table: &str, records: &[Record]) -> DbResult<()> {
        let conn = self.conn()?;
        check_identifier(table)?;
        let first = match records.first() {
            Some(first) => first,
            None => return Ok(()),
        };
        if first.is_empty() {
            return Err(DbError::EmptyRecord);
        }
        let columns: Vec<&str> = first.keys().map(String::as_str).collect();
        for column in &columns {
            check_identifier(column)?;
        }
        for (index, record) in records.iter().enumerate().skip(1) {
            let matches = record.len() == columns.len()
                && columns.iter().all(|c| record.contains_key(*c));
            if !matches {
                return Err(DbError::MismatchedColumns { index });
            }
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders(columns.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        for record in records {
            stmt.execute(params_from_iter(columns.iter().map(|c| &record[*c])))?;
        }
        debug!("bulk inserted {} row(s) into {}", records.len(), table);
        Ok(())
    }

    /// Query rows matching an exact-equality, AND-combined condition set.
    ///
    /// `columns` of `None` (or an empty slice) selects `*`. Empty or absent
    /// conditions mean no WHERE clause. Rows come back in the engine's
    /// natural order; zero matches is `Ok(vec![])`, not an error.
    pub fn select(
        &self,
        table: &str,
        conditions: Option<&Conditions>,
        columns: Option<&[&str]>,
        limit: Option<u32>,
    ) -> DbResult<Vec<Record>> {
        check_identifier(table)?;
        let projection = match columns {
            Some(cols) if !cols.is_empty() => {
                for column in cols {
                    check_identifier(column)?;
                }
                cols.join(", ")
            }
            _ => "*".to_string(),
        };
        let mut sql = format!("SELECT {} FROM {}", projection, table);
        let mut params: Vec<&Value> = Vec::new();
        if let Some(conditions) = conditions {
            if !conditions.is_empty() {
                for key in conditions.keys() {
                    check_identifier(key)?;
                }
                sql.push_str(" WHERE ");
                sql.push_str(&where_clause(conditions));
                params.extend(conditions.values());
            }
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        self.query_rows(&sql, params)
    }

    /// Update matching rows. The condition set is mandatory: an empty one
    /// would silently rewrite the whole table, so it fails with
    /// [`DbError::EmptyConditions`] instead. The affected-row count is
    /// reported on the diagnostic channel only.
    pub fn update(
        &self,
        table: &str,
        updates: &Record,
        conditions: &Conditions,
    ) -> DbResult<()> {
        let conn = self.conn()?;
        check_identifier(table)?;
        if updates.is_empty() {
            return Err(DbError::EmptyRecord);
        }
        if conditions.is_empty() {
            return Err(DbError::EmptyConditions(table.to_string()));
        }
        for key in updates.keys().chain(conditions.keys()) {
            check_identifier(key)?;
        }
        let set_clause = updates
            .keys()
            .map(|k| format!("{} = ?", k))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            set_clause,
            where_clause(conditions)
        );
        let params = updates.values().chain(conditions.values());
        let affected = conn.execute(&sql, params_from_iter(params))?;
        debug!("updated {} row(s) in {}", affected, table);
        Ok(())
    }

    /// Delete matching rows. Same mandatory-conditions policy as
    /// [`update`](Self::update).
    pub fn delete(&self, table: &str, conditions: &Conditions) -> DbResult<()> {
        let conn = self.conn()?;
        check_identifier(table)?;
        if conditions.is_empty() {
            return Err(DbError::EmptyConditions(table.to_string()));
        }
        for key in conditions.keys() {
            check_identifier(key)?;
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            table,
            where_clause(conditions)
        );
        let affected = conn.execute(&sql, params_from_iter(conditions.values()))?;
        debug!("deleted {} row(s) from {}", affected, table);
        Ok(())
    }

    /// List user tables from the catalog, in catalog order, excluding
    /// SQLite's own `sqlite_sequence` bookkeeping table.
    pub fn get_all_tables(&self) -> DbResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut tables = Vec::new();
        for name in names {
            let name = name?;
            if name != "sqlite_sequence" {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    /// Escape hatch: execute arbitrary statement text with positional
    /// parameters.
    ///
    /// Statements whose text starts (after leading whitespace) with the
    /// case-insensitive token `SELECT` are fetched and normalized into
    /// records; everything else is executed and returns an empty vec. The
    /// dispatch is purely lexical: a row-returning statement that does not
    /// start with SELECT (a PRAGMA, a RETURNING clause) is executed, not
    /// fetched, and fails accordingly.
    pub fn execute_sql(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Record>> {
        if is_select_statement(sql) {
            self.query_rows(sql, params.iter().collect())
        } else {
            let conn = self.conn()?;
            let affected = conn.execute(sql, params_from_iter(params.iter()))?;
            debug!("statement executed ({} row(s) affected)", affected);
            Ok(Vec::new())
        }
    }

    /// Run a row-returning statement and normalize each row into a
    /// `Record` keyed by the statement's column names.
    fn query_rows(&self, sql: &str, params: Vec<&Value>) -> DbResult<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, name) in names.iter().enumerate() {
                record.insert(name.clone(), Value::from(row.get_ref(i)?));
            }
            result.push(record);
        }
        Ok(result)
    }
}

/// Reject any identifier outside `[A-Za-z_][A-Za-z0-9_]*` before it is
/// interpolated into statement text.
fn check_identifier(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

fn where_clause(conditions: &Conditions) -> String {
    conditions
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn is_select_statement(sql: &str) -> bool {
    sql.trim_start()
        .as_bytes()
        .get(..6)
        .map_or(false, |head| head.eq_ignore_ascii_case(b"select"))
}
