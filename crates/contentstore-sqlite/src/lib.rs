//! SQLite driver for ContentStore.
//!
//! [`SqliteConnection`] implements [`Connection`] on top of `rusqlite`. Values
//! are bound positionally (`?1`, `?2`, ...) and a missing table is reported
//! as [`Error::TableNotFound`].
//!
//! # Example
//!
//! ```
//! use contentstore_core::{Connection, Value};
//! use contentstore_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory().unwrap();
//! conn.execute_batch("CREATE TABLE pages (id INTEGER PRIMARY KEY, title TEXT)").unwrap();
//! let id = conn.insert("INSERT INTO pages (title) VALUES (?1)", &[Value::from("Home")]).unwrap();
//! assert_eq!(id, 1);
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use contentstore_core::{Connection, Dialect, Error, Result, Row, Value};
use rusqlite::params_from_iter;
use rusqlite::types::{Value as SqlValue, ValueRef};

const NO_SUCH_TABLE: &str = "no such table: ";

/// A connection to an SQLite database.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    path: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| Error::Custom(format!("failed to open {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn,
            path: path.display().to_string(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| Error::Custom(format!("failed to open in-memory database: {e}")))?;
        tracing::debug!("Opened in-memory SQLite database");
        Ok(Self {
            conn,
            path: ":memory:".to_string(),
        })
    }

    /// Path of the database, `:memory:` for in-memory databases.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run one or more unparameterized statements, such as DDL.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| map_error(sql, &e))
    }

    /// The underlying `rusqlite` connection.
    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let start = Instant::now();
        let mut stmt = self.conn.prepare(sql).map_err(|e| map_error(sql, &e))?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter().map(to_sql_value)))
            .map_err(|e| map_error(sql, &e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| map_error(sql, &e))? {
            let values = (0..columns.len())
                .map(|idx| row.get_ref(idx).map(from_value_ref))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| map_error(sql, &e))?;
            out.push(Row::new(Arc::clone(&columns), values));
        }

        tracing::debug!(
            sql,
            rows = out.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "SQLite query"
        );
        Ok(out)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let start = Instant::now();
        let affected = self
            .conn
            .execute(sql, params_from_iter(params.iter().map(to_sql_value)))
            .map_err(|e| map_error(sql, &e))?;
        tracing::debug!(
            sql,
            rows = affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "SQLite execute"
        );
        Ok(affected as u64)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.execute(sql, params)?;
        Ok(self.conn.last_insert_rowid())
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::BigInt(n) => SqlValue::Integer(*n),
        Value::Double(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::BigInt(n),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}

fn map_error(sql: &str, err: &rusqlite::Error) -> Error {
    let message = err.to_string();
    if let Some(pos) = message.find(NO_SUCH_TABLE) {
        let table = message[pos + NO_SUCH_TABLE.len()..]
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        tracing::warn!(table = %table, "Table not found");
        return Error::TableNotFound { table };
    }
    Error::query(sql, message)
}
