//! The storage backend contract.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Placeholder style used when rendering parameterized statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?1, ?2, ...`
    #[default]
    Sqlite,
    /// `$1, $2, ...`
    Postgres,
}

impl Dialect {
    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Postgres => format!("${index}"),
        }
    }

    /// Lower-case dialect name, for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
        }
    }
}

/// A relational execution interface.
///
/// Every statement is parameterized: values are passed in `params` and bound
/// by the driver, never spliced into `sql`. Drivers must report a missing
/// table as [`Error::TableNotFound`](crate::Error::TableNotFound) so callers
/// can tell it apart from an empty result.
pub trait Connection {
    /// Placeholder style this connection expects.
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    /// Run a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute an INSERT and return the new row's identity.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;
}

impl<C: Connection + ?Sized> Connection for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        (**self).query_one(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        (**self).insert(sql, params)
    }
}
