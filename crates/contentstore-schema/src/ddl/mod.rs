//! DDL generation for content tables.
//!
//! Renders the statements that bring up (or tear down) the backing table of a
//! content type. Only SQLite is rendered today; the trait is the seam for
//! other backends.

mod sqlite;

pub use sqlite::SqliteDdlGenerator;

use contentstore_core::{ContentType, Value, quote_ident};

/// A schema change to render.
#[derive(Debug, Clone, Copy)]
pub enum SchemaOperation<'a> {
    /// Create the table of a content type, with its indexes.
    CreateTable(&'a ContentType),
    /// Drop the table of a content type.
    DropTable(&'a ContentType),
}

/// Renders schema operations as SQL statements.
pub trait DdlGenerator {
    /// Dialect name, for logging.
    fn dialect(&self) -> &'static str;

    /// Statements implementing `op`, in execution order.
    fn generate(&self, op: &SchemaOperation<'_>) -> Vec<String>;
}

/// `CREATE TABLE` and `CREATE INDEX` statements for a content type (SQLite).
pub fn create_table_sql(content_type: &ContentType) -> Vec<String> {
    SqliteDdlGenerator.generate(&SchemaOperation::CreateTable(content_type))
}

/// `DROP TABLE` statement for a content type (SQLite).
pub fn drop_table_sql(content_type: &ContentType) -> Vec<String> {
    SqliteDdlGenerator.generate(&SchemaOperation::DropTable(content_type))
}

/// Render a value as an SQL literal for a `DEFAULT` clause.
fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::Double(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

fn index_name(table: &str, column: &str) -> String {
    quote_ident(&format!("idx_{table}_{column}"))
}
