//! Error types shared by every ContentStore crate.

use std::fmt;

/// Result alias used throughout the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure reported by the storage, query, schema or search layers.
#[derive(Debug)]
pub enum Error {
    /// The identifier did not resolve to any registered content type.
    SchemaNotFound(String),
    /// A save or delete was invoked without a resolvable content type.
    MissingContentType {
        /// Operation that required the content type (`save`, `delete`).
        operation: &'static str,
    },
    /// A sort, filter or write target is not a field of the content type.
    InvalidColumn {
        /// Key of the content type the column was checked against.
        content_type: String,
        /// The offending column name.
        column: String,
    },
    /// The backing table of a content type does not exist.
    TableNotFound {
        /// Name of the missing table.
        table: String,
    },
    /// The sample content generator failed or timed out.
    Generator(String),
    /// A free-text query normalized to no usable term.
    InvalidSearchQuery(String),
    /// A filter expression could not be parsed.
    InvalidFilter(String),
    /// The backend rejected a statement.
    Query {
        /// The statement that failed.
        sql: String,
        /// Backend message.
        message: String,
    },
    /// Invalid or unreadable configuration.
    Config(String),
    /// I/O failure (configuration files, database files).
    Io(std::io::Error),
    /// JSON (de)serialization failure.
    Json(serde_json::Error),
    /// Anything else.
    Custom(String),
}

impl Error {
    /// Build an `InvalidColumn` error.
    pub fn invalid_column(content_type: impl Into<String>, column: impl Into<String>) -> Self {
        Error::InvalidColumn {
            content_type: content_type.into(),
            column: column.into(),
        }
    }

    /// Build a `Query` error.
    pub fn query(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Query {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// True for the infrastructure-level "table is missing" condition.
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, Error::TableNotFound { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaNotFound(identifier) => {
                write!(f, "content type not found: {identifier}")
            }
            Error::MissingContentType { operation } => {
                write!(f, "content type is required for {operation}")
            }
            Error::InvalidColumn {
                content_type,
                column,
            } => write!(f, "content type {content_type} has no field named {column}"),
            Error::TableNotFound { table } => write!(f, "table not found: {table}"),
            Error::Generator(msg) => write!(f, "content generator failed: {msg}"),
            Error::InvalidSearchQuery(query) => write!(f, "invalid search query: {query:?}"),
            Error::InvalidFilter(msg) => write!(f, "invalid filter: {msg}"),
            Error::Query { sql, message } => write!(f, "query failed: {message} ({sql})"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
