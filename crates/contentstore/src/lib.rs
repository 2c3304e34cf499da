//! ContentStore: schema-driven content storage, query and search.
//!
//! Content types are defined in configuration, not in code. ContentStore
//! resolves any of a content type's identifiers to its schema, turns fetch
//! requests into validated, parameterized queries, hydrates rows into
//! [`ContentRecord`]s, searches free text across content types and fills
//! content types with generated sample records.
//!
//! # Example
//!
//! ```
//! use contentstore::prelude::*;
//! use contentstore::SqliteConnection;
//! use serde_json::json;
//!
//! let config = StorageConfig::new().content_type(
//!     "pages",
//!     json!({ "sort": "-id", "fields": { "title": { "type": "text" } } }),
//! );
//! let storage = Storage::from_config(SqliteConnection::open_memory().unwrap(), config).unwrap();
//! contentstore::create_tables(&storage).unwrap();
//!
//! let mut page = storage.create_by_name("pages").unwrap();
//! page.set("title", "Hello");
//! let id = storage.save(&mut page).unwrap();
//!
//! let found = storage.fetch_path(&format!("pages/{id}")).unwrap();
//! assert_eq!(found.into_single().unwrap().title().as_deref(), Some("Hello"));
//! ```

pub use contentstore_core::{
    BASE_FIELDS, Connection, ContentRecord, ContentType, Dialect, Error, FieldDef, FieldKind,
    Result, Row, Value,
};
pub use contentstore_query::{Direction, Filter, Operator, OrderBy, Predicate, QueryOptions, QueryPlan};
pub use contentstore_schema::{SchemaRegistry, StorageConfig, create_table_sql, slugify};
pub use contentstore_storage::{
    Fetched, GeneratorFactory, PrefillBuilder, PrefillResponse, RecordGenerator,
    SampleContentFactory, SampleContentGenerator, SearchHit, SearchOptions, SearchQuery,
    SearchResult, Storage, StorageEvent, StorageEventName, StorageEvents,
};

#[cfg(feature = "sqlite")]
pub use contentstore_sqlite::SqliteConnection;

/// Query building.
pub mod query {
    pub use contentstore_query::*;
}

/// Registry, configuration and DDL.
pub mod schema {
    pub use contentstore_schema::*;
}

/// The repository and the services on top of it.
pub mod storage {
    pub use contentstore_storage::*;
}

/// Everything most callers need.
pub mod prelude {
    pub use crate::{
        Connection, ContentRecord, ContentType, Error, FieldDef, FieldKind, Fetched, Filter,
        PrefillBuilder, QueryOptions, Result, SchemaRegistry, SearchOptions, Storage,
        StorageConfig, StorageEventName, Value,
    };
}

/// Create the tables of every registered content type, if missing.
///
/// Runs the SQLite DDL of [`create_table_sql`] statement by statement.
pub fn create_tables<C: Connection>(storage: &Storage<C>) -> Result<()> {
    for ct in storage.registry().iter() {
        for stmt in create_table_sql(ct) {
            storage.connection().execute(&stmt, &[])?;
        }
        tracing::debug!(content_type = %ct.key, table = %ct.table_name, "Ensured table");
    }
    Ok(())
}
