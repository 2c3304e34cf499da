//! Content type registry, configuration and DDL for ContentStore.
//!
//! - [`SchemaRegistry`] resolves any identifier of a content type (key, slug,
//!   singular slug, name, singular name) to its definition.
//! - [`StorageConfig`] loads content type definitions and storage settings
//!   from JSON.
//! - [`ddl`] renders the tables backing content types.

pub mod config;
pub mod ddl;
pub mod registry;

pub use config::{ContentTypeConfig, FieldConfig, StorageConfig, coerce_count};
pub use ddl::{DdlGenerator, SchemaOperation, SqliteDdlGenerator, create_table_sql, drop_table_sql};
pub use registry::{SchemaRegistry, slugify};
