//! Core types and traits for ContentStore.
//!
//! `contentstore-core` is the **foundation layer** for the workspace. It defines the
//! traits and data types that all other crates build on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Connection` is the trait implemented by storage drivers.
//! - **Data model**: `Row`, `Value`, `ContentType` and `ContentRecord` represent
//!   schemas, query inputs and hydrated results, shared across the query, schema,
//!   storage and driver crates.
//! - **Errors**: a single `Error` enum so every layer reports failures the same way.
//!
//! # Who Uses This Crate
//!
//! - `contentstore-query` consumes `ContentType` metadata and `Value` to build SQL.
//! - `contentstore-schema` builds `ContentType` values from configuration and indexes them.
//! - `contentstore-storage` depends on `Connection`, `Row` and `ContentRecord` for
//!   fetch/save/delete, search and prefill flows.
//! - `contentstore-sqlite` implements `Connection`.
//!
//! Most applications should use the `contentstore` facade; reach for
//! `contentstore-core` directly when writing drivers or advanced integrations.

pub mod connection;
pub mod content_type;
pub mod error;
pub mod identifiers;
pub mod record;
pub mod row;
pub mod value;

pub use connection::{Connection, Dialect};
pub use content_type::{BASE_FIELDS, ContentType, FieldDef, FieldKind};
pub use error::{Error, Result};
pub use identifiers::{quote_ident, sanitize_identifier};
pub use record::ContentRecord;
pub use row::Row;
pub use value::Value;
