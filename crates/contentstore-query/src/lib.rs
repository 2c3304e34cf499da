//! Schema-validated query building for ContentStore.
//!
//! Translates structured fetch requests into [`QueryPlan`]s and records into
//! INSERT/UPDATE/DELETE statements. Every column reference is checked against
//! the target [`ContentType`](contentstore_core::ContentType) and every value
//! is bound as a parameter.

pub mod builder;
pub mod filter;
pub mod plan;

pub use builder::{DeleteBuilder, InsertBuilder, UpdateBuilder};
pub use filter::{Filter, Operator, Predicate, coerce_value};
pub use plan::{Direction, OrderBy, QueryOptions, QueryPlan};
