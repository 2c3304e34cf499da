//! Content repository for ContentStore.
//!
//! [`Storage`] ties a [`Connection`] to a [`SchemaRegistry`]: it resolves
//! content type identifiers, runs validated query plans, hydrates rows into
//! [`ContentRecord`]s and performs writes with lifecycle notifications.
//! Search and prefill are layered on top of it, in [`search`] and
//! [`prefill`].
//!
//! Every operation is synchronous and self-contained. The repository keeps no
//! reference to records it returns.

pub mod events;
pub mod prefill;
pub mod sample;
pub mod search;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Instant;

use contentstore_core::{Connection, ContentRecord, ContentType, Error, Result, Value};
use contentstore_query::{
    DeleteBuilder, Filter, InsertBuilder, QueryOptions, QueryPlan, UpdateBuilder, coerce_value,
};
use contentstore_schema::{SchemaRegistry, StorageConfig};

pub use events::{StorageEvent, StorageEventName, StorageEvents};
pub use prefill::{GeneratorFactory, PrefillBuilder, PrefillResponse, RecordGenerator};
pub use sample::{SampleContentFactory, SampleContentGenerator};
pub use search::{SearchHit, SearchOptions, SearchQuery, SearchResult};

/// Outcome of a fetch.
#[derive(Debug, Clone)]
pub enum Fetched {
    /// All matching records, possibly none.
    Many(Vec<ContentRecord>),
    /// The one record a single-result fetch asked for.
    Single(ContentRecord),
    /// A single-result fetch matched nothing.
    NotFound,
}

impl Fetched {
    /// Records as a list, whatever the shape.
    pub fn into_records(self) -> Vec<ContentRecord> {
        match self {
            Fetched::Many(records) => records,
            Fetched::Single(record) => vec![record],
            Fetched::NotFound => Vec::new(),
        }
    }

    /// The single record, if this is [`Fetched::Single`].
    pub fn into_single(self) -> Option<ContentRecord> {
        match self {
            Fetched::Single(record) => Some(record),
            _ => None,
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        match self {
            Fetched::Many(records) => records.len(),
            Fetched::Single(_) => 1,
            Fetched::NotFound => 0,
        }
    }

    /// True when no record was found.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The content repository.
#[derive(Debug)]
pub struct Storage<C: Connection> {
    conn: C,
    registry: Arc<SchemaRegistry>,
    events: StorageEvents,
    config: StorageConfig,
}

impl<C: Connection> Storage<C> {
    /// Create a repository with default configuration.
    pub fn new(conn: C, registry: impl Into<Arc<SchemaRegistry>>) -> Self {
        Self {
            conn,
            registry: registry.into(),
            events: StorageEvents::new(),
            config: StorageConfig::default(),
        }
    }

    /// Create a repository whose content types come from `config`.
    pub fn from_config(conn: C, config: StorageConfig) -> Result<Self> {
        let registry = SchemaRegistry::from_config(&config)?;
        tracing::info!(
            content_types = registry.len(),
            table_prefix = %config.table_prefix,
            "Storage configured"
        );
        Ok(Self {
            conn,
            registry: Arc::new(registry),
            events: StorageEvents::new(),
            config,
        })
    }

    /// Replace the configuration. The registry is left as is.
    pub fn with_config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// The schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// The configuration.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Lifecycle listeners.
    pub fn events(&self) -> &StorageEvents {
        &self.events
    }

    /// Register a lifecycle listener.
    pub fn listen<F>(&mut self, name: StorageEventName, listener: F)
    where
        F: Fn(&StorageEvent<'_>) + Send + Sync + 'static,
    {
        self.events.listen(name, listener);
    }

    /// Resolve a content type identifier.
    pub fn content_type(&self, identifier: &str) -> Result<Arc<ContentType>> {
        self.registry.resolve(identifier)
    }

    /// The validated plan `fetch` would run.
    pub fn plan(&self, identifier: &str, options: &QueryOptions) -> Result<QueryPlan> {
        let ct = self.content_type(identifier)?;
        QueryPlan::build(&ct, options)
    }

    /// Fetch records of a content type.
    ///
    /// A single-result fetch returns [`Fetched::Single`] or
    /// [`Fetched::NotFound`]; any other fetch returns [`Fetched::Many`].
    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn fetch(&self, identifier: &str, options: &QueryOptions) -> Result<Fetched> {
        let ct = self.content_type(identifier)?;
        let plan = QueryPlan::build(&ct, options)?;
        let mut records = self.run_plan(&ct, &plan)?;

        if plan.is_single_result() {
            return Ok(if records.is_empty() {
                Fetched::NotFound
            } else {
                Fetched::Single(records.swap_remove(0))
            });
        }
        Ok(Fetched::Many(records))
    }

    /// Fetch by a `contenttype/id-or-slug` path.
    ///
    /// A path without a `/` fetches every record of the content type. A
    /// numeric second segment is an identity, anything else a slug.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn fetch_path(&self, path: &str) -> Result<Fetched> {
        let path = path.trim().trim_matches('/');
        let Some((identifier, item)) = path.split_once('/') else {
            return self.fetch(path, &QueryOptions::new());
        };

        let item = item.trim_matches('/');
        let options = match item.parse::<i64>() {
            Ok(id) => QueryOptions::new().filter("id", Filter::eq(id)),
            Err(_) => QueryOptions::new().filter("slug", Filter::eq(item)),
        };
        self.fetch(identifier, &options.single())
    }

    /// Fetch one record by identity.
    pub fn find(&self, identifier: &str, id: i64) -> Result<Option<ContentRecord>> {
        let options = QueryOptions::new().filter("id", Filter::eq(id)).single();
        Ok(self.fetch(identifier, &options)?.into_single())
    }

    /// Execute a plan built for `ct` and hydrate its rows.
    pub(crate) fn run_plan(&self, ct: &Arc<ContentType>, plan: &QueryPlan) -> Result<Vec<ContentRecord>> {
        let start = Instant::now();
        let (sql, params) = plan.to_select(self.conn.dialect());
        let rows = self.conn.query(&sql, &params)?;
        let records: Vec<ContentRecord> = rows
            .iter()
            .map(|row| ContentRecord::from_row(Arc::clone(ct), row))
            .collect();

        tracing::debug!(
            content_type = %ct.key,
            table = %ct.table_name,
            rows = records.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched records"
        );
        Ok(records)
    }

    /// A new, unsaved record with the content type's defaults applied.
    pub fn create(&self, content_type: &Arc<ContentType>) -> ContentRecord {
        let mut record = ContentRecord::new(Arc::clone(content_type));
        record.set("status", content_type.default_status.as_str());
        for field in &content_type.fields {
            if let Some(default) = &field.default {
                record.set(field.name.as_str(), default.clone());
            }
        }
        record
    }

    /// [`create`](Self::create) by identifier.
    pub fn create_by_name(&self, identifier: &str) -> Result<ContentRecord> {
        let ct = self.content_type(identifier)?;
        Ok(self.create(&ct))
    }

    /// Write a record and return its identity.
    ///
    /// New records are inserted and receive their identity. Records with an
    /// identity are updated; if no row has that identity it is inserted with
    /// it. `PRE_SAVE` fires before the write and `POST_SAVE` after it
    /// succeeds, once each. A record without content type fails with
    /// `MissingContentType` and fires nothing.
    #[tracing::instrument(level = "debug", skip(self, record))]
    pub fn save(&self, record: &mut ContentRecord) -> Result<i64> {
        let ct = record
            .content_type()
            .cloned()
            .ok_or(Error::MissingContentType { operation: "save" })?;
        let dialect = self.conn.dialect();

        let update = match record.id() {
            Some(_) => Some(UpdateBuilder::for_record(record)?.build_with_dialect(dialect)?),
            None => None,
        };
        // Validates the record's columns before anything fires.
        let (insert_sql, insert_params) = InsertBuilder::new(record).build_with_dialect(dialect)?;

        self.emit(StorageEventName::PreSave, &ct, record.id(), Some(&*record));

        let id = match (record.id(), update) {
            (Some(id), Some((sql, params))) => {
                let affected = if sql.is_empty() {
                    self.exists(&ct, id)?.into()
                } else {
                    self.conn.execute(&sql, &params)?
                };
                if affected == 0 {
                    self.conn.insert(&insert_sql, &insert_params)?
                } else {
                    id
                }
            }
            _ => self.conn.insert(&insert_sql, &insert_params)?,
        };
        record.set_id(id);

        tracing::info!(content_type = %ct.key, id, "Saved record");
        self.emit(StorageEventName::PostSave, &ct, Some(id), Some(&*record));
        Ok(id)
    }

    fn exists(&self, ct: &ContentType, id: i64) -> Result<bool> {
        let plan = QueryPlan::build(ct, &QueryOptions::new().filter("id", Filter::eq(id)))?;
        let (sql, params) = plan.to_count(self.conn.dialect());
        Ok(count_of(self.conn.query_one(&sql, &params)?.as_ref()) > 0)
    }

    /// Delete a record by identity.
    ///
    /// An empty or unknown identifier fails with `MissingContentType`. A
    /// non-positive identity, or one with no row, deletes nothing and returns
    /// `Ok(false)`. None of these fire events. Otherwise `PRE_DELETE` fires,
    /// the row is deleted and `POST_DELETE` fires.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn delete(&self, identifier: &str, id: i64) -> Result<bool> {
        let missing = Error::MissingContentType {
            operation: "delete",
        };
        if identifier.trim().is_empty() {
            return Err(missing);
        }
        let ct = self.content_type(identifier).map_err(|_| missing)?;
        if id <= 0 || !self.exists(&ct, id)? {
            tracing::debug!(content_type = %ct.key, id, "Nothing to delete");
            return Ok(false);
        }

        let (sql, params) = DeleteBuilder::new(&ct)
            .by_id(id)
            .build_with_dialect(self.conn.dialect())?;

        self.emit(StorageEventName::PreDelete, &ct, Some(id), None);
        let affected = self.conn.execute(&sql, &params)?;
        tracing::info!(content_type = %ct.key, id, rows = affected, "Deleted record");
        self.emit(StorageEventName::PostDelete, &ct, Some(id), None);

        Ok(affected > 0)
    }

    /// Update one column of one record.
    ///
    /// Returns `Ok(None)` without writing when `column` is not a field of the
    /// content type or is the identity; otherwise the number of rows changed.
    /// Fires no lifecycle events.
    #[tracing::instrument(level = "debug", skip(self, value))]
    pub fn update_single_value(
        &self,
        identifier: &str,
        id: i64,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Option<u64>> {
        let ct = self.content_type(identifier)?;
        let Some(field) = ct.field(column).filter(|f| f.name != "id") else {
            tracing::warn!(content_type = %ct.key, column, "Refusing to update unknown column");
            return Ok(None);
        };

        let value = coerce_value(&value.into(), field.kind);
        let (sql, params) = UpdateBuilder::new(&ct)
            .set(column, value)
            .by_id(id)
            .build_with_dialect(self.conn.dialect())?;
        let affected = self.conn.execute(&sql, &params)?;
        tracing::debug!(content_type = %ct.key, id, column, rows = affected, "Updated single value");
        Ok(Some(affected))
    }

    /// Number of records of a content type.
    ///
    /// Fails with `TableNotFound` when the backing table is missing.
    pub fn count(&self, identifier: &str) -> Result<u64> {
        let ct = self.content_type(identifier)?;
        self.count_filtered(&ct, &QueryOptions::new())
    }

    /// Number of records of a content type matching `options`' filters.
    pub fn count_filtered(&self, ct: &ContentType, options: &QueryOptions) -> Result<u64> {
        let plan = QueryPlan::build(ct, options)?;
        let (sql, params) = plan.to_count(self.conn.dialect());
        Ok(count_of(self.conn.query_one(&sql, &params)?.as_ref()))
    }

    fn emit(
        &self,
        name: StorageEventName,
        content_type: &ContentType,
        id: Option<i64>,
        record: Option<&ContentRecord>,
    ) {
        self.events.dispatch(&StorageEvent {
            name,
            content_type,
            id,
            record,
        });
    }
}

fn count_of(row: Option<&contentstore_core::Row>) -> u64 {
    row.and_then(|r| r.get_named("count").or_else(|| r.get(0)))
        .and_then(Value::as_i64)
        .map_or(0, |n| n.max(0).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockConnection, registry};
    use contentstore_core::Row;
    use std::sync::Mutex;

    fn storage() -> Storage<MockConnection> {
        Storage::new(MockConnection::new(), registry())
    }

    fn counting(storage: &mut Storage<MockConnection>) -> Arc<Mutex<Vec<StorageEventName>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in StorageEventName::ALL {
            let seen = Arc::clone(&seen);
            storage.listen(name, move |event| seen.lock().unwrap().push(event.name));
        }
        seen
    }

    #[test]
    fn test_default_sort_from_content_type() {
        let storage = storage();
        storage.fetch("showcases", &QueryOptions::new()).unwrap();
        let sql = storage.connection().last_sql();
        assert!(sql.contains("ORDER BY \"id\" DESC"), "{sql}");
    }

    #[test]
    fn test_single_result_limits_to_one() {
        let storage = storage();
        let fetched = storage
            .fetch("showcase", &QueryOptions::new().limit(20).single())
            .unwrap();
        assert!(matches!(fetched, Fetched::NotFound));
        assert!(storage.connection().last_sql().ends_with("LIMIT 1"));
    }

    #[test]
    fn test_fetch_path_by_id() {
        let storage = storage();
        storage.connection().push_rows(vec![Row::from_pairs([
            ("id", Value::BigInt(2)),
            ("title", Value::from("Koala")),
        ])]);

        let record = storage.fetch_path("showcase/2").unwrap().into_single().unwrap();
        assert_eq!(record.id(), Some(2));
        assert_eq!(record.content_type().unwrap().key, "showcases");
        let (sql, params) = storage.connection().last();
        assert!(sql.contains("WHERE \"id\" = ?1"));
        assert_eq!(params, vec![Value::BigInt(2)]);
    }

    #[test]
    fn test_save_without_content_type() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        let mut record = ContentRecord::detached();

        let err = storage.save(&mut record).unwrap_err();
        assert_eq!(err.to_string(), "content type is required for save");
        assert!(seen.lock().unwrap().is_empty());
        assert!(storage.connection().statements().is_empty());
    }

    #[test]
    fn test_save_fires_pre_and_post_once() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        let mut record = storage.create_by_name("showcases").unwrap();
        record.set("title", "koala");

        let id = storage.save(&mut record).unwrap();
        assert_eq!(record.id(), Some(id));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StorageEventName::PreSave, StorageEventName::PostSave]
        );
        assert!(storage.connection().last_sql().starts_with("INSERT INTO \"bolt_showcases\""));
    }

    #[test]
    fn test_save_existing_record_updates() {
        let storage = storage();
        storage.connection().set_affected(1);
        let mut record = storage.create_by_name("showcases").unwrap();
        record.set_id(7);
        record.set("title", "changed");

        assert_eq!(storage.save(&mut record).unwrap(), 7);
        assert!(storage.connection().last_sql().starts_with("UPDATE \"bolt_showcases\""));
    }

    #[test]
    fn test_save_unknown_field_fires_nothing() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        let mut record = storage.create_by_name("showcases").unwrap();
        record.set("nonexistent", 1);

        assert!(matches!(
            storage.save(&mut record),
            Err(Error::InvalidColumn { .. })
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_without_content_type() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        assert!(matches!(
            storage.delete("", 999),
            Err(Error::MissingContentType { operation: "delete" })
        ));
        assert!(storage.delete("nothing", 1).is_err());
        assert!(!storage.delete("showcases", 0).unwrap());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_fires_two_events() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        storage.connection().push_rows(vec![Row::from_pairs([("count", Value::BigInt(1))])]);
        storage.connection().set_affected(1);

        assert!(storage.delete("showcases", 1).unwrap());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![StorageEventName::PreDelete, StorageEventName::PostDelete]
        );
    }

    #[test]
    fn test_delete_missing_row_fires_nothing() {
        let mut storage = storage();
        let seen = counting(&mut storage);
        storage.connection().push_rows(vec![Row::from_pairs([("count", Value::BigInt(0))])]);

        assert!(!storage.delete("pages", 4242).unwrap());
        assert!(seen.lock().unwrap().is_empty());
        let statements = storage.connection().statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].0.starts_with("SELECT COUNT(*)"), "{}", statements[0].0);
    }

    #[test]
    fn test_update_single_value() {
        let storage = storage();
        storage.connection().set_affected(1);

        assert_eq!(
            storage.update_single_value("showcases", 2, "ownerid", "10").unwrap(),
            Some(1)
        );
        let (sql, params) = storage.connection().last();
        assert_eq!(sql, "UPDATE \"bolt_showcases\" SET \"ownerid\" = ?1 WHERE \"id\" = ?2");
        assert_eq!(params, vec![Value::BigInt(10), Value::BigInt(2)]);

        let before = storage.connection().statements().len();
        assert_eq!(
            storage.update_single_value("showcases", 2, "nonexistent", "x").unwrap(),
            None
        );
        assert_eq!(storage.update_single_value("showcases", 2, "id", 3).unwrap(), None);
        assert_eq!(storage.connection().statements().len(), before);
    }

    #[test]
    fn test_create_applies_defaults() {
        let storage = storage();
        let record = storage.create_by_name("showcase").unwrap();
        assert_eq!(record.content_type().unwrap().slug, "showcases");
        assert_eq!(record.get("status"), Some(&Value::from("published")));
        assert!(record.is_new());
    }

    #[test]
    fn test_count() {
        let storage = storage();
        storage
            .connection()
            .push_rows(vec![Row::from_pairs([("count", Value::BigInt(5))])]);
        assert_eq!(storage.count("pages").unwrap(), 5);
        assert_eq!(
            storage.connection().last_sql(),
            "SELECT COUNT(*) AS count FROM \"bolt_pages\""
        );
    }

    #[test]
    fn test_unknown_filter_column_rejects_plan() {
        let storage = storage();
        let options = QueryOptions::new().filter("nonexistent", "x");
        assert!(matches!(
            storage.plan("pages", &options),
            Err(Error::InvalidColumn { .. })
        ));
    }
}
