//! Content records: field values bound to a content type at runtime.
//!
//! Provides `ContentRecord` for working with rows whose schema is only known
//! once the content type configuration has been loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::content_type::ContentType;
use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// A record of some content type.
///
/// Unlike a compile-time model, a `ContentRecord` stores values in a map keyed
/// by field name, trading type safety for schemas defined in configuration.
/// The identity is `None` until the record has been saved.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use contentstore_core::{ContentRecord, ContentType, FieldDef, FieldKind, Value};
///
/// let pages = Arc::new(
///     ContentType::new("pages").with_field(FieldDef::new("title", FieldKind::Text)),
/// );
/// let mut record = ContentRecord::new(pages);
/// record.set("title", "Hello");
///
/// assert_eq!(record.get("title").and_then(Value::as_str), Some("Hello"));
/// assert!(record.is_new());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentRecord {
    content_type: Option<Arc<ContentType>>,
    id: Option<i64>,
    values: BTreeMap<String, Value>,
}

impl ContentRecord {
    /// Create an empty record of the given content type.
    pub fn new(content_type: Arc<ContentType>) -> Self {
        Self {
            content_type: Some(content_type),
            id: None,
            values: BTreeMap::new(),
        }
    }

    /// Create a record that is not bound to any content type.
    ///
    /// Such a record cannot be saved.
    pub fn detached() -> Self {
        Self::default()
    }

    /// The content type, if bound.
    pub fn content_type(&self) -> Option<&Arc<ContentType>> {
        self.content_type.as_ref()
    }

    /// Bind the record to a content type.
    pub fn set_content_type(&mut self, content_type: Arc<ContentType>) {
        self.content_type = Some(content_type);
    }

    /// Identity, once saved.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Set the identity.
    pub fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// True until the record has an identity.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Set a field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        if field == "id" {
            if let Some(id) = value.as_i64() {
                self.id = Some(id);
            }
            return;
        }
        self.values.insert(field, value);
    }

    /// Set several field values at once.
    pub fn set_values<I, K, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in values {
            self.set(k, v);
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Remove a value, returning it.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    /// Check if a field has a value set.
    pub fn has(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// All field values, by name.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Display title: the value of the content type's title field.
    pub fn title(&self) -> Option<String> {
        let field = self.content_type.as_ref()?.title_field()?;
        self.values.get(&field.name).map(Value::to_text)
    }

    /// Column/value pairs to write, in field order, excluding the identity.
    ///
    /// Fails with `InvalidColumn` when a value names a field the content type
    /// does not have, and with `MissingContentType` for a detached record.
    pub fn to_write_pairs(&self) -> Result<Vec<(&str, &Value)>> {
        let ct = self
            .content_type
            .as_ref()
            .ok_or(Error::MissingContentType { operation: "save" })?;

        if let Some(unknown) = self.values.keys().find(|k| !ct.has_field(k)) {
            return Err(Error::invalid_column(&ct.key, unknown.as_str()));
        }

        Ok(ct
            .fields
            .iter()
            .filter(|f| f.name != "id")
            .filter_map(|f| self.values.get(&f.name).map(|v| (f.name.as_str(), v)))
            .collect())
    }

    /// Hydrate a record from a database row.
    ///
    /// Only columns that are fields of the content type are copied; a missing
    /// column of a nullable field reads as `Null`.
    pub fn from_row(content_type: Arc<ContentType>, row: &Row) -> Self {
        let mut record = Self::new(Arc::clone(&content_type));
        for field in &content_type.fields {
            match row.get_named(&field.name) {
                Some(value) if field.name == "id" => record.id = value.as_i64(),
                Some(value) => {
                    record.values.insert(field.name.clone(), value.clone());
                }
                None if field.nullable && field.name != "id" => {
                    record.values.insert(field.name.clone(), Value::Null);
                }
                None => {}
            }
        }
        record
    }
}

impl Serialize for ContentRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        map.serialize_entry(
            "contenttype",
            &self.content_type.as_ref().map(|ct| ct.key.as_str()),
        )?;
        map.serialize_entry("id", &self.id)?;
        for (k, v) in &self.values {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
