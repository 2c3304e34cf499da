//! Storage configuration.
//!
//! Loaded from JSON. Content type definitions keep their declared order,
//! which is also the registration order of the registry built from them.

use std::path::Path;

use contentstore_core::{ContentType, Error, FieldDef, FieldKind, Result, Value, sanitize_identifier};
use serde::{Deserialize, Deserializer};
use serde_json::Map;

use crate::registry::slugify;

/// Default cap on records per content type for prefill.
pub const DEFAULT_PREFILL_MAX_COUNT: u64 = 200;

/// Default number of hits fetched per content type by search.
pub const DEFAULT_SEARCH_LIMIT_PER_TYPE: u64 = 100;

/// Configuration of the storage layer.
///
/// # Example
///
/// ```
/// use contentstore_schema::StorageConfig;
///
/// let config = StorageConfig::from_json_str(r#"{
///     "table_prefix": "cs_",
///     "prefill_max_count": "25",
///     "content_types": {
///         "pages": { "fields": { "title": { "type": "text" } } }
///     }
/// }"#).unwrap();
///
/// assert_eq!(config.prefill_max_count, 25);
/// let types = config.content_type_definitions().unwrap();
/// assert_eq!(types[0].table_name, "cs_pages");
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prepended to every table name.
    pub table_prefix: String,
    /// Record cap used by prefill when skipping non-empty content types.
    #[serde(deserialize_with = "deserialize_count")]
    pub prefill_max_count: u64,
    /// Whether search only returns records whose status is `published`.
    pub search_published_only: bool,
    /// Maximum hits fetched from each content type by search.
    pub search_limit_per_type: u64,
    /// Status of new records when a content type does not set one.
    pub default_status: String,
    /// Content type definitions by key, in declared order.
    pub content_types: Map<String, serde_json::Value>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table_prefix: String::new(),
            prefill_max_count: DEFAULT_PREFILL_MAX_COUNT,
            search_published_only: true,
            search_limit_per_type: DEFAULT_SEARCH_LIMIT_PER_TYPE,
            default_status: "published".to_string(),
            content_types: Map::new(),
        }
    }
}

impl StorageConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded storage configuration");
        Self::from_json_str(&text)
    }

    /// Set the table prefix.
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Set the prefill record cap.
    pub fn prefill_max_count(mut self, max_count: u64) -> Self {
        self.prefill_max_count = max_count;
        self
    }

    /// Restrict search to published records, or not.
    pub fn search_published_only(mut self, published_only: bool) -> Self {
        self.search_published_only = published_only;
        self
    }

    /// Set the per-content-type search hit limit.
    pub fn search_limit_per_type(mut self, limit: u64) -> Self {
        self.search_limit_per_type = limit;
        self
    }

    /// Set the default status of new records.
    pub fn default_status(mut self, status: impl Into<String>) -> Self {
        self.default_status = status.into();
        self
    }

    /// Add a content type definition.
    pub fn content_type(mut self, key: impl Into<String>, definition: serde_json::Value) -> Self {
        self.content_types.insert(key.into(), definition);
        self
    }

    /// Build the content types declared in this configuration.
    pub fn content_type_definitions(&self) -> Result<Vec<ContentType>> {
        self.content_types
            .iter()
            .map(|(key, raw)| {
                let def = ContentTypeConfig::deserialize(raw)
                    .map_err(|e| Error::Config(format!("content type '{key}': {e}")))?;
                def.into_content_type(key, self)
            })
            .collect()
    }
}

/// Definition of a single content type, as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentTypeConfig {
    /// Plural display name. Defaults to the key.
    pub name: Option<String>,
    /// Singular display name. Defaults to the name.
    pub singular_name: Option<String>,
    /// Plural slug. Defaults to the slugified key.
    pub slug: Option<String>,
    /// Singular slug. Defaults to the slugified singular name.
    pub singular_slug: Option<String>,
    /// Table name without prefix. Defaults to the key.
    pub tablename: Option<String>,
    /// Configured fields, in declared order.
    pub fields: Map<String, serde_json::Value>,
    /// Default sort.
    pub sort: Option<String>,
    /// Whether search covers this content type.
    pub searchable: Option<bool>,
    /// Status of new records.
    pub default_status: Option<String>,
}

/// Definition of a field, as written in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    /// Field type name, see [`FieldKind::from_str`].
    #[serde(rename = "type")]
    pub kind: String,
    /// NOT NULL when set.
    #[serde(default)]
    pub required: bool,
    /// Value for new records.
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl ContentTypeConfig {
    fn into_content_type(self, key: &str, config: &StorageConfig) -> Result<ContentType> {
        let name = self.name.unwrap_or_else(|| key.to_string());
        let singular_name = self.singular_name.unwrap_or_else(|| name.clone());
        let slug = self.slug.unwrap_or_else(|| slugify(key));
        let singular_slug = self
            .singular_slug
            .unwrap_or_else(|| slugify(&singular_name));
        let table = sanitize_identifier(self.tablename.as_deref().unwrap_or(key));

        let mut ct = ContentType::new(key)
            .with_name(name)
            .with_singular_name(singular_name)
            .with_slug(slug)
            .with_singular_slug(singular_slug)
            .with_table_name(format!("{}{table}", config.table_prefix))
            .with_searchable(self.searchable.unwrap_or(true))
            .with_default_status(
                self.default_status
                    .unwrap_or_else(|| config.default_status.clone()),
            );
        if let Some(sort) = self.sort {
            ct = ct.with_sort(sort);
        }

        for (field_name, raw) in self.fields {
            let field: FieldConfig = serde_json::from_value(raw).map_err(|e| {
                Error::Config(format!("field '{field_name}' of '{key}': {e}"))
            })?;
            let kind = FieldKind::from_str(&field.kind).ok_or_else(|| {
                Error::Config(format!(
                    "field '{field_name}' of '{key}' has unknown type '{}'",
                    field.kind
                ))
            })?;
            let mut def = FieldDef::new(field_name, kind);
            if field.required {
                def = def.required();
            }
            if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
                def = def.with_default(Value::from(default));
            }
            ct = ct.with_field(def);
        }
        Ok(ct)
    }
}

/// Coerce a loosely typed count to a non-negative integer.
///
/// Numbers are truncated, strings contribute their leading integer part
/// (`"12abc"` is 12), booleans count as 0 or 1 and anything else is 0.
/// Negative results clamp to 0.
pub fn coerce_count(value: &serde_json::Value) -> u64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|i| i.max(0).unsigned_abs()))
            .or_else(|| n.as_f64().map(float_to_count))
            .unwrap_or(0),
        serde_json::Value::String(s) => leading_integer(s),
        serde_json::Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

#[allow(clippy::cast_sign_loss)]
fn float_to_count(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.trunc() as u64
    } else {
        0
    }
}

fn leading_integer(s: &str) -> u64 {
    let s = s.trim_start();
    if s.starts_with('-') {
        return 0;
    }
    let digits: String = s
        .trim_start_matches('+')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(if digits.is_empty() { 0 } else { u64::MAX })
}

fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_count(&raw))
}
