//! Content type and field definitions.
//!
//! A content type is a user-configured schema: its identifiers, its backing
//! table, its fields and its default sort. Content types are immutable once
//! loaded and shared as `Arc<ContentType>`.

use crate::value::Value;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Single line of text.
    Text,
    /// Multi-line plain text.
    Textarea,
    /// HTML markup.
    Html,
    /// Markdown source.
    Markdown,
    /// URL slug.
    Slug,
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Boolean checkbox.
    Checkbox,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Date and time (`YYYY-MM-DD HH:MM:SS`).
    DateTime,
    /// One value out of a fixed list.
    Select,
    /// Identity of a record in another content type.
    Relation,
}

impl FieldKind {
    /// Parse a configured field type (case-insensitive).
    ///
    /// Returns `None` if the string is not a recognized type.
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(FieldKind::Text),
            "textarea" => Some(FieldKind::Textarea),
            "html" => Some(FieldKind::Html),
            "markdown" => Some(FieldKind::Markdown),
            "slug" => Some(FieldKind::Slug),
            "integer" | "int" => Some(FieldKind::Integer),
            "float" | "number" => Some(FieldKind::Float),
            "checkbox" | "bool" | "boolean" => Some(FieldKind::Checkbox),
            "date" => Some(FieldKind::Date),
            "datetime" => Some(FieldKind::DateTime),
            "select" => Some(FieldKind::Select),
            "relation" => Some(FieldKind::Relation),
            _ => None,
        }
    }

    /// Configuration name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Html => "html",
            FieldKind::Markdown => "markdown",
            FieldKind::Slug => "slug",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::DateTime => "datetime",
            FieldKind::Select => "select",
            FieldKind::Relation => "relation",
        }
    }

    /// Whether free-text search looks at fields of this kind.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Html
                | FieldKind::Markdown
                | FieldKind::Slug
        )
    }

    /// SQLite column type for this kind.
    #[must_use]
    pub const fn sql_type(&self) -> &'static str {
        match self {
            FieldKind::Integer | FieldKind::Checkbox | FieldKind::Relation => "INTEGER",
            FieldKind::Float => "REAL",
            _ => "TEXT",
        }
    }
}

/// A single field of a content type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Semantic type.
    pub kind: FieldKind,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Value applied to new records.
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create a nullable field without default.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            default: None,
        }
    }

    /// Mark as NOT NULL.
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default value for new records.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Columns every content table carries, ahead of its configured fields.
pub const BASE_FIELDS: &[(&str, FieldKind)] = &[
    ("id", FieldKind::Integer),
    ("slug", FieldKind::Slug),
    ("datecreated", FieldKind::DateTime),
    ("datechanged", FieldKind::DateTime),
    ("datepublish", FieldKind::DateTime),
    ("ownerid", FieldKind::Integer),
    ("status", FieldKind::Select),
];

/// A content type schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentType {
    /// Configuration key, the canonical identity.
    pub key: String,
    /// Plural URL slug.
    pub slug: String,
    /// Singular URL slug.
    pub singular_slug: String,
    /// Plural display name.
    pub name: String,
    /// Singular display name.
    pub singular_name: String,
    /// Backing table.
    pub table_name: String,
    /// Base fields followed by configured fields, in order.
    pub fields: Vec<FieldDef>,
    /// Default sort (`-id`, `title`, `datepublish DESC, id`).
    pub sort: Option<String>,
    /// Whether free-text search includes this content type.
    pub searchable: bool,
    /// Status given to new records.
    pub default_status: String,
}

impl ContentType {
    /// Create a content type whose identifiers and table all derive from `key`.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let fields = BASE_FIELDS
            .iter()
            .map(|(name, kind)| {
                let field = FieldDef::new(*name, *kind);
                if *name == "id" { field.required() } else { field }
            })
            .collect();
        Self {
            slug: key.clone(),
            singular_slug: key.clone(),
            name: key.clone(),
            singular_name: key.clone(),
            table_name: key.clone(),
            key,
            fields,
            sort: None,
            searchable: true,
            default_status: "published".to_string(),
        }
    }

    /// Set the plural slug.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Set the singular slug.
    pub fn with_singular_slug(mut self, slug: impl Into<String>) -> Self {
        self.singular_slug = slug.into();
        self
    }

    /// Set the plural display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the singular display name.
    pub fn with_singular_name(mut self, name: impl Into<String>) -> Self {
        self.singular_name = name.into();
        self
    }

    /// Set the backing table.
    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Set the default sort.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Include or exclude from search.
    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Set the status applied to new records.
    pub fn with_default_status(mut self, status: impl Into<String>) -> Self {
        self.default_status = status.into();
        self
    }

    /// Append a field. A field with the name of an existing one replaces it.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        if let Some(existing) = self.fields.iter_mut().find(|f| f.name == field.name) {
            *existing = field;
        } else {
            self.fields.push(field);
        }
        self
    }

    /// Look up a field by column name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a field of this content type.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Fields that free-text search matches against.
    pub fn text_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.kind.is_text())
    }

    /// Fields that are not base columns.
    pub fn configured_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| !BASE_FIELDS.iter().any(|(name, _)| *name == f.name))
    }

    /// Field used as the record title: `title` if present, else the first
    /// configured text field.
    pub fn title_field(&self) -> Option<&FieldDef> {
        self.field("title").or_else(|| {
            self.configured_fields()
                .find(|f| matches!(f.kind, FieldKind::Text))
        })
    }
}
