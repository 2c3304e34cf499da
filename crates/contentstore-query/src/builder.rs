//! Statement builders for INSERT, UPDATE and DELETE of content records.
//!
//! Every builder checks its target columns against the content type and
//! returns the SQL text together with the values to bind.

use contentstore_core::{ContentRecord, ContentType, Dialect, Error, Result, Value, quote_ident};

use crate::filter::{Operator, Predicate};

/// INSERT builder for a new record.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use contentstore_core::{ContentRecord, ContentType, Dialect, FieldDef, FieldKind};
/// use contentstore_query::InsertBuilder;
///
/// let pages = Arc::new(ContentType::new("pages").with_field(FieldDef::new("title", FieldKind::Text)));
/// let mut record = ContentRecord::new(pages);
/// record.set("title", "Hello");
///
/// let (sql, params) = InsertBuilder::new(&record).build_with_dialect(Dialect::Sqlite).unwrap();
/// assert_eq!(sql, "INSERT INTO \"pages\" (\"title\") VALUES (?1)");
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    record: &'a ContentRecord,
}

impl<'a> InsertBuilder<'a> {
    /// Create a new INSERT builder for the given record.
    pub fn new(record: &'a ContentRecord) -> Self {
        Self { record }
    }

    /// Build the INSERT SQL and parameters with the default dialect.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the INSERT SQL and parameters with a specific dialect.
    ///
    /// An explicit identity is inserted as well, so records can be imported
    /// with fixed ids.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let ct = self
            .record
            .content_type()
            .ok_or(Error::MissingContentType { operation: "save" })?;

        let mut columns = Vec::new();
        let mut values = Vec::new();
        if let Some(id) = self.record.id() {
            columns.push(quote_ident("id"));
            values.push(Value::BigInt(id));
        }
        for (name, value) in self.record.to_write_pairs()? {
            columns.push(quote_ident(name));
            values.push(value.clone());
        }

        if columns.is_empty() {
            return Ok((
                format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&ct.table_name)),
                Vec::new(),
            ));
        }

        let placeholders: Vec<_> = (1..=values.len()).map(|i| dialect.placeholder(i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&ct.table_name),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, values))
    }
}

/// A column-value pair for explicit UPDATE SET operations.
#[derive(Debug, Clone)]
struct SetClause {
    column: String,
    value: Value,
}

/// UPDATE builder.
///
/// # Example
///
/// ```
/// use contentstore_core::{ContentType, Dialect};
/// use contentstore_query::UpdateBuilder;
///
/// let pages = ContentType::new("pages");
/// let (sql, params) = UpdateBuilder::new(&pages)
///     .set("ownerid", 10)
///     .by_id(2)
///     .build_with_dialect(Dialect::Sqlite)
///     .unwrap();
///
/// assert_eq!(sql, "UPDATE \"pages\" SET \"ownerid\" = ?1 WHERE \"id\" = ?2");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    content_type: &'a ContentType,
    sets: Vec<SetClause>,
    where_clause: Option<Predicate>,
}

impl<'a> UpdateBuilder<'a> {
    /// Create an empty UPDATE builder for explicit SET operations.
    pub fn new(content_type: &'a ContentType) -> Self {
        Self {
            content_type,
            sets: Vec::new(),
            where_clause: None,
        }
    }

    /// Create an UPDATE of every written field of a saved record, by identity.
    pub fn for_record(record: &'a ContentRecord) -> Result<Self> {
        let ct = record
            .content_type()
            .ok_or(Error::MissingContentType { operation: "save" })?;
        let id = record
            .id()
            .ok_or_else(|| Error::Custom("cannot update a record without identity".to_string()))?;

        let mut builder = Self::new(ct);
        for (name, value) in record.to_write_pairs()? {
            builder = builder.set(name, value.clone());
        }
        Ok(builder.by_id(id))
    }

    /// Set a column to a value.
    pub fn set<V: Into<Value>>(mut self, column: &str, value: V) -> Self {
        self.sets.push(SetClause {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(Predicate::And(mut children)) => {
                children.push(predicate);
                Predicate::And(children)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    /// Restrict to the record with this identity.
    pub fn by_id(self, id: i64) -> Self {
        self.filter(Predicate::compare("id", Operator::Eq, id))
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the UPDATE SQL and parameters.
    ///
    /// Returns an empty statement when there is nothing to set. Fails with
    /// `InvalidColumn` when a SET or WHERE column is not a field.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let ct = self.content_type;
        if self.sets.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut params = Vec::new();
        let mut set_clauses = Vec::with_capacity(self.sets.len());
        for set in &self.sets {
            if !ct.has_field(&set.column) {
                return Err(Error::invalid_column(&ct.key, set.column.as_str()));
            }
            params.push(set.value.clone());
            set_clauses.push(format!(
                "{} = {}",
                quote_ident(&set.column),
                dialect.placeholder(params.len())
            ));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(&ct.table_name),
            set_clauses.join(", ")
        );

        if let Some(where_clause) = &self.where_clause {
            for column in where_clause.columns() {
                if !ct.has_field(column) {
                    return Err(Error::invalid_column(&ct.key, column));
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.to_sql(dialect, &mut params));
        }

        Ok((sql, params))
    }
}

/// DELETE builder.
///
/// # Example
///
/// ```
/// use contentstore_core::{ContentType, Dialect};
/// use contentstore_query::DeleteBuilder;
///
/// let pages = ContentType::new("pages");
/// let (sql, _) = DeleteBuilder::new(&pages).by_id(1).build_with_dialect(Dialect::Sqlite).unwrap();
/// assert_eq!(sql, "DELETE FROM \"pages\" WHERE \"id\" = ?1");
/// ```
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    content_type: &'a ContentType,
    where_clause: Option<Predicate>,
}

impl<'a> DeleteBuilder<'a> {
    /// Create a new DELETE builder for the content type.
    pub fn new(content_type: &'a ContentType) -> Self {
        Self {
            content_type,
            where_clause: None,
        }
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => Predicate::And(vec![existing, predicate]),
            None => predicate,
        });
        self
    }

    /// Restrict to the record with this identity.
    pub fn by_id(self, id: i64) -> Self {
        self.filter(Predicate::compare("id", Operator::Eq, id))
    }

    /// Build with the default dialect.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        self.build_with_dialect(Dialect::default())
    }

    /// Build the DELETE SQL and parameters.
    pub fn build_with_dialect(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let ct = self.content_type;
        let mut sql = format!("DELETE FROM {}", quote_ident(&ct.table_name));
        let mut params = Vec::new();

        if let Some(where_clause) = &self.where_clause {
            for column in where_clause.columns() {
                if !ct.has_field(column) {
                    return Err(Error::invalid_column(&ct.key, column));
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.to_sql(dialect, &mut params));
        }

        Ok((sql, params))
    }
}
