//! Query plans: the validated, parameter-bound form of a fetch request.
//!
//! [`QueryOptions`] enumerates everything a caller can ask for. Building a
//! [`QueryPlan`] checks every referenced column against the content type, so a
//! plan that exists is safe to render and execute.
//!
//! # Example
//!
//! ```
//! use contentstore_core::{ContentType, Dialect, FieldDef, FieldKind};
//! use contentstore_query::{QueryOptions, QueryPlan};
//!
//! let entries = ContentType::new("entries")
//!     .with_field(FieldDef::new("title", FieldKind::Text))
//!     .with_sort("-id");
//!
//! let plan = QueryPlan::build(&entries, &QueryOptions::new().filter("title", "%koala%")).unwrap();
//! let (sql, params) = plan.to_select(Dialect::Sqlite);
//!
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM \"entries\" WHERE \"title\" LIKE ?1 ORDER BY \"id\" DESC"
//! );
//! assert_eq!(params.len(), 1);
//! ```

use contentstore_core::{ContentType, Dialect, Error, Result, Value, quote_ident};

use crate::filter::{Filter, Predicate};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// SQL keyword.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name.
    pub column: String,
    /// Direction.
    pub direction: Direction,
}

impl OrderBy {
    /// Parse a sort specification into its terms.
    ///
    /// Accepts comma-separated keys, each either `-column` (descending),
    /// `column` (ascending) or `column ASC|DESC`. An empty specification
    /// yields no terms.
    pub fn parse_list(input: &str) -> Result<Vec<OrderBy>> {
        let mut out = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(column) = part.strip_prefix('-') {
                out.push(OrderBy {
                    column: column.trim().to_string(),
                    direction: Direction::Desc,
                });
                continue;
            }

            let mut words = part.split_whitespace();
            let column = words.next().unwrap_or_default().to_string();
            let direction = match words.next() {
                None => Direction::Asc,
                Some(w) if w.eq_ignore_ascii_case("asc") => Direction::Asc,
                Some(w) if w.eq_ignore_ascii_case("desc") => Direction::Desc,
                Some(w) => {
                    return Err(Error::Custom(format!(
                        "invalid sort direction {w:?} in {input:?}"
                    )));
                }
            };
            if words.next().is_some() {
                return Err(Error::Custom(format!("invalid sort term {part:?}")));
            }
            out.push(OrderBy { column, direction });
        }
        Ok(out)
    }
}

/// Everything a caller can ask of a fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Explicit sort; the content type's default sort applies when `None`.
    pub sort: Option<String>,
    /// Field filters, combined with AND.
    pub filters: Vec<(String, Filter)>,
    /// Maximum rows (page size when `page` is set).
    pub limit: Option<u64>,
    /// Rows to skip. Ignored when `page` is set.
    pub offset: Option<u64>,
    /// 1-based page number; requires `limit`.
    pub page: Option<u64>,
    /// Exactly one result expected; forces the limit to 1.
    pub single_result: bool,
}

impl QueryOptions {
    /// Empty options: everything, default sort.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit sort.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Add a field filter.
    pub fn filter(mut self, field: impl Into<String>, filter: impl Into<Filter>) -> Self {
        self.filters.push((field.into(), filter.into()));
        self
    }

    /// Set the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the offset.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Page-based pagination.
    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.page = Some(page);
        self.limit = Some(page_size);
        self
    }

    /// Expect a single result.
    pub fn single(mut self) -> Self {
        self.single_result = true;
        self
    }
}

/// A validated, executable query against one content type's table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    content_type: String,
    table: String,
    order: Vec<OrderBy>,
    predicate: Option<Predicate>,
    limit: Option<u64>,
    offset: Option<u64>,
    single_result: bool,
}

impl QueryPlan {
    /// Validate `options` against `content_type` and build the plan.
    ///
    /// Fails with `InvalidColumn` when a filter or sort key names a field the
    /// content type does not have. A `page` without `limit` is rejected too.
    pub fn build(content_type: &ContentType, options: &QueryOptions) -> Result<Self> {
        let sort_spec = options
            .sort
            .as_deref()
            .or(content_type.sort.as_deref())
            .unwrap_or_default();
        let order = OrderBy::parse_list(sort_spec)?;
        for term in &order {
            ensure_column(content_type, &term.column)?;
        }

        let mut predicates = Vec::with_capacity(options.filters.len());
        for (name, filter) in &options.filters {
            let field = content_type
                .field(name)
                .ok_or_else(|| Error::invalid_column(&content_type.key, name.as_str()))?;
            predicates.push(filter.bind(field)?);
        }
        let predicate = match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::And(predicates)),
        };

        let (limit, offset) = if options.single_result {
            (Some(1), options.offset)
        } else {
            match (options.page, options.limit) {
                (Some(page), Some(limit)) => {
                    (Some(limit), Some(page.saturating_sub(1).saturating_mul(limit)))
                }
                (Some(page), None) => {
                    return Err(Error::Custom(format!(
                        "page {page} of {} requested without a page size",
                        content_type.key
                    )));
                }
                (None, _) => (options.limit, options.offset),
            }
        };

        tracing::trace!(
            content_type = %content_type.key,
            order = order.len(),
            filtered = predicate.is_some(),
            ?limit,
            ?offset,
            "Built query plan"
        );

        Ok(Self {
            content_type: content_type.key.clone(),
            table: content_type.table_name.clone(),
            order,
            predicate,
            limit,
            offset,
            single_result: options.single_result,
        })
    }

    /// AND an extra predicate into the plan, checking its columns first.
    pub fn and_where(mut self, content_type: &ContentType, predicate: Predicate) -> Result<Self> {
        for column in predicate.columns() {
            ensure_column(content_type, column)?;
        }
        self.predicate = Some(match self.predicate.take() {
            None => predicate,
            Some(Predicate::And(mut children)) => {
                children.push(predicate);
                Predicate::And(children)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
        });
        Ok(self)
    }

    /// Key of the content type this plan targets.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Sort terms.
    pub fn order(&self) -> &[OrderBy] {
        &self.order
    }

    /// Filter predicate.
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// Row limit.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Row offset.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Whether exactly one result is expected.
    pub fn is_single_result(&self) -> bool {
        self.single_result
    }

    /// The ORDER BY clause, or an empty string without sort terms.
    pub fn order_sql(&self) -> String {
        if self.order.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .order
            .iter()
            .map(|o| match o.direction {
                Direction::Asc => quote_ident(&o.column),
                Direction::Desc => format!("{} DESC", quote_ident(&o.column)),
            })
            .collect();
        format!("ORDER BY {}", terms.join(", "))
    }

    fn where_sql(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        self.predicate
            .as_ref()
            .map(|p| format!(" WHERE {}", p.to_sql(dialect, params)))
            .unwrap_or_default()
    }

    /// Render the SELECT statement and its parameters.
    pub fn to_select(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        sql.push_str(&self.where_sql(dialect, &mut params));

        let order = self.order_sql();
        if !order.is_empty() {
            sql.push(' ');
            sql.push_str(&order);
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite needs a LIMIT in front of OFFSET; -1 means unbounded.
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {offset}"));
            }
            _ => {}
        }

        (sql, params)
    }

    /// Render a `SELECT COUNT(*)` over the same table and filter.
    pub fn to_count(&self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(&self.table));
        sql.push_str(&self.where_sql(dialect, &mut params));
        (sql, params)
    }
}

fn ensure_column(content_type: &ContentType, column: &str) -> Result<()> {
    if content_type.has_field(column) {
        Ok(())
    } else {
        Err(Error::invalid_column(&content_type.key, column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;
    use contentstore_core::{FieldDef, FieldKind};

    fn entries() -> ContentType {
        ContentType::new("entries")
            .with_field(FieldDef::new("title", FieldKind::Text))
            .with_field(FieldDef::new("body", FieldKind::Html))
            .with_field(FieldDef::new("rating", FieldKind::Integer))
    }

    #[test]
    fn test_default_sort_descending() {
        let ct = entries().with_sort("-id");
        let plan = QueryPlan::build(&ct, &QueryOptions::new()).unwrap();
        assert_eq!(plan.order_sql(), "ORDER BY \"id\" DESC");
    }

    #[test]
    fn test_explicit_sort_overrides_default() {
        let ct = entries().with_sort("-id");
        let plan = QueryPlan::build(&ct, &QueryOptions::new().sort("title, rating DESC")).unwrap();
        assert_eq!(plan.order_sql(), "ORDER BY \"title\", \"rating\" DESC");
    }

    #[test]
    fn test_unknown_sort_column_rejected() {
        let ct = entries();
        let err = QueryPlan::build(&ct, &QueryOptions::new().sort("-nonexistent")).unwrap_err();
        assert!(matches!(err, Error::InvalidColumn { ref column, .. } if column == "nonexistent"));
    }

    #[test]
    fn test_bad_sort_direction_rejected() {
        let ct = entries();
        assert!(QueryPlan::build(&ct, &QueryOptions::new().sort("title sideways")).is_err());
    }

    #[test]
    fn test_unknown_filter_column_rejected() {
        let ct = entries();
        let err =
            QueryPlan::build(&ct, &QueryOptions::new().filter("nonexistent", "x")).unwrap_err();
        assert!(matches!(err, Error::InvalidColumn { .. }));
    }

    #[test]
    fn test_single_result_forces_limit_one() {
        let ct = entries();
        let plan = QueryPlan::build(&ct, &QueryOptions::new().limit(50).single()).unwrap();
        assert_eq!(plan.limit(), Some(1));
        assert!(plan.is_single_result());
        let (sql, _) = plan.to_select(Dialect::Sqlite);
        assert!(sql.ends_with(" LIMIT 1"), "{sql}");
    }

    #[test]
    fn test_page_computes_offset() {
        let ct = entries();
        let plan = QueryPlan::build(&ct, &QueryOptions::new().page(3, 10)).unwrap();
        assert_eq!(plan.limit(), Some(10));
        assert_eq!(plan.offset(), Some(20));
        let (sql, _) = plan.to_select(Dialect::Sqlite);
        assert!(sql.ends_with(" LIMIT 10 OFFSET 20"), "{sql}");
    }

    #[test]
    fn test_page_without_limit_rejected() {
        let options = QueryOptions {
            page: Some(2),
            ..QueryOptions::default()
        };
        let err = QueryPlan::build(&entries(), &options).unwrap_err();
        assert!(matches!(err, Error::Custom(ref msg) if msg.contains("page size")), "{err}");
    }

    #[test]
    fn test_offset_without_limit() {
        let ct = entries();
        let plan = QueryPlan::build(&ct, &QueryOptions::new().offset(5)).unwrap();
        let (sql, _) = plan.to_select(Dialect::Sqlite);
        assert!(sql.ends_with(" LIMIT -1 OFFSET 5"), "{sql}");
    }

    #[test]
    fn test_filters_are_bound() {
        let ct = entries();
        let options = QueryOptions::new()
            .filter("title", "koala")
            .filter("rating", ">3");
        let plan = QueryPlan::build(&ct, &options).unwrap();
        let (sql, params) = plan.to_select(Dialect::Sqlite);
        assert_eq!(
            sql,
            "SELECT * FROM \"entries\" WHERE (\"title\" = ?1 AND \"rating\" > ?2)"
        );
        assert_eq!(
            params,
            vec![Value::Text("koala".to_string()), Value::BigInt(3)]
        );
    }

    #[test]
    fn test_and_where_checks_columns() {
        let ct = entries();
        let plan = QueryPlan::build(&ct, &QueryOptions::new().filter("title", "a")).unwrap();
        let plan = plan
            .and_where(&ct, Predicate::compare("status", Operator::Eq, "published"))
            .unwrap();
        let (sql, params) = plan.to_count(Dialect::Sqlite);
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS count FROM \"entries\" WHERE (\"title\" = ?1 AND \"status\" = ?2)"
        );
        assert_eq!(params.len(), 2);

        let bad = plan.and_where(&ct, Predicate::compare("nope", Operator::Eq, 1));
        assert!(matches!(bad, Err(Error::InvalidColumn { .. })));
    }

    #[test]
    fn test_no_sort_no_order_clause() {
        let ct = entries();
        let plan = QueryPlan::build(&ct, &QueryOptions::new()).unwrap();
        assert_eq!(plan.order_sql(), "");
        assert_eq!(plan.to_select(Dialect::Sqlite).0, "SELECT * FROM \"entries\"");
    }
}
