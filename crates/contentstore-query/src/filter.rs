//! Filter expressions and the predicates they bind to.
//!
//! A [`Filter`] is what a caller asks for on one field ("greater than 5",
//! "either `news` or `blog`"). Binding it to a field of a content type yields a
//! [`Predicate`], the column-checked node a [`QueryPlan`](crate::QueryPlan)
//! renders. Values only ever reach SQL as bound parameters.
//!
//! # String syntax
//!
//! | input | meaning |
//! |---|---|
//! | `koala` | `= 'koala'` |
//! | `!koala` | `<> 'koala'` |
//! | `>5`, `>=5`, `<5`, `<=5` | comparisons |
//! | `%koala%` | `LIKE '%koala%'` (`!%koala%` for NOT LIKE) |
//! | `NULL`, `!NULL` | `IS NULL`, `IS NOT NULL` |
//! | `a \|\| b` | either condition |
//! | `a && b` | both conditions |
//!
//! `&&` groups before `||`.

use contentstore_core::{Dialect, Error, FieldDef, FieldKind, Result, Value, quote_ident};

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Operator {
    /// SQL text of the operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Whether the operator takes an operand.
    pub const fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

/// A condition on one field, not yet bound to a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `<field> <op> <value>`
    Condition {
        /// Comparison operator.
        op: Operator,
        /// Operand, ignored for the NULL tests.
        value: Value,
    },
    /// Any of the nested filters.
    Any(Vec<Filter>),
    /// All of the nested filters.
    All(Vec<Filter>),
}

impl Filter {
    /// Equality with a literal value (no operator parsing).
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::cmp(Operator::Eq, value)
    }

    /// Inequality.
    pub fn ne(value: impl Into<Value>) -> Self {
        Self::cmp(Operator::Ne, value)
    }

    /// LIKE with a pattern (`%` and `_` wildcards).
    pub fn like(pattern: impl Into<String>) -> Self {
        Self::cmp(Operator::Like, Value::Text(pattern.into()))
    }

    /// Case-insensitive "contains" (SQLite LIKE is ASCII case-insensitive).
    pub fn contains(term: &str) -> Self {
        Self::like(format!("%{}%", term))
    }

    /// `IS NULL`.
    pub fn is_null() -> Self {
        Self::cmp(Operator::IsNull, Value::Null)
    }

    /// Arbitrary comparison.
    pub fn cmp(op: Operator, value: impl Into<Value>) -> Self {
        Filter::Condition {
            op,
            value: value.into(),
        }
    }

    /// Parse the string filter syntax described in the module docs.
    ///
    /// `&&` binds tighter than `||`: `>1 && <5 || 9` is `(>1 AND <5) OR 9`.
    pub fn parse(input: &str) -> Self {
        if input.contains("||") {
            return Filter::Any(input.split("||").map(Self::parse_all).collect());
        }
        Self::parse_all(input)
    }

    fn parse_all(input: &str) -> Self {
        if input.contains("&&") {
            return Filter::All(input.split("&&").map(Self::parse_single).collect());
        }
        Self::parse_single(input)
    }

    fn parse_single(input: &str) -> Self {
        let input = input.trim();

        if input.eq_ignore_ascii_case("null") {
            return Self::is_null();
        }
        if input.eq_ignore_ascii_case("!null") {
            return Self::cmp(Operator::IsNotNull, Value::Null);
        }

        let (op, rest) = if let Some(rest) = input.strip_prefix(">=") {
            (Operator::Ge, rest)
        } else if let Some(rest) = input.strip_prefix("<=") {
            (Operator::Le, rest)
        } else if let Some(rest) = input.strip_prefix('>') {
            (Operator::Gt, rest)
        } else if let Some(rest) = input.strip_prefix('<') {
            (Operator::Lt, rest)
        } else if let Some(rest) = input.strip_prefix('!') {
            if rest.contains('%') {
                (Operator::NotLike, rest)
            } else {
                (Operator::Ne, rest)
            }
        } else if input.contains('%') {
            (Operator::Like, input)
        } else {
            (Operator::Eq, input)
        };

        Self::cmp(op, Value::Text(rest.trim().to_string()))
    }

    /// Bind this filter to a field, producing a predicate.
    ///
    /// Text operands are coerced to the field's numeric type where it has one,
    /// so `>5` on an integer field compares numbers, not strings.
    pub fn bind(&self, field: &FieldDef) -> Result<Predicate> {
        match self {
            Filter::Condition { op, value } => Ok(Predicate::Compare {
                column: field.name.clone(),
                op: *op,
                value: if op.takes_value() {
                    coerce_value(value, field.kind)
                } else {
                    Value::Null
                },
            }),
            Filter::Any(parts) | Filter::All(parts) if parts.is_empty() => Err(
                Error::InvalidFilter(format!("empty filter group on {}", field.name)),
            ),
            Filter::Any(parts) => Ok(Predicate::Or(
                parts.iter().map(|p| p.bind(field)).collect::<Result<_>>()?,
            )),
            Filter::All(parts) => Ok(Predicate::And(
                parts.iter().map(|p| p.bind(field)).collect::<Result<_>>()?,
            )),
        }
    }
}

impl From<&str> for Filter {
    fn from(input: &str) -> Self {
        Filter::parse(input)
    }
}

impl From<String> for Filter {
    fn from(input: String) -> Self {
        Filter::parse(&input)
    }
}

impl From<i64> for Filter {
    fn from(v: i64) -> Self {
        Filter::eq(v)
    }
}

impl From<Value> for Filter {
    fn from(v: Value) -> Self {
        Filter::eq(v)
    }
}

/// Coerce a text operand to the storage type of a field kind.
///
/// Non-text values and text that does not parse are returned unchanged.
pub fn coerce_value(value: &Value, kind: FieldKind) -> Value {
    let Value::Text(text) = value else {
        return value.clone();
    };
    match kind {
        FieldKind::Integer | FieldKind::Relation | FieldKind::Checkbox => text
            .trim()
            .parse::<i64>()
            .map_or_else(|_| value.clone(), Value::BigInt),
        FieldKind::Float => text
            .trim()
            .parse::<f64>()
            .map_or_else(|_| value.clone(), Value::Double),
        _ => value.clone(),
    }
}

/// A column-bound condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `"column" op ?`
    Compare {
        /// Column name.
        column: String,
        /// Operator.
        op: Operator,
        /// Bound operand.
        value: Value,
    },
    /// All children hold.
    And(Vec<Predicate>),
    /// At least one child holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Shorthand for a comparison node.
    pub fn compare(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// Every column this predicate references.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Compare { column, .. } => out.push(column),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
        }
    }

    /// Render to SQL, appending operands to `params`.
    ///
    /// Placeholders are numbered after whatever `params` already holds.
    pub fn to_sql(&self, dialect: Dialect, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Compare { column, op, value } => {
                if op.takes_value() {
                    params.push(value.clone());
                    format!(
                        "{} {} {}",
                        quote_ident(column),
                        op.as_sql(),
                        dialect.placeholder(params.len())
                    )
                } else {
                    format!("{} {}", quote_ident(column), op.as_sql())
                }
            }
            Predicate::And(children) => join_children(children, " AND ", dialect, params),
            Predicate::Or(children) => join_children(children, " OR ", dialect, params),
        }
    }
}

fn join_children(
    children: &[Predicate],
    sep: &str,
    dialect: Dialect,
    params: &mut Vec<Value>,
) -> String {
    match children {
        [] => "1 = 1".to_string(),
        [only] => only.to_sql(dialect, params),
        _ => {
            let parts: Vec<String> = children
                .iter()
                .map(|c| c.to_sql(dialect, params))
                .collect();
            format!("({})", parts.join(sep))
        }
    }
}
