//! A recording connection and fixture registry for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use contentstore_core::{Connection, ContentType, FieldDef, FieldKind, Result, Row, Value};
use contentstore_schema::SchemaRegistry;

/// Records every statement; answers queries from a queue of canned row sets.
#[derive(Debug, Default)]
pub struct MockConnection {
    statements: RefCell<Vec<(String, Vec<Value>)>>,
    rows: RefCell<VecDeque<Vec<Row>>>,
    affected: Cell<u64>,
    next_id: Cell<i64>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.rows.borrow_mut().push_back(rows);
    }

    pub fn set_affected(&self, affected: u64) {
        self.affected.set(affected);
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.statements.borrow().clone()
    }

    pub fn last(&self) -> (String, Vec<Value>) {
        self.statements.borrow().last().cloned().unwrap_or_default()
    }

    pub fn last_sql(&self) -> String {
        self.last().0
    }

    fn record(&self, sql: &str, params: &[Value]) {
        self.statements
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
    }
}

impl Connection for MockConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(sql, params);
        Ok(self.rows.borrow_mut().pop_front().unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.record(sql, params);
        Ok(self.affected.get())
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.record(sql, params);
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        Ok(id)
    }
}

/// `showcases` (sorted `-id`) and `pages`, with a `bolt_` table prefix.
pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.register(
        ContentType::new("showcases")
            .with_singular_slug("showcase")
            .with_name("Showcases")
            .with_singular_name("Showcase")
            .with_table_name("bolt_showcases")
            .with_sort("-id")
            .with_field(FieldDef::new("title", FieldKind::Text))
            .with_field(FieldDef::new("body", FieldKind::Html)),
    );
    registry.register(
        ContentType::new("pages")
            .with_singular_slug("page")
            .with_table_name("bolt_pages")
            .with_field(FieldDef::new("title", FieldKind::Text))
            .with_field(FieldDef::new("teaser", FieldKind::Textarea)),
    );
    registry
}
