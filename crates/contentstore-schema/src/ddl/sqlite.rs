//! SQLite DDL generator.

use contentstore_core::{ContentType, FieldDef, quote_ident};

use super::{DdlGenerator, SchemaOperation, index_name, literal};

/// Base columns that get a secondary index.
const INDEXED_COLUMNS: [&str; 3] = ["slug", "status", "datepublish"];

/// DDL generator for SQLite.
pub struct SqliteDdlGenerator;

impl DdlGenerator for SqliteDdlGenerator {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn generate(&self, op: &SchemaOperation<'_>) -> Vec<String> {
        let statements = match op {
            SchemaOperation::CreateTable(ct) => {
                let mut stmts = vec![create_table(ct)];
                for column in INDEXED_COLUMNS {
                    if ct.has_field(column) {
                        stmts.push(format!(
                            "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                            index_name(&ct.table_name, column),
                            quote_ident(&ct.table_name),
                            quote_ident(column)
                        ));
                    }
                }
                stmts
            }
            SchemaOperation::DropTable(ct) => {
                vec![format!("DROP TABLE IF EXISTS {}", quote_ident(&ct.table_name))]
            }
        };

        tracing::debug!(
            dialect = self.dialect(),
            statements = statements.len(),
            "Generated DDL"
        );
        statements
    }
}

fn create_table(ct: &ContentType) -> String {
    let columns: Vec<String> = ct.fields.iter().map(column_definition).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quote_ident(&ct.table_name),
        columns.join(",\n  ")
    )
}

fn column_definition(field: &FieldDef) -> String {
    if field.name == "id" {
        return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", quote_ident("id"));
    }
    let mut def = format!("{} {}", quote_ident(&field.name), field.kind.sql_type());
    if !field.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &field.default {
        def.push_str(" DEFAULT ");
        def.push_str(&literal(default));
    }
    def
}
