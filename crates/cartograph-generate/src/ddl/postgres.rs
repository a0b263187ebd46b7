use std::collections::BTreeSet;

use cartograph_core::{Column, Table};

use super::{Emitter, Engine, EngineText, declared_type, quote_ident, sql_string_literal};

/// Standard relational lowering with inline constraints.
///
/// Schemas live inside a database, so the script switches database with
/// `\connect` before each group of tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresEmitter;

impl PostgresEmitter {
    fn ident(name: &str) -> String {
        quote_ident(name, '"')
    }

    fn qualified(schema: &str, table: &str) -> String {
        format!("{}.{}", Self::ident(schema), Self::ident(table))
    }
}

impl Emitter for PostgresEmitter {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn render_column(&self, table: &Table, column: &Column) -> EngineText {
        let mut line = format!(
            "{} {}",
            Self::ident(&column.name),
            declared_type(column, "TEXT")
        );

        // Composite keys are emitted as a table constraint instead.
        if column.pk && table.primary_key().len() == 1 {
            line.push_str(" PRIMARY KEY");
        }
        if column.unique {
            line.push_str(" UNIQUE");
        }
        if column.not_null {
            line.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            line.push_str(" DEFAULT ");
            line.push_str(default);
        }
        if let Some(fk) = &column.fk {
            let referenced = fk.resolve(&table.id());
            line.push_str(&format!(
                " REFERENCES {}({})",
                Self::qualified(&referenced.schema, &referenced.table),
                Self::ident(&fk.column)
            ));
        }

        EngineText::Sql(line)
    }

    fn render_table(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .values()
            .filter_map(|column| self.render_column(table, column).as_sql().map(str::to_string))
            .collect();

        let primary_key = table.primary_key();
        if primary_key.len() > 1 {
            let columns: Vec<String> = primary_key
                .iter()
                .map(|column| Self::ident(&column.name))
                .collect();
            lines.push(format!("PRIMARY KEY ({})", columns.join(", ")));
        }

        let name = Self::qualified(&table.schema, &table.name);
        let mut out = format!(
            "CREATE TABLE IF NOT EXISTS {name} (\n  {}\n);\n",
            lines.join(",\n  ")
        );

        if let Some(description) = &table.description {
            out.push_str(&format!(
                "COMMENT ON TABLE {name} IS {};\n",
                sql_string_literal(description)
            ));
        }
        for column in table.columns.values() {
            if let Some(description) = &column.description {
                out.push_str(&format!(
                    "COMMENT ON COLUMN {name}.{} IS {};\n",
                    Self::ident(&column.name),
                    sql_string_literal(description)
                ));
            }
        }

        out
    }

    fn render_database(&self, db: &str, tables: &[&Table]) -> String {
        let mut out = format!("-- database: {db}\n\\connect {}\n", Self::ident(db));
        let schemas: BTreeSet<&str> = tables.iter().map(|table| table.schema.as_str()).collect();
        for schema in schemas {
            out.push_str(&format!(
                "CREATE SCHEMA IF NOT EXISTS {};\n",
                Self::ident(schema)
            ));
        }
        out
    }
}
