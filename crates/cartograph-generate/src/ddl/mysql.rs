use std::collections::BTreeSet;

use cartograph_core::{Column, Table};

use super::{Emitter, Engine, EngineText, declared_type, quote_ident, sql_string_literal};

/// MySQL lowering: aliased types, rewritten defaults and trailing keys.
///
/// MySQL parses but ignores inline `REFERENCES`, so foreign keys are always
/// table constraints here. The target schema is the MySQL database; `db`
/// has no counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlEmitter;

impl MySqlEmitter {
    fn ident(name: &str) -> String {
        quote_ident(name, '`')
    }

    fn qualified(schema: &str, table: &str) -> String {
        format!("{}.{}", Self::ident(schema), Self::ident(table))
    }
}

/// Map a dialect-agnostic type to the MySQL spelling.
pub fn mysql_type(raw: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    let aliased = match normalized.as_str() {
        "" | "text" | "string" => "VARCHAR(255)",
        "uuid" => "CHAR(36)",
        "json" | "jsonb" => "JSON",
        "timestamptz" | "timestamp with time zone" => "TIMESTAMP",
        "bool" | "boolean" => "TINYINT(1)",
        "double precision" => "DOUBLE",
        "bytea" => "BLOB",
        _ => return raw.trim().to_string(),
    };
    aliased.to_string()
}

/// Rewrite default expressions that MySQL spells differently.
pub fn mysql_default(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "now()" | "current_timestamp" | "current_timestamp()" => "CURRENT_TIMESTAMP".to_string(),
        "gen_random_uuid()" | "uuid_generate_v4()" => "(UUID())".to_string(),
        _ => raw.to_string(),
    }
}

impl Emitter for MySqlEmitter {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    fn render_column(&self, _table: &Table, column: &Column) -> EngineText {
        let mut line = format!(
            "{} {}",
            Self::ident(&column.name),
            mysql_type(declared_type(column, ""))
        );

        if column.not_null {
            line.push_str(" NOT NULL");
        }
        if column.unique {
            line.push_str(" UNIQUE");
        }
        if let Some(default) = &column.default {
            line.push_str(" DEFAULT ");
            line.push_str(&mysql_default(default));
        }

        EngineText::Sql(line)
    }

    fn render_table(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .values()
            .filter_map(|column| self.render_column(table, column).as_sql().map(str::to_string))
            .collect();

        let primary_key: Vec<String> = table
            .primary_key()
            .iter()
            .map(|column| Self::ident(&column.name))
            .collect();
        if !primary_key.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));
        }

        let owner = table.id();
        for column in table.columns.values() {
            if let Some(fk) = &column.fk {
                let referenced = fk.resolve(&owner);
                lines.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    Self::ident(&column.name),
                    Self::qualified(&referenced.schema, &referenced.table),
                    Self::ident(&fk.column)
                ));
            }
        }

        let mut options = String::from(" ENGINE=InnoDB");
        if let Some(description) = &table.description {
            options.push_str(&format!(" COMMENT={}", sql_string_literal(description)));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n){options};\n",
            Self::qualified(&table.schema, &table.name),
            lines.join(",\n  ")
        )
    }

    fn render_preamble(&self, tables: &[&Table]) -> String {
        let databases: BTreeSet<&str> = tables.iter().map(|table| table.schema.as_str()).collect();
        databases
            .into_iter()
            .map(|database| {
                format!("CREATE DATABASE IF NOT EXISTS {};\n", Self::ident(database))
            })
            .collect()
    }
}
