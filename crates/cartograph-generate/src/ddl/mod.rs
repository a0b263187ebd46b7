//! Schema-definition emitters, one per target engine.
//!
//! Every engine lowers the same [`Column`] model through the [`Emitter`]
//! contract; [`Engine`] is the closed set of supported targets.

mod mongodb;
mod mysql;
mod postgres;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use cartograph_core::{Ast, Column, Table, TableId};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use mongodb::{MongoEmitter, bson_type};
pub use mysql::{MySqlEmitter, mysql_default, mysql_type};
pub use postgres::PostgresEmitter;

use crate::errors::GenerateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Postgres,
    Mysql,
    Mongodb,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Postgres, Engine::Mysql, Engine::Mongodb];

    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
            Engine::Mongodb => "mongodb",
        }
    }

    /// Artifact file name for this engine's script.
    pub fn file_name(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres.sql",
            Engine::Mysql => "mysql.sql",
            Engine::Mongodb => "mongodb.js",
        }
    }

    pub fn emitter(self) -> &'static dyn Emitter {
        match self {
            Engine::Postgres => &PostgresEmitter,
            Engine::Mysql => &MySqlEmitter,
            Engine::Mongodb => &MongoEmitter,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Engine {
    type Err = GenerateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Engine::Postgres),
            "mysql" | "mariadb" => Ok(Engine::Mysql),
            "mongodb" | "mongo" => Ok(Engine::Mongodb),
            other => Err(GenerateError::UnknownEngine(other.to_string())),
        }
    }
}

/// Engine-specific lowering of a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineText {
    /// Column definition line for relational engines.
    Sql(String),
    /// Validator property for document stores.
    Property {
        name: String,
        bson_types: Vec<&'static str>,
        required: bool,
    },
}

impl EngineText {
    pub fn as_sql(&self) -> Option<&str> {
        match self {
            EngineText::Sql(text) => Some(text),
            EngineText::Property { .. } => None,
        }
    }
}

pub trait Emitter: Sync {
    fn engine(&self) -> Engine;

    /// Lower one column of `table`.
    fn render_column(&self, table: &Table, column: &Column) -> EngineText;

    /// Full statement(s) creating `table`.
    fn render_table(&self, table: &Table) -> String;

    /// Statements emitted once before the tables (schemas, databases).
    fn render_preamble(&self, _tables: &[&Table]) -> String {
        String::new()
    }

    /// Statements opening the section for one `db`, before its tables.
    fn render_database(&self, _db: &str, _tables: &[&Table]) -> String {
        String::new()
    }

    fn comment_prefix(&self) -> &'static str {
        "--"
    }

    /// Render the whole document for this engine.
    fn render(&self, ast: &Ast) -> String {
        let tables = ordered_tables(ast);
        let mut out = format!(
            "{} Generated by cartograph for {} ({})\n",
            self.comment_prefix(),
            ast.project.as_deref().unwrap_or("unnamed project"),
            self.engine()
        );

        let preamble = self.render_preamble(&tables);
        if !preamble.is_empty() {
            out.push('\n');
            out.push_str(&preamble);
        }

        let mut databases: BTreeMap<&str, Vec<&Table>> = BTreeMap::new();
        for table in tables {
            databases.entry(table.db.as_str()).or_default().push(table);
        }

        for (db, tables) in databases {
            let section = self.render_database(db, &tables);
            if !section.is_empty() {
                out.push('\n');
                out.push_str(&section);
            }
            for table in tables {
                out.push('\n');
                out.push_str(&self.render_table(table));
            }
        }
        out
    }
}

/// Render the script for one engine.
pub fn render_ddl(ast: &Ast, engine: Engine) -> String {
    let script = engine.emitter().render(ast);
    debug!(
        event = "ddl_rendered",
        engine = %engine,
        tables = ast.tables.len(),
        bytes = script.len()
    );
    script
}

/// Tables with dimension-like names first and fact-like names last, then by key.
///
/// This keeps most foreign keys pointing backwards; it is not a dependency sort.
pub fn ordered_tables(ast: &Ast) -> Vec<&Table> {
    let mut tables: Vec<(&TableId, &Table)> = ast.tables.iter().collect();
    tables.sort_by(|(left_id, left), (right_id, right)| {
        table_rank(&left.name)
            .cmp(&table_rank(&right.name))
            .then_with(|| left_id.cmp(right_id))
    });
    tables.into_iter().map(|(_, table)| table).collect()
}

fn table_rank(name: &str) -> u8 {
    let name = name.to_ascii_lowercase();
    if name.starts_with("dim") {
        0
    } else if name.starts_with("fact") || name.starts_with("fct") {
        2
    } else {
        1
    }
}

/// Column type with a fallback for columns declared without one.
fn declared_type<'a>(column: &'a Column, fallback: &'a str) -> &'a str {
    let ty = column.ty.trim();
    if ty.is_empty() { fallback } else { ty }
}

fn sql_string_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Words both relational engines reject as bare identifiers.
const RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "between", "by", "case", "check", "column",
    "constraint", "create", "cross", "current_date", "current_time", "current_timestamp",
    "current_user", "default", "delete", "desc", "distinct", "drop", "else", "end", "except",
    "exists", "false", "fetch", "for", "foreign", "from", "grant", "group", "having", "in",
    "index", "inner", "insert", "intersect", "into", "is", "join", "key", "left", "like",
    "limit", "natural", "not", "null", "offset", "on", "or", "order", "outer", "primary",
    "references", "right", "select", "table", "then", "to", "true", "union", "unique",
    "update", "user", "using", "values", "when", "where", "with",
];

/// Quote `name` with `quote` unless it is a plain lowercase, unreserved word.
///
/// Embedded quote characters are doubled.
fn quote_ident(name: &str, quote: char) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_lowercase() || ch == '_')
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');

    if plain && !RESERVED_WORDS.contains(&name) {
        name.to_string()
    } else {
        let escaped = name.replace(quote, &format!("{quote}{quote}"));
        format!("{quote}{escaped}{quote}")
    }
}
