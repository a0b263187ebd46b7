use std::collections::BTreeMap;

use cartograph_core::{Ast, Column, Table};
use serde::Serialize;
use tracing::debug;

/// Mermaid ER diagram source for one `(db, schema)` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramSource {
    pub db: String,
    pub schema: String,
    pub text: String,
}

impl DiagramSource {
    /// File stem used when the diagram is written out (`db.schema`).
    pub fn file_stem(&self) -> String {
        format!("{}.{}", self.db, self.schema)
    }
}

/// Render one `erDiagram` per `(db, schema)` group, groups in key order.
pub fn render_diagrams(ast: &Ast) -> Vec<DiagramSource> {
    let mut groups: BTreeMap<(&str, &str), Vec<&Table>> = BTreeMap::new();
    for table in ast.tables.values() {
        groups
            .entry((table.db.as_str(), table.schema.as_str()))
            .or_default()
            .push(table);
    }

    let diagrams: Vec<DiagramSource> = groups
        .into_iter()
        .map(|((db, schema), tables)| DiagramSource {
            db: db.to_string(),
            schema: schema.to_string(),
            text: render_group(&tables),
        })
        .collect();

    debug!(event = "diagrams_rendered", groups = diagrams.len());
    diagrams
}

fn render_group(tables: &[&Table]) -> String {
    let mut out = String::from("erDiagram\n");

    for table in tables {
        out.push_str(&format!("    {} {{\n", sanitize_token(&table.name)));
        for column in table.columns.values() {
            out.push_str(&format!(
                "        {} {}",
                sanitize_token(&column.ty),
                sanitize_token(&column.name)
            ));
            let flags = column_flags(column);
            if !flags.is_empty() {
                out.push_str(&format!(" \"{}\"", flags.join(" ")));
            }
            out.push('\n');
        }
        out.push_str("    }\n");
    }

    for table in tables {
        let owner = table.id();
        for column in table.columns.values() {
            let Some(fk) = &column.fk else {
                continue;
            };
            let referenced = fk.resolve(&owner);
            let in_group = referenced.db == owner.db
                && referenced.schema == owner.schema
                && tables.iter().any(|other| other.name == referenced.table);
            if in_group {
                out.push_str(&format!(
                    "    {} ||--o{{ {} : \"{}\"\n",
                    sanitize_token(&referenced.table),
                    sanitize_token(&table.name),
                    sanitize_token(&column.name)
                ));
            }
        }
    }

    out
}

/// Flag tokens in fixed order: PK, FK, UNIQUE, NOT_NULL.
pub fn column_flags(column: &Column) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if column.pk {
        flags.push("PK");
    }
    if column.fk.is_some() {
        flags.push("FK");
    }
    if column.unique {
        flags.push("UNIQUE");
    }
    if column.not_null {
        flags.push("NOT_NULL");
    }
    flags
}

/// Reduce a string to `[A-Za-z0-9_]`, collapsing underscore runs.
///
/// `DECIMAL(10, 2)` becomes `DECIMAL_10_2`.
pub fn sanitize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch.is_ascii_alphanumeric() { ch } else { '_' };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}
