//! Lowering from the raw document into the canonical graph.
//!
//! Normalization never fails: anything it cannot make sense of is carried
//! into the AST (as an unresolved target or unknown provenance) so that the
//! validator can report every problem in one pass.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::model::{
    Ast, Column, ForeignKeyRef, Mapping, MappingSource, Source, SourceKind, Table, TableId,
    TargetRef,
};
use crate::raw::{RawColumn, RawDocument, RawFrom, RawMapping, RawSource, RawTable};

/// Normalize a raw document into the canonical AST.
///
/// Duplicate table keys and source ids are merged by overwrite: the last
/// declaration wins and the overwritten key is recorded on the AST.
pub fn normalize(raw: &RawDocument) -> Ast {
    let mut ast = Ast {
        project: raw.project.clone(),
        ..Ast::default()
    };

    for source in &raw.sources {
        let source = normalize_source(source);
        if let Some(previous) = ast.sources.insert(source.id.clone(), source) {
            debug!(event = "source_shadowed", source_id = %previous.id);
            ast.shadowed_sources.push(previous.id);
        }
    }

    for group in &raw.targets {
        for table in &group.tables {
            let table = normalize_table(&group.db, &group.schema, table);
            let id = table.id();
            if ast.tables.insert(id.clone(), table).is_some() {
                debug!(event = "table_shadowed", table = %id);
                ast.shadowed_tables.push(id);
            }
        }
    }

    ast.mappings = raw
        .mappings
        .iter()
        .enumerate()
        .map(|(index, mapping)| normalize_mapping(index, mapping))
        .collect();

    debug!(
        event = "normalized",
        sources = ast.sources.len(),
        tables = ast.tables.len(),
        mappings = ast.mappings.len()
    );

    ast
}

fn normalize_source(raw: &RawSource) -> Source {
    Source {
        id: raw.id.clone(),
        kind: SourceKind::parse(&raw.kind),
        metadata: raw.metadata.clone(),
    }
}

fn normalize_table(db: &str, schema: &str, raw: &RawTable) -> Table {
    let mut columns = IndexMap::with_capacity(raw.columns.len());
    for column in &raw.columns {
        columns.insert(column.name.clone(), normalize_column(column));
    }

    Table {
        db: db.to_string(),
        schema: schema.to_string(),
        name: raw.name.clone(),
        description: raw.description.clone(),
        owner: raw.owner.clone(),
        columns,
    }
}

fn normalize_column(raw: &RawColumn) -> Column {
    Column {
        name: raw.name.clone(),
        ty: raw.ty.clone().unwrap_or_default(),
        pk: raw.pk,
        fk: raw.fk.as_ref().map(|fk| ForeignKeyRef {
            table: fk.table.clone(),
            column: fk.column.clone(),
        }),
        unique: raw.unique,
        not_null: raw.not_null,
        default: raw.default.as_ref().and_then(default_text),
        description: raw.description.clone(),
    }
}

fn default_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn normalize_mapping(index: usize, raw: &RawMapping) -> Mapping {
    let (raw_target, target) = match &raw.target {
        Value::String(text) => (text.clone(), TargetRef::parse(text)),
        other => (
            other.to_string(),
            TargetRef::Unresolved { raw: other.clone() },
        ),
    };

    Mapping {
        index,
        raw_target,
        target,
        from: normalize_from(&raw.from),
        notes: raw.notes.clone(),
        tags: raw.tags.clone(),
    }
}

fn normalize_from(raw: &RawFrom) -> MappingSource {
    if let Some(fields) = &raw.fields {
        return MappingSource::Fields {
            source_id: raw.source_id.clone(),
            rule: raw.rule.clone(),
            transform: raw.transform.clone(),
            fields: fields.clone(),
        };
    }

    if let Some(source_id) = &raw.source_id {
        return MappingSource::Field {
            source_id: source_id.clone(),
            path: raw.path.clone(),
            transform: raw.transform.clone(),
        };
    }

    match &raw.rule {
        Some(rule) => MappingSource::Rule { rule: rule.clone() },
        None => MappingSource::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::parse_document;
    use serde_json::json;

    #[test]
    fn last_table_declaration_wins() {
        let raw = parse_document(json!({
            "targets": [
                { "db": "dw", "schema": "sales", "tables": [
                    { "name": "orders", "columns": [{ "name": "id", "type": "INT" }] }
                ]},
                { "db": "dw", "schema": "sales", "tables": [
                    { "name": "orders", "columns": [{ "name": "order_id", "type": "BIGINT" }] }
                ]}
            ]
        }))
        .unwrap();

        let ast = normalize(&raw);
        assert_eq!(ast.tables.len(), 1);
        let table = &ast.tables[&TableId::new("dw", "sales", "orders")];
        assert!(table.columns.contains_key("order_id"));
        assert!(!table.columns.contains_key("id"));
        assert_eq!(ast.shadowed_tables, vec![TableId::new("dw", "sales", "orders")]);
    }

    #[test]
    fn non_string_targets_are_kept_unresolved() {
        let raw = parse_document(json!({
            "mappings": [{ "target": { "table": "orders" }, "from": { "source_id": "crm" } }]
        }))
        .unwrap();

        let ast = normalize(&raw);
        assert_eq!(
            ast.mappings[0].target,
            TargetRef::Unresolved {
                raw: json!({ "table": "orders" })
            }
        );
        assert_eq!(ast.mappings[0].from.source_id(), Some("crm"));
    }

    #[test]
    fn fields_take_precedence_over_source() {
        let raw = parse_document(json!({
            "mappings": [{
                "target": "dw.sales.orders",
                "from": { "source_id": "crm", "fields": { "id": "$.id" } }
            }]
        }))
        .unwrap();

        let ast = normalize(&raw);
        let from = &ast.mappings[0].from;
        assert_eq!(from.fields().map(|fields| fields.len()), Some(1));
        assert_eq!(from.source_id(), Some("crm"));
    }

    #[test]
    fn scalar_defaults_become_text() {
        let raw = parse_document(json!({
            "targets": [{ "db": "dw", "schema": "s", "tables": [{ "name": "t", "columns": [
                { "name": "active", "type": "BOOLEAN", "default": true },
                { "name": "note", "type": "TEXT", "default": null }
            ]}]}]
        }))
        .unwrap();

        let ast = normalize(&raw);
        let table = &ast.tables[&TableId::new("dw", "s", "t")];
        assert_eq!(table.columns["active"].default.as_deref(), Some("true"));
        assert_eq!(table.columns["note"].default, None);
    }
}
