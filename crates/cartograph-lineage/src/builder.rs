use std::collections::{BTreeMap, BTreeSet, HashMap};

use cartograph_core::{Ast, Mapping, MappingSource, TableId, TargetRef, WILDCARD};
use indexmap::IndexMap;
use tracing::debug;

use crate::model::{
    Edge, EdgeKind, EdgeMetadata, LineageGraph, Node, column_node_id, rule_node_id,
    source_column_node_id, source_node_id, table_node_id,
};

/// Placeholder used when a mapping does not say where its value comes from.
pub const UNKNOWN: &str = "unknown";

/// Build the lineage graph for a normalized document.
///
/// Every declared source, table and column gets a node whether or not a
/// mapping touches it. Every mapping contributes provenance, even when it
/// names no origin at all.
pub fn build_lineage(ast: &Ast) -> LineageGraph {
    let mut builder = GraphBuilder::default();

    for source in ast.sources.values() {
        builder.add_node(Node::Source {
            id: source_node_id(&source.id),
            source_id: source.id.clone(),
            kind: Some(source.kind.as_str().to_string()),
            declared: true,
        });
    }

    for (table_id, table) in &ast.tables {
        builder.add_node(Node::Table {
            id: table_node_id(table_id),
            table: table_id.clone(),
            declared: true,
        });
        for column in table.columns.values() {
            builder.add_node(Node::Column {
                id: column_node_id(table_id, &column.name),
                table: table_id.clone(),
                column: column.name.clone(),
                ty: Some(column.ty.clone()),
                declared: true,
            });
        }
    }

    for mapping in &ast.mappings {
        builder.add_mapping(mapping);
    }

    let graph = builder.finish();
    debug!(
        event = "lineage_built",
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        table_edges = graph.table_edges.len()
    );
    graph
}

/// Resolved origin of one mapped value.
struct Provenance {
    node: String,
    /// `src:<id>` or `rule:<rule>`; groups column edges into table edges.
    root: String,
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    table_edges: BTreeMap<(String, String), BTreeSet<String>>,
    unresolved: Vec<usize>,
}

impl GraphBuilder {
    /// Insert a node unless one with the same id already exists.
    fn add_node(&mut self, node: Node) -> String {
        let id = node.id().to_string();
        if !self.index.contains_key(&id) {
            self.index.insert(id.clone(), self.nodes.len());
            self.nodes.push(node);
        }
        id
    }

    fn add_mapping(&mut self, mapping: &Mapping) {
        match &mapping.target {
            TargetRef::Unresolved { .. } => {
                self.single_provenance(&mapping.from);
                self.unresolved.push(mapping.index);
            }
            TargetRef::Column { table, .. } => {
                let provenance = self.single_provenance(&mapping.from);
                for column in mapping.target.column_tokens() {
                    let target = self.ensure_column(table, column);
                    self.add_edge(mapping, &provenance, target, table, column);
                }
            }
            TargetRef::Wildcard { table } => match non_empty_fields(&mapping.from) {
                Some(fields) => {
                    for (column, path) in fields {
                        let provenance = self.field_provenance(&mapping.from, path);
                        let target = self.ensure_column(table, column);
                        self.add_edge(mapping, &provenance, target, table, column);
                    }
                }
                None => {
                    let provenance = self.single_provenance(&mapping.from);
                    let target = self.ensure_table(table);
                    self.add_edge(mapping, &provenance, target, table, WILDCARD);
                }
            },
        }
    }

    /// Provenance for mappings that feed a single value.
    fn single_provenance(&mut self, from: &MappingSource) -> Provenance {
        match from {
            MappingSource::Field {
                source_id, path, ..
            } => self.source_column(source_id, path.as_deref().unwrap_or(UNKNOWN)),
            MappingSource::Rule { rule } => self.rule(rule),
            MappingSource::Fields {
                source_id, rule, ..
            } => match (source_id, rule) {
                (Some(source_id), _) => self.source_column(source_id, UNKNOWN),
                (None, Some(rule)) => self.rule(rule),
                (None, None) => self.source_column(UNKNOWN, UNKNOWN),
            },
            MappingSource::Unknown => self.source_column(UNKNOWN, UNKNOWN),
        }
    }

    /// Provenance for one entry of a `fields` expansion.
    fn field_provenance(&mut self, from: &MappingSource, path: &str) -> Provenance {
        match (from.source_id(), from.rule()) {
            (Some(source_id), _) => self.source_column(source_id, path),
            (None, Some(rule)) => self.rule(rule),
            (None, None) => self.source_column(UNKNOWN, path),
        }
    }

    fn source_column(&mut self, source_id: &str, path: &str) -> Provenance {
        let root = source_node_id(source_id);
        if !self.index.contains_key(&root) {
            self.add_node(Node::Source {
                id: root.clone(),
                source_id: source_id.to_string(),
                kind: None,
                declared: false,
            });
        }
        let node = self.add_node(Node::SourceColumn {
            id: source_column_node_id(source_id, path),
            source_id: source_id.to_string(),
            path: path.to_string(),
        });
        Provenance { node, root }
    }

    fn rule(&mut self, rule: &str) -> Provenance {
        let node = self.add_node(Node::Rule {
            id: rule_node_id(rule),
            rule: rule.to_string(),
            label: rule_label(rule),
        });
        Provenance {
            root: node.clone(),
            node,
        }
    }

    fn ensure_table(&mut self, table: &TableId) -> String {
        self.add_node(Node::Table {
            id: table_node_id(table),
            table: table.clone(),
            declared: false,
        })
    }

    fn ensure_column(&mut self, table: &TableId, column: &str) -> String {
        self.ensure_table(table);
        self.add_node(Node::Column {
            id: column_node_id(table, column),
            table: table.clone(),
            column: column.to_string(),
            ty: None,
            declared: false,
        })
    }

    fn add_edge(
        &mut self,
        mapping: &Mapping,
        provenance: &Provenance,
        target: String,
        table: &TableId,
        column: &str,
    ) {
        self.edges.push(Edge {
            source: provenance.node.clone(),
            target,
            kind: EdgeKind::ColumnLineage,
            metadata: EdgeMetadata {
                mapping_index: Some(mapping.index),
                raw_target: Some(mapping.raw_target.clone()),
                column: Some(column.to_string()),
                transform: mapping.from.transform().map(str::to_string),
                notes: mapping.notes.clone(),
                columns: Vec::new(),
            },
        });

        self.table_edges
            .entry((provenance.root.clone(), table_node_id(table)))
            .or_default()
            .insert(column.to_string());
    }

    fn finish(self) -> LineageGraph {
        let table_edges = self
            .table_edges
            .into_iter()
            .map(|((source, target), columns)| Edge {
                source,
                target,
                kind: EdgeKind::TableLineage,
                metadata: EdgeMetadata {
                    columns: columns.into_iter().collect(),
                    ..EdgeMetadata::default()
                },
            })
            .collect();

        LineageGraph {
            nodes: self.nodes,
            edges: self.edges,
            table_edges,
            unresolved_mappings: self.unresolved,
        }
    }
}

fn non_empty_fields(from: &MappingSource) -> Option<&IndexMap<String, String>> {
    from.fields().filter(|fields| !fields.is_empty())
}

/// Readable label for a rule: enclosing parens and quotes are dropped.
pub fn rule_label(rule: &str) -> String {
    let mut label = rule.trim();
    while let Some(inner) = strip_enclosing(label) {
        if inner.trim().is_empty() {
            break;
        }
        label = inner.trim();
    }
    label.to_string()
}

fn strip_enclosing(text: &str) -> Option<&str> {
    for quote in ['"', '\'', '`'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return Some(&text[1..text.len() - 1]);
        }
    }

    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    // `(a) + (b)` is not wrapped as a whole.
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return None;
        }
    }
    (depth == 0).then_some(inner)
}
