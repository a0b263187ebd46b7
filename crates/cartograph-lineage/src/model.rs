use cartograph_core::TableId;
use serde::{Deserialize, Serialize};

/// Node of the lineage graph. Every variant carries a stable synthetic id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Source {
        id: String,
        source_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        /// False for ids referenced by mappings but never declared.
        declared: bool,
    },
    Table {
        id: String,
        table: TableId,
        declared: bool,
    },
    Column {
        id: String,
        table: TableId,
        column: String,
        #[serde(rename = "data_type", default, skip_serializing_if = "Option::is_none")]
        ty: Option<String>,
        declared: bool,
    },
    SourceColumn {
        id: String,
        source_id: String,
        path: String,
    },
    Rule {
        id: String,
        rule: String,
        label: String,
    },
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Source { id, .. }
            | Node::Table { id, .. }
            | Node::Column { id, .. }
            | Node::SourceColumn { id, .. }
            | Node::Rule { id, .. } => id,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Node::Source { .. })
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Node::Table { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    ColumnLineage,
    TableLineage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_target: Option<String>,
    /// Target column for column edges (`*` for a bare wildcard).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Contributing columns for table edges, sorted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(default)]
    pub metadata: EdgeMetadata,
}

/// Column- and table-level provenance for a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub table_edges: Vec<Edge>,
    /// Mappings whose target could not be resolved; they have provenance
    /// nodes but no edge.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_mappings: Vec<usize>,
}

impl LineageGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Edges feeding the given node.
    pub fn upstream<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |edge| edge.target == id)
    }
}

pub fn source_node_id(source_id: &str) -> String {
    format!("src:{source_id}")
}

pub fn table_node_id(table: &TableId) -> String {
    format!("t:{table}")
}

pub fn column_node_id(table: &TableId, column: &str) -> String {
    format!("t:{table}.{column}")
}

pub fn source_column_node_id(source_id: &str, path: &str) -> String {
    format!("sc:{source_id}:{path}")
}

pub fn rule_node_id(rule: &str) -> String {
    format!("rule:{rule}")
}
