//! Column- and table-level lineage for mapping documents.
//!
//! The graph is a superset view of the schema: every declared source, table
//! and column is present, plus one provenance node per distinct origin
//! referenced by a mapping.

pub mod builder;
pub mod model;

pub use builder::{UNKNOWN, build_lineage, rule_label};
pub use model::{
    Edge, EdgeKind, EdgeMetadata, LineageGraph, Node, column_node_id, rule_node_id,
    source_column_node_id, source_node_id, table_node_id,
};
