//! Canonical model and normalizer for Cartograph mapping documents.
//!
//! A document declares target tables, source systems and column-level
//! mappings. This crate reads the loosely-typed document shape and lowers
//! it into the [`Ast`] every other stage consumes.

pub mod error;
pub mod invariants;
pub mod model;
pub mod normalize;
pub mod raw;
pub mod schema;

pub use error::{Error, Result};
pub use invariants::check_invariants;
pub use model::{
    Ast, Column, ForeignKeyRef, Mapping, MappingSource, Source, SourceKind, Table, TableId,
    TargetRef, WILDCARD, split_column_list,
};
pub use normalize::normalize;
pub use raw::{
    DocumentFormat, RawColumn, RawDocument, RawForeignKey, RawFrom, RawMapping, RawSource,
    RawTable, RawTargetGroup, load_document_str, parse_document,
};
pub use schema::document_json_schema;

/// Contract version of the canonical AST artifact.
pub const AST_VERSION: &str = "0.1";
