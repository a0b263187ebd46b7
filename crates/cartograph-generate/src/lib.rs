//! Artifact renderers for normalized mapping documents.
//!
//! Each renderer is an independent function of the [`cartograph_core::Ast`]:
//! the mapping matrix (CSV), Mermaid ER diagrams and per-engine DDL scripts.
//! None of them consult the validation report; they render best-effort
//! output for documents that still have errors.

pub mod ddl;
pub mod diagram;
pub mod errors;
pub mod tabular;

pub use ddl::{Emitter, Engine, EngineText, ordered_tables, render_ddl};
pub use diagram::{DiagramSource, column_flags, render_diagrams, sanitize_token};
pub use errors::GenerateError;
pub use tabular::{MAPPING_CSV_HEADER, UNKNOWN_TYPE, render_mapping_csv};
