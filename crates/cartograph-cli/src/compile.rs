use std::path::Path;

use cartograph_core::{
    Ast, DocumentFormat, check_invariants, load_document_str, normalize, parse_document,
};
use cartograph_generate::{
    DiagramSource, Engine, GenerateError, render_ddl, render_diagrams, render_mapping_csv,
};
use cartograph_lineage::{LineageGraph, build_lineage};
use cartograph_validate::{ValidateError, ValidationReport, validate_document, validate_document_json};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Core(#[from] cartograph_core::Error),
    #[error(transparent)]
    Validate(#[from] ValidateError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("document does not match the mapping schema ({} issue(s))", .0.errors.len())]
    Structural(ValidationReport),
}

/// Everything one pass over a document produces.
#[derive(Debug)]
pub struct Compilation {
    pub ast: Ast,
    pub report: ValidationReport,
    pub lineage: LineageGraph,
    pub mappings_csv: String,
    pub diagrams: Vec<DiagramSource>,
    pub ddl: Vec<(Engine, String)>,
}

/// Read a `.json` or `.toml` document from disk.
pub fn load_document(path: &Path) -> Result<Value, CompileError> {
    let format = DocumentFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| CompileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    Ok(load_document_str(&text, format)?)
}

/// Shape check, normalization and referential validation.
///
/// Structural problems stop here; referential findings are returned in
/// the report so the caller decides what they mean.
pub fn analyze(document: Value) -> Result<(Ast, ValidationReport), CompileError> {
    let structural = validate_document_json(&document)?;
    if !structural.is_ok() {
        warn!(event = "schema_rejected", errors = structural.errors.len());
        return Err(CompileError::Structural(structural));
    }

    let raw = parse_document(document)?;
    let ast = normalize(&raw);
    check_invariants(&ast)?;

    let mut report = structural;
    report.merge(validate_document(&ast));
    Ok((ast, report))
}

/// Run every stage and render artifacts for the requested engines.
pub fn compile(document: Value, engines: &[Engine]) -> Result<Compilation, CompileError> {
    let (ast, report) = analyze(document)?;

    let lineage = build_lineage(&ast);
    let mappings_csv = render_mapping_csv(&ast)?;
    let diagrams = render_diagrams(&ast);
    let ddl = engines
        .iter()
        .map(|engine| (*engine, render_ddl(&ast, *engine)))
        .collect();

    info!(
        event = "compiled",
        tables = ast.tables.len(),
        mappings = ast.mappings.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        diagrams = diagrams.len()
    );

    Ok(Compilation {
        ast,
        report,
        lineage,
        mappings_csv,
        diagrams,
        ddl,
    })
}
