use cartograph_core::{Ast, Mapping, MappingSource, TargetRef};
use tracing::debug;

use crate::errors::GenerateError;

/// Header of the mapping matrix export.
pub const MAPPING_CSV_HEADER: [&str; 13] = [
    "target",
    "db",
    "schema",
    "table",
    "column",
    "type",
    "source_id",
    "path",
    "transform",
    "rule",
    "fields",
    "notes",
    "tags",
];

/// Value of the type cell when a qualified target column is not declared.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Render the mapping matrix: one CSV row per mapping.
pub fn render_mapping_csv(ast: &Ast) -> Result<String, GenerateError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(MAPPING_CSV_HEADER)?;
    for mapping in &ast.mappings {
        writer.write_record(mapping_record(ast, mapping))?;
    }

    writer.flush()?;
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    let text = String::from_utf8(bytes)?;

    debug!(
        event = "mapping_csv_rendered",
        rows = ast.mappings.len(),
        bytes = text.len()
    );
    Ok(text)
}

fn mapping_record(ast: &Ast, mapping: &Mapping) -> Vec<String> {
    let (db, schema, table) = match mapping.target.table() {
        Some(id) => (id.db.clone(), id.schema.clone(), id.table.clone()),
        None => Default::default(),
    };
    let column = mapping.target.column().unwrap_or_default().to_string();

    let ty = match &mapping.target {
        TargetRef::Column { .. } => ast
            .resolve_column(&mapping.target)
            .map(|column| column.ty.clone())
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        _ => String::new(),
    };

    let from = &mapping.from;
    let path = match from {
        MappingSource::Field { path, .. } => path.clone().unwrap_or_default(),
        _ => String::new(),
    };
    let fields = from
        .fields()
        .map(|fields| {
            fields
                .iter()
                .map(|(column, path)| format!("{column}={path}"))
                .collect::<Vec<_>>()
                .join(";")
        })
        .unwrap_or_default();

    vec![
        mapping.raw_target.clone(),
        db,
        schema,
        table,
        column,
        ty,
        from.source_id().unwrap_or_default().to_string(),
        path,
        from.transform().unwrap_or_default().to_string(),
        from.rule().unwrap_or_default().to_string(),
        fields,
        mapping.notes.clone().unwrap_or_default(),
        mapping.tags.join(";"),
    ]
}
