use std::collections::{HashMap, HashSet};

use cartograph_core::{Ast, Mapping, MappingSource, SourceKind, TableId, TargetRef};
use tracing::info;

use crate::errors::{ValidationIssue, ValidationReport};

/// Check every cross-reference in the canonical graph.
///
/// Each check is independent: a bad mapping never hides problems in the
/// mappings after it, and nothing here fails or mutates the input.
pub fn validate_document(ast: &Ast) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut coverage = Coverage::default();

    for mapping in &ast.mappings {
        validate_mapping(ast, mapping, &mut coverage, &mut report);
    }

    validate_not_null(ast, &coverage, &mut report);
    validate_unused_sources(ast, &coverage, &mut report);
    validate_declarations(ast, &mut report);

    info!(
        event = "validation_finished",
        errors = report.errors.len(),
        warnings = report.warnings.len()
    );

    report
}

/// Columns and sources touched by at least one mapping.
#[derive(Default)]
struct Coverage<'a> {
    columns: HashMap<&'a TableId, HashSet<&'a str>>,
    sources: HashSet<&'a str>,
}

impl<'a> Coverage<'a> {
    fn mark(&mut self, table: &'a TableId, column: &'a str) {
        self.columns.entry(table).or_default().insert(column);
    }

    fn is_mapped(&self, table: &TableId, column: &str) -> bool {
        self.columns
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    }
}

fn validate_mapping<'a>(
    ast: &'a Ast,
    mapping: &'a Mapping,
    coverage: &mut Coverage<'a>,
    report: &mut ValidationReport,
) {
    let base_path = format!("/mappings/{}", mapping.index);

    if let Some(source_id) = mapping.from.source_id() {
        coverage.sources.insert(source_id);
        if ast.source(source_id).is_none() {
            report.push_error(ValidationIssue::error(
                "unknown_source",
                format!("{base_path}/from/source_id"),
                format!(
                    "source '{}' referenced by mapping '{}' is not declared",
                    source_id, mapping.raw_target
                ),
                Some("declare the source under `sources` or fix the id".to_string()),
            ));
        }
    }

    if matches!(mapping.from, MappingSource::Unknown) {
        report.push_warning(ValidationIssue::warning(
            "unknown_provenance",
            format!("{base_path}/from"),
            format!(
                "mapping '{}' has no source_id, rule or fields",
                mapping.raw_target
            ),
            None,
        ));
    }

    let table_id = match &mapping.target {
        TargetRef::Unresolved { .. } => {
            report.push_error(ValidationIssue::error(
                "unresolved_target",
                format!("{base_path}/target"),
                format!(
                    "mapping target {} is not a db.schema.table[.column] reference",
                    mapping.raw_target
                ),
                None,
            ));
            return;
        }
        TargetRef::Column { table, .. } | TargetRef::Wildcard { table } => table,
    };

    let Some(table) = ast.table(table_id) else {
        report.push_error(ValidationIssue::error(
            "unknown_table",
            format!("{base_path}/target"),
            format!(
                "table '{}' not found for mapping target '{}'",
                table_id, mapping.raw_target
            ),
            None,
        ));
        return;
    };

    // An empty `fields` object expands to nothing, same as a bare wildcard.
    let fields = mapping.from.fields().filter(|fields| !fields.is_empty());
    match &mapping.target {
        TargetRef::Wildcard { .. } => match fields {
            Some(fields) => {
                for column in fields.keys() {
                    coverage.mark(table_id, column);
                    if !table.columns.contains_key(column) {
                        report.push_error(ValidationIssue::error(
                            "unknown_column",
                            format!("{base_path}/from/fields/{column}"),
                            format!(
                                "column '{}' not found for wildcard mapping '{}'",
                                table_id.column_key(column),
                                mapping.raw_target
                            ),
                            None,
                        ));
                    }
                }
            }
            None => {
                report.push_warning(ValidationIssue::warning(
                    "wildcard_without_fields",
                    format!("{base_path}/target"),
                    format!(
                        "wildcard mapping '{}' has no fields breakdown; no column is marked as mapped",
                        mapping.raw_target
                    ),
                    Some("list target columns under from.fields".to_string()),
                ));
            }
        },
        TargetRef::Column { .. } => {
            for column in mapping.target.column_tokens() {
                coverage.mark(table_id, column);
                if !table.columns.contains_key(column) {
                    report.push_error(ValidationIssue::error(
                        "unknown_column",
                        format!("{base_path}/target"),
                        format!(
                            "column '{}' not found for mapping target '{}'",
                            table_id.column_key(column),
                            mapping.raw_target
                        ),
                        None,
                    ));
                }
            }
        }
        TargetRef::Unresolved { .. } => {}
    }
}

fn validate_not_null(ast: &Ast, coverage: &Coverage<'_>, report: &mut ValidationReport) {
    for (table_id, table) in &ast.tables {
        for column in table.columns.values() {
            if column.needs_mapping() && !coverage.is_mapped(table_id, &column.name) {
                report.push_error(ValidationIssue::error(
                    "unmapped_not_null",
                    format!("/tables/{table_id}/columns/{}", column.name),
                    format!(
                        "NOT NULL column '{}' has no default and no mapping populates it",
                        table_id.column_key(&column.name)
                    ),
                    Some("add a mapping or a default value".to_string()),
                ));
            }
        }
    }
}

fn validate_unused_sources(ast: &Ast, coverage: &Coverage<'_>, report: &mut ValidationReport) {
    for source_id in ast.sources.keys() {
        if !coverage.sources.contains(source_id.as_str()) {
            report.push_warning(ValidationIssue::warning(
                "unused_source",
                format!("/sources/{source_id}"),
                format!("source '{source_id}' is declared but no mapping references it"),
                None,
            ));
        }
    }
}

fn validate_declarations(ast: &Ast, report: &mut ValidationReport) {
    for table_id in &ast.shadowed_tables {
        report.push_warning(ValidationIssue::warning(
            "duplicate_table",
            format!("/tables/{table_id}"),
            format!("table '{table_id}' is declared more than once; the last declaration wins"),
            Some("merge the declarations into one table".to_string()),
        ));
    }

    for source_id in &ast.shadowed_sources {
        report.push_warning(ValidationIssue::warning(
            "duplicate_source",
            format!("/sources/{source_id}"),
            format!("source '{source_id}' is declared more than once; the last declaration wins"),
            None,
        ));
    }

    // Engines without a database level (MySQL) key tables by schema and name only.
    let mut first_by_name: HashMap<(&str, &str), &TableId> = HashMap::new();
    for table_id in ast.tables.keys() {
        let name = (table_id.schema.as_str(), table_id.table.as_str());
        match first_by_name.get(&name) {
            Some(first) => report.push_warning(ValidationIssue::warning(
                "table_name_collision",
                format!("/tables/{table_id}"),
                format!(
                    "tables '{first}' and '{table_id}' differ only by database; MySQL output places both in database '{}'",
                    table_id.schema
                ),
                Some("rename the table or the schema if MySQL DDL is used".to_string()),
            )),
            None => {
                first_by_name.insert(name, table_id);
            }
        }
    }

    for source in ast.sources.values() {
        if let SourceKind::Other(kind) = &source.kind {
            report.push_warning(ValidationIssue::warning(
                "unknown_source_kind",
                format!("/sources/{}/kind", source.id),
                format!("source '{}' has unrecognized kind '{}'", source.id, kind),
                Some("use relational, document_store, api or file".to_string()),
            ));
        }
    }

    for (table_id, table) in &ast.tables {
        for column in table.columns.values() {
            let Some(fk) = &column.fk else {
                continue;
            };
            let path = format!("/tables/{table_id}/columns/{}/fk", column.name);
            let referenced = fk.resolve(table_id);
            match ast.table(&referenced) {
                None => report.push_warning(ValidationIssue::warning(
                    "unknown_fk_table",
                    path,
                    format!(
                        "foreign key on '{}' references undeclared table '{}'",
                        table_id.column_key(&column.name),
                        referenced
                    ),
                    None,
                )),
                Some(target) if !target.columns.contains_key(&fk.column) => {
                    report.push_warning(ValidationIssue::warning(
                        "unknown_fk_column",
                        path,
                        format!(
                            "foreign key on '{}' references undeclared column '{}'",
                            table_id.column_key(&column.name),
                            referenced.column_key(&fk.column)
                        ),
                        None,
                    ))
                }
                Some(_) => {}
            }
        }
    }
}
