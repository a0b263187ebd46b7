use cartograph_core::document_json_schema;
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{ValidateError, ValidationIssue, ValidationReport};

/// Check a raw document against the mapping document JSON Schema.
///
/// This is the gate the loader applies before normalization; the
/// referential checks assume it already passed.
pub fn validate_document_json(document: &Value) -> Result<ValidationReport, ValidateError> {
    let schema = serde_json::to_value(document_json_schema())?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| ValidateError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(document) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_document_passes() {
        let report = validate_document_json(&json!({
            "targets": [{ "db": "dw", "schema": "s", "tables": [] }],
            "sources": [{ "id": "crm", "kind": "api" }],
            "mappings": [{ "target": "dw.s.t.c", "from": { "source_id": "crm" } }]
        }))
        .expect("validate");
        assert!(report.is_ok(), "{:?}", report.errors);
    }

    #[test]
    fn missing_required_keys_are_reported_with_paths() {
        let report = validate_document_json(&json!({
            "targets": [{ "schema": "s" }]
        }))
        .expect("validate");
        assert!(!report.is_ok());
        assert!(report.errors.iter().any(|issue| issue.path == "/targets/0"));
    }
}
