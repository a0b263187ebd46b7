use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::raw::RawDocument;

/// Emit the JSON Schema for mapping documents.
pub fn document_json_schema() -> RootSchema {
    schema_for!(RawDocument)
}
