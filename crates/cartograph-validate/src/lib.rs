//! Referential validation for normalized mapping documents.

pub mod errors;
pub mod structural;
pub mod validate;

pub use errors::{IssueSeverity, ValidateError, ValidationIssue, ValidationReport};
pub use structural::validate_document_json;
pub use validate::validate_document;
