//! Loosely-typed document shapes as they arrive from the loader.
//!
//! These types mirror the authoring format one-to-one and carry no
//! invariants. Only the normalizer turns them into canonical model types.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Top-level mapping document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawDocument {
    /// Optional project label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Target groups, each scoped to one database and schema.
    #[serde(default)]
    pub targets: Vec<RawTargetGroup>,
    /// Declared source systems.
    #[serde(default)]
    pub sources: Vec<RawSource>,
    /// Column-level mapping declarations.
    #[serde(default)]
    pub mappings: Vec<RawMapping>,
}

/// Tables sharing one `db` and `schema`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawTargetGroup {
    pub db: String,
    pub schema: String,
    #[serde(default)]
    pub tables: Vec<RawTable>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawColumn {
    pub name: String,
    /// Dialect-agnostic type string (ex.: `DECIMAL(10,2)`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default)]
    pub pk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk: Option<RawForeignKey>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub not_null: bool,
    /// Default expression; scalars other than strings are kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawForeignKey {
    pub table: String,
    pub column: String,
}

/// Source system declaration. Unknown keys are kept as metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawSource {
    pub id: String,
    pub kind: String,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RawMapping {
    /// Dotted target reference. Usually a string; anything else is kept as-is
    /// so the validator can report it.
    pub target: Value,
    #[serde(default)]
    pub from: RawFrom,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Provenance of a mapping. Which fields are set decides its shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Opaque transform expression, already checked upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Wildcard expansion: target column -> source path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, String>>,
}

/// Input formats accepted by [`load_document_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(DocumentFormat::Json),
            Some("toml") => Ok(DocumentFormat::Toml),
            other => Err(Error::Unsupported(format!(
                "document extension {:?} (expected .json or .toml)",
                other.unwrap_or("")
            ))),
        }
    }
}

/// Parse document text into a generic JSON value.
pub fn load_document_str(text: &str, format: DocumentFormat) -> Result<Value> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str(text)?,
        DocumentFormat::Toml => toml::from_str::<Value>(text)?,
    };
    Ok(value)
}

/// Convert a JSON value into a raw document.
pub fn parse_document(value: Value) -> Result<RawDocument> {
    if !value.is_object() {
        return Err(Error::InvalidDocument(
            "document root must be an object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| Error::InvalidDocument(err.to_string()))
}
