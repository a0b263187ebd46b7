use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Marker used for a target that names a table but no column.
pub const WILDCARD: &str = "*";

/// Identity of a target table: `db.schema.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId {
    pub db: String,
    pub schema: String,
    pub table: String,
}

impl TableId {
    pub fn new(db: impl Into<String>, schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Parse a qualified `db.schema.table` key. Extra dots stay in the table name.
    pub fn parse(key: &str) -> Option<Self> {
        let mut parts = key.splitn(3, '.');
        let db = parts.next()?;
        let schema = parts.next()?;
        let table = parts.next()?;
        Some(Self::new(db, schema, table))
    }

    /// Qualified column key `db.schema.table.column`.
    pub fn column_key(&self, column: &str) -> String {
        format!("{self}.{column}")
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.db, self.schema, self.table)
    }
}

impl Serialize for TableId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TableId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        TableId::parse(&key)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid table key '{key}'")))
    }
}

/// Canonical graph produced by the normalizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ast {
    pub project: Option<String>,
    pub sources: IndexMap<String, Source>,
    pub tables: IndexMap<TableId, Table>,
    pub mappings: Vec<Mapping>,
    /// Table keys declared more than once; the last declaration won.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadowed_tables: Vec<TableId>,
    /// Source ids declared more than once; the last declaration won.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadowed_sources: Vec<String>,
}

impl Ast {
    pub fn table(&self, id: &TableId) -> Option<&Table> {
        self.tables.get(id)
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Look up the column a mapping target points at, when it is fully qualified.
    pub fn resolve_column(&self, target: &TargetRef) -> Option<&Column> {
        match target {
            TargetRef::Column { table, column } => self.tables.get(table)?.columns.get(column),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub db: String,
    pub schema: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub columns: IndexMap<String, Column>,
}

impl Table {
    pub fn id(&self) -> TableId {
        TableId::new(&self.db, &self.schema, &self.name)
    }

    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.values().filter(|column| column.pk).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub pk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fk: Option<ForeignKeyRef>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Column {
    /// A column that must be populated by some mapping.
    pub fn needs_mapping(&self) -> bool {
        self.not_null && !self.pk && self.default.is_none()
    }

    /// Primary key or NOT NULL; document stores mark these as required.
    pub fn is_required(&self) -> bool {
        self.pk || self.not_null
    }
}

/// Foreign key reference as written in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

impl ForeignKeyRef {
    /// Qualify the referenced table relative to the owning table.
    pub fn resolve(&self, owner: &TableId) -> TableId {
        let parts: Vec<&str> = self.table.split('.').collect();
        match parts.as_slice() {
            [table] => TableId::new(&owner.db, &owner.schema, *table),
            [schema, table] => TableId::new(&owner.db, *schema, *table),
            [db, schema, rest @ ..] => TableId::new(*db, *schema, rest.join(".")),
            [] => TableId::new(&owner.db, &owner.schema, ""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Relational,
    DocumentStore,
    Api,
    File,
    Other(String),
}

impl SourceKind {
    /// Lower a free-form kind string, accepting common engine names.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "relational" | "postgres" | "postgresql" | "mysql" | "sql" | "jdbc" | "sqlserver"
            | "oracle" => SourceKind::Relational,
            "document_store" | "document" | "mongodb" | "mongo" | "nosql" => {
                SourceKind::DocumentStore
            }
            "api" | "rest" | "http" | "graphql" => SourceKind::Api,
            "file" | "csv" | "parquet" | "json" | "s3" | "sftp" => SourceKind::File,
            _ => SourceKind::Other(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::Relational => "relational",
            SourceKind::DocumentStore => "document_store",
            SourceKind::Api => "api",
            SourceKind::File => "file",
            SourceKind::Other(raw) => raw.as_str(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
    /// Connection or location details, kept opaque.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

/// Structured mapping target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRef {
    Column { table: TableId, column: String },
    Wildcard { table: TableId },
    /// Anything that did not parse; reported by the validator.
    Unresolved { raw: Value },
}

impl TargetRef {
    /// Parse a dotted target string.
    ///
    /// Three segments name a table (wildcard); four or more name a column,
    /// with segments past the third joined back with dots.
    ///
    /// Empty table segments and column segments holding no column name
    /// (`db.s.t.` or `db.s.t., ;`) stay unresolved.
    pub fn parse(raw: &str) -> Self {
        let unresolved = || TargetRef::Unresolved {
            raw: Value::String(raw.to_string()),
        };

        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() < 3 || parts[..3].iter().any(|part| part.trim().is_empty()) {
            return unresolved();
        }

        let table = TableId::new(parts[0], parts[1], parts[2]);
        if parts.len() == 3 {
            return TargetRef::Wildcard { table };
        }

        let column = parts[3..].join(".");
        if column == WILDCARD {
            TargetRef::Wildcard { table }
        } else if split_column_list(&column).is_empty() {
            unresolved()
        } else {
            TargetRef::Column { table, column }
        }
    }

    pub fn table(&self) -> Option<&TableId> {
        match self {
            TargetRef::Column { table, .. } | TargetRef::Wildcard { table } => Some(table),
            TargetRef::Unresolved { .. } => None,
        }
    }

    /// Column name, or the wildcard marker.
    pub fn column(&self) -> Option<&str> {
        match self {
            TargetRef::Column { column, .. } => Some(column),
            TargetRef::Wildcard { .. } => Some(WILDCARD),
            TargetRef::Unresolved { .. } => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TargetRef::Wildcard { .. })
    }

    /// Literal column split on comma, semicolon and whitespace.
    ///
    /// Composite-looking targets such as `a, b` fan out to each name.
    pub fn column_tokens(&self) -> Vec<&str> {
        match self {
            TargetRef::Column { column, .. } => split_column_list(column),
            _ => Vec::new(),
        }
    }
}

pub fn split_column_list(value: &str) -> Vec<&str> {
    value
        .split(|ch: char| ch == ',' || ch == ';' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Where a mapped value comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingSource {
    Field {
        source_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<String>,
    },
    Rule {
        rule: String,
    },
    /// Wildcard expansion: one entry per target column.
    Fields {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<String>,
        fields: IndexMap<String, String>,
    },
    Unknown,
}

impl MappingSource {
    pub fn source_id(&self) -> Option<&str> {
        match self {
            MappingSource::Field { source_id, .. } => Some(source_id),
            MappingSource::Fields { source_id, .. } => source_id.as_deref(),
            _ => None,
        }
    }

    pub fn rule(&self) -> Option<&str> {
        match self {
            MappingSource::Rule { rule } => Some(rule),
            MappingSource::Fields { rule, .. } => rule.as_deref(),
            _ => None,
        }
    }

    pub fn transform(&self) -> Option<&str> {
        match self {
            MappingSource::Field { transform, .. } | MappingSource::Fields { transform, .. } => {
                transform.as_deref()
            }
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<String, String>> {
        match self {
            MappingSource::Fields { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    /// Position in the document's `mappings` array.
    pub index: usize,
    /// Target exactly as written (JSON text when it was not a string).
    pub raw_target: String,
    pub target: TargetRef,
    pub from: MappingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}
