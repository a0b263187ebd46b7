use cartograph_core::{Column, Table};
use serde_json::{Map, Value, json};

use super::{Emitter, Engine, EngineText, declared_type};

/// Collection scripts with a `$jsonSchema` validator.
///
/// Required fields are primary key and NOT NULL columns. Every other field
/// accepts its type or `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoEmitter;

/// Primary BSON type for a dialect-agnostic column type.
pub fn bson_type(raw: &str) -> &'static str {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.ends_with("[]") || normalized.starts_with("array") {
        return "array";
    }
    let base = normalized
        .split(|ch: char| ch == '(' || ch.is_whitespace())
        .next()
        .unwrap_or_default();
    match base {
        "int" | "integer" | "int4" | "smallint" | "tinyint" | "serial" => "int",
        "bigint" | "int8" | "bigserial" | "long" => "long",
        "decimal" | "numeric" | "money" | "number" => "decimal",
        "float" | "double" | "real" | "float8" => "double",
        "bool" | "boolean" => "bool",
        "date" | "datetime" | "timestamp" | "timestamptz" => "date",
        "json" | "jsonb" | "object" | "map" | "struct" => "object",
        "bytea" | "binary" | "varbinary" | "blob" | "bytes" => "binData",
        "objectid" => "objectId",
        _ => "string",
    }
}

impl MongoEmitter {
    fn property(column: &Column, bson_types: &[&'static str]) -> Value {
        let mut property = Map::new();
        let bson_type = match bson_types {
            [single] => json!(single),
            many => json!(many),
        };
        property.insert("bsonType".to_string(), bson_type);
        if let Some(description) = &column.description {
            property.insert("description".to_string(), json!(description));
        }
        Value::Object(property)
    }

    fn collection(table: &Table) -> String {
        format!(
            "db.getSiblingDB({}).getCollection({})",
            json!(table.db),
            json!(table.name)
        )
    }
}

impl Emitter for MongoEmitter {
    fn engine(&self) -> Engine {
        Engine::Mongodb
    }

    fn comment_prefix(&self) -> &'static str {
        "//"
    }

    fn render_column(&self, _table: &Table, column: &Column) -> EngineText {
        let primary = bson_type(declared_type(column, "string"));
        let required = column.is_required();
        let bson_types = if required {
            vec![primary]
        } else {
            vec![primary, "null"]
        };

        EngineText::Property {
            name: column.name.clone(),
            bson_types,
            required,
        }
    }

    fn render_table(&self, table: &Table) -> String {
        let mut required = Vec::new();
        let mut properties = Map::new();

        for column in table.columns.values() {
            if let EngineText::Property {
                name,
                bson_types,
                required: is_required,
            } = self.render_column(table, column)
            {
                if is_required {
                    required.push(Value::String(name.clone()));
                }
                properties.insert(name, Self::property(column, &bson_types));
            }
        }

        let mut schema = Map::new();
        schema.insert("bsonType".to_string(), json!("object"));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        schema.insert("properties".to_string(), Value::Object(properties));
        if let Some(description) = &table.description {
            schema.insert("description".to_string(), json!(description));
        }

        let options = json!({ "validator": { "$jsonSchema": Value::Object(schema) } });
        let mut out = format!(
            "db.getSiblingDB({}).createCollection({}, {:#});\n",
            json!(table.db),
            json!(table.name),
            options
        );

        for column in table.columns.values() {
            if column.unique && !column.pk {
                out.push_str(&format!(
                    "{}.createIndex({}, {});\n",
                    Self::collection(table),
                    json!({ column.name.clone(): 1 }),
                    json!({ "unique": true })
                ));
            }
        }

        out
    }

    fn render_database(&self, db: &str, _tables: &[&Table]) -> String {
        format!("// database: {db}\n")
    }
}
