mod common;

use cartograph_core::{TableId, normalize, parse_document};
use cartograph_generate::{Emitter, Engine, EngineText, ordered_tables, render_ddl};

fn table_order(ast: &cartograph_core::Ast) -> Vec<String> {
    ordered_tables(ast)
        .iter()
        .map(|table| table.id().to_string())
        .collect()
}

#[test]
fn dimension_tables_precede_fact_tables() {
    let ast = common::warehouse_ast();
    assert_eq!(
        table_order(&ast),
        vec![
            "dw.sales.dim_customer",
            "dw.audit.events",
            "dw.sales.returns",
            "dw.sales.fact_orders",
        ]
    );

    let sql = render_ddl(&ast, Engine::Postgres);
    let dim = sql.find("CREATE TABLE IF NOT EXISTS sales.dim_customer").unwrap();
    let fact = sql.find("CREATE TABLE IF NOT EXISTS sales.fact_orders").unwrap();
    assert!(dim < fact);
}

#[test]
fn postgres_keeps_all_flag_clauses() {
    let ast = common::warehouse_ast();
    let sql = render_ddl(&ast, Engine::Postgres);

    assert!(sql.starts_with("-- Generated by cartograph for retail (postgres)\n"));
    assert!(sql.contains("CREATE SCHEMA IF NOT EXISTS audit;\nCREATE SCHEMA IF NOT EXISTS sales;\n"));
    assert!(sql.contains("id INT PRIMARY KEY UNIQUE NOT NULL"));
    assert!(sql.contains("customer_id INT NOT NULL REFERENCES sales.dim_customer(id)"));
    assert!(sql.contains("created_at TIMESTAMP NOT NULL DEFAULT now()"));
    assert!(sql.contains("COMMENT ON TABLE sales.fact_orders IS 'One row per order';"));
}

#[test]
fn mysql_lowers_types_defaults_and_keys() {
    let ast = common::warehouse_ast();
    let sql = render_ddl(&ast, Engine::Mysql);

    assert!(sql.contains("CREATE DATABASE IF NOT EXISTS sales;"));
    assert!(sql.contains("email VARCHAR(255) UNIQUE"));
    assert!(sql.contains("name VARCHAR(255)"));
    assert!(sql.contains("id CHAR(36) DEFAULT (UUID())"));
    assert!(sql.contains("payload JSON"));
    assert!(sql.contains("created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    assert!(sql.contains("PRIMARY KEY (id),\n  FOREIGN KEY (customer_id) REFERENCES sales.dim_customer (id)"));
    assert!(!sql.contains("INT PRIMARY KEY"));
    assert!(sql.contains(") ENGINE=InnoDB COMMENT='One row per order';"));
}

#[test]
fn mongodb_required_fields_are_never_nullable() {
    let ast = common::warehouse_ast();
    let table = ast
        .table(&TableId::new("dw", "sales", "fact_orders"))
        .expect("fact_orders");
    let emitter = Engine::Mongodb.emitter();

    for column in table.columns.values() {
        match emitter.render_column(table, column) {
            EngineText::Property {
                bson_types,
                required,
                ..
            } => {
                assert_eq!(required, column.pk || column.not_null);
                if required {
                    assert_eq!(bson_types.len(), 1, "{}", column.name);
                } else {
                    assert_eq!(bson_types.last(), Some(&"null"), "{}", column.name);
                    assert_eq!(bson_types.len(), 2);
                }
            }
            other => panic!("unexpected lowering {other:?}"),
        }
    }
}

#[test]
fn mongodb_script_embeds_validator() {
    let ast = common::warehouse_ast();
    let script = render_ddl(&ast, Engine::Mongodb);

    assert!(script.starts_with("// Generated by cartograph for retail (mongodb)\n"));
    assert!(script.contains("db.getSiblingDB(\"dw\").createCollection(\"fact_orders\", {"));
    assert!(script.contains("\"$jsonSchema\""));

    let start = script
        .find("createCollection(\"fact_orders\", ")
        .map(|index| index + "createCollection(\"fact_orders\", ".len())
        .expect("fact_orders collection");
    let end = start + script[start..].find(");\n").expect("statement end");
    let options: serde_json::Value =
        serde_json::from_str(&script[start..end]).expect("validator json");
    let schema = &options["validator"]["$jsonSchema"];

    assert_eq!(
        schema["required"],
        serde_json::json!(["id", "customer_id", "created_at"])
    );
    assert_eq!(schema["properties"]["id"]["bsonType"], "int");
    assert_eq!(
        schema["properties"]["amount"]["bsonType"],
        serde_json::json!(["decimal", "null"])
    );
    assert!(script.contains("getCollection(\"dim_customer\").createIndex({\"email\":1}, {\"unique\":true});"));
}

#[test]
fn every_engine_renders_every_table() {
    let ast = common::warehouse_ast();
    for engine in Engine::ALL {
        let text = engine.emitter().render(&ast);
        for table in ast.tables.values() {
            assert!(
                text.contains(&table.name),
                "{engine} output is missing {}",
                table.name
            );
        }
    }
}

#[test]
fn postgres_tables_in_different_databases_do_not_collide() {
    let ast = normalize(
        &parse_document(serde_json::json!({
            "targets": [
                { "db": "dw", "schema": "sales", "tables": [
                    { "name": "orders", "columns": [{ "name": "id", "type": "INT", "pk": true }] }
                ]},
                { "db": "lake", "schema": "sales", "tables": [
                    { "name": "orders", "columns": [{ "name": "order", "type": "TEXT" }] }
                ]}
            ]
        }))
        .expect("parse document"),
    );
    assert_eq!(ast.tables.len(), 2);

    let sql = render_ddl(&ast, Engine::Postgres);
    let dw = sql.find("\\connect dw\n").expect("dw section");
    let lake = sql.find("\\connect lake\n").expect("lake section");
    assert!(dw < lake);

    let (dw_section, lake_section) = sql.split_at(lake);
    assert_eq!(dw_section[dw..].matches("CREATE TABLE IF NOT EXISTS sales.orders").count(), 1);
    assert!(dw_section.contains("id INT PRIMARY KEY"));
    assert!(lake_section.starts_with("\\connect lake\nCREATE SCHEMA IF NOT EXISTS sales;\n"));
    assert!(lake_section.contains("CREATE TABLE IF NOT EXISTS sales.orders (\n  \"order\" TEXT\n);"));

    let script = render_ddl(&ast, Engine::Mongodb);
    assert!(script.contains("// database: dw\n"));
    assert!(script.contains("db.getSiblingDB(\"lake\").createCollection(\"orders\""));
}
