use cartograph_core::{Ast, normalize, parse_document};
use cartograph_validate::{ValidationReport, validate_document};
use serde_json::{Value, json};

fn orders_document() -> Value {
    json!({
        "targets": [{
            "db": "dw",
            "schema": "sales",
            "tables": [{
                "name": "orders",
                "columns": [
                    { "name": "id", "type": "INT", "pk": true },
                    { "name": "total", "type": "DECIMAL(10,2)", "not_null": true }
                ]
            }]
        }],
        "sources": [{ "id": "crm", "kind": "relational" }],
        "mappings": [
            { "target": "dw.sales.orders.id", "from": { "source_id": "crm", "path": "$.order_id" } }
        ]
    })
}

fn ast_of(document: Value) -> Ast {
    normalize(&parse_document(document).expect("parse document"))
}

fn report_of(document: Value) -> ValidationReport {
    validate_document(&ast_of(document))
}

fn codes(issues: &[cartograph_validate::ValidationIssue]) -> Vec<&str> {
    issues.iter().map(|issue| issue.code.as_str()).collect()
}

#[test]
fn unmapped_not_null_column_is_the_only_error() {
    let report = report_of(orders_document());

    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    let message = &report.errors[0].message;
    assert!(message.contains("total"));
    assert!(message.contains("NOT NULL"));
    assert!(message.contains("dw.sales.orders.total"));
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn default_value_clears_not_null_error() {
    let mut document = orders_document();
    document["targets"][0]["tables"][0]["columns"][1]["default"] = json!("0");

    let report = report_of(document);
    assert!(report.is_ok(), "{:?}", report.errors);
}

#[test]
fn covering_mapping_clears_not_null_error() {
    let mut document = orders_document();
    document["mappings"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "target": "dw.sales.orders.total", "from": { "rule": "0" } }));

    let report = report_of(document);
    assert!(report.is_ok(), "{:?}", report.errors);
}

#[test]
fn wildcard_fields_cover_not_null_columns() {
    let mut document = orders_document();
    document["mappings"] = json!([{
        "target": "dw.sales.orders",
        "from": { "source_id": "crm", "fields": { "id": "$.id", "total": "$.amount" } }
    }]);

    let report = report_of(document);
    assert!(report.is_ok(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn plain_wildcard_warns_and_covers_nothing() {
    let mut document = orders_document();
    document["mappings"] = json!([{ "target": "dw.sales.orders", "from": { "source_id": "crm" } }]);

    let report = report_of(document);
    assert_eq!(codes(&report.warnings), vec!["wildcard_without_fields"]);
    assert_eq!(codes(&report.errors), vec!["unmapped_not_null"]);
}

#[test]
fn dangling_source_strictly_increases_errors() {
    let mut clean = orders_document();
    clean["targets"][0]["tables"][0]["columns"][1]["default"] = json!("0");
    let baseline = report_of(clean.clone());
    assert!(baseline.is_ok());

    clean["mappings"].as_array_mut().unwrap().push(json!({
        "target": "dw.sales.orders.total",
        "from": { "source_id": "ghost_system", "path": "$.total" }
    }));
    let report = report_of(clean);

    assert!(report.errors.len() > baseline.errors.len());
    assert!(
        report
            .error_messages()
            .iter()
            .any(|message| message.contains("ghost_system"))
    );
}

#[test]
fn every_bad_mapping_is_reported() {
    let mut document = orders_document();
    document["targets"][0]["tables"][0]["columns"][1]["default"] = json!("0");
    document["mappings"] = json!([
        { "target": "dw.sales.orders.id", "from": { "source_id": "crm", "path": "$.id" } },
        { "target": "dw.sales.missing.id", "from": { "source_id": "crm" } },
        { "target": "dw.sales.orders.nope", "from": { "source_id": "crm" } },
        { "target": 17, "from": { "rule": "1" } },
        { "target": "orders", "from": { "rule": "1" } }
    ]);

    let report = report_of(document);
    assert_eq!(
        codes(&report.errors),
        vec![
            "unknown_table",
            "unknown_column",
            "unresolved_target",
            "unresolved_target"
        ]
    );
    assert!(report.errors[0].message.contains("dw.sales.missing"));
    assert!(report.errors[1].message.contains("dw.sales.orders.nope"));
    assert!(report.errors[2].message.contains("17"));
}

#[test]
fn delimited_columns_fan_out() {
    let document = json!({
        "targets": [{ "db": "dw", "schema": "crm", "tables": [{ "name": "people", "columns": [
            { "name": "first_name", "type": "TEXT", "not_null": true },
            { "name": "last_name", "type": "TEXT", "not_null": true }
        ]}]}],
        "sources": [{ "id": "hr", "kind": "file" }],
        "mappings": [
            { "target": "dw.crm.people.first_name, last_name", "from": { "source_id": "hr", "path": "$.name" } }
        ]
    });

    let report = report_of(document);
    assert!(report.is_ok(), "{:?}", report.errors);
}

#[test]
fn unused_source_is_a_warning() {
    let mut document = orders_document();
    document["targets"][0]["tables"][0]["columns"][1]["default"] = json!("0");
    document["sources"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "legacy_erp", "kind": "kafka" }));

    let report = report_of(document);
    assert!(report.is_ok());
    assert_eq!(
        codes(&report.warnings),
        vec!["unused_source", "unknown_source_kind"]
    );
    assert!(report.warnings[0].message.contains("legacy_erp"));
}

#[test]
fn duplicate_declarations_and_dangling_fks_warn() {
    let document = json!({
        "targets": [
            { "db": "dw", "schema": "sales", "tables": [
                { "name": "orders", "columns": [
                    { "name": "id", "type": "INT", "pk": true },
                    { "name": "customer_id", "type": "INT", "fk": { "table": "customers", "column": "id" } }
                ]}
            ]},
            { "db": "dw", "schema": "sales", "tables": [
                { "name": "orders", "columns": [
                    { "name": "id", "type": "INT", "pk": true },
                    { "name": "customer_id", "type": "INT", "fk": { "table": "customers", "column": "id" } }
                ]}
            ]}
        ]
    });

    let report = report_of(document);
    assert!(report.is_ok());
    assert_eq!(
        codes(&report.warnings),
        vec!["duplicate_table", "unknown_fk_table"]
    );
    assert!(report.warnings[1].message.contains("dw.sales.customers"));
}

#[test]
fn blank_column_segments_are_unresolved_targets() {
    for target in ["dw.sales.orders.", "dw.sales.orders., ;"] {
        let mut document = orders_document();
        document["mappings"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "target": target, "from": { "source_id": "crm", "path": "$.x" } }));

        let report = report_of(document);
        assert_eq!(
            codes(&report.errors),
            vec!["unresolved_target", "unmapped_not_null"],
            "{target}"
        );
        assert_eq!(report.errors[0].path, "/mappings/1/target");
    }
}

#[test]
fn empty_fields_breakdown_counts_as_plain_wildcard() {
    let mut document = orders_document();
    document["mappings"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "target": "dw.sales.orders", "from": { "source_id": "crm", "fields": {} } }));

    let report = report_of(document);
    assert_eq!(codes(&report.warnings), vec!["wildcard_without_fields"]);
    assert_eq!(codes(&report.errors), vec!["unmapped_not_null"]);
}

#[test]
fn same_table_in_two_databases_warns() {
    let mut document = orders_document();
    let mut lake = document["targets"][0].clone();
    lake["db"] = json!("lake");
    lake["tables"][0]["columns"][1]["default"] = json!("0");
    document["targets"].as_array_mut().unwrap().push(lake);

    let report = report_of(document);
    assert_eq!(codes(&report.warnings), vec!["table_name_collision"]);
    let warning = &report.warnings[0];
    assert_eq!(warning.path, "/tables/lake.sales.orders");
    assert!(warning.message.contains("dw.sales.orders"));
    assert_eq!(codes(&report.errors), vec!["unmapped_not_null"]);
}
