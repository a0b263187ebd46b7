use cartograph_core::{Ast, normalize, parse_document};
use serde_json::json;

/// Warehouse document shared by the renderer tests.
pub fn warehouse_ast() -> Ast {
    let document = json!({
        "project": "retail",
        "targets": [
            { "db": "dw", "schema": "sales", "tables": [
                { "name": "fact_orders", "description": "One row per order", "columns": [
                    { "name": "id", "type": "INT", "pk": true, "not_null": true, "unique": true },
                    { "name": "customer_id", "type": "INT", "not_null": true,
                      "fk": { "table": "dim_customer", "column": "id" } },
                    { "name": "amount", "type": "DECIMAL(10, 2)" },
                    { "name": "created_at", "type": "TIMESTAMP", "not_null": true, "default": "now()" }
                ]},
                { "name": "dim_customer", "columns": [
                    { "name": "id", "type": "INT", "pk": true },
                    { "name": "email", "type": "TEXT", "unique": true },
                    { "name": "name", "type": "string" }
                ]},
                { "name": "returns", "columns": [
                    { "name": "order_id", "type": "INT", "pk": true },
                    { "name": "reason", "type": "TEXT" }
                ]}
            ]},
            { "db": "dw", "schema": "audit", "tables": [
                { "name": "events", "columns": [
                    { "name": "id", "type": "uuid", "pk": true, "default": "gen_random_uuid()" },
                    { "name": "payload", "type": "jsonb" }
                ]}
            ]}
        ],
        "sources": [
            { "id": "crm", "kind": "postgres" },
            { "id": "shop", "kind": "api" }
        ],
        "mappings": [
            { "target": "dw.sales.fact_orders.id", "from": { "source_id": "shop", "path": "$.order.id" } },
            { "target": "dw.sales.fact_orders.customer_id", "from": {
                "source_id": "crm", "path": "$.customer.id", "transform": "to_int($)"
            }, "notes": "joined on email, then id", "tags": ["pii", "join"] },
            { "target": "dw.sales.dim_customer", "from": {
                "source_id": "crm", "fields": { "id": "$.id", "email": "$.email" }
            }},
            { "target": "dw.sales.fact_orders.discount", "from": { "rule": "0" } },
            { "target": "sales.orders", "from": { "rule": "'x'" } }
        ]
    });
    normalize(&parse_document(document).expect("parse fixture"))
}
