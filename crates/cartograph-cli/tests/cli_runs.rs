use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cartograph-cli-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn cartograph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cartograph"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

fn run_root(output: &Output) -> PathBuf {
    let stdout = String::from_utf8_lossy(&output.stdout);
    PathBuf::from(stdout.lines().last().unwrap().trim())
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn compile_writes_every_artifact() {
    let dir = scratch_dir();
    let document = fixture("orders.json");
    let output = cartograph(&dir, &["compile", document.to_str().unwrap(), "--run-dir", "runs"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let root = dir.join(run_root(&output));
    assert!(root.file_name().unwrap().to_string_lossy().contains("__run_"));

    let manifest = read_json(&root.join("manifest.json"));
    assert_eq!(manifest["status"], "invalid");
    assert_eq!(manifest["errors"], 1);
    let artifacts: Vec<&str> = manifest["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|value| value.as_str().unwrap())
        .collect();
    assert_eq!(
        artifacts,
        vec![
            "ast.json",
            "validation.json",
            "lineage.json",
            "mappings.csv",
            "diagrams/shop.public.mmd",
            "ddl/postgres.sql",
            "ddl/mysql.sql",
            "ddl/mongodb.js",
        ]
    );
    for artifact in &artifacts {
        assert!(root.join(artifact).is_file(), "{artifact} missing");
    }

    let validation = read_json(&root.join("validation.json"));
    assert_eq!(validation["errors"][0]["code"], "unmapped_not_null");

    let config = read_json(&root.join("config.json"));
    assert_eq!(config["engines"], serde_json::json!(["postgres", "mysql", "mongodb"]));

    let logs = std::fs::read_to_string(root.join("logs.ndjson")).unwrap();
    let events: Vec<Value> = logs
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(events.iter().any(|event| event["fields"]["event"] == "run_started"));
    assert!(events.iter().any(|event| event["fields"]["event"] == "run_finished"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn strict_compile_fails_after_writing_artifacts() {
    let dir = scratch_dir();
    let document = fixture("orders.json");
    let output = cartograph(
        &dir,
        &["compile", document.to_str().unwrap(), "--run-dir", "runs", "--strict"],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[unmapped_not_null]"));

    let run = std::fs::read_dir(dir.join("runs")).unwrap().next().unwrap().unwrap();
    assert!(run.path().join("manifest.json").is_file());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn config_file_selects_engines_and_artifacts() {
    let dir = scratch_dir();
    std::fs::write(
        dir.join("cartograph.toml"),
        "run_dir = \"out\"\nengines = [\"mongodb\"]\nstrict = true\n\n[artifacts]\ndiagrams = false\n",
    )
    .unwrap();
    let document = fixture("warehouse.toml");

    let output = cartograph(&dir, &["compile", document.to_str().unwrap(), "--engine", "mysql"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let root = dir.join(run_root(&output));
    assert!(root.starts_with(dir.join("out")));
    assert!(root.join("ddl/mysql.sql").is_file());
    assert!(!root.join("ddl/mongodb.js").exists());
    assert!(!root.join("diagrams").exists());

    let sql = std::fs::read_to_string(root.join("ddl/mysql.sql")).unwrap();
    assert!(sql.contains("placed_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    assert!(sql.contains("FOREIGN KEY (customer_id) REFERENCES sales.dim_customer (id)"));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn check_reports_findings_without_a_run() {
    let dir = scratch_dir();
    let document = fixture("orders.json");
    let output = cartograph(&dir, &["check", document.to_str().unwrap()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("shop.public.orders.total"));
    assert!(!dir.join("runs").exists());

    let clean = fixture("warehouse.toml");
    let output = cartograph(&dir, &["check", clean.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn schema_command_writes_json_schema() {
    let dir = scratch_dir();
    let output = cartograph(&dir, &["schema", "--out", "schema/document.json"]);
    assert!(output.status.success());

    let schema = read_json(&dir.join("schema/document.json"));
    assert_eq!(schema["title"], "RawDocument");
    assert!(schema["properties"]["mappings"].is_object());

    std::fs::remove_dir_all(&dir).unwrap();
}
