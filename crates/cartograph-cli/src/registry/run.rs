use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use cartograph_core::AST_VERSION;
use cartograph_generate::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::{RegistryResult, write_bytes_atomic, write_json_atomic};
use crate::compile::Compilation;
use crate::config::ArtifactToggles;

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub document: PathBuf,
    pub run_dir: PathBuf,
    pub engines: Vec<Engine>,
    pub strict: bool,
    pub artifacts: ArtifactToggles,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub document: String,
    pub ast_version: &'static str,
    pub engines: Vec<Engine>,
    pub strict: bool,
    pub artifacts: ArtifactToggles,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
}

/// Summary of a finished run, written last as `manifest.json`.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub run_id: String,
    pub ast_version: &'static str,
    pub status: &'static str,
    pub errors: usize,
    pub warnings: usize,
    /// Artifact paths relative to the run directory, in write order.
    pub artifacts: Vec<String>,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let logs_path = root.join("logs.ndjson");

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        document: ctx.document.display().to_string(),
        ast_version: AST_VERSION,
        engines: ctx.engines.clone(),
        strict: ctx.strict,
        artifacts: ctx.artifacts.clone(),
        git: collect_git_info(),
    };

    write_json_atomic(&root.join("config.json"), &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths { root, logs_path })
}

/// Write every enabled artifact of `compilation`, then the manifest.
pub fn write_artifacts(
    paths: &RunPaths,
    ctx: &RunContext,
    compilation: &Compilation,
) -> RegistryResult<Manifest> {
    let mut written = ArtifactLog::new(&paths.root);
    let toggles = &ctx.artifacts;

    if toggles.ast {
        let ast = json!({ "version": AST_VERSION, "ast": &compilation.ast });
        written.json("ast.json", &ast)?;
    }
    if toggles.validation {
        written.json("validation.json", &compilation.report)?;
    }
    if toggles.lineage {
        written.json("lineage.json", &compilation.lineage)?;
    }
    if toggles.csv {
        written.bytes("mappings.csv", compilation.mappings_csv.as_bytes())?;
    }
    if toggles.diagrams {
        for diagram in &compilation.diagrams {
            let name = format!("diagrams/{}.mmd", diagram.file_stem());
            written.bytes(&name, diagram.text.as_bytes())?;
        }
    }
    if toggles.ddl {
        for (engine, script) in &compilation.ddl {
            let name = format!("ddl/{}", engine.file_name());
            written.bytes(&name, script.as_bytes())?;
        }
    }

    let manifest = Manifest {
        run_id: ctx.run_id.clone(),
        ast_version: AST_VERSION,
        status: if compilation.report.is_ok() {
            "success"
        } else {
            "invalid"
        },
        errors: compilation.report.errors.len(),
        warnings: compilation.report.warnings.len(),
        artifacts: written.names,
    };
    write_json_atomic(&paths.root.join("manifest.json"), &manifest)?;

    Ok(manifest)
}

struct ArtifactLog<'a> {
    root: &'a Path,
    names: Vec<String>,
}

impl<'a> ArtifactLog<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            names: Vec::new(),
        }
    }

    fn json<T: Serialize>(&mut self, name: &str, value: &T) -> RegistryResult<()> {
        write_json_atomic(&self.root.join(name), value)?;
        self.record(name);
        Ok(())
    }

    fn bytes(&mut self, name: &str, data: &[u8]) -> RegistryResult<()> {
        write_bytes_atomic(&self.root.join(name), data)?;
        self.record(name);
        Ok(())
    }

    fn record(&mut self, name: &str) {
        tracing::info!(event = "artifact_written", artifact = name);
        self.names.push(name.to_string());
    }
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}
