mod compile;
mod config;
mod registry;

use std::path::PathBuf;
use std::time::Instant;

use cartograph_core::document_json_schema;
use cartograph_generate::Engine;
use cartograph_validate::ValidationReport;
use clap::{Args, Parser, Subcommand};
use compile::{CompileError, analyze, compile, load_document};
use config::{ConfigError, load_settings};
use registry::{RunContext, init_console_logging, init_run_logging, start_run, write_artifacts};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid engine: {0}")]
    Engine(#[from] cartograph_generate::GenerateError),
    #[error("document has {0} validation error(s)")]
    ValidationFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "cartograph", version, about = "Cartograph mapping compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a document into a run directory of artifacts.
    Compile(CompileArgs),
    /// Validate a document and print its findings.
    Check(CheckArgs),
    /// Print the JSON Schema for mapping documents.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Mapping document (.json or .toml).
    document: PathBuf,
    /// Settings file; defaults to ./cartograph.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Engine(s) to emit DDL for; repeat to select several.
    #[arg(long, value_name = "ENGINE")]
    engine: Vec<String>,
    /// Exit with an error when the document has validation errors.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Mapping document (.json or .toml).
    document: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => run_compile(args),
        Command::Check(args) => run_check(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn run_compile(args: CompileArgs) -> Result<(), CliError> {
    let CompileArgs {
        document,
        config,
        run_dir,
        engine,
        strict,
    } = args;

    let settings = load_settings(config.as_deref())?;
    let engines = if engine.is_empty() {
        settings.engines.clone()
    } else {
        parse_engines(&engine)?
    };

    let run_ctx = RunContext {
        run_id: Uuid::new_v4().to_string(),
        started_at: chrono::Utc::now(),
        document: document.clone(),
        run_dir: run_dir.unwrap_or(settings.run_dir),
        engines,
        strict: strict || settings.strict,
        artifacts: settings.artifacts,
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        document = %document.display()
    );
    let timer = Instant::now();

    let compilation = compile(load_document(&document)?, &run_ctx.engines).inspect_err(|err| {
        if let CompileError::Structural(report) = err {
            print_report(report);
        }
    })?;
    let manifest = write_artifacts(&run_paths, &run_ctx, &compilation)?;

    print_report(&compilation.report);
    println!("{}", run_paths.root.display());

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        status = manifest.status,
        artifacts = manifest.artifacts.len(),
        duration_ms = duration_ms
    );

    if run_ctx.strict && !compilation.report.is_ok() {
        return Err(CliError::ValidationFailed(compilation.report.errors.len()));
    }

    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), CliError> {
    init_console_logging()?;

    let report = match analyze(load_document(&args.document)?) {
        Ok((_, report)) => report,
        Err(CompileError::Structural(report)) => report,
        Err(err) => return Err(err.into()),
    };

    print_report(&report);
    if report.is_ok() {
        println!("ok");
        Ok(())
    } else {
        Err(CliError::ValidationFailed(report.errors.len()))
    }
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    init_console_logging()?;

    let schema = document_json_schema();
    match args.out {
        Some(path) => {
            registry::write_json_atomic(&path, &schema)?;
            tracing::info!(event = "schema_written", path = %path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&schema)?),
    }
    Ok(())
}

fn parse_engines(values: &[String]) -> Result<Vec<Engine>, CliError> {
    let mut engines = Vec::new();
    for value in values {
        let engine: Engine = value.parse()?;
        if !engines.contains(&engine) {
            engines.push(engine);
        }
    }
    Ok(engines)
}

fn print_report(report: &ValidationReport) {
    for issue in &report.errors {
        eprintln!("error[{}] {issue}", issue.code);
    }
    for issue in &report.warnings {
        eprintln!("warning[{}] {issue}", issue.code);
    }
}

