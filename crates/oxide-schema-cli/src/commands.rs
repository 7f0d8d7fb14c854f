//! Command bodies. Each returns the text to print so that the binary
//! stays a thin shell around them.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use oxide_schema_core::model::DatabaseSchemaMetadata;
use oxide_schema_core::prelude::{get_sql_statement_prefix, SchemaResource};
use oxide_schema_core::{
    get_database_schema_diff, AdviceStatus, DefinitionContext, DialectRegistry, Engine,
    SchemaDialect,
};
use tracing::{debug, info};

use crate::cli::{Cli, Commands};

/// What a command printed and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub text: String,
    pub success: bool,
}

impl Output {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }
}

/// Runs the parsed command line against `registry`.
///
/// # Errors
///
/// Returns an error when an input cannot be read or decoded, when the
/// engine has no dialect, or when the dialect rejects the input.
pub fn run(cli: &Cli, registry: &DialectRegistry) -> Result<Output> {
    match &cli.command {
        Commands::Parse { file } => parse(dialect_for(registry, cli.engine)?, file).map(Output::ok),
        Commands::Diff { old, new } => diff(old, new).map(Output::ok),
        Commands::Migrate { from, to } => {
            migrate(dialect_for(registry, cli.engine)?, from, to).map(Output::ok)
        }
        Commands::Dump {
            snapshot,
            print_header,
        } => dump(dialect_for(registry, cli.engine)?, snapshot, *print_header).map(Output::ok),
        Commands::Design { baseline, target } => {
            design(dialect_for(registry, cli.engine)?, baseline, target).map(Output::ok)
        }
        Commands::Check { script, snapshot } => {
            check(dialect_for(registry, cli.engine)?, script, snapshot.as_deref())
        }
        Commands::ExportPrefix {
            table,
            schema,
            columns,
        } => export_prefix(cli.engine, table, schema.as_deref(), columns).map(Output::ok),
    }
}

fn dialect_for(registry: &DialectRegistry, engine: Engine) -> Result<&dyn SchemaDialect> {
    let dialect = registry
        .get(engine)
        .with_context(|| format!("no dialect for engine {engine}"))?;
    debug!(%engine, dialect = dialect.name(), "resolved dialect");
    Ok(dialect)
}

/// Reads a file, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_snapshot(path: &Path) -> Result<DatabaseSchemaMetadata> {
    let text = read_input(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a schema snapshot", path.display()))
}

fn parse_script(dialect: &dyn SchemaDialect, path: &Path) -> Result<DatabaseSchemaMetadata> {
    let text = read_input(path)?;
    dialect
        .parse_to_metadata(&text)
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// `parse`: script to snapshot JSON.
///
/// # Errors
///
/// Fails on unreadable input or a script the dialect rejects.
pub fn parse(dialect: &dyn SchemaDialect, path: &Path) -> Result<String> {
    let metadata = parse_script(dialect, path)?;
    info!(
        tables = metadata.schemas.iter().map(|s| s.tables.len()).sum::<usize>(),
        "parsed {}",
        path.display()
    );
    Ok(serde_json::to_string_pretty(&metadata)?)
}

/// `diff`: two snapshots to diff JSON.
///
/// # Errors
///
/// Fails on unreadable or malformed snapshots.
pub fn diff(old: &Path, new: &Path) -> Result<String> {
    let diff = get_database_schema_diff(&read_snapshot(old)?, &read_snapshot(new)?);
    info!(changes = diff.len(), "compared snapshots");
    Ok(serde_json::to_string_pretty(&diff)?)
}

/// `migrate`: two scripts to the DDL between them.
///
/// # Errors
///
/// Fails on unreadable input, a rejected script or a change the dialect
/// cannot express.
pub fn migrate(dialect: &dyn SchemaDialect, from: &Path, to: &Path) -> Result<String> {
    let diff = get_database_schema_diff(&parse_script(dialect, from)?, &parse_script(dialect, to)?);
    if diff.is_empty() {
        info!("schemas are identical");
        return Ok(String::new());
    }
    info!(changes = diff.len(), "generating migration");
    dialect
        .generate_migration(&diff)
        .context("failed to generate migration")
}

/// `dump`: snapshot to schema dump.
///
/// # Errors
///
/// Fails on an unreadable snapshot or one the dialect cannot print.
pub fn dump(dialect: &dyn SchemaDialect, path: &Path, print_header: bool) -> Result<String> {
    let metadata = read_snapshot(path)?;
    dialect
        .get_database_definition(DefinitionContext { print_header }, &metadata)
        .context("failed to print definition")
}

/// `design`: baseline script rewritten toward a snapshot.
///
/// # Errors
///
/// Fails on unreadable input or a baseline the dialect rejects.
pub fn design(dialect: &dyn SchemaDialect, baseline: &Path, target: &Path) -> Result<String> {
    let text = read_input(baseline)?;
    let target = read_snapshot(target)?;
    dialect
        .get_design_schema(&text, &target)
        .with_context(|| format!("failed to reconcile {}", baseline.display()))
}

/// `check`: walks a script through a snapshot. Prints the advice as JSON,
/// or `ok`; an error advice makes the command fail.
///
/// # Errors
///
/// Fails on unreadable input or a script that does not parse.
pub fn check(dialect: &dyn SchemaDialect, script: &Path, snapshot: Option<&Path>) -> Result<Output> {
    let text = read_input(script)?;
    let mut metadata = match snapshot {
        Some(path) => read_snapshot(path)?,
        None => DatabaseSchemaMetadata::default(),
    };
    let advice = dialect
        .walk_through(&mut metadata, &text)
        .with_context(|| format!("failed to check {}", script.display()))?;

    let Some(advice) = advice else {
        return Ok(Output::ok(String::from("ok")));
    };
    info!(code = %advice.code, line = advice.position.line, "{}", advice.title);
    Ok(Output {
        text: serde_json::to_string_pretty(&advice)?,
        success: advice.status != AdviceStatus::Error,
    })
}

/// `export-prefix`: the `INSERT INTO ... VALUES (` prefix for `table`.
///
/// # Errors
///
/// Fails for engines without SQL identifiers.
pub fn export_prefix(
    engine: Engine,
    table: &str,
    schema: Option<&str>,
    columns: &[String],
) -> Result<String> {
    let resource = SchemaResource {
        schema: schema.unwrap_or_default().to_string(),
        ..SchemaResource::table(table)
    };
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    Ok(get_sql_statement_prefix(engine, &[resource], &columns)?)
}
