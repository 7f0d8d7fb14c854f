//! End-to-end runs of the CLI commands against files on disk.

mod common;

use clap::Parser;
use common::{registry, Fixtures};
use oxide_schema_cli::{run, Cli, Output};
use oxide_schema_core::model::DatabaseSchemaMetadata;
use oxide_schema_core::MetadataDiff;

const USERS: &str = "CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));";
const USERS_WITH_EMAIL: &str =
    "CREATE TABLE users (id INT NOT NULL, email VARCHAR(255), PRIMARY KEY (id));";

fn run_args(args: &[&str]) -> anyhow::Result<Output> {
    let mut argv = vec!["oxide-schema"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap_or_else(|e| panic!("Bad arguments {args:?}: {e}"));
    run(&cli, &registry())
}

fn run_ok(args: &[&str]) -> String {
    let output = run_args(args).unwrap_or_else(|e| panic!("Command {args:?} failed: {e:#}"));
    assert!(output.success, "Command {args:?} reported failure:\n{}", output.text);
    output.text
}

fn path_str(path: &std::path::Path) -> &str {
    path.to_str().unwrap()
}

/// Parses a script through the CLI and stores the snapshot JSON.
fn snapshot(fixtures: &Fixtures, name: &str, sql: &str) -> std::path::PathBuf {
    let script = fixtures.write(&format!("{name}.sql"), sql);
    let json = run_ok(&["parse", path_str(&script)]);
    fixtures.write(&format!("{name}.json"), &json)
}

// ====================================================================
// Snapshots and diffs
// ====================================================================

#[test]
fn test_parse_prints_snapshot_json() {
    let fixtures = Fixtures::new();
    let script = fixtures.write("users.sql", USERS);
    let json = run_ok(&["parse", path_str(&script)]);

    let metadata: DatabaseSchemaMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(metadata.schemas[0].tables[0].name, "users");
}

#[test]
fn test_diff_of_snapshots() {
    let fixtures = Fixtures::new();
    let old = snapshot(&fixtures, "old", USERS);
    let new = snapshot(&fixtures, "new", USERS_WITH_EMAIL);

    let json = run_ok(&["diff", path_str(&old), path_str(&new)]);
    let diff: MetadataDiff = serde_json::from_str(&json).unwrap();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff.table_changes[0].table_name, "users");

    let json = run_ok(&["diff", path_str(&old), path_str(&old)]);
    let diff: MetadataDiff = serde_json::from_str(&json).unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_migrate_between_scripts() {
    let fixtures = Fixtures::new();
    let from = fixtures.write("from.sql", USERS);
    let to = fixtures.write("to.sql", USERS_WITH_EMAIL);

    let ddl = run_ok(&["migrate", path_str(&from), path_str(&to)]);
    assert_eq!(
        ddl,
        "ALTER TABLE `users` ADD COLUMN `email` varchar(255) DEFAULT NULL AFTER `id`;\n"
    );
    assert_eq!(run_ok(&["migrate", path_str(&from), path_str(&from)]), "");
}

#[test]
fn test_missing_file_is_reported() {
    let fixtures = Fixtures::new();
    let missing = fixtures.path("missing.sql");
    let err = run_args(&["parse", path_str(&missing)]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read"));
}

#[test]
fn test_syntax_error_is_reported() {
    let fixtures = Fixtures::new();
    let script = fixtures.write("bad.sql", "CREATE TABLE (;");
    let err = run_args(&["parse", path_str(&script)]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse"));
}

// ====================================================================
// Printing and reconciliation
// ====================================================================

#[test]
fn test_dump_with_header() {
    let fixtures = Fixtures::new();
    let json = snapshot(&fixtures, "users", USERS);

    let dump = run_ok(&["dump", path_str(&json)]);
    assert!(dump.starts_with("--\n-- Table structure for `users`\n--\nCREATE TABLE `users`"));

    let dump = run_ok(&["dump", path_str(&json), "--print-header"]);
    assert!(dump.starts_with("SET @OLD_UNIQUE_CHECKS"));
}

#[test]
fn test_design_rewrites_baseline() {
    let fixtures = Fixtures::new();
    let baseline = fixtures.write("schema.sql", USERS);
    let target = snapshot(&fixtures, "target", USERS_WITH_EMAIL);

    let text = run_ok(&["design", path_str(&baseline), path_str(&target)]);
    assert!(text.starts_with("CREATE TABLE users (id INT NOT NULL, `email` varchar(255)"));

    let same = snapshot(&fixtures, "same", USERS);
    assert_eq!(run_ok(&["design", path_str(&baseline), path_str(&same)]), USERS);
}

// ====================================================================
// Validation
// ====================================================================

#[test]
fn test_check_clean_script() {
    let fixtures = Fixtures::new();
    let script = fixtures.write("script.sql", USERS);
    assert_eq!(run_ok(&["check", path_str(&script)]), "ok");
}

#[test]
fn test_check_against_snapshot_fails_on_error() {
    let fixtures = Fixtures::new();
    let json = snapshot(&fixtures, "users", USERS);
    let script = fixtures.write("script.sql", "ALTER TABLE users ADD COLUMN id INT;");

    let output = run_args(&["check", path_str(&script), "--snapshot", path_str(&json)]).unwrap();
    assert!(!output.success);
    let advice: serde_json::Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(advice["code"], 412);
    assert_eq!(advice["status"], "ERROR");
}

#[test]
fn test_check_warning_still_succeeds() {
    let fixtures = Fixtures::new();
    let script = fixtures.write("script.sql", "CREATE TABLE t AS SELECT 1;");

    let output = run_args(&["check", path_str(&script)]).unwrap();
    assert!(output.success);
    let advice: serde_json::Value = serde_json::from_str(&output.text).unwrap();
    assert_eq!(advice["code"], 205);
    assert_eq!(advice["status"], "WARNING");
}

// ====================================================================
// Export
// ====================================================================

#[test]
fn test_export_prefix() {
    let text = run_ok(&["export-prefix", "--table", "users", "id", "email"]);
    assert_eq!(text, "INSERT INTO `users` (`id`,`email`) VALUES (");

    let text = run_ok(&[
        "--engine", "postgres", "export-prefix", "--table", "users", "--schema", "public", "id",
    ]);
    assert_eq!(text, "INSERT INTO \"public\".\"users\" (\"id\") VALUES (");
}

#[test]
fn test_export_prefix_rejects_engine_without_sql() {
    let err = run_args(&["--engine", "redis", "export-prefix", "--table", "t", "a"]).unwrap_err();
    assert!(format!("{err}").contains("redis"));
}

#[test]
fn test_engine_without_dialect() {
    let fixtures = Fixtures::new();
    let script = fixtures.write("users.sql", USERS);
    let err = run_args(&["--engine", "postgres", "parse", path_str(&script)]).unwrap_err();
    assert!(format!("{err}").contains("no dialect for engine postgres"));
}
