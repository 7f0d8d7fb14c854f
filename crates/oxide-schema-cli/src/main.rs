//! oxide-schema CLI
//!
//! Command-line tool for parsing, diffing and migrating database schemas.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use oxide_schema_cli::{run, Cli};
use oxide_schema_core::dialect;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = dialect::install(oxide_schema_mysql::register)?;
    let output = run(&cli, registry)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.text.as_bytes())?;
    if !output.text.is_empty() && !output.text.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }

    Ok(if output.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
