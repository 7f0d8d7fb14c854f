//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oxide_schema_core::Engine;

/// Parse, diff, migrate and validate database schemas.
#[derive(Debug, Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database engine whose dialect reads and writes the scripts.
    #[arg(short, long, env = "OXIDE_SCHEMA_ENGINE", default_value = "mysql")]
    pub engine: Engine,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse a DDL script and print its snapshot as JSON.
    Parse {
        /// Script to parse (`-` for stdin).
        file: PathBuf,
    },

    /// Compare two JSON snapshots and print the diff as JSON.
    Diff {
        /// Snapshot before the change.
        old: PathBuf,
        /// Snapshot after the change.
        new: PathBuf,
    },

    /// Print the DDL that turns one schema script into another.
    Migrate {
        /// Script describing the current schema.
        from: PathBuf,
        /// Script describing the wanted schema.
        to: PathBuf,
    },

    /// Print a JSON snapshot as a schema dump.
    Dump {
        /// Snapshot to print (`-` for stdin).
        snapshot: PathBuf,

        /// Disable unique and foreign-key checks around the dump.
        #[arg(long)]
        print_header: bool,
    },

    /// Rewrite a hand-written schema script to match a JSON snapshot.
    Design {
        /// Script to rewrite.
        baseline: PathBuf,
        /// Snapshot the rewritten script must describe.
        target: PathBuf,
    },

    /// Validate a script statement by statement.
    Check {
        /// Script to validate (`-` for stdin).
        script: PathBuf,

        /// Snapshot the script runs against (empty if not specified).
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Print the `INSERT` prefix used when exporting rows as SQL.
    ExportPrefix {
        /// Target table.
        #[arg(short, long)]
        table: String,

        /// Schema qualifying the table.
        #[arg(short, long)]
        schema: Option<String>,

        /// Exported columns, in order.
        #[arg(required = true)]
        columns: Vec<String>,
    },
}
