//! # oxide-schema-cli
//!
//! Command-line front end for the schema engine. The argument model lives
//! in [`cli`], the command bodies in [`commands`]; `main.rs` only wires
//! logging, the dialect registry and the exit code.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{run, Output};
