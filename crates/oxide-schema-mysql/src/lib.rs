//! # oxide-schema-mysql
//!
//! The MySQL dialect of the schema engine.
//!
//! This crate provides:
//! - A lossless lexer and a span-annotated DDL parser that splits scripts
//!   on `;` and `DELIMITER` changes
//! - [`parse_to_metadata`]: DDL script to snapshot
//! - [`generate_migration`]: a diff rendered as an ordered DDL script
//! - [`get_database_definition`]: a dump-style printer
//! - [`get_design_schema`]: minimal-change reconciliation of a hand-written
//!   schema file with a target snapshot
//! - [`walk_through`]: statement-by-statement validation producing advice
//!
//! The same implementation serves OceanBase in MySQL mode.
//!
//! ```rust
//! use oxide_schema_core::get_database_schema_diff;
//! use oxide_schema_mysql::{generate_migration, parse_to_metadata};
//!
//! let old = parse_to_metadata("CREATE TABLE t (id INT NOT NULL);").unwrap();
//! let new = parse_to_metadata("CREATE TABLE t (id INT NOT NULL, name VARCHAR(10));").unwrap();
//! let ddl = generate_migration(&get_database_schema_diff(&old, &new)).unwrap();
//! assert_eq!(
//!     ddl,
//!     "ALTER TABLE `t` ADD COLUMN `name` varchar(10) DEFAULT NULL AFTER `id`;\n"
//! );
//! ```

pub mod catalog;
pub mod definition;
pub mod design;
pub mod dialect;
pub mod generate;
pub mod lexer;
pub mod parse_to_metadata;
pub mod parser;
pub mod render;
pub mod types;
pub mod walk_through;

pub use definition::{
    get_database_definition, get_function_definition, get_procedure_definition,
    get_table_definition, get_view_definition,
};
pub use design::get_design_schema;
pub use dialect::{register, MysqlDialect};
pub use generate::generate_migration;
pub use parse_to_metadata::parse_to_metadata;
pub use parser::{parse_script, ParseError, ParsedStatement};
pub use walk_through::walk_through;
