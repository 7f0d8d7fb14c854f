//! # oxide-schema-core
//!
//! Dialect-independent building blocks of the schema engine.
//!
//! This crate provides:
//! - The canonical snapshot model ([`model`]), a set of serde structs that
//!   every component exchanges
//! - A structural differ producing an ordered [`MetadataDiff`]
//! - The [`SchemaDialect`] capability trait and an engine-keyed
//!   [`DialectRegistry`]
//! - Walk-through [`Advice`] with stable numeric codes
//!
//! Concrete dialects live in their own crates and register themselves at
//! start-up:
//!
//! ```rust,ignore
//! use oxide_schema_core::prelude::*;
//!
//! dialect::install(oxide_schema_mysql::register)?;
//! let old = dialect::parse_to_metadata(Engine::Mysql, "CREATE TABLE t (id INT);")?;
//! let new = dialect::parse_to_metadata(Engine::Mysql, "CREATE TABLE t (id BIGINT);")?;
//! let diff = get_database_schema_diff(&old, &new);
//! let ddl = dialect::generate_migration(Engine::Mysql, &diff)?;
//! // ddl == "ALTER TABLE `t` MODIFY COLUMN `id` bigint DEFAULT NULL;\n"
//! ```

pub mod advice;
pub mod dialect;
pub mod diff;
pub mod engine;
pub mod error;
pub mod export;
pub mod graph;
pub mod model;

pub use advice::{Advice, AdviceCode, AdviceStatus, Position};
pub use dialect::{DefinitionContext, DialectRegistry, SchemaDialect};
pub use diff::{get_database_schema_diff, DiffAction, MetadataDiff, TableDiff};
pub use engine::Engine;
pub use error::{Result, SchemaError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::advice::{Advice, AdviceCode, AdviceStatus, Position};
    pub use crate::dialect::{self, DefinitionContext, DialectRegistry, SchemaDialect};
    pub use crate::diff::{
        diff_table, get_database_schema_diff, ColumnDiff, DiffAction, EventDiff, FunctionDiff,
        IndexDiff, MetadataDiff, ObjectDiff, ProcedureDiff, RoutineDiff, TableDiff, ViewDiff,
    };
    pub use crate::engine::Engine;
    pub use crate::error::{Result, SchemaError};
    pub use crate::export::{excel_column_name, get_sql_statement_prefix, SchemaResource};
    pub use crate::model::{
        CheckConstraintMetadata, ColumnDefault, ColumnMetadata, DatabaseSchemaMetadata,
        EventMetadata, ForeignKeyMetadata, FunctionMetadata, GenerationKind, GenerationMetadata,
        IndexMetadata, PartitionType, ProcedureMetadata, SchemaMetadata, TableMetadata,
        TablePartitionMetadata, TriggerMetadata, ViewMetadata,
    };
}
