//! The MySQL [`SchemaDialect`].

use std::sync::Arc;

use oxide_schema_core::model::{
    DatabaseSchemaMetadata, FunctionMetadata, ProcedureMetadata, TableMetadata, ViewMetadata,
};
use oxide_schema_core::{
    Advice, DefinitionContext, DialectRegistry, Engine, MetadataDiff, Result, SchemaDialect,
};

use crate::{definition, design, generate, parse_to_metadata, walk_through};

/// MySQL and grammar-compatible engines. Schema names are ignored; a
/// MySQL snapshot has a single unnamed schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl SchemaDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn parse_to_metadata(&self, text: &str) -> Result<DatabaseSchemaMetadata> {
        parse_to_metadata::parse_to_metadata(text)
    }

    fn generate_migration(&self, diff: &MetadataDiff) -> Result<String> {
        generate::generate_migration(diff)
    }

    fn get_database_definition(
        &self,
        ctx: DefinitionContext,
        metadata: &DatabaseSchemaMetadata,
    ) -> Result<String> {
        definition::get_database_definition(ctx, metadata)
    }

    fn get_table_definition(&self, _schema_name: &str, table: &TableMetadata) -> Result<String> {
        definition::get_table_definition(table)
    }

    fn get_view_definition(&self, _schema_name: &str, view: &ViewMetadata) -> Result<String> {
        Ok(definition::get_view_definition(view))
    }

    fn get_function_definition(
        &self,
        _schema_name: &str,
        function: &FunctionMetadata,
    ) -> Result<String> {
        Ok(definition::get_function_definition(function))
    }

    fn get_procedure_definition(
        &self,
        _schema_name: &str,
        procedure: &ProcedureMetadata,
    ) -> Result<String> {
        Ok(definition::get_procedure_definition(procedure))
    }

    fn get_design_schema(
        &self,
        baseline: &str,
        target: &DatabaseSchemaMetadata,
    ) -> Result<String> {
        design::get_design_schema(baseline, target)
    }

    fn walk_through(
        &self,
        metadata: &mut DatabaseSchemaMetadata,
        text: &str,
    ) -> Result<Option<Advice>> {
        walk_through::walk_through(metadata, text)
    }
}

/// Engines served by [`MysqlDialect`].
pub const ENGINES: [Engine; 2] = [Engine::Mysql, Engine::Oceanbase];

/// Registers [`MysqlDialect`] for every engine in [`ENGINES`].
///
/// # Errors
///
/// Returns [`oxide_schema_core::SchemaError::DuplicateDialect`] if one of
/// the engines is already taken.
pub fn register(registry: &mut DialectRegistry) -> Result<()> {
    let dialect: Arc<dyn SchemaDialect> = Arc::new(MysqlDialect);
    for engine in ENGINES {
        registry.register(engine, Arc::clone(&dialect))?;
    }
    Ok(())
}
