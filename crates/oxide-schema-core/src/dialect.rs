//! Dialect capability trait and registry.
//!
//! Each SQL dialect implements [`SchemaDialect`] once and registers it
//! under one or more [`Engine`] keys. Callers look operations up by
//! engine and never name a concrete dialect type.
//!
//! A process-wide registry is installed once with [`install`] and is
//! read-only afterwards. The free functions at the bottom of this module
//! dispatch through it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::advice::Advice;
use crate::diff::MetadataDiff;
use crate::engine::Engine;
use crate::error::{Result, SchemaError};
use crate::model::{
    DatabaseSchemaMetadata, FunctionMetadata, ProcedureMetadata, TableMetadata, ViewMetadata,
};

/// Options for [`SchemaDialect::get_database_definition`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefinitionContext {
    /// Wrap the dump in statements that disable and restore
    /// foreign-key and unique checks.
    pub print_header: bool,
}

/// The operations a dialect provides.
pub trait SchemaDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Parses a DDL script into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns a syntax error, or a structural error such as duplicate
    /// object names or conflicting database names.
    fn parse_to_metadata(&self, text: &str) -> Result<DatabaseSchemaMetadata>;

    /// Renders a diff as an executable DDL script.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Unsupported`] when a change cannot be
    /// expressed in this dialect.
    fn generate_migration(&self, diff: &MetadataDiff) -> Result<String>;

    /// Prints a canonical dump of the whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when an object cannot be printed.
    fn get_database_definition(
        &self,
        ctx: DefinitionContext,
        metadata: &DatabaseSchemaMetadata,
    ) -> Result<String>;

    /// Prints one `CREATE TABLE` statement.
    ///
    /// # Errors
    ///
    /// Returns an error when the table cannot be printed.
    fn get_table_definition(&self, schema_name: &str, table: &TableMetadata) -> Result<String>;

    /// Prints one view.
    ///
    /// # Errors
    ///
    /// Returns an error when the view cannot be printed.
    fn get_view_definition(&self, schema_name: &str, view: &ViewMetadata) -> Result<String>;

    /// Prints one stored function.
    ///
    /// # Errors
    ///
    /// Returns an error when the function cannot be printed.
    fn get_function_definition(
        &self,
        schema_name: &str,
        function: &FunctionMetadata,
    ) -> Result<String>;

    /// Prints one stored procedure.
    ///
    /// # Errors
    ///
    /// Returns an error when the procedure cannot be printed.
    fn get_procedure_definition(
        &self,
        schema_name: &str,
        procedure: &ProcedureMetadata,
    ) -> Result<String>;

    /// Reconciles a hand-written baseline script with a target snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the baseline does not parse. Nothing is
    /// returned on failure; the output is all-or-nothing.
    fn get_design_schema(&self, baseline: &str, target: &DatabaseSchemaMetadata)
        -> Result<String>;

    /// Replays `text` statement by statement against `metadata`, which
    /// is updated in place. Returns the first advice, if any; on advice
    /// the snapshot reflects every statement before the offending one.
    ///
    /// # Errors
    ///
    /// Returns an error if the script does not parse.
    fn walk_through(
        &self,
        metadata: &mut DatabaseSchemaMetadata,
        text: &str,
    ) -> Result<Option<Advice>>;
}

/// Maps engines to dialect implementations.
#[derive(Default, Clone)]
pub struct DialectRegistry {
    dialects: BTreeMap<Engine, Arc<dyn SchemaDialect>>,
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.dialects.iter().map(|(e, d)| (e, d.name())))
            .finish()
    }
}

impl DialectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `dialect` for `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateDialect`] if the engine already
    /// has a dialect.
    pub fn register(&mut self, engine: Engine, dialect: Arc<dyn SchemaDialect>) -> Result<()> {
        if self.dialects.contains_key(&engine) {
            return Err(SchemaError::DuplicateDialect(engine));
        }
        debug!(%engine, dialect = dialect.name(), "registered dialect");
        self.dialects.insert(engine, dialect);
        Ok(())
    }

    /// Looks up the dialect for `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnsupportedEngine`] if nothing is registered.
    pub fn get(&self, engine: Engine) -> Result<&dyn SchemaDialect> {
        self.dialects
            .get(&engine)
            .map(AsRef::as_ref)
            .ok_or(SchemaError::UnsupportedEngine(engine))
    }

    /// Returns the registered engines in a stable order.
    pub fn engines(&self) -> impl Iterator<Item = Engine> + '_ {
        self.dialects.keys().copied()
    }
}

static GLOBAL: OnceLock<DialectRegistry> = OnceLock::new();

/// Installs the process-wide registry. The initializer runs only for
/// the first successful call; later calls return the installed registry.
///
/// # Errors
///
/// Propagates the initializer's error; nothing is installed in that case.
pub fn install<F>(init: F) -> Result<&'static DialectRegistry>
where
    F: FnOnce(&mut DialectRegistry) -> Result<()>,
{
    if let Some(registry) = GLOBAL.get() {
        return Ok(registry);
    }
    let mut registry = DialectRegistry::new();
    init(&mut registry)?;
    Ok(GLOBAL.get_or_init(|| registry))
}

/// Returns the process-wide registry.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidState`] if [`install`] was never called.
pub fn global() -> Result<&'static DialectRegistry> {
    GLOBAL
        .get()
        .ok_or_else(|| SchemaError::InvalidState("dialect registry is not installed".into()))
}

/// Parses `text` with the dialect registered for `engine`.
///
/// # Errors
///
/// See [`SchemaDialect::parse_to_metadata`].
pub fn parse_to_metadata(engine: Engine, text: &str) -> Result<DatabaseSchemaMetadata> {
    global()?.get(engine)?.parse_to_metadata(text)
}

/// Generates a migration script with the dialect registered for `engine`.
///
/// # Errors
///
/// See [`SchemaDialect::generate_migration`].
pub fn generate_migration(engine: Engine, diff: &MetadataDiff) -> Result<String> {
    global()?.get(engine)?.generate_migration(diff)
}

/// Prints a database dump with the dialect registered for `engine`.
///
/// # Errors
///
/// See [`SchemaDialect::get_database_definition`].
pub fn get_database_definition(
    engine: Engine,
    ctx: DefinitionContext,
    metadata: &DatabaseSchemaMetadata,
) -> Result<String> {
    global()?.get(engine)?.get_database_definition(ctx, metadata)
}

/// Reconciles a baseline with the dialect registered for `engine`.
///
/// # Errors
///
/// See [`SchemaDialect::get_design_schema`].
pub fn get_design_schema(
    engine: Engine,
    baseline: &str,
    target: &DatabaseSchemaMetadata,
) -> Result<String> {
    global()?.get(engine)?.get_design_schema(baseline, target)
}

/// Runs a walk-through with the dialect registered for `engine`.
///
/// # Errors
///
/// See [`SchemaDialect::walk_through`].
pub fn walk_through(
    engine: Engine,
    metadata: &mut DatabaseSchemaMetadata,
    text: &str,
) -> Result<Option<Advice>> {
    global()?.get(engine)?.walk_through(metadata, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullDialect;

    impl SchemaDialect for NullDialect {
        fn name(&self) -> &'static str {
            "null"
        }

        fn parse_to_metadata(&self, _text: &str) -> Result<DatabaseSchemaMetadata> {
            Ok(DatabaseSchemaMetadata::new("parsed"))
        }

        fn generate_migration(&self, _diff: &MetadataDiff) -> Result<String> {
            Ok(String::new())
        }

        fn get_database_definition(
            &self,
            _ctx: DefinitionContext,
            _metadata: &DatabaseSchemaMetadata,
        ) -> Result<String> {
            Ok(String::new())
        }

        fn get_table_definition(&self, _: &str, table: &TableMetadata) -> Result<String> {
            Ok(table.name.clone())
        }

        fn get_view_definition(&self, _: &str, view: &ViewMetadata) -> Result<String> {
            Ok(view.name.clone())
        }

        fn get_function_definition(&self, _: &str, f: &FunctionMetadata) -> Result<String> {
            Ok(f.name.clone())
        }

        fn get_procedure_definition(&self, _: &str, p: &ProcedureMetadata) -> Result<String> {
            Ok(p.name.clone())
        }

        fn get_design_schema(&self, baseline: &str, _: &DatabaseSchemaMetadata) -> Result<String> {
            Ok(baseline.to_string())
        }

        fn walk_through(&self, _: &mut DatabaseSchemaMetadata, _: &str) -> Result<Option<Advice>> {
            Ok(None)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = DialectRegistry::new();
        registry
            .register(Engine::Mysql, Arc::new(NullDialect))
            .unwrap();
        let dialect = registry.get(Engine::Mysql).unwrap();
        assert_eq!(dialect.name(), "null");
        assert_eq!(
            dialect.parse_to_metadata("").unwrap().name,
            "parsed".to_string()
        );
        assert_eq!(registry.engines().collect::<Vec<_>>(), vec![Engine::Mysql]);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = DialectRegistry::new();
        registry
            .register(Engine::Tidb, Arc::new(NullDialect))
            .unwrap();
        let err = registry
            .register(Engine::Tidb, Arc::new(NullDialect))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateDialect(Engine::Tidb)));
    }

    #[test]
    fn test_unregistered_engine() {
        let registry = DialectRegistry::new();
        let err = registry.get(Engine::Postgres).err().unwrap();
        assert_eq!(err.to_string(), "Unsupported engine: postgres");
    }
}
