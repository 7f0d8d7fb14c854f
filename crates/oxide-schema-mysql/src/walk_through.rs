//! Statement-by-statement replay of a script against a snapshot.
//!
//! Each statement either moves the snapshot forward or produces an
//! [`Advice`] explaining why MySQL would reject it. The walk stops at the
//! first advice, leaving the snapshot with the effects of every statement
//! before it. Foreign keys and check constraints are recorded but not
//! validated.

use oxide_schema_core::model::{DatabaseSchemaMetadata, SchemaMetadata, TableMetadata};
use oxide_schema_core::{Advice, AdviceCode, Result};
use tracing::debug;

use crate::catalog::{
    drop_inherited_character_sets, partitions_from_clause, IndexKind, TableEditor,
};
use crate::parse_to_metadata::{
    drop_objects, put_routine, put_trigger, put_view, routine_exists, Patterns, Session,
};
use crate::parser::ast::{
    AlterItem, AlterTable, CreateIndex, CreateRoutine, CreateTable, CreateTrigger, CreateView,
    DatabaseStatement, DropIndex, DropTable, ObjectName, RenameTable, Statement,
};
use crate::parser::{parse_script, ParsedStatement};

/// Outcome of one transition.
type Step = std::result::Result<(), Advice>;

/// Replays `text` on `metadata`.
///
/// Returns the advice of the first rejected statement, or `None` when the
/// whole script applies. The unnamed schema is created when missing.
///
/// # Errors
///
/// Returns [`oxide_schema_core::SchemaError::Syntax`] when the script
/// does not parse, and a structural error for partitioning that cannot
/// be represented.
pub fn walk_through(metadata: &mut DatabaseSchemaMetadata, text: &str) -> Result<Option<Advice>> {
    let statements = parse_script(text)?;
    metadata.ensure_schema("");

    let mut state = WalkThrough {
        metadata,
        source: text,
        line: 1,
        session: Session::default(),
        patterns: Patterns::new()?,
    };
    for (idx, parsed) in statements.iter().enumerate() {
        state.line = parsed.chunk.line;
        let checkpoint = state.checkpoint(&parsed.statement);
        if let Err(advice) = state.apply(parsed)? {
            state.rollback(checkpoint);
            debug!(
                statement = idx,
                line = advice.position.line,
                code = %advice.code,
                "walk-through stopped"
            );
            return Ok(Some(advice));
        }
    }
    debug!(statements = statements.len(), "walk-through completed");
    Ok(None)
}

struct WalkThrough<'a> {
    metadata: &'a mut DatabaseSchemaMetadata,
    source: &'a str,
    /// Line of the statement being applied.
    line: usize,
    session: Session,
    patterns: Patterns,
}

impl WalkThrough<'_> {
    /// Copies the schema before statements that apply piece by piece, so
    /// that a rejected one leaves nothing behind.
    fn checkpoint(&self, statement: &Statement) -> Option<SchemaMetadata> {
        match statement {
            Statement::AlterTable(_) | Statement::DropTable(_) | Statement::RenameTable(_) => {
                self.metadata.schema("").cloned()
            }
            _ => None,
        }
    }

    fn rollback(&mut self, checkpoint: Option<SchemaMetadata>) {
        if let (Some(saved), Some(schema)) = (checkpoint, self.metadata.schema_mut("")) {
            *schema = saved;
        }
    }

    fn apply(&mut self, parsed: &ParsedStatement) -> Result<Step> {
        match &parsed.statement {
            Statement::CreateTable(create) => self.create_table(create, parsed.text(self.source)),
            Statement::AlterTable(alter) => self.alter_table(alter),
            Statement::DropTable(drop) => Ok(self.drop_table(drop)),
            Statement::RenameTable(rename) => Ok(self.rename_table(rename)),
            Statement::CreateIndex(create) => Ok(self.create_index(create)),
            Statement::DropIndex(drop) => Ok(self.drop_index(drop)),
            Statement::CreateDatabase(database) => Ok(Err(self.not_current(&database.name.value))),
            Statement::AlterDatabase(database) => Ok(self.alter_database(database)),
            Statement::DropDatabase(database) => Ok(self.drop_database(database)),
            Statement::CreateView(view) => Ok(self.create_view(view)),
            Statement::CreateRoutine(routine) => Ok(self.create_routine(routine)),
            Statement::CreateTrigger(trigger) => Ok(self.create_trigger(trigger)),
            Statement::DropObject(drop) => Ok(self.schema().map(|schema| drop_objects(schema, drop))),
            Statement::Other => {
                self.patterns
                    .capture_session(&mut self.session, parsed.text(self.source));
                Ok(Ok(()))
            }
            Statement::Use(_) => Ok(Ok(())),
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    fn is_current(&self, database: &str) -> bool {
        self.metadata.name.eq_ignore_ascii_case(database)
    }

    fn not_current(&self, database: &str) -> Advice {
        Advice::warning(
            AdviceCode::NotCurrentDatabase,
            format!(
                "Database `{database}` is not the current database `{}`",
                self.metadata.name
            ),
            self.line,
        )
    }

    /// Warns about names qualified with another database.
    fn check_database(&self, name: &ObjectName) -> Step {
        match name.database_name() {
            Some(database) if !self.is_current(database) => Err(self.not_current(database)),
            _ => Ok(()),
        }
    }

    fn schema(&mut self) -> std::result::Result<&mut SchemaMetadata, Advice> {
        let line = self.line;
        self.metadata
            .schema_mut("")
            .ok_or_else(|| Advice::error(AdviceCode::SchemaNotExists, "Schema does not exist", line))
    }

    fn table_not_exists(&self, table: &str) -> Advice {
        Advice::error(
            AdviceCode::TableNotExists,
            format!("Table `{table}` does not exist"),
            self.line,
        )
    }

    fn table_exists(&self, table: &str) -> Advice {
        Advice::error(
            AdviceCode::TableExists,
            format!("Table `{table}` already exists"),
            self.line,
        )
    }

    /// Resolves an existing table in the current database.
    fn find_table(&mut self, name: &ObjectName) -> std::result::Result<&mut TableMetadata, Advice> {
        self.check_database(name)?;
        let table_name = name.name.value.as_str();
        let missing = self.table_not_exists(table_name);
        self.schema()?.table_mut(table_name).ok_or(missing)
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn create_table(&mut self, create: &CreateTable, text: &str) -> Result<Step> {
        if let Err(advice) = self.check_database(&create.name) {
            return Ok(Err(advice));
        }
        let name = create.name.name.value.as_str();
        let exists = match self.schema() {
            Ok(schema) => schema.table(name).is_some(),
            Err(advice) => return Ok(Err(advice)),
        };
        if exists {
            if create.if_not_exists {
                return Ok(Ok(()));
            }
            return Ok(Err(self.table_exists(name)));
        }
        if create.as_select {
            return Ok(Err(Advice::warning(
                AdviceCode::StatementCreateTableAs,
                format!("CREATE TABLE AS statement is used in \"{text}\""),
                self.line,
            )));
        }
        if let Some(like) = &create.like {
            return Ok(self.copy_table(name, like));
        }

        let mut table = TableMetadata::new(name);
        {
            let mut editor = TableEditor::new(&mut table, true);
            for element in &create.elements {
                if let Err(conflict) = editor.add_element(element) {
                    let line = element.span().line_in(self.source);
                    if let Some(advice) = conflict.to_advice(name, line) {
                        return Ok(Err(advice));
                    }
                }
            }
            editor.apply_options(&create.options);
        }
        if let Some(partition) = &create.partition {
            table.partitions = partitions_from_clause(partition)?;
        }
        drop_inherited_character_sets(&mut table);
        match self.schema() {
            Ok(schema) => schema.tables.push(table),
            Err(advice) => return Ok(Err(advice)),
        }
        Ok(Ok(()))
    }

    /// `CREATE TABLE ... LIKE`: columns, indexes and partitions are copied;
    /// foreign keys and triggers are not.
    fn copy_table(&mut self, name: &str, like: &ObjectName) -> Step {
        let source = self.find_table(like)?.clone();
        let copy = TableMetadata {
            name: name.to_string(),
            foreign_keys: Vec::new(),
            triggers: Vec::new(),
            ..source
        };
        self.schema()?.tables.push(copy);
        Ok(())
    }

    fn alter_table(&mut self, alter: &AlterTable) -> Result<Step> {
        let mut table_name = match self.find_table(&alter.name) {
            Ok(table) => table.name.clone(),
            Err(advice) => return Ok(Err(advice)),
        };
        let line = self.line;

        for item in &alter.items {
            match item {
                AlterItem::RenameTable(new_name) => {
                    if let Err(advice) = self.check_database(new_name) {
                        return Ok(Err(advice));
                    }
                    let target = new_name.name.value.clone();
                    if let Err(advice) = self.rename(&table_name, &target) {
                        return Ok(Err(advice));
                    }
                    table_name = target;
                }
                AlterItem::Partition(clause) => {
                    let partitions = partitions_from_clause(clause)?;
                    if let Ok(schema) = self.schema() {
                        if let Some(table) = schema.table_mut(&table_name) {
                            table.partitions = partitions;
                        }
                    }
                }
                item => {
                    let table = match self.schema() {
                        Ok(schema) => schema.table_mut(&table_name),
                        Err(advice) => return Ok(Err(advice)),
                    };
                    let Some(table) = table else {
                        continue;
                    };
                    if let Err(conflict) = TableEditor::new(table, true).apply_alter_item(item) {
                        if let Some(advice) = conflict.to_advice(&table_name, line) {
                            return Ok(Err(advice));
                        }
                    }
                }
            }
        }
        Ok(Ok(()))
    }

    /// Renames a table within the current database.
    fn rename(&mut self, from: &str, to: &str) -> Step {
        if from == to {
            return Ok(());
        }
        let missing = self.table_not_exists(from);
        let taken = self.table_exists(to);
        let schema = self.schema()?;
        if schema.table(to).is_some() {
            return Err(taken);
        }
        let table = schema.table_mut(from).ok_or(missing)?;
        table.name = to.to_string();
        Ok(())
    }

    fn drop_table(&mut self, drop: &DropTable) -> Step {
        for name in &drop.tables {
            self.check_database(name)?;
            let table_name = name.name.value.as_str();
            let missing = self.table_not_exists(table_name);
            let schema = self.schema()?;
            if schema.table(table_name).is_none() {
                if drop.if_exists {
                    continue;
                }
                return Err(missing);
            }
            schema.tables.retain(|t| t.name != table_name);
        }
        Ok(())
    }

    /// Each pair is a rename inside the current database, a move out of
    /// it (the table is gone from this snapshot), or a statement about
    /// other databases.
    fn rename_table(&mut self, rename: &RenameTable) -> Step {
        for (from, to) in &rename.pairs {
            let from_db = from.database_name().unwrap_or_default();
            let to_db = to.database_name().unwrap_or_default();
            let from_current = from_db.is_empty() || self.is_current(from_db);
            let to_current = to_db.is_empty() || self.is_current(to_db);

            if from_current && to_current {
                self.rename(&from.name.value, &to.name.value)?;
            } else if from_current {
                let table_name = from.name.value.as_str();
                let missing = self.table_not_exists(table_name);
                let schema = self.schema()?;
                if schema.table(table_name).is_none() {
                    return Err(missing);
                }
                schema.tables.retain(|t| t.name != table_name);
            } else {
                return Err(self.not_current(from_db));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    fn create_index(&mut self, create: &CreateIndex) -> Step {
        let line = self.line;
        let table = self.find_table(&create.table)?;
        let table_name = table.name.clone();
        let kind = IndexKind::from_modifier(create.modifier.as_deref());
        let name = create.index.name.as_ref().map(|n| n.value.as_str());
        match TableEditor::new(table, true).add_index(kind, name, &create.index) {
            Ok(()) => Ok(()),
            Err(conflict) => conflict.to_advice(&table_name, line).map_or(Ok(()), Err),
        }
    }

    fn drop_index(&mut self, drop: &DropIndex) -> Step {
        let line = self.line;
        let table = self.find_table(&drop.table)?;
        let table_name = table.name.clone();
        match TableEditor::new(table, true).drop_index(&drop.name.value) {
            Ok(()) => Ok(()),
            Err(conflict) => conflict.to_advice(&table_name, line).map_or(Ok(()), Err),
        }
    }

    // ========================================================================
    // Databases
    // ========================================================================

    fn alter_database(&mut self, database: &DatabaseStatement) -> Step {
        let name = database.name.value.as_str();
        if !name.is_empty() && !self.is_current(name) {
            return Err(self.not_current(name));
        }
        if let Some(charset) = &database.charset {
            self.metadata.character_set.clone_from(charset);
        }
        if let Some(collation) = &database.collation {
            self.metadata.collation.clone_from(collation);
        }
        Ok(())
    }

    fn drop_database(&self, database: &DatabaseStatement) -> Step {
        let name = database.name.value.as_str();
        if !self.is_current(name) {
            return Err(self.not_current(name));
        }
        debug!(database = name, "dropping the current database is not tracked");
        Ok(())
    }

    // ========================================================================
    // Views, routines and triggers
    // ========================================================================

    fn create_view(&mut self, view: &CreateView) -> Step {
        self.check_database(&view.name)?;
        let columns = self.patterns.view_columns(view);
        put_view(self.schema()?, view, columns);
        Ok(())
    }

    fn create_routine(&mut self, routine: &CreateRoutine) -> Step {
        self.check_database(&routine.name)?;
        let session = self.session.clone();
        let schema = self.schema()?;
        if routine.if_not_exists && routine_exists(schema, routine) {
            return Ok(());
        }
        put_routine(schema, routine, &session);
        Ok(())
    }

    fn create_trigger(&mut self, trigger: &CreateTrigger) -> Step {
        self.check_database(&trigger.name)?;
        let session = self.session.clone();
        let table = self.find_table(&trigger.table)?;
        put_trigger(table, trigger, &session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_to_metadata::parse_to_metadata;
    use oxide_schema_core::AdviceStatus;

    fn walk(metadata: &mut DatabaseSchemaMetadata, script: &str) -> Option<Advice> {
        walk_through(metadata, script).unwrap()
    }

    fn named(name: &str) -> DatabaseSchemaMetadata {
        DatabaseSchemaMetadata::new(name)
    }

    #[test]
    fn test_clean_script_builds_snapshot() {
        let script = "CREATE TABLE t (id INT NOT NULL AUTO_INCREMENT, name VARCHAR(10), PRIMARY KEY (id));\n\
                      ALTER TABLE t ADD COLUMN age INT AFTER id, ADD KEY idx_name (name);\n\
                      CREATE INDEX idx_age ON t (age);";
        let mut metadata = named("db");
        assert_eq!(walk(&mut metadata, script), None);

        let expected = parse_to_metadata(script).unwrap();
        assert_eq!(metadata.schemas[0].tables, expected.schemas[0].tables);
    }

    #[test]
    fn test_table_exists() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE t (a INT);\nCREATE TABLE IF NOT EXISTS t (b INT);\nCREATE TABLE t (c INT);",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::TableExists);
        assert_eq!(advice.status, AdviceStatus::Error);
        assert_eq!(advice.position.line, 3);
        assert_eq!(advice.content, "Table `t` already exists");
        assert!(metadata.schemas[0].table("t").unwrap().column("a").is_some());
    }

    #[test]
    fn test_halts_with_prior_effects_only() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE a (id INT);\n\
             ALTER TABLE a DROP COLUMN missing;\n\
             CREATE TABLE b (id INT);",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::ColumnNotExists);
        assert_eq!(advice.content, "Column `missing` does not exist in table `a`");
        assert_eq!(advice.position.line, 2);
        assert!(metadata.schemas[0].table("a").is_some());
        assert!(metadata.schemas[0].table("b").is_none());
    }

    #[test]
    fn test_rejected_alter_leaves_earlier_items_unapplied() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE a (id INT);\nALTER TABLE a ADD COLUMN b INT, DROP COLUMN missing;",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::ColumnNotExists);
        assert_eq!(advice.position.line, 2);
        let columns: Vec<_> = metadata.schemas[0]
            .table("a")
            .unwrap()
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, ["id"]);
    }

    #[test]
    fn test_rejected_alter_keeps_table_name() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE a (id INT);\nALTER TABLE a RENAME TO b, DROP COLUMN missing;",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::ColumnNotExists);
        assert!(metadata.schemas[0].table("a").is_some());
        assert!(metadata.schemas[0].table("b").is_none());
    }

    #[test]
    fn test_rejected_multi_table_drop_keeps_every_table() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE t1 (id INT);\nDROP TABLE t1, missing;",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::TableNotExists);
        assert_eq!(advice.position.line, 2);
        assert!(metadata.schemas[0].table("t1").is_some());
    }

    #[test]
    fn test_rejected_multi_rename_keeps_every_name() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE a (id INT);\nCREATE TABLE c (id INT);\nRENAME TABLE a TO b, c TO b;",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::TableExists);
        assert_eq!(advice.position.line, 3);
        assert!(metadata.schemas[0].table("a").is_some());
        assert!(metadata.schemas[0].table("b").is_none());
        assert!(metadata.schemas[0].table("c").is_some());
    }

    #[test]
    fn test_second_auto_increment_points_at_column() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TABLE t (\n  a INT AUTO_INCREMENT,\n  b INT AUTO_INCREMENT,\n  KEY (a)\n);",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::AutoIncrementExists);
        assert_eq!(advice.position.line, 3);
    }

    #[test]
    fn test_other_database_warns() {
        let mut metadata = named("db");
        let advice = walk(&mut metadata, "CREATE TABLE other.t (a INT);").unwrap();
        assert_eq!(advice.code, AdviceCode::NotCurrentDatabase);
        assert_eq!(advice.status, AdviceStatus::Warning);
        assert_eq!(advice.content, "Database `other` is not the current database `db`");

        let mut metadata = named("db");
        assert_eq!(walk(&mut metadata, "CREATE TABLE DB.t (a INT);"), None);
    }

    #[test]
    fn test_create_table_as_select() {
        let mut metadata = named("db");
        let advice = walk(&mut metadata, "CREATE TABLE t AS SELECT 1 AS a;").unwrap();
        assert_eq!(advice.code, AdviceCode::StatementCreateTableAs);
        assert_eq!(advice.status, AdviceStatus::Warning);
    }

    #[test]
    fn test_create_table_like() {
        let mut metadata = named("db");
        assert_eq!(
            walk(
                &mut metadata,
                "CREATE TABLE a (id INT, KEY k (id));\nCREATE TABLE b LIKE a;"
            ),
            None
        );
        assert!(metadata.schemas[0].table("b").unwrap().index("k").is_some());

        let advice = walk(&mut metadata, "CREATE TABLE c LIKE missing;").unwrap();
        assert_eq!(advice.code, AdviceCode::TableNotExists);
    }

    #[test]
    fn test_drop_table() {
        let mut metadata = named("db");
        assert_eq!(
            walk(&mut metadata, "CREATE TABLE t (a INT);\nDROP TABLE t;\nDROP TABLE IF EXISTS t;"),
            None
        );
        let advice = walk(&mut metadata, "DROP TABLE t;").unwrap();
        assert_eq!(advice.code, AdviceCode::TableNotExists);
    }

    #[test]
    fn test_rename_table_classification() {
        let mut metadata = named("db");
        walk(&mut metadata, "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);");

        let advice = walk(&mut metadata, "RENAME TABLE a TO b;").unwrap();
        assert_eq!(advice.code, AdviceCode::TableExists);

        assert_eq!(walk(&mut metadata, "RENAME TABLE a TO c;"), None);
        assert!(metadata.schemas[0].table("c").is_some());

        assert_eq!(walk(&mut metadata, "RENAME TABLE c TO archive.c;"), None);
        assert!(metadata.schemas[0].table("c").is_none());

        let advice = walk(&mut metadata, "RENAME TABLE x.a TO y.a;").unwrap();
        assert_eq!(advice.code, AdviceCode::NotCurrentDatabase);
    }

    #[test]
    fn test_index_checks() {
        let mut metadata = named("db");
        walk(&mut metadata, "CREATE TABLE t (a INT, g GEOMETRY, KEY k (a));");

        let advice = walk(&mut metadata, "CREATE INDEX k ON t (a);").unwrap();
        assert_eq!(advice.code, AdviceCode::IndexExists);

        let advice = walk(&mut metadata, "CREATE INDEX k2 ON t (missing);").unwrap();
        assert_eq!(advice.code, AdviceCode::ColumnNotExists);

        let advice = walk(&mut metadata, "CREATE SPATIAL INDEX sp ON t (g);").unwrap();
        assert_eq!(advice.code, AdviceCode::SpatialIndexKeyNullable);

        let advice = walk(&mut metadata, "DROP INDEX nope ON t;").unwrap();
        assert_eq!(advice.code, AdviceCode::IndexNotExists);

        assert_eq!(walk(&mut metadata, "DROP INDEX k ON t;"), None);
    }

    #[test]
    fn test_column_defaults() {
        let mut metadata = named("db");
        walk(&mut metadata, "CREATE TABLE t (a INT NOT NULL, b TEXT);");

        let advice = walk(&mut metadata, "ALTER TABLE t ALTER COLUMN b SET DEFAULT 'x';").unwrap();
        assert_eq!(advice.code, AdviceCode::InvalidColumnDefault);

        let advice = walk(&mut metadata, "ALTER TABLE t ALTER COLUMN a SET DEFAULT NULL;").unwrap();
        assert_eq!(advice.code, AdviceCode::SetNullDefaultForNotNullColumn);

        let advice = walk(&mut metadata, "ALTER TABLE t ADD COLUMN c INT ON UPDATE CURRENT_TIMESTAMP;")
            .unwrap();
        assert_eq!(advice.code, AdviceCode::OnUpdateColumnNotDatetimeOrTimestamp);
    }

    #[test]
    fn test_databases() {
        let mut metadata = named("db");
        let advice = walk(&mut metadata, "CREATE DATABASE other;").unwrap();
        assert_eq!(advice.code, AdviceCode::NotCurrentDatabase);

        assert_eq!(walk(&mut metadata, "ALTER DATABASE db CHARACTER SET utf8mb4;"), None);
        assert_eq!(metadata.character_set, "utf8mb4");

        let advice = walk(&mut metadata, "DROP DATABASE other;").unwrap();
        assert_eq!(advice.code, AdviceCode::NotCurrentDatabase);
    }

    #[test]
    fn test_trigger_needs_table() {
        let mut metadata = named("db");
        let advice = walk(
            &mut metadata,
            "CREATE TRIGGER tr BEFORE INSERT ON t FOR EACH ROW SET NEW.a = 1;",
        )
        .unwrap();
        assert_eq!(advice.code, AdviceCode::TableNotExists);

        walk(&mut metadata, "CREATE TABLE t (a INT);");
        assert_eq!(
            walk(
                &mut metadata,
                "SET sql_mode = 'ANSI';\nCREATE TRIGGER tr BEFORE INSERT ON t FOR EACH ROW SET NEW.a = 1;"
            ),
            None
        );
        let trigger = &metadata.schemas[0].table("t").unwrap().triggers[0];
        assert_eq!(trigger.sql_mode, "ANSI");
    }

    #[test]
    fn test_views_and_routines_are_tracked() {
        let mut metadata = named("db");
        let script = "CREATE TABLE t (a INT);\n\
                      CREATE VIEW v AS SELECT a FROM t;\n\
                      CREATE FUNCTION f() RETURNS INT RETURN 1;\n\
                      DROP FUNCTION IF EXISTS f;";
        assert_eq!(walk(&mut metadata, script), None);
        assert_eq!(metadata.schemas[0].views[0].definition, "SELECT a FROM t");
        assert!(metadata.schemas[0].functions.is_empty());
    }

    #[test]
    fn test_missing_schema_is_created() {
        let mut metadata = DatabaseSchemaMetadata::default();
        metadata.schemas.clear();
        assert_eq!(walk(&mut metadata, "CREATE TABLE t (a INT);"), None);
        assert_eq!(metadata.schemas.len(), 1);
    }

    #[test]
    fn test_syntax_error_is_an_error() {
        let mut metadata = named("db");
        assert!(walk_through(&mut metadata, "CREATE TABLE (;").is_err());
    }
}
