//! Migration generator.
//!
//! Renders a [`MetadataDiff`] as a MySQL script in two phases. The drop
//! phase removes everything that goes away, dependents first; the create
//! phase builds everything new, with foreign keys added only once every
//! table exists. Each phase is skipped when it has nothing to say, and a
//! blank line separates the two when both are present.

use std::collections::HashSet;

use oxide_schema_core::diff::{DiffAction, MetadataDiff, RoutineDiff, TableDiff};
use oxide_schema_core::graph::DependencyGraph;
use oxide_schema_core::model::{
    ColumnMetadata, IndexMetadata, PartitionType, TableMetadata, TriggerMetadata, ViewMetadata,
};
use oxide_schema_core::{Result, SchemaError};
use tracing::{debug, warn};

use crate::render::{
    check_clause, column_clause, create_index_statement, create_table_statement,
    foreign_key_clause, index_clause, partition_clause, quote_ident, quote_string, TableDefaults,
    TableStyle,
};

/// Statements of one phase, each followed by a fixed terminator.
struct Script {
    sql: String,
    terminator: &'static str,
}

impl Script {
    const fn new(terminator: &'static str) -> Self {
        Self {
            sql: String::new(),
            terminator,
        }
    }

    fn push(&mut self, statement: impl AsRef<str>) {
        self.sql.push_str(statement.as_ref());
        self.sql.push_str(self.terminator);
    }

    /// A compound statement that needs its own delimiter.
    fn push_block(&mut self, statement: &str) {
        self.sql.push_str("DELIMITER ;;\n");
        self.sql.push_str(statement.trim_end());
        self.sql.push_str(";;\nDELIMITER ;\n");
    }

    fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Generates the DDL that turns the old side of `diff` into the new one.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidState`] when a diff entry lacks the
/// object its action needs, and [`SchemaError::Unsupported`] for
/// partitioning that has no MySQL spelling.
pub fn generate_migration(diff: &MetadataDiff) -> Result<String> {
    let mut drops = Script::new(";\n\n");
    drop_phase(diff, &mut drops)?;
    debug!(bytes = drops.sql.len(), "generated drop phase");

    let mut creates = Script::new(";\n");
    create_phase(diff, &mut creates)?;
    debug!(bytes = creates.sql.len(), "generated create phase");

    Ok(match (drops.is_empty(), creates.is_empty()) {
        (true, _) => creates.sql,
        (false, true) => drops.sql,
        (false, false) => format!("{}\n{}", drops.sql, creates.sql),
    })
}

// ================================================================
// Drop phase
// ================================================================

fn drop_phase(diff: &MetadataDiff, out: &mut Script) -> Result<()> {
    for table_diff in &diff.table_changes {
        match table_diff.action {
            DiffAction::Drop => {
                for trigger in &old_table(table_diff)?.triggers {
                    out.push(format!("DROP TRIGGER IF EXISTS {}", quote_ident(&trigger.name)));
                }
            }
            DiffAction::Alter => {
                for change in &table_diff.trigger_changes {
                    if let Some(trigger) = dropped(change.action, change.old.as_ref()) {
                        out.push(format!("DROP TRIGGER IF EXISTS {}", quote_ident(&trigger.name)));
                    }
                }
            }
            DiffAction::Create => {}
        }
    }

    for table_diff in altered(diff) {
        for change in &table_diff.foreign_key_changes {
            if let Some(fk) = dropped(change.action, change.old.as_ref()) {
                out.push(format!(
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
                    quote_ident(&table_diff.table_name),
                    quote_ident(&fk.name)
                ));
            }
        }
    }

    for view_diff in &diff.view_changes {
        if view_diff.action == DiffAction::Drop {
            let view = routine_old(view_diff)?;
            out.push(format!(
                "CREATE OR REPLACE VIEW {} AS {}",
                quote_ident(&view.name),
                placeholder_select(&view.columns)
            ));
        }
    }

    drop_routines(&diff.event_changes, "EVENT", out);
    for view_diff in &diff.view_changes {
        if view_diff.action == DiffAction::Drop {
            out.push(format!("DROP VIEW IF EXISTS {}", quote_ident(&view_diff.name)));
        }
    }
    drop_routines(&diff.procedure_changes, "PROCEDURE", out);
    drop_routines(&diff.function_changes, "FUNCTION", out);

    drop_tables(diff, out)?;

    for table_diff in altered(diff) {
        drop_table_objects(table_diff, out)?;
    }
    Ok(())
}

/// Routines are replaced by dropping and re-creating them, so an altered
/// routine is dropped here too.
fn drop_routines<T>(changes: &[RoutineDiff<T>], kind: &str, out: &mut Script) {
    for change in changes {
        if matches!(change.action, DiffAction::Drop | DiffAction::Alter) {
            out.push(format!("DROP {kind} IF EXISTS {}", quote_ident(&change.name)));
        }
    }
}

/// Drops removed tables so that a table goes only after every dropped
/// table referencing it.
fn drop_tables(diff: &MetadataDiff, out: &mut Script) -> Result<()> {
    let mut dropped_tables: Vec<&TableMetadata> = Vec::new();
    for table_diff in &diff.table_changes {
        if table_diff.action == DiffAction::Drop {
            dropped_tables.push(old_table(table_diff)?);
        }
    }
    if dropped_tables.is_empty() {
        return Ok(());
    }

    let mut graph = DependencyGraph::new();
    for table in &dropped_tables {
        graph.add_node(&table.name);
    }
    for table in &dropped_tables {
        for fk in &table.foreign_keys {
            if dropped_tables.iter().any(|t| t.name == fk.referenced_table) {
                graph.add_edge(&table.name, &fk.referenced_table);
            }
        }
    }

    let sorted = graph.sort();
    if !sorted.is_acyclic() {
        warn!(tables = ?sorted.cyclic, "foreign key cycle among dropped tables");
        for name in &sorted.cyclic {
            let Some(table) = dropped_tables.iter().find(|t| &t.name == name) else {
                continue;
            };
            for fk in &table.foreign_keys {
                out.push(format!(
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
                    quote_ident(&table.name),
                    quote_ident(&fk.name)
                ));
            }
        }
    }

    for name in sorted.order.iter().chain(&sorted.cyclic) {
        out.push(format!("DROP TABLE IF EXISTS {}", quote_ident(name)));
    }
    Ok(())
}

fn drop_table_objects(table_diff: &TableDiff, out: &mut Script) -> Result<()> {
    let table = quote_ident(&table_diff.table_name);
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for change in &table_diff.check_constraint_changes {
        if let Some(check) = dropped(change.action, change.old.as_ref()) {
            if seen.insert(("check", &check.name)) {
                out.push(format!(
                    "ALTER TABLE {table} DROP CHECK {}",
                    quote_ident(&check.name)
                ));
            }
        }
    }

    for change in &table_diff.index_changes {
        let Some(index) = dropped(change.action, change.old.as_ref()) else {
            continue;
        };
        if !seen.insert(("index", &index.name)) {
            continue;
        }
        if index.primary {
            out.push(format!("ALTER TABLE {table} DROP PRIMARY KEY"));
        } else {
            out.push(format!("DROP INDEX {} ON {table}", quote_ident(&index.name)));
        }
    }

    for change in &table_diff.column_changes {
        if let Some(column) = dropped(change.action, change.old.as_ref()) {
            if seen.insert(("column", &column.name)) {
                out.push(format!(
                    "ALTER TABLE {table} DROP COLUMN {}",
                    quote_ident(&column.name)
                ));
            }
        }
    }

    if !table_diff.partition_changes.is_empty() && new_table(table_diff)?.partitions.is_empty() {
        out.push(format!("ALTER TABLE {table} REMOVE PARTITIONING"));
    }
    Ok(())
}

// ================================================================
// Create phase
// ================================================================

fn create_phase(diff: &MetadataDiff, out: &mut Script) -> Result<()> {
    for view_diff in &diff.view_changes {
        if view_diff.action == DiffAction::Create {
            let view = routine_new(view_diff)?;
            out.push(format!(
                "CREATE OR REPLACE VIEW {} AS {}",
                quote_ident(&view.name),
                placeholder_select(&view.columns)
            ));
        }
    }

    let mut new_tables: Vec<&TableMetadata> = Vec::new();
    for table_diff in &diff.table_changes {
        if table_diff.action == DiffAction::Create {
            let table = new_table(table_diff)?;
            check_partitions(table)?;
            let statement = create_table_statement(table, TableStyle::MIGRATION)?;
            out.push(statement.trim_end_matches(';'));
            new_tables.push(table);
        }
    }
    for table in &new_tables {
        for fk in &table.foreign_keys {
            out.push(format!(
                "ALTER TABLE {} ADD {}",
                quote_ident(&table.name),
                foreign_key_clause(fk)
            ));
        }
    }
    for table in &new_tables {
        for trigger in &table.triggers {
            out.push_block(&trigger_statement(&table.name, trigger));
        }
    }

    for table_diff in altered(diff) {
        alter_table(table_diff, out)?;
    }

    for view_diff in &diff.view_changes {
        if matches!(view_diff.action, DiffAction::Create | DiffAction::Alter) {
            let view = routine_new(view_diff)?;
            out.push(format!(
                "CREATE OR REPLACE VIEW {} AS {}",
                quote_ident(&view.name),
                view.definition.trim_end().trim_end_matches(';')
            ));
        }
    }

    for change in &diff.function_changes {
        if let Some(function) = created(change) {
            out.push_block(&function.definition);
        }
    }
    for change in &diff.procedure_changes {
        if let Some(procedure) = created(change) {
            out.push_block(&procedure.definition);
        }
    }
    for change in &diff.event_changes {
        if let Some(event) = created(change) {
            out.push_block(&event.definition);
        }
    }
    Ok(())
}

fn alter_table(table_diff: &TableDiff, out: &mut Script) -> Result<()> {
    let old = old_table(table_diff)?;
    let new = new_table(table_diff)?;
    let table = quote_ident(&table_diff.table_name);
    let defaults = TableDefaults::of(new);

    for change in &table_diff.column_changes {
        if let Some(column) = created_object(change.action, change.new.as_ref()) {
            out.push(format!(
                "ALTER TABLE {table} ADD COLUMN {}{}",
                column_clause(column, defaults),
                column_position(new, column)
            ));
        }
    }
    for change in &table_diff.column_changes {
        if change.action == DiffAction::Alter {
            if let Some(column) = &change.new {
                out.push(format!(
                    "ALTER TABLE {table} MODIFY COLUMN {}",
                    column_clause(column, defaults)
                ));
            }
        }
    }

    let added: Vec<&IndexMetadata> = table_diff
        .index_changes
        .iter()
        .filter_map(|c| created_object(c.action, c.new.as_ref()))
        .collect();
    for index in added.iter().filter(|i| i.primary) {
        out.push(format!("ALTER TABLE {table} ADD {}", index_clause(index)));
    }
    for index in added.iter().filter(|i| !i.primary && i.unique) {
        out.push(format!("ALTER TABLE {table} ADD {}", index_clause(index)));
    }
    for index in added.iter().filter(|i| !i.primary && !i.unique) {
        out.push(create_index_statement(&table_diff.table_name, index));
    }

    for change in &table_diff.check_constraint_changes {
        if let Some(check) = created_object(change.action, change.new.as_ref()) {
            out.push(format!("ALTER TABLE {table} ADD {}", check_clause(check)));
        }
    }
    for change in &table_diff.foreign_key_changes {
        if let Some(fk) = created_object(change.action, change.new.as_ref()) {
            out.push(format!("ALTER TABLE {table} ADD {}", foreign_key_clause(fk)));
        }
    }
    for change in &table_diff.trigger_changes {
        if let Some(trigger) = created_object(change.action, change.new.as_ref()) {
            out.push_block(&trigger_statement(&table_diff.table_name, trigger));
        }
    }

    let options = changed_options(old, new);
    if !options.is_empty() {
        out.push(format!("ALTER TABLE {table}{options}"));
    }

    if !table_diff.partition_changes.is_empty() && !new.partitions.is_empty() {
        check_partitions(new)?;
        out.push(format!("ALTER TABLE {table}{}", partition_clause(&new.partitions)?));
    }
    Ok(())
}

/// Table options that differ, each with a leading space. Options cleared
/// in the new table cannot be reset and are left alone, except the
/// comment.
fn changed_options(old: &TableMetadata, new: &TableMetadata) -> String {
    let mut sql = String::new();
    if old.engine != new.engine && !new.engine.is_empty() {
        sql.push_str(&format!(" ENGINE={}", new.engine));
    }
    if old.charset != new.charset && !new.charset.is_empty() {
        sql.push_str(&format!(" DEFAULT CHARSET={}", new.charset));
    }
    if old.collation != new.collation && !new.collation.is_empty() {
        sql.push_str(&format!(" COLLATE={}", new.collation));
    }
    if old.comment != new.comment {
        sql.push_str(&format!(" COMMENT={}", quote_string(&new.comment)));
    }
    sql
}

/// `FIRST` or `AFTER prev`, taken from the column's place in the new
/// table.
fn column_position(table: &TableMetadata, column: &ColumnMetadata) -> String {
    match table.columns.iter().position(|c| c.name == column.name) {
        Some(0) => String::from(" FIRST"),
        Some(idx) => format!(" AFTER {}", quote_ident(&table.columns[idx - 1].name)),
        None => String::new(),
    }
}

/// `CREATE TRIGGER` in the shape the parser and the printer share.
pub(crate) fn trigger_statement(table: &str, trigger: &TriggerMetadata) -> String {
    format!(
        "CREATE TRIGGER {}\n{} {} ON {} FOR EACH ROW\n{}",
        quote_ident(&trigger.name),
        trigger.timing,
        trigger.event,
        quote_ident(table),
        trigger.body.trim_end().trim_end_matches(';')
    )
}

/// `SELECT 1 AS `a`, 1 AS `b``: stands in for a view whose real
/// definition may reference objects that do not exist yet.
fn placeholder_select(columns: &[ColumnMetadata]) -> String {
    if columns.is_empty() {
        return String::from("SELECT 1");
    }
    let list: Vec<String> = columns
        .iter()
        .map(|c| format!("1 AS {}", quote_ident(&c.name)))
        .collect();
    format!("SELECT {}", list.join(", "))
}

pub(crate) fn check_partitions(table: &TableMetadata) -> Result<()> {
    if table
        .partitions
        .iter()
        .any(|p| p.partition_type == PartitionType::Unspecified)
    {
        return Err(SchemaError::Unsupported(format!(
            "partition without a type on table `{}`",
            table.name
        )));
    }
    Ok(())
}

// ================================================================
// Diff accessors
// ================================================================

fn altered(diff: &MetadataDiff) -> impl Iterator<Item = &TableDiff> {
    diff.table_changes
        .iter()
        .filter(|t| t.action == DiffAction::Alter)
}

/// The old object of a sub-change that goes away. Sub-objects other than
/// columns are replaced by drop and create, so only `Drop` counts.
fn dropped<T>(action: DiffAction, old: Option<&T>) -> Option<&T> {
    (action == DiffAction::Drop).then_some(old).flatten()
}

fn created_object<T>(action: DiffAction, new: Option<&T>) -> Option<&T> {
    (action == DiffAction::Create).then_some(new).flatten()
}

/// New definition of a routine that is created or replaced.
fn created<T>(change: &RoutineDiff<T>) -> Option<&T> {
    matches!(change.action, DiffAction::Create | DiffAction::Alter)
        .then_some(change.new.as_ref())
        .flatten()
}

fn old_table(table_diff: &TableDiff) -> Result<&TableMetadata> {
    table_diff.old_table.as_ref().ok_or_else(|| {
        SchemaError::InvalidState(format!(
            "table diff for `{}` has no old table",
            table_diff.table_name
        ))
    })
}

fn new_table(table_diff: &TableDiff) -> Result<&TableMetadata> {
    table_diff.new_table.as_ref().ok_or_else(|| {
        SchemaError::InvalidState(format!(
            "table diff for `{}` has no new table",
            table_diff.table_name
        ))
    })
}

fn routine_old(change: &RoutineDiff<ViewMetadata>) -> Result<&ViewMetadata> {
    change.old.as_ref().ok_or_else(|| {
        SchemaError::InvalidState(format!("view diff for `{}` has no old view", change.name))
    })
}

fn routine_new(change: &RoutineDiff<ViewMetadata>) -> Result<&ViewMetadata> {
    change.new.as_ref().ok_or_else(|| {
        SchemaError::InvalidState(format!("view diff for `{}` has no new view", change.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_to_metadata::parse_to_metadata;
    use oxide_schema_core::diff::get_database_schema_diff;

    fn migrate(from: &str, to: &str) -> String {
        let old = parse_to_metadata(from).unwrap();
        let new = parse_to_metadata(to).unwrap();
        generate_migration(&get_database_schema_diff(&old, &new)).unwrap()
    }

    #[test]
    fn test_identical_schemas_generate_nothing() {
        let sql = "CREATE TABLE t (id INT NOT NULL, PRIMARY KEY (id));";
        assert_eq!(migrate(sql, sql), "");
    }

    #[test]
    fn test_modify_column() {
        assert_eq!(
            migrate("CREATE TABLE t (id INT);", "CREATE TABLE t (id BIGINT);"),
            "ALTER TABLE `t` MODIFY COLUMN `id` bigint DEFAULT NULL;\n"
        );
    }

    #[test]
    fn test_add_column_keeps_position() {
        let ddl = migrate(
            "CREATE TABLE t (a INT, c INT);",
            "CREATE TABLE t (z INT, a INT, b INT, c INT);",
        );
        assert_eq!(
            ddl,
            "ALTER TABLE `t` ADD COLUMN `z` int DEFAULT NULL FIRST;\n\
             ALTER TABLE `t` ADD COLUMN `b` int DEFAULT NULL AFTER `a`;\n"
        );
    }

    #[test]
    fn test_drop_and_create_phases_are_separated() {
        let ddl = migrate("CREATE TABLE a (id INT);", "CREATE TABLE b (id INT);");
        assert!(ddl.starts_with("DROP TABLE IF EXISTS `a`;\n\n\nCREATE TABLE IF NOT EXISTS `b`"));
    }

    #[test]
    fn test_referencing_table_dropped_first() {
        let from = "CREATE TABLE parent (id INT NOT NULL, PRIMARY KEY (id));\n\
                    CREATE TABLE child (pid INT, CONSTRAINT fk FOREIGN KEY (pid) REFERENCES parent (id));";
        let ddl = migrate(from, "");
        let child = ddl.find("DROP TABLE IF EXISTS `child`").unwrap();
        let parent = ddl.find("DROP TABLE IF EXISTS `parent`").unwrap();
        assert!(child < parent);
    }

    #[test]
    fn test_cycle_strips_foreign_keys_first() {
        let from = "CREATE TABLE a (id INT, bid INT);\n\
                    CREATE TABLE b (id INT, aid INT);\n\
                    ALTER TABLE a ADD CONSTRAINT fa FOREIGN KEY (bid) REFERENCES b (id);\n\
                    ALTER TABLE b ADD CONSTRAINT fb FOREIGN KEY (aid) REFERENCES a (id);";
        let ddl = migrate(from, "");
        let strip = ddl.find("ALTER TABLE `a` DROP FOREIGN KEY `fa`").unwrap();
        let drop = ddl.find("DROP TABLE IF EXISTS `a`").unwrap();
        assert!(strip < drop);
        assert!(ddl.contains("ALTER TABLE `b` DROP FOREIGN KEY `fb`"));
    }

    #[test]
    fn test_foreign_keys_added_after_all_tables() {
        let to = "CREATE TABLE child (pid INT, CONSTRAINT fk FOREIGN KEY (pid) REFERENCES parent (id));\n\
                  CREATE TABLE parent (id INT NOT NULL, PRIMARY KEY (id));";
        let ddl = migrate("", to);
        let parent = ddl.find("CREATE TABLE IF NOT EXISTS `parent`").unwrap();
        let fk = ddl
            .find("ALTER TABLE `child` ADD CONSTRAINT `fk` FOREIGN KEY (`pid`) REFERENCES `parent` (`id`)")
            .unwrap();
        assert!(parent < fk);
    }

    #[test]
    fn test_index_change_is_drop_and_create() {
        let ddl = migrate(
            "CREATE TABLE t (a INT NOT NULL, b INT, PRIMARY KEY (a), KEY idx (a));",
            "CREATE TABLE t (a INT NOT NULL, b INT, PRIMARY KEY (a, b), KEY idx (b));",
        );
        assert!(ddl.contains("ALTER TABLE `t` DROP PRIMARY KEY;\n\n"));
        assert!(ddl.contains("DROP INDEX `idx` ON `t`;\n\n"));
        let pk = ddl.find("ALTER TABLE `t` ADD PRIMARY KEY").unwrap();
        let idx = ddl.find("CREATE INDEX `idx` ON `t` (`b`)").unwrap();
        assert!(pk < idx);
    }

    #[test]
    fn test_routines_are_delimited() {
        let ddl = migrate(
            "",
            "DELIMITER ;;\nCREATE FUNCTION f() RETURNS INT DETERMINISTIC BEGIN RETURN 1; END;;\nDELIMITER ;\n",
        );
        assert_eq!(
            ddl,
            "DELIMITER ;;\nCREATE FUNCTION f() RETURNS INT DETERMINISTIC BEGIN RETURN 1; END;;\nDELIMITER ;\n"
        );
    }

    #[test]
    fn test_new_table_triggers_precede_new_routines() {
        let to = "CREATE TABLE t (id INT);\n\
                  CREATE TRIGGER tr BEFORE INSERT ON t FOR EACH ROW SET NEW.id = 1;\n\
                  DELIMITER ;;\nCREATE FUNCTION f() RETURNS INT DETERMINISTIC BEGIN RETURN 1; END;;\nDELIMITER ;\n";
        let ddl = migrate("", to);
        let table = ddl.find("CREATE TABLE IF NOT EXISTS `t`").unwrap();
        let trigger = ddl.find("CREATE TRIGGER `tr`").unwrap();
        let function = ddl.find("CREATE FUNCTION f()").unwrap();
        assert!(table < trigger);
        assert!(trigger < function);
    }

    #[test]
    fn test_new_view_gets_placeholder_first() {
        let ddl = migrate("", "CREATE VIEW v (a) AS SELECT 1;");
        let placeholder = ddl.find("CREATE OR REPLACE VIEW `v` AS SELECT 1 AS `a`").unwrap();
        let real = ddl.find("CREATE OR REPLACE VIEW `v` AS SELECT 1;\n").unwrap();
        assert!(placeholder < real);
    }

    #[test]
    fn test_table_comment_change() {
        assert_eq!(
            migrate(
                "CREATE TABLE t (id INT) COMMENT 'old';",
                "CREATE TABLE t (id INT) COMMENT 'it''s new';"
            ),
            "ALTER TABLE `t` COMMENT='it''s new';\n"
        );
    }

    #[test]
    fn test_missing_table_is_invalid_state() {
        let diff = MetadataDiff {
            table_changes: vec![TableDiff {
                action: DiffAction::Drop,
                schema_name: String::new(),
                table_name: "t".into(),
                old_table: None,
                new_table: None,
                column_changes: vec![],
                index_changes: vec![],
                foreign_key_changes: vec![],
                check_constraint_changes: vec![],
                partition_changes: vec![],
                trigger_changes: vec![],
            }],
            ..MetadataDiff::default()
        };
        assert!(matches!(
            generate_migration(&diff),
            Err(SchemaError::InvalidState(_))
        ));
    }
}
