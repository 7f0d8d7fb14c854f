//! Definition printer.
//!
//! Prints a snapshot as a dump in the layout of `mysqldump`: placeholder
//! views first so views can reference each other, then tables, real
//! views, routines and finally triggers. Every object gets a banner.

use oxide_schema_core::dialect::DefinitionContext;
use oxide_schema_core::model::{
    DatabaseSchemaMetadata, EventMetadata, FunctionMetadata, ProcedureMetadata, TableMetadata,
    TriggerMetadata, ViewMetadata,
};
use oxide_schema_core::Result;
use tracing::debug;

use crate::generate::{check_partitions, trigger_statement};
use crate::render::{create_table_statement, quote_ident, TableStyle};

const DISABLE_CHECKS: &str = "SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;\n\
                              SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;\n";
const RESTORE_CHECKS: &str = "SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;\n\
                              SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;\n";

/// Session variables a routine was created under.
struct Session<'a> {
    character_set_client: &'a str,
    collation_connection: &'a str,
    sql_mode: &'a str,
    time_zone: Option<&'a str>,
}

impl<'a> Session<'a> {
    fn of_trigger(trigger: &'a TriggerMetadata) -> Self {
        Self {
            character_set_client: &trigger.character_set_client,
            collation_connection: &trigger.collation_connection,
            sql_mode: &trigger.sql_mode,
            time_zone: None,
        }
    }

    fn write(&self, out: &mut String) {
        if !self.character_set_client.is_empty() {
            out.push_str(&format!(
                "SET character_set_client = {};\n",
                self.character_set_client
            ));
            out.push_str(&format!(
                "SET character_set_results = {};\n",
                self.character_set_client
            ));
        }
        if !self.collation_connection.is_empty() {
            out.push_str(&format!(
                "SET collation_connection = {};\n",
                self.collation_connection
            ));
        }
        out.push_str(&format!("SET sql_mode = '{}';\n", self.sql_mode));
        if let Some(time_zone) = self.time_zone {
            out.push_str(&format!("SET time_zone = '{time_zone}';\n"));
        }
    }
}

fn banner(out: &mut String, kind: &str, name: &str) {
    out.push_str(&format!("--\n-- {kind} structure for {}\n--\n", quote_ident(name)));
}

fn delimited(out: &mut String, statement: &str) {
    out.push_str("DELIMITER ;;\n");
    out.push_str(statement.trim_end());
    out.push_str(";;\nDELIMITER ;\n\n");
}

fn write_placeholder_view(out: &mut String, view: &ViewMetadata) {
    banner(out, "Temporary view", &view.name);
    if view.columns.is_empty() {
        out.push_str(&format!(
            "-- {} references invalid table(s) or column(s) or function(s) or definer/invoker of view lack rights to use them\n\n",
            quote_ident(&view.name)
        ));
        return;
    }
    let columns: Vec<String> = view
        .columns
        .iter()
        .map(|c| format!("  1 AS {}", quote_ident(&c.name)))
        .collect();
    out.push_str(&format!(
        "CREATE VIEW {} AS SELECT\n{};\n\n",
        quote_ident(&view.name),
        columns.join(",\n")
    ));
}

fn write_table(out: &mut String, table: &TableMetadata) -> Result<()> {
    check_partitions(table)?;
    banner(out, "Table", &table.name);
    out.push_str(&create_table_statement(table, TableStyle::DUMP)?);
    out.push_str("\n\n");
    Ok(())
}

fn write_view(out: &mut String, view: &ViewMetadata) {
    banner(out, "View", &view.name);
    out.push_str(&format!(
        "CREATE OR REPLACE VIEW {} AS {};\n\n",
        quote_ident(&view.name),
        view.definition.trim_end().trim_end_matches(';')
    ));
}

fn write_function(out: &mut String, function: &FunctionMetadata) {
    banner(out, "Function", &function.name);
    Session {
        character_set_client: &function.character_set_client,
        collation_connection: &function.collation_connection,
        sql_mode: &function.sql_mode,
        time_zone: None,
    }
    .write(out);
    delimited(out, &function.definition);
}

fn write_procedure(out: &mut String, procedure: &ProcedureMetadata) {
    banner(out, "Procedure", &procedure.name);
    Session {
        character_set_client: &procedure.character_set_client,
        collation_connection: &procedure.collation_connection,
        sql_mode: &procedure.sql_mode,
        time_zone: None,
    }
    .write(out);
    delimited(out, &procedure.definition);
}

fn write_event(out: &mut String, event: &EventMetadata) {
    banner(out, "Event", &event.name);
    Session {
        character_set_client: &event.character_set_client,
        collation_connection: &event.collation_connection,
        sql_mode: &event.sql_mode,
        time_zone: Some(&event.time_zone),
    }
    .write(out);
    delimited(out, &event.definition);
}

fn write_trigger(out: &mut String, table: &str, trigger: &TriggerMetadata) {
    banner(out, "Trigger", &trigger.name);
    Session::of_trigger(trigger).write(out);
    delimited(out, &trigger_statement(table, trigger));
}

/// Prints the whole snapshot. Only the first schema is printed; MySQL
/// snapshots have exactly one.
///
/// # Errors
///
/// Returns [`oxide_schema_core::SchemaError::Unsupported`] for a table
/// whose partitioning cannot be printed.
pub fn get_database_definition(
    ctx: DefinitionContext,
    metadata: &DatabaseSchemaMetadata,
) -> Result<String> {
    let Some(schema) = metadata.schemas.first() else {
        return Ok(String::new());
    };

    let mut out = String::new();
    if ctx.print_header {
        out.push_str(DISABLE_CHECKS);
    }
    for view in &schema.views {
        write_placeholder_view(&mut out, view);
    }
    for table in &schema.tables {
        write_table(&mut out, table)?;
    }
    for view in &schema.views {
        write_view(&mut out, view);
    }
    for function in &schema.functions {
        write_function(&mut out, function);
    }
    for procedure in &schema.procedures {
        write_procedure(&mut out, procedure);
    }
    for event in &schema.events {
        write_event(&mut out, event);
    }
    for table in &schema.tables {
        for trigger in &table.triggers {
            write_trigger(&mut out, &table.name, trigger);
        }
    }
    if ctx.print_header {
        out.push_str(RESTORE_CHECKS);
    }

    debug!(
        tables = schema.tables.len(),
        views = schema.views.len(),
        bytes = out.len(),
        "printed database definition"
    );
    Ok(out)
}

/// Prints one table with its banner.
///
/// # Errors
///
/// Returns [`oxide_schema_core::SchemaError::Unsupported`] when the
/// partitioning cannot be printed.
pub fn get_table_definition(table: &TableMetadata) -> Result<String> {
    let mut out = String::new();
    write_table(&mut out, table)?;
    Ok(out)
}

#[must_use]
pub fn get_view_definition(view: &ViewMetadata) -> String {
    let mut out = String::new();
    write_view(&mut out, view);
    out
}

#[must_use]
pub fn get_function_definition(function: &FunctionMetadata) -> String {
    let mut out = String::new();
    write_function(&mut out, function);
    out
}

#[must_use]
pub fn get_procedure_definition(procedure: &ProcedureMetadata) -> String {
    let mut out = String::new();
    write_procedure(&mut out, procedure);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_to_metadata::parse_to_metadata;
    use oxide_schema_core::model::{ColumnMetadata, PartitionType, TablePartitionMetadata};
    use oxide_schema_core::SchemaError;

    #[test]
    fn test_empty_snapshot_prints_nothing() {
        let metadata = DatabaseSchemaMetadata::default();
        let out = get_database_definition(DefinitionContext { print_header: true }, &metadata);
        assert_eq!(out.unwrap(), "");
    }

    #[test]
    fn test_table_with_header() {
        let metadata = parse_to_metadata(
            "CREATE TABLE t (id INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (id)) ENGINE=InnoDB;",
        )
        .unwrap();
        let out = get_database_definition(DefinitionContext { print_header: true }, &metadata)
            .unwrap();
        assert_eq!(
            out,
            "SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;\n\
             SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;\n\
             --\n-- Table structure for `t`\n--\n\
             CREATE TABLE `t` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;\n\n\
             SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;\n\
             SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;\n"
        );
    }

    #[test]
    fn test_placeholder_views() {
        let view = ViewMetadata {
            name: "v".into(),
            definition: "SELECT a, b FROM t".into(),
            columns: vec![ColumnMetadata::new("a", ""), ColumnMetadata::new("b", "")],
            ..ViewMetadata::default()
        };
        let mut out = String::new();
        write_placeholder_view(&mut out, &view);
        assert_eq!(
            out,
            "--\n-- Temporary view structure for `v`\n--\nCREATE VIEW `v` AS SELECT\n  1 AS `a`,\n  1 AS `b`;\n\n"
        );

        let mut out = String::new();
        write_placeholder_view(&mut out, &ViewMetadata { columns: vec![], ..view });
        assert!(out.ends_with("-- `v` references invalid table(s) or column(s) or function(s) or definer/invoker of view lack rights to use them\n\n"));
    }

    #[test]
    fn test_event_session_lines() {
        let event = EventMetadata {
            name: "e".into(),
            definition: "CREATE EVENT e ON SCHEDULE EVERY 1 DAY DO DELETE FROM t".into(),
            time_zone: "SYSTEM".into(),
            sql_mode: "STRICT_TRANS_TABLES".into(),
            character_set_client: "utf8mb4".into(),
            collation_connection: "utf8mb4_general_ci".into(),
        };
        let mut out = String::new();
        write_event(&mut out, &event);
        assert_eq!(
            out,
            "--\n-- Event structure for `e`\n--\n\
             SET character_set_client = utf8mb4;\n\
             SET character_set_results = utf8mb4;\n\
             SET collation_connection = utf8mb4_general_ci;\n\
             SET sql_mode = 'STRICT_TRANS_TABLES';\n\
             SET time_zone = 'SYSTEM';\n\
             DELIMITER ;;\nCREATE EVENT e ON SCHEDULE EVERY 1 DAY DO DELETE FROM t;;\nDELIMITER ;\n\n"
        );
    }

    #[test]
    fn test_triggers_follow_routines() {
        let metadata = parse_to_metadata(
            "CREATE TABLE t (id INT);\n\
             CREATE TRIGGER tr BEFORE INSERT ON t FOR EACH ROW SET NEW.id = 1;\n\
             CREATE PROCEDURE p() SELECT 1;",
        )
        .unwrap();
        let out = get_database_definition(DefinitionContext::default(), &metadata).unwrap();
        let procedure = out.find("-- Procedure structure for `p`").unwrap();
        let trigger = out.find("-- Trigger structure for `tr`").unwrap();
        assert!(procedure < trigger);
        assert!(out.contains("CREATE TRIGGER `tr`\nBEFORE INSERT ON `t` FOR EACH ROW\nSET NEW.id = 1;;\n"));
    }

    #[test]
    fn test_untyped_partition_is_unsupported() {
        let mut table = TableMetadata::new("t");
        table.columns.push(ColumnMetadata::new("id", "int"));
        table.partitions.push(TablePartitionMetadata {
            name: "p0".into(),
            partition_type: PartitionType::Unspecified,
            ..TablePartitionMetadata::default()
        });
        assert!(matches!(
            get_table_definition(&table),
            Err(SchemaError::Unsupported(_))
        ));
    }
}
