//! Helpers for exporting query results.

use crate::engine::Engine;
use crate::error::{Result, SchemaError};

/// One past the last addressable spreadsheet column (`ZZZ`).
pub const EXCEL_MAX_COLUMN: usize = 18278;

const EXCEL_LETTERS: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A table touched by an exported statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaResource {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl SchemaResource {
    /// A resource naming only a table.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// Builds the `INSERT INTO ... (cols) VALUES (` prefix used when
/// exporting rows as SQL.
///
/// The target table is only named when exactly one resource is known;
/// otherwise a `<table_name>` placeholder is written.
///
/// # Errors
///
/// Returns [`SchemaError::Unsupported`] for engines without SQL
/// identifiers.
pub fn get_sql_statement_prefix(
    engine: Engine,
    resources: &[SchemaResource],
    columns: &[&str],
) -> Result<String> {
    let quote = engine.identifier_quote().ok_or_else(|| {
        SchemaError::Unsupported(format!("engine {engine} for exporting as SQL"))
    })?;
    let quoted = |name: &str| format!("{quote}{name}{quote}");

    let mut sql = String::from("INSERT INTO ");
    if let [resource] = resources {
        if !resource.schema.is_empty() {
            sql.push_str(&quoted(&resource.schema));
            sql.push('.');
        }
        sql.push_str(&quoted(&resource.table));
    } else {
        sql.push_str(&quoted("<table_name>"));
    }

    let columns: Vec<String> = columns.iter().map(|c| quoted(c)).collect();
    sql.push_str(" (");
    sql.push_str(&columns.join(","));
    sql.push_str(") VALUES (");
    Ok(sql)
}

/// Converts a zero-based column index to its spreadsheet name
/// (`0 -> A`, `26 -> AA`).
///
/// # Errors
///
/// Returns [`SchemaError::InvalidArgument`] when `index` is
/// [`EXCEL_MAX_COLUMN`] or more.
pub fn excel_column_name(index: usize) -> Result<String> {
    if index >= EXCEL_MAX_COLUMN {
        return Err(SchemaError::InvalidArgument(format!(
            "index cannot be greater than {EXCEL_MAX_COLUMN} (column ZZZ)"
        )));
    }

    let mut letters = Vec::new();
    let mut index = Some(index);
    while let Some(i) = index {
        letters.push(EXCEL_LETTERS[i % 26]);
        index = (i / 26).checked_sub(1);
    }
    letters.reverse();
    Ok(String::from_utf8_lossy(&letters).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_without_resources() {
        let prefix = get_sql_statement_prefix(Engine::Mysql, &[], &["a"]).unwrap();
        assert_eq!(prefix, "INSERT INTO `<table_name>` (`a`) VALUES (");
    }

    #[test]
    fn test_prefix_with_one_resource() {
        let resources = [SchemaResource::table("table1")];
        let prefix = get_sql_statement_prefix(Engine::Mysql, &resources, &["a", "b"]).unwrap();
        assert_eq!(prefix, "INSERT INTO `table1` (`a`,`b`) VALUES (");
    }

    #[test]
    fn test_prefix_with_schema_and_double_quotes() {
        let resources = [SchemaResource {
            schema: "public".into(),
            ..SchemaResource::table("t")
        }];
        let prefix = get_sql_statement_prefix(Engine::Postgres, &resources, &["id"]).unwrap();
        assert_eq!(prefix, r#"INSERT INTO "public"."t" ("id") VALUES ("#);
    }

    #[test]
    fn test_prefix_with_many_resources_uses_placeholder() {
        let resources = [SchemaResource::table("a"), SchemaResource::table("b")];
        let prefix = get_sql_statement_prefix(Engine::Tidb, &resources, &["x"]).unwrap();
        assert!(prefix.starts_with("INSERT INTO `<table_name>`"));
    }

    #[test]
    fn test_prefix_rejects_non_sql_engines() {
        assert!(get_sql_statement_prefix(Engine::Redis, &[], &["a"]).is_err());
        assert!(get_sql_statement_prefix(Engine::Mongodb, &[], &["a"]).is_err());
    }

    #[test]
    fn test_excel_column_names() {
        assert_eq!(excel_column_name(0).unwrap(), "A");
        assert_eq!(excel_column_name(25).unwrap(), "Z");
        assert_eq!(excel_column_name(26).unwrap(), "AA");
        assert_eq!(excel_column_name(701).unwrap(), "ZZ");
        assert_eq!(excel_column_name(702).unwrap(), "AAA");
        assert_eq!(excel_column_name(EXCEL_MAX_COLUMN - 1).unwrap(), "ZZZ");
    }

    #[test]
    fn test_excel_column_out_of_range() {
        let err = excel_column_name(EXCEL_MAX_COLUMN).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument: index cannot be greater than 18278 (column ZZZ)"
        );
    }
}
