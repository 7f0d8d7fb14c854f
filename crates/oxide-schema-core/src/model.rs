//! Canonical snapshot wire format.
//!
//! These types are the interchange contract between the engine and its
//! callers. They are plain serde structs: every field defaults when
//! absent, and every collection is an ordered `Vec` so that output order
//! always follows declaration order and never hash-map iteration order.

use serde::{Deserialize, Serialize};

/// Root of a snapshot: one database and its schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSchemaMetadata {
    /// Database name. Empty when the script never names one.
    pub name: String,
    /// Ordered schemas. Dialects without a schema concept use a single
    /// schema with an empty name.
    pub schemas: Vec<SchemaMetadata>,
    /// Default character set of the database.
    pub character_set: String,
    /// Default collation of the database.
    pub collation: String,
}

impl DatabaseSchemaMetadata {
    /// Creates an empty snapshot for the named database.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a schema by name.
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&SchemaMetadata> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Looks up a schema by name for mutation.
    pub fn schema_mut(&mut self, name: &str) -> Option<&mut SchemaMetadata> {
        self.schemas.iter_mut().find(|s| s.name == name)
    }

    /// Returns the named schema, creating an empty one if needed.
    pub fn ensure_schema(&mut self, name: &str) -> &mut SchemaMetadata {
        let idx = match self.schemas.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.schemas.push(SchemaMetadata::new(name));
                self.schemas.len() - 1
            }
        };
        &mut self.schemas[idx]
    }

    /// Clears volatile runtime fields (row counts, data sizes) so two
    /// snapshots can be compared structurally.
    #[must_use]
    pub fn without_runtime_fields(mut self) -> Self {
        for schema in &mut self.schemas {
            for table in &mut schema.tables {
                table.row_count = 0;
                table.data_size = 0;
            }
        }
        self
    }
}

/// A schema: ordered tables and routines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMetadata {
    /// Schema name.
    pub name: String,
    /// Tables in declaration order.
    pub tables: Vec<TableMetadata>,
    /// Views in declaration order.
    pub views: Vec<ViewMetadata>,
    /// Stored functions.
    pub functions: Vec<FunctionMetadata>,
    /// Stored procedures.
    pub procedures: Vec<ProcedureMetadata>,
    /// Scheduled events.
    pub events: Vec<EventMetadata>,
}

impl SchemaMetadata {
    /// Creates an empty schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks up a table by name for mutation.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableMetadata> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    /// Looks up a view by name.
    #[must_use]
    pub fn view(&self, name: &str) -> Option<&ViewMetadata> {
        self.views.iter().find(|v| v.name == name)
    }
}

/// A table and everything it owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableMetadata {
    pub name: String,
    /// Storage engine (`InnoDB`, `MyISAM`, ...).
    pub engine: String,
    pub collation: String,
    pub charset: String,
    pub comment: String,
    pub user_comment: String,
    pub columns: Vec<ColumnMetadata>,
    pub indexes: Vec<IndexMetadata>,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    pub check_constraints: Vec<CheckConstraintMetadata>,
    pub triggers: Vec<TriggerMetadata>,
    /// Top-level partitions. All entries share the same type and
    /// expression; the first entry carries the `use_default` count.
    pub partitions: Vec<TablePartitionMetadata>,
    /// Runtime statistic, ignored by the differ.
    pub row_count: i64,
    /// Runtime statistic, ignored by the differ.
    pub data_size: i64,
}

impl TableMetadata {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Looks up a column by name for mutation.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Looks up an index by name for mutation.
    pub fn index_mut(&mut self, name: &str) -> Option<&mut IndexMetadata> {
        self.indexes.iter_mut().find(|i| i.name == name)
    }

    /// Returns the primary index, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// Recomputes column positions from list order.
    pub fn renumber_columns(&mut self) {
        for (position, column) in (1..).zip(self.columns.iter_mut()) {
            column.position = position;
        }
    }
}

/// Default value of a column. Absence is modeled as `Option::None` on the
/// column, so the three variants here are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// `DEFAULT NULL`.
    Null,
    /// A string literal, with quote escaping already undone.
    Value(String),
    /// Any other expression text, kept verbatim.
    Expression(String),
}

impl ColumnDefault {
    /// The expression used to model `AUTO_INCREMENT` as a default.
    pub const AUTO_INCREMENT: &'static str = "AUTO_INCREMENT";

    /// Returns the synthetic auto-increment default.
    #[must_use]
    pub fn auto_increment() -> Self {
        Self::Expression(Self::AUTO_INCREMENT.to_string())
    }

    /// Returns true for the auto-increment sentinel.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        matches!(self, Self::Expression(e) if e.eq_ignore_ascii_case(Self::AUTO_INCREMENT))
    }

    /// Returns true for `DEFAULT NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// How a generated column stores its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    #[default]
    Virtual,
    Stored,
}

/// Generation clause of a generated column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationMetadata {
    pub kind: GenerationKind,
    pub expression: String,
}

/// A column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMetadata {
    pub name: String,
    /// 1-based ordinal position. Recomputed from list order whenever a
    /// snapshot is produced; never authoritative.
    pub position: i32,
    pub default: Option<ColumnDefault>,
    pub on_update: String,
    pub nullable: bool,
    /// Normalized, lower-cased declared type.
    #[serde(rename = "type")]
    pub column_type: String,
    pub character_set: String,
    pub collation: String,
    pub comment: String,
    pub user_comment: String,
    pub generation: Option<GenerationMetadata>,
}

impl ColumnMetadata {
    /// Creates a nullable column of the given type.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            ..Self::default()
        }
    }

    /// Returns true when the column auto-increments.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.default
            .as_ref()
            .is_some_and(ColumnDefault::is_auto_increment)
    }
}

/// An index or key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexMetadata {
    pub name: String,
    /// Column names, or parenthesized expressions.
    pub expressions: Vec<String>,
    /// Per-key prefix length; `-1` means not specified. Empty when no
    /// key carries a length.
    pub key_length: Vec<i64>,
    /// Per-key descending flag. Empty when no key is descending.
    pub descending: Vec<bool>,
    /// `BTREE`, `HASH`, `FULLTEXT` or `SPATIAL`.
    #[serde(rename = "type")]
    pub index_type: String,
    pub unique: bool,
    pub primary: bool,
    pub visible: bool,
    pub comment: String,
}

impl IndexMetadata {
    /// Name reserved for the primary key.
    pub const PRIMARY: &'static str = "PRIMARY";
}

/// A foreign key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyMetadata {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub on_delete: String,
    pub on_update: String,
}

/// A check constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConstraintMetadata {
    pub name: String,
    pub expression: String,
}

/// A trigger, owned by its table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerMetadata {
    pub name: String,
    /// `INSERT`, `UPDATE` or `DELETE`.
    pub event: String,
    /// `BEFORE` or `AFTER`.
    pub timing: String,
    pub body: String,
    pub sql_mode: String,
    pub character_set_client: String,
    pub collation_connection: String,
}

/// Partitioning scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartitionType {
    #[default]
    Unspecified,
    Range,
    RangeColumns,
    List,
    ListColumns,
    Hash,
    LinearHash,
    Key,
    LinearKey,
}

impl PartitionType {
    /// The SQL spelling used after `PARTITION BY`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Range => "RANGE",
            Self::RangeColumns => "RANGE COLUMNS",
            Self::List => "LIST",
            Self::ListColumns => "LIST COLUMNS",
            Self::Hash => "HASH",
            Self::LinearHash => "LINEAR HASH",
            Self::Key => "KEY",
            Self::LinearKey => "LINEAR KEY",
        }
    }

    /// Value preposition for the partition list (`LESS THAN` / `IN`).
    #[must_use]
    pub const fn preposition(self) -> Option<&'static str> {
        match self {
            Self::Range | Self::RangeColumns => Some("LESS THAN"),
            Self::List | Self::ListColumns => Some("IN"),
            _ => None,
        }
    }

    /// True for the `COLUMNS` variants.
    #[must_use]
    pub const fn is_columns(self) -> bool {
        matches!(self, Self::RangeColumns | Self::ListColumns)
    }
}

/// A partition or subpartition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePartitionMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub partition_type: PartitionType,
    pub expression: String,
    /// Boundary text (`10`, `MAXVALUE`, `1,2,3`).
    pub value: String,
    /// `PARTITIONS n` count as text; empty when an explicit list is given.
    pub use_default: String,
    pub subpartitions: Vec<TablePartitionMetadata>,
}

/// A view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewMetadata {
    pub name: String,
    /// The `SELECT` text after `AS`.
    pub definition: String,
    pub comment: String,
    /// Output columns, when known. Used to build forward-reference
    /// placeholders.
    pub columns: Vec<ColumnMetadata>,
}

/// A stored function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionMetadata {
    pub name: String,
    /// Full `CREATE FUNCTION` statement text.
    pub definition: String,
    pub sql_mode: String,
    pub character_set_client: String,
    pub collation_connection: String,
}

/// A stored procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureMetadata {
    pub name: String,
    /// Full `CREATE PROCEDURE` statement text.
    pub definition: String,
    pub sql_mode: String,
    pub character_set_client: String,
    pub collation_connection: String,
}

/// A scheduled event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMetadata {
    pub name: String,
    /// Full `CREATE EVENT` statement text.
    pub definition: String,
    pub time_zone: String,
    pub sql_mode: String,
    pub character_set_client: String,
    pub collation_connection: String,
}
