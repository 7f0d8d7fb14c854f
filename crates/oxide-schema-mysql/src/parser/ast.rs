//! Span-annotated syntax tree for MySQL DDL.
//!
//! The tree keeps just enough structure for the schema engine: names,
//! column attributes, keys and table options, each with the source span
//! it came from. Bodies of views, routines and triggers stay as text.

use oxide_schema_core::model::{ColumnDefault, PartitionType};

use crate::lexer::Span;

/// A name and where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    /// The unquoted name.
    pub value: String,
    pub span: Span,
}

/// A possibly database-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectName {
    pub database: Option<Ident>,
    pub name: Ident,
}

impl ObjectName {
    /// Span from the qualifier (if any) to the name.
    #[must_use]
    pub fn span(&self) -> Span {
        self.database
            .as_ref()
            .map_or(self.name.span, |db| db.span.merge(self.name.span))
    }

    /// The database qualifier, if present.
    #[must_use]
    pub fn database_name(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.value.as_str())
    }
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateTable(CreateTable),
    CreateView(CreateView),
    CreateRoutine(CreateRoutine),
    CreateTrigger(CreateTrigger),
    CreateIndex(CreateIndex),
    CreateDatabase(DatabaseStatement),
    AlterDatabase(DatabaseStatement),
    DropDatabase(DatabaseStatement),
    AlterTable(AlterTable),
    DropTable(DropTable),
    DropObject(DropObject),
    DropIndex(DropIndex),
    RenameTable(RenameTable),
    Use(Ident),
    /// Any statement the schema engine does not interpret.
    Other,
}

// ============================================================================
// CREATE TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub temporary: bool,
    pub if_not_exists: bool,
    pub name: ObjectName,
    /// The parenthesized element list, parentheses included.
    pub elements_span: Option<Span>,
    pub elements: Vec<TableElement>,
    pub options: Vec<TableOption>,
    pub partition: Option<PartitionClause>,
    pub like: Option<ObjectName>,
    /// True for `CREATE TABLE ... [AS] SELECT`.
    pub as_select: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableElement {
    Column(ColumnDef),
    Constraint(TableConstraint),
}

impl TableElement {
    /// Span of the whole element.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Column(column) => column.span,
            Self::Constraint(constraint) => constraint.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Ident,
    pub data_type: DataType,
    pub attributes: Vec<ColumnAttribute>,
    pub span: Span,
}

impl ColumnDef {
    /// Returns true when an attribute matches `pred`.
    pub fn has(&self, pred: impl Fn(&AttributeKind) -> bool) -> bool {
        self.attributes.iter().any(|a| pred(&a.kind))
    }
}

/// A column type with its canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    /// Canonical lower-case spelling, e.g. `int(10) unsigned`.
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAttribute {
    pub kind: AttributeKind,
    pub span: Span,
    /// Span of the value part (after `DEFAULT`, `COMMENT`, `ON UPDATE`);
    /// empty for valueless attributes.
    pub value_span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Null,
    NotNull,
    Default(ColumnDefault),
    OnUpdate(String),
    AutoIncrement,
    Unique,
    PrimaryKey,
    Comment(String),
    Collate(String),
    CharacterSet(String),
    ColumnFormat(String),
    Storage(String),
    Visible(bool),
    Generated { expression: String, stored: bool },
    Check(CheckDef),
    Enforced(bool),
    References(ReferenceDef),
    Srid(String),
    Secondary,
    SerialDefaultValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstraint {
    /// `CONSTRAINT symbol`, when given.
    pub symbol: Option<Ident>,
    pub kind: ConstraintKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey(IndexDef),
    Unique(IndexDef),
    Index(IndexDef),
    Fulltext(IndexDef),
    Spatial(IndexDef),
    ForeignKey(ForeignKeyDef),
    Check(CheckDef),
}

/// Body of an index-like constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDef {
    pub name: Option<Ident>,
    pub keys: Vec<KeyPart>,
    /// `USING BTREE|HASH`, upper-cased.
    pub using: Option<String>,
    pub comment: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPart {
    /// Column name, or a parenthesized expression as written.
    pub expression: String,
    pub length: Option<i64>,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    /// Index name written after `FOREIGN KEY`.
    pub index_name: Option<Ident>,
    pub columns: Vec<String>,
    pub reference: ReferenceDef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDef {
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDef {
    pub name: Option<String>,
    /// Expression text inside the parentheses.
    pub expression: String,
    pub enforced: bool,
}

/// A table option such as `ENGINE=InnoDB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOption {
    /// Upper-case option name; `CHARACTER SET` is reported as `CHARSET`.
    pub name: String,
    /// The value, unquoted for strings.
    pub value: String,
    pub span: Span,
}

// ============================================================================
// Partitions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionClause {
    pub partition_type: PartitionType,
    /// Expression or column list inside the parentheses, as written.
    pub expression: String,
    /// `PARTITIONS n`.
    pub count: Option<u64>,
    pub subpartition: Option<SubpartitionSpec>,
    pub definitions: Vec<PartitionDef>,
    /// Clause span, including an enclosing version comment.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubpartitionSpec {
    pub partition_type: PartitionType,
    pub expression: String,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDef {
    pub name: String,
    /// Value list text inside the parentheses, or `MAXVALUE`.
    pub value: Option<String>,
    pub subpartitions: Vec<String>,
}

// ============================================================================
// Other CREATE statements
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateView {
    pub or_replace: bool,
    pub name: ObjectName,
    pub columns: Vec<String>,
    /// The `SELECT` text after `AS`.
    pub definition: String,
}

/// Kinds of objects stored as full statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Function,
    Procedure,
    Event,
}

impl RoutineKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
            Self::Event => "EVENT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoutine {
    pub kind: RoutineKind,
    pub if_not_exists: bool,
    pub name: ObjectName,
    /// The whole statement text.
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTrigger {
    pub name: ObjectName,
    /// `BEFORE` or `AFTER`.
    pub timing: String,
    /// `INSERT`, `UPDATE` or `DELETE`.
    pub event: String,
    pub table: ObjectName,
    /// Everything after `FOR EACH ROW` and an optional ordering clause.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndex {
    /// `UNIQUE`, `FULLTEXT` or `SPATIAL`.
    pub modifier: Option<String>,
    pub index: IndexDef,
    pub table: ObjectName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStatement {
    pub name: Ident,
    pub if_exists: bool,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

// ============================================================================
// ALTER / DROP / RENAME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlterTable {
    pub name: ObjectName,
    pub items: Vec<AlterItem>,
}

/// Position of a column for `ADD`, `MODIFY` and `CHANGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPosition {
    First,
    After(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterItem {
    AddColumns {
        columns: Vec<ColumnDef>,
        position: Option<ColumnPosition>,
    },
    AddConstraint(TableConstraint),
    DropColumn(String),
    DropIndex(String),
    DropPrimaryKey,
    DropForeignKey(String),
    DropCheck(String),
    /// `DROP CONSTRAINT`, matching a check or a foreign key by name.
    DropConstraint(String),
    ModifyColumn {
        column: ColumnDef,
        position: Option<ColumnPosition>,
    },
    ChangeColumn {
        old_name: String,
        column: ColumnDef,
        position: Option<ColumnPosition>,
    },
    RenameColumn {
        old_name: String,
        new_name: String,
    },
    RenameIndex {
        old_name: String,
        new_name: String,
    },
    RenameTable(ObjectName),
    SetDefault {
        column: String,
        default: ColumnDefault,
    },
    DropDefault(String),
    SetColumnVisible {
        column: String,
        visible: bool,
    },
    SetIndexVisible {
        index: String,
        visible: bool,
    },
    TableOptions(Vec<TableOption>),
    Partition(PartitionClause),
    RemovePartitioning,
    /// An item the schema engine does not interpret.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub temporary: bool,
    pub if_exists: bool,
    pub tables: Vec<ObjectName>,
}

/// `DROP VIEW|FUNCTION|PROCEDURE|EVENT|TRIGGER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    View,
    Function,
    Procedure,
    Event,
    Trigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropObject {
    pub kind: DropKind,
    pub if_exists: bool,
    pub names: Vec<ObjectName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropIndex {
    pub name: Ident,
    pub table: ObjectName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    pub pairs: Vec<(ObjectName, ObjectName)>,
}
