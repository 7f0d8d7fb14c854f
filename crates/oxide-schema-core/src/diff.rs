//! Schema differ.
//!
//! Compares an "old" and a "new" [`DatabaseSchemaMetadata`] and produces
//! an ordered [`MetadataDiff`]. Objects only in the new snapshot are
//! created, objects only in the old one are dropped, and objects present
//! in both with any structural difference are altered. Identical objects
//! produce no entry, so diffing a snapshot against itself is empty.
//!
//! Output order follows the snapshots' declaration order: drops and
//! alters in old order, then creates in new order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    CheckConstraintMetadata, ColumnDefault, ColumnMetadata, DatabaseSchemaMetadata,
    EventMetadata, ForeignKeyMetadata, FunctionMetadata, IndexMetadata, ProcedureMetadata,
    SchemaMetadata, TableMetadata, TablePartitionMetadata, TriggerMetadata, ViewMetadata,
};

// ================================================================
// Public types
// ================================================================

/// What happens to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiffAction {
    Create,
    Alter,
    Drop,
}

/// A change to an object owned by a table (column, index, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDiff<T> {
    pub action: DiffAction,
    pub old: Option<T>,
    pub new: Option<T>,
}

impl<T> ObjectDiff<T> {
    fn create(new: T) -> Self {
        Self {
            action: DiffAction::Create,
            old: None,
            new: Some(new),
        }
    }

    fn drop(old: T) -> Self {
        Self {
            action: DiffAction::Drop,
            old: Some(old),
            new: None,
        }
    }

    fn alter(old: T, new: T) -> Self {
        Self {
            action: DiffAction::Alter,
            old: Some(old),
            new: Some(new),
        }
    }
}

pub type ColumnDiff = ObjectDiff<ColumnMetadata>;
pub type IndexDiff = ObjectDiff<IndexMetadata>;
pub type ForeignKeyDiff = ObjectDiff<ForeignKeyMetadata>;
pub type CheckConstraintDiff = ObjectDiff<CheckConstraintMetadata>;
pub type PartitionDiff = ObjectDiff<TablePartitionMetadata>;
pub type TriggerDiff = ObjectDiff<TriggerMetadata>;

/// A change to a schema-level routine or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineDiff<T> {
    pub action: DiffAction,
    pub schema_name: String,
    pub name: String,
    pub old: Option<T>,
    pub new: Option<T>,
}

pub type ViewDiff = RoutineDiff<ViewMetadata>;
pub type FunctionDiff = RoutineDiff<FunctionMetadata>;
pub type ProcedureDiff = RoutineDiff<ProcedureMetadata>;
pub type EventDiff = RoutineDiff<EventMetadata>;

/// A change to a table. For `Alter`, the sub-change lists describe what
/// differs; for `Create`/`Drop` they are empty and the whole table is in
/// `new_table`/`old_table`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDiff {
    pub action: DiffAction,
    pub schema_name: String,
    pub table_name: String,
    pub old_table: Option<TableMetadata>,
    pub new_table: Option<TableMetadata>,
    #[serde(default)]
    pub column_changes: Vec<ColumnDiff>,
    #[serde(default)]
    pub index_changes: Vec<IndexDiff>,
    #[serde(default)]
    pub foreign_key_changes: Vec<ForeignKeyDiff>,
    #[serde(default)]
    pub check_constraint_changes: Vec<CheckConstraintDiff>,
    #[serde(default)]
    pub partition_changes: Vec<PartitionDiff>,
    #[serde(default)]
    pub trigger_changes: Vec<TriggerDiff>,
}

impl TableDiff {
    fn whole(action: DiffAction, schema_name: &str, table: &TableMetadata) -> Self {
        let (old_table, new_table) = match action {
            DiffAction::Drop => (Some(table.clone()), None),
            _ => (None, Some(table.clone())),
        };
        Self {
            action,
            schema_name: schema_name.to_string(),
            table_name: table.name.clone(),
            old_table,
            new_table,
            column_changes: vec![],
            index_changes: vec![],
            foreign_key_changes: vec![],
            check_constraint_changes: vec![],
            partition_changes: vec![],
            trigger_changes: vec![],
        }
    }
}

/// Ordered structural delta between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataDiff {
    pub database_name: String,
    pub table_changes: Vec<TableDiff>,
    pub view_changes: Vec<ViewDiff>,
    pub function_changes: Vec<FunctionDiff>,
    pub procedure_changes: Vec<ProcedureDiff>,
    pub event_changes: Vec<EventDiff>,
}

impl MetadataDiff {
    /// Returns `true` if there are no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table_changes.is_empty()
            && self.view_changes.is_empty()
            && self.function_changes.is_empty()
            && self.procedure_changes.is_empty()
            && self.event_changes.is_empty()
    }

    /// Total number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table_changes.len()
            + self.view_changes.len()
            + self.function_changes.len()
            + self.procedure_changes.len()
            + self.event_changes.len()
    }
}

// ================================================================
// Equality with normalization
// ================================================================

/// `DEFAULT NULL` and no default are the same thing: a nullable column
/// defaults to NULL anyway, and a NOT NULL column cannot.
fn effective_default(column: &ColumnMetadata) -> Option<&ColumnDefault> {
    column.default.as_ref().filter(|d| !d.is_null())
}

fn columns_equal(a: &ColumnMetadata, b: &ColumnMetadata) -> bool {
    a.column_type.eq_ignore_ascii_case(&b.column_type)
        && a.nullable == b.nullable
        && effective_default(a) == effective_default(b)
        && a.comment == b.comment
        && a.character_set.eq_ignore_ascii_case(&b.character_set)
        && a.collation.eq_ignore_ascii_case(&b.collation)
        && a.on_update.eq_ignore_ascii_case(&b.on_update)
        && a.generation == b.generation
}

fn normalized_index_type(index: &IndexMetadata) -> String {
    if index.index_type.is_empty() {
        "BTREE".to_string()
    } else {
        index.index_type.to_ascii_uppercase()
    }
}

fn key_length_at(index: &IndexMetadata, i: usize) -> i64 {
    index.key_length.get(i).copied().filter(|l| *l > 0).unwrap_or(-1)
}

fn descending_at(index: &IndexMetadata, i: usize) -> bool {
    index.descending.get(i).copied().unwrap_or(false)
}

fn indexes_equal(a: &IndexMetadata, b: &IndexMetadata) -> bool {
    normalized_index_type(a) == normalized_index_type(b)
        && a.unique == b.unique
        && a.primary == b.primary
        && a.visible == b.visible
        && a.comment == b.comment
        && a.expressions == b.expressions
        && (0..a.expressions.len()).all(|i| {
            key_length_at(a, i) == key_length_at(b, i) && descending_at(a, i) == descending_at(b, i)
        })
}

fn normalized_action(action: &str) -> String {
    if action.is_empty() {
        "NO ACTION".to_string()
    } else {
        action.to_ascii_uppercase()
    }
}

fn foreign_keys_equal(a: &ForeignKeyMetadata, b: &ForeignKeyMetadata) -> bool {
    a.columns == b.columns
        && a.referenced_schema == b.referenced_schema
        && a.referenced_table == b.referenced_table
        && a.referenced_columns == b.referenced_columns
        && normalized_action(&a.on_delete) == normalized_action(&b.on_delete)
        && normalized_action(&a.on_update) == normalized_action(&b.on_update)
}

fn triggers_equal(a: &TriggerMetadata, b: &TriggerMetadata) -> bool {
    a.event.eq_ignore_ascii_case(&b.event)
        && a.timing.eq_ignore_ascii_case(&b.timing)
        && a.body == b.body
}

fn partitions_equal(a: &TablePartitionMetadata, b: &TablePartitionMetadata) -> bool {
    a.partition_type == b.partition_type
        && a.expression == b.expression
        && a.value == b.value
        && a.use_default == b.use_default
        && a.subpartitions.len() == b.subpartitions.len()
        && a.subpartitions.iter().all(|sa| {
            b.subpartitions
                .iter()
                .find(|sb| sb.name == sa.name)
                .is_some_and(|sb| partitions_equal(sa, sb))
        })
}

// ================================================================
// Generic list comparison
// ================================================================

/// Compares two named lists. Changed objects become `Alter` when
/// `alter_in_place` is set, otherwise a `Drop` followed by a `Create`.
fn compare_named<T: Clone>(
    old: &[T],
    new: &[T],
    name: impl Fn(&T) -> &str,
    equal: impl Fn(&T, &T) -> bool,
    alter_in_place: bool,
) -> Vec<ObjectDiff<T>> {
    let mut changes = Vec::new();
    for o in old {
        if !new.iter().any(|n| name(n) == name(o)) {
            changes.push(ObjectDiff::drop(o.clone()));
        }
    }
    for n in new {
        match old.iter().find(|o| name(o) == name(n)) {
            None => changes.push(ObjectDiff::create(n.clone())),
            Some(o) if !equal(o, n) => {
                if alter_in_place {
                    changes.push(ObjectDiff::alter(o.clone(), n.clone()));
                } else {
                    changes.push(ObjectDiff::drop(o.clone()));
                    changes.push(ObjectDiff::create(n.clone()));
                }
            }
            Some(_) => {}
        }
    }
    changes
}

fn compare_routines<T: Clone>(
    schema_name: &str,
    old: &[T],
    new: &[T],
    name: impl Fn(&T) -> &str,
    definition: impl Fn(&T) -> &str,
) -> Vec<RoutineDiff<T>> {
    compare_named(old, new, &name, |a, b| definition(a) == definition(b), true)
        .into_iter()
        .map(|d| {
            let object_name = d
                .new
                .as_ref()
                .or(d.old.as_ref())
                .map(|o| name(o).to_string())
                .unwrap_or_default();
            RoutineDiff {
                action: d.action,
                schema_name: schema_name.to_string(),
                name: object_name,
                old: d.old,
                new: d.new,
            }
        })
        .collect()
}

// ================================================================
// Table-level diff
// ================================================================

/// Compares a single table's old and new definitions. Returns `None`
/// when nothing differs.
#[must_use]
pub fn diff_table(schema_name: &str, old: &TableMetadata, new: &TableMetadata) -> Option<TableDiff> {
    let column_changes = compare_named(
        &old.columns,
        &new.columns,
        |c| c.name.as_str(),
        columns_equal,
        true,
    );
    let index_changes = compare_named(
        &old.indexes,
        &new.indexes,
        |i| i.name.as_str(),
        indexes_equal,
        false,
    );
    let foreign_key_changes = compare_named(
        &old.foreign_keys,
        &new.foreign_keys,
        |f| f.name.as_str(),
        foreign_keys_equal,
        false,
    );
    let check_constraint_changes = compare_named(
        &old.check_constraints,
        &new.check_constraints,
        |c| c.name.as_str(),
        |a, b| a.expression == b.expression,
        false,
    );
    let partition_changes = compare_named(
        &old.partitions,
        &new.partitions,
        |p| p.name.as_str(),
        partitions_equal,
        false,
    );
    let trigger_changes = compare_named(
        &old.triggers,
        &new.triggers,
        |t| t.name.as_str(),
        triggers_equal,
        false,
    );

    let options_changed = old.comment != new.comment
        || !old.engine.eq_ignore_ascii_case(&new.engine)
        || !old.charset.eq_ignore_ascii_case(&new.charset)
        || !old.collation.eq_ignore_ascii_case(&new.collation);

    if column_changes.is_empty()
        && index_changes.is_empty()
        && foreign_key_changes.is_empty()
        && check_constraint_changes.is_empty()
        && partition_changes.is_empty()
        && trigger_changes.is_empty()
        && !options_changed
    {
        return None;
    }

    Some(TableDiff {
        action: DiffAction::Alter,
        schema_name: schema_name.to_string(),
        table_name: new.name.clone(),
        old_table: Some(old.clone()),
        new_table: Some(new.clone()),
        column_changes,
        index_changes,
        foreign_key_changes,
        check_constraint_changes,
        partition_changes,
        trigger_changes,
    })
}

// ================================================================
// Schema-level diff
// ================================================================

fn add_whole_schema(diff: &mut MetadataDiff, schema: &SchemaMetadata, action: DiffAction) {
    let empty = SchemaMetadata::new(schema.name.clone());
    let (old, new) = match action {
        DiffAction::Drop => (schema, &empty),
        _ => (&empty, schema),
    };
    compare_schema(diff, old, new);
}

fn compare_schema(diff: &mut MetadataDiff, old: &SchemaMetadata, new: &SchemaMetadata) {
    let schema_name = new.name.as_str();

    for table in &old.tables {
        match new.table(&table.name) {
            None => diff
                .table_changes
                .push(TableDiff::whole(DiffAction::Drop, schema_name, table)),
            Some(new_table) => {
                if let Some(table_diff) = diff_table(schema_name, table, new_table) {
                    diff.table_changes.push(table_diff);
                }
            }
        }
    }
    for table in &new.tables {
        if old.table(&table.name).is_none() {
            diff.table_changes
                .push(TableDiff::whole(DiffAction::Create, schema_name, table));
        }
    }

    diff.view_changes.extend(compare_routines(
        schema_name,
        &old.views,
        &new.views,
        |v| v.name.as_str(),
        |v| v.definition.as_str(),
    ));
    diff.function_changes.extend(compare_routines(
        schema_name,
        &old.functions,
        &new.functions,
        |f| f.name.as_str(),
        |f| f.definition.as_str(),
    ));
    diff.procedure_changes.extend(compare_routines(
        schema_name,
        &old.procedures,
        &new.procedures,
        |p| p.name.as_str(),
        |p| p.definition.as_str(),
    ));
    diff.event_changes.extend(compare_routines(
        schema_name,
        &old.events,
        &new.events,
        |e| e.name.as_str(),
        |e| e.definition.as_str(),
    ));
}

/// Computes the structural delta from `old` to `new`.
#[must_use]
pub fn get_database_schema_diff(
    old: &DatabaseSchemaMetadata,
    new: &DatabaseSchemaMetadata,
) -> MetadataDiff {
    let mut diff = MetadataDiff {
        database_name: new.name.clone(),
        ..MetadataDiff::default()
    };

    for schema in &old.schemas {
        if new.schema(&schema.name).is_none() {
            add_whole_schema(&mut diff, schema, DiffAction::Drop);
        }
    }
    for schema in &new.schemas {
        match old.schema(&schema.name) {
            None => add_whole_schema(&mut diff, schema, DiffAction::Create),
            Some(old_schema) => compare_schema(&mut diff, old_schema, schema),
        }
    }

    debug!(
        database = %diff.database_name,
        changes = diff.len(),
        "computed schema diff"
    );
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDefault, GenerationKind, GenerationMetadata};

    // ============================================================
    // Helpers
    // ============================================================

    fn col(name: &str, ty: &str, nullable: bool) -> ColumnMetadata {
        ColumnMetadata {
            nullable,
            ..ColumnMetadata::new(name, ty)
        }
    }

    fn pk(columns: &[&str]) -> IndexMetadata {
        IndexMetadata {
            name: "PRIMARY".into(),
            expressions: columns.iter().map(|c| (*c).to_string()).collect(),
            index_type: "BTREE".into(),
            unique: true,
            primary: true,
            visible: true,
            ..IndexMetadata::default()
        }
    }

    fn table(name: &str, columns: Vec<ColumnMetadata>) -> TableMetadata {
        TableMetadata {
            columns,
            ..TableMetadata::new(name)
        }
    }

    fn db(tables: Vec<TableMetadata>) -> DatabaseSchemaMetadata {
        let mut db = DatabaseSchemaMetadata::new("db");
        db.ensure_schema("").tables = tables;
        db
    }

    fn users() -> TableMetadata {
        let mut t = table(
            "users",
            vec![col("id", "int", false), col("name", "varchar(255)", true)],
        );
        t.indexes.push(pk(&["id"]));
        t
    }

    // ============================================================
    // Tests
    // ============================================================

    #[test]
    fn no_changes_produces_empty_diff() {
        let a = db(vec![users()]);
        let diff = get_database_schema_diff(&a, &a);
        assert!(diff.is_empty());
        assert_eq!(diff.database_name, "db");
    }

    #[test]
    fn new_table_detected() {
        let diff = get_database_schema_diff(&db(vec![]), &db(vec![users()]));
        assert_eq!(diff.table_changes.len(), 1);
        let change = &diff.table_changes[0];
        assert_eq!(change.action, DiffAction::Create);
        assert_eq!(change.table_name, "users");
        assert!(change.new_table.is_some());
        assert!(change.old_table.is_none());
    }

    #[test]
    fn dropped_table_detected() {
        let diff = get_database_schema_diff(&db(vec![users()]), &db(vec![]));
        assert_eq!(diff.table_changes.len(), 1);
        assert_eq!(diff.table_changes[0].action, DiffAction::Drop);
        assert!(diff.table_changes[0].old_table.is_some());
    }

    #[test]
    fn drops_come_before_creates_in_declaration_order() {
        let old = db(vec![table("a", vec![]), table("b", vec![])]);
        let new = db(vec![table("d", vec![]), table("c", vec![]), table("b", vec![])]);
        let diff = get_database_schema_diff(&old, &new);
        let names: Vec<_> = diff
            .table_changes
            .iter()
            .map(|t| (t.action, t.table_name.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                (DiffAction::Drop, "a"),
                (DiffAction::Create, "d"),
                (DiffAction::Create, "c"),
            ]
        );
    }

    #[test]
    fn added_dropped_and_modified_columns() {
        let old = db(vec![users()]);
        let mut changed = users();
        changed.columns[1].column_type = "varchar(100)".into();
        changed.columns.push(col("email", "text", true));
        changed.columns.remove(0);
        changed.indexes.clear();
        let diff = get_database_schema_diff(&old, &db(vec![changed]));
        let table_diff = &diff.table_changes[0];
        assert_eq!(table_diff.action, DiffAction::Alter);
        let actions: Vec<_> = table_diff.column_changes.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![DiffAction::Drop, DiffAction::Alter, DiffAction::Create]
        );
        assert_eq!(table_diff.index_changes.len(), 1);
        assert_eq!(table_diff.index_changes[0].action, DiffAction::Drop);
    }

    #[test]
    fn null_default_equals_absent_default() {
        let mut a = users();
        let mut b = users();
        a.columns[1].default = Some(ColumnDefault::Null);
        b.columns[1].default = None;
        assert!(diff_table("", &a, &b).is_none());

        b.columns[1].default = Some(ColumnDefault::Value("x".into()));
        assert!(diff_table("", &a, &b).is_some());
    }

    #[test]
    fn type_comparison_is_case_insensitive() {
        let a = users();
        let mut b = users();
        b.columns[0].column_type = "INT".into();
        assert!(diff_table("", &a, &b).is_none());
    }

    #[test]
    fn generation_change_is_detected() {
        let a = users();
        let mut b = users();
        b.columns[1].generation = Some(GenerationMetadata {
            kind: GenerationKind::Stored,
            expression: "concat(id)".into(),
        });
        let diff = diff_table("", &a, &b).unwrap();
        assert_eq!(diff.column_changes[0].action, DiffAction::Alter);
    }

    #[test]
    fn changed_index_is_dropped_and_recreated() {
        let a = users();
        let mut b = users();
        b.indexes[0].expressions.push("name".into());
        let diff = diff_table("", &a, &b).unwrap();
        let actions: Vec<_> = diff.index_changes.iter().map(|c| c.action).collect();
        assert_eq!(actions, vec![DiffAction::Drop, DiffAction::Create]);
    }

    #[test]
    fn index_type_and_lengths_normalize() {
        let mut a = users();
        let mut b = users();
        a.indexes[0].index_type = String::new();
        a.indexes[0].key_length = vec![];
        b.indexes[0].key_length = vec![-1];
        assert!(diff_table("", &a, &b).is_none());
    }

    #[test]
    fn foreign_key_actions_normalize() {
        let fk = ForeignKeyMetadata {
            name: "fk".into(),
            columns: vec!["id".into()],
            referenced_table: "other".into(),
            referenced_columns: vec!["id".into()],
            ..ForeignKeyMetadata::default()
        };
        let mut a = users();
        let mut b = users();
        a.foreign_keys.push(fk.clone());
        b.foreign_keys.push(ForeignKeyMetadata {
            on_delete: "no action".into(),
            ..fk
        });
        assert!(diff_table("", &a, &b).is_none());
    }

    #[test]
    fn table_comment_change_is_an_alter() {
        let a = users();
        let mut b = users();
        b.comment = "people".into();
        let diff = diff_table("", &a, &b).unwrap();
        assert_eq!(diff.action, DiffAction::Alter);
        assert!(diff.column_changes.is_empty());
    }

    #[test]
    fn runtime_fields_are_ignored() {
        let a = users();
        let mut b = users();
        b.row_count = 42;
        assert!(diff_table("", &a, &b).is_none());
    }

    #[test]
    fn views_and_routines_compare_by_definition() {
        let mut old = db(vec![]);
        let mut new = db(vec![]);
        old.schemas[0].views.push(ViewMetadata {
            name: "v".into(),
            definition: "select 1".into(),
            ..ViewMetadata::default()
        });
        new.schemas[0].views.push(ViewMetadata {
            name: "v".into(),
            definition: "select 2".into(),
            ..ViewMetadata::default()
        });
        new.schemas[0].functions.push(FunctionMetadata {
            name: "f".into(),
            definition: "CREATE FUNCTION f() RETURNS INT RETURN 1".into(),
            ..FunctionMetadata::default()
        });
        let diff = get_database_schema_diff(&old, &new);
        assert_eq!(diff.view_changes.len(), 1);
        assert_eq!(diff.view_changes[0].action, DiffAction::Alter);
        assert_eq!(diff.view_changes[0].name, "v");
        assert_eq!(diff.function_changes[0].action, DiffAction::Create);
        assert_eq!(diff.function_changes[0].name, "f");
    }

    #[test]
    fn missing_schema_drops_everything() {
        let old = db(vec![users()]);
        let new = DatabaseSchemaMetadata::new("db");
        let diff = get_database_schema_diff(&old, &new);
        assert_eq!(diff.table_changes.len(), 1);
        assert_eq!(diff.table_changes[0].action, DiffAction::Drop);
        assert_eq!(diff.table_changes[0].schema_name, "");
    }

    #[test]
    fn diff_serializes_to_json() {
        let diff = get_database_schema_diff(&db(vec![]), &db(vec![users()]));
        let json = serde_json::to_string(&diff).unwrap();
        let back: MetadataDiff = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diff);
    }
}
