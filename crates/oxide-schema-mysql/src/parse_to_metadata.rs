//! DDL script to snapshot.
//!
//! Statements are applied in order to a fresh snapshot with one unnamed
//! schema. Only structural conflicts are errors here (a table declared
//! twice, two different database qualifiers, a trigger on an unknown
//! table); legality checks belong to the walk-through.
//!
//! Dumps written by the definition printer parse back to the snapshot
//! they came from: placeholder views restore view columns, and the
//! session `SET` lines in front of routines and triggers are captured
//! into their `sql_mode` / `character_set_client` / `collation_connection`
//! / `time_zone` fields.

use oxide_schema_core::model::{
    ColumnMetadata, DatabaseSchemaMetadata, EventMetadata, FunctionMetadata, ProcedureMetadata,
    SchemaMetadata, TableMetadata, TriggerMetadata, ViewMetadata,
};
use oxide_schema_core::{Result, SchemaError};
use regex::Regex;
use tracing::{debug, warn};

use crate::catalog::{
    build_table, drop_inherited_character_sets, partitions_from_clause, IndexKind, TableEditor,
};
use crate::parser::ast::{
    AlterItem, AlterTable, CreateIndex, CreateRoutine, CreateTable, CreateTrigger, CreateView,
    DatabaseStatement, DropIndex, DropKind, DropObject, DropTable, ObjectName, RenameTable,
    RoutineKind, Statement,
};
use crate::parser::{parse_script, ParsedStatement};

/// Session variables most recently set by the script.
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub character_set_client: String,
    pub collation_connection: String,
    pub sql_mode: String,
    pub time_zone: String,
}

/// Recognizes `SET <variable> = <value>` and dump placeholder views.
pub(crate) struct Patterns {
    session_set: Regex,
    placeholder_view: Regex,
    placeholder_column: Regex,
}

impl Patterns {
    pub(crate) fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| SchemaError::InvalidState(format!("invalid pattern: {e}")))
        };
        Ok(Self {
            session_set: compile(
                r"(?is)^(?:/\*!\d*\s*)?SET\s+(?:SESSION\s+|@@SESSION\.|@@)?(character_set_client|collation_connection|sql_mode|time_zone)\s*=\s*(.+?)\s*(?:\*/)?$",
            )?,
            placeholder_view: compile(
                r"(?is)^SELECT\s+1\s+AS\s+`[^`]+`(?:\s*,\s*1\s+AS\s+`[^`]+`)*$",
            )?,
            placeholder_column: compile(r"(?i)1\s+AS\s+`([^`]+)`")?,
        })
    }

    /// Updates `session` from a `SET` statement; other text is ignored.
    pub(crate) fn capture_session(&self, session: &mut Session, text: &str) {
        let Some(captures) = self.session_set.captures(text.trim()) else {
            return;
        };
        let value = unquote(&captures[2]);
        if value.starts_with('@') {
            return;
        }
        let value = value.to_string();
        match captures[1].to_ascii_lowercase().as_str() {
            "character_set_client" => session.character_set_client = value,
            "collation_connection" => session.collation_connection = value,
            "sql_mode" => session.sql_mode = value,
            "time_zone" => session.time_zone = value,
            _ => {}
        }
    }

    /// Columns of a view: the explicit column list, or the names of a
    /// `SELECT 1 AS `a`, 1 AS `b`` placeholder.
    pub(crate) fn view_columns(&self, view: &CreateView) -> Vec<ColumnMetadata> {
        if !view.columns.is_empty() {
            return view.columns.iter().map(|c| view_column(c)).collect();
        }
        if !self.placeholder_view.is_match(view.definition.trim()) {
            return Vec::new();
        }
        self.placeholder_column
            .captures_iter(&view.definition)
            .map(|c| view_column(&c[1]))
            .collect()
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}

struct SnapshotBuilder {
    metadata: DatabaseSchemaMetadata,
    session: Session,
    patterns: Patterns,
}

impl SnapshotBuilder {
    fn new() -> Result<Self> {
        let mut metadata = DatabaseSchemaMetadata::default();
        metadata.schemas.push(SchemaMetadata::default());
        Ok(Self {
            metadata,
            session: Session::default(),
            patterns: Patterns::new()?,
        })
    }

    fn schema(&self) -> &SchemaMetadata {
        &self.metadata.schemas[0]
    }

    fn schema_mut(&mut self) -> &mut SchemaMetadata {
        &mut self.metadata.schemas[0]
    }

    fn apply(&mut self, parsed: &ParsedStatement, source: &str) -> Result<()> {
        match &parsed.statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::CreateView(view) => self.create_view(view),
            Statement::CreateRoutine(routine) => self.create_routine(routine),
            Statement::CreateTrigger(trigger) => self.create_trigger(trigger),
            Statement::CreateIndex(index) => self.create_index(index),
            Statement::CreateDatabase(database) | Statement::AlterDatabase(database) => {
                self.create_database(database)
            }
            Statement::AlterTable(alter) => self.alter_table(alter),
            Statement::RenameTable(rename) => self.rename_table(rename),
            Statement::DropIndex(drop) => self.drop_index(drop),
            Statement::DropTable(drop) => {
                self.drop_table(drop);
                Ok(())
            }
            Statement::DropObject(drop) => {
                self.drop_object(drop);
                Ok(())
            }
            Statement::Other => {
                self.capture_session(parsed.text(source));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Records the database qualifier of an object name.
    fn note_database(&mut self, name: &ObjectName) -> Result<()> {
        let Some(database) = name.database_name() else {
            return Ok(());
        };
        if self.metadata.name.is_empty() {
            self.metadata.name = database.to_string();
        } else if self.metadata.name != database {
            return Err(SchemaError::MultipleDatabases {
                first: self.metadata.name.clone(),
                second: database.to_string(),
            });
        }
        Ok(())
    }

    fn capture_session(&mut self, text: &str) {
        self.patterns.capture_session(&mut self.session, text);
    }

    fn create_database(&mut self, database: &DatabaseStatement) -> Result<()> {
        let name = &database.name.value;
        if !name.is_empty() {
            if self.metadata.name.is_empty() {
                self.metadata.name.clone_from(name);
            } else if self.metadata.name != *name {
                return Err(SchemaError::MultipleDatabases {
                    first: self.metadata.name.clone(),
                    second: name.clone(),
                });
            }
        }
        if let Some(charset) = &database.charset {
            self.metadata.character_set.clone_from(charset);
        }
        if let Some(collation) = &database.collation {
            self.metadata.collation.clone_from(collation);
        }
        Ok(())
    }

    fn create_table(&mut self, create: &CreateTable) -> Result<()> {
        self.note_database(&create.name)?;
        let name = create.name.name.value.as_str();
        if self.schema().table(name).is_some() {
            if create.if_not_exists {
                return Ok(());
            }
            return Err(SchemaError::duplicate("table", name));
        }

        let table = if let Some(like) = &create.like {
            let source = self.schema().table(&like.name.value).ok_or_else(|| {
                SchemaError::InvalidState(format!(
                    "Table `{}` copied by `{name}` does not exist",
                    like.name.value
                ))
            })?;
            TableMetadata {
                name: name.to_string(),
                foreign_keys: Vec::new(),
                triggers: Vec::new(),
                ..source.clone()
            }
        } else if create.as_select {
            warn!(table = name, "CREATE TABLE ... SELECT recorded without columns");
            TableMetadata::new(name)
        } else {
            let mut table = build_table(create, false).map_err(|e| e.conflict.into_error(name))?;
            if let Some(partition) = &create.partition {
                table.partitions = partitions_from_clause(partition)?;
            }
            drop_inherited_character_sets(&mut table);
            table
        };

        debug!(
            table = name,
            columns = table.columns.len(),
            indexes = table.indexes.len(),
            "parsed table"
        );
        self.schema_mut().tables.push(table);
        Ok(())
    }

    fn table_mut(&mut self, name: &ObjectName) -> Result<&mut TableMetadata> {
        self.note_database(name)?;
        let table_name = name.name.value.as_str();
        self.metadata.schemas[0]
            .table_mut(table_name)
            .ok_or_else(|| SchemaError::InvalidState(format!("Table `{table_name}` does not exist")))
    }

    fn create_index(&mut self, create: &CreateIndex) -> Result<()> {
        let table = self.table_mut(&create.table)?;
        let table_name = table.name.clone();
        let kind = IndexKind::from_modifier(create.modifier.as_deref());
        let name = create.index.name.as_ref().map(|n| n.value.as_str());
        TableEditor::new(table, false)
            .add_index(kind, name, &create.index)
            .map_err(|c| c.into_error(&table_name))
    }

    fn alter_table(&mut self, alter: &AlterTable) -> Result<()> {
        let mut table_name = alter.name.name.value.clone();
        self.table_mut(&alter.name)?;
        for item in &alter.items {
            match item {
                AlterItem::RenameTable(new_name) => {
                    self.note_database(new_name)?;
                    let target = new_name.name.value.clone();
                    if target != table_name && self.schema().table(&target).is_some() {
                        return Err(SchemaError::duplicate("table", target));
                    }
                    if let Some(table) = self.schema_mut().table_mut(&table_name) {
                        table.name.clone_from(&target);
                    }
                    table_name = target;
                }
                AlterItem::Partition(clause) => {
                    let partitions = partitions_from_clause(clause)?;
                    if let Some(table) = self.schema_mut().table_mut(&table_name) {
                        table.partitions = partitions;
                    }
                }
                item => {
                    let Some(table) = self.schema_mut().table_mut(&table_name) else {
                        continue;
                    };
                    TableEditor::new(table, false)
                        .apply_alter_item(item)
                        .map_err(|c| c.into_error(&table_name))?;
                }
            }
        }
        Ok(())
    }

    /// Renames within the snapshot; a move to another database drops the
    /// table from it.
    fn rename_table(&mut self, rename: &RenameTable) -> Result<()> {
        for (from, to) in &rename.pairs {
            self.note_database(from)?;
            let from_name = from.name.value.as_str();
            let current = self.metadata.name.as_str();
            let moved_out = to
                .database_name()
                .is_some_and(|database| !current.is_empty() && database != current);
            if moved_out {
                self.schema_mut().tables.retain(|t| t.name != from_name);
                continue;
            }
            self.note_database(to)?;
            let to_name = to.name.value.as_str();
            if from_name != to_name && self.schema().table(to_name).is_some() {
                return Err(SchemaError::duplicate("table", to_name));
            }
            self.table_mut(from)?.name = to_name.to_string();
        }
        Ok(())
    }

    fn drop_index(&mut self, drop: &DropIndex) -> Result<()> {
        let table = self.table_mut(&drop.table)?;
        let table_name = table.name.clone();
        TableEditor::new(table, false)
            .drop_index(&drop.name.value)
            .map_err(|c| c.into_error(&table_name))
    }

    fn drop_table(&mut self, drop: &DropTable) {
        for name in &drop.tables {
            self.schema_mut()
                .tables
                .retain(|t| t.name != name.name.value);
        }
    }

    fn drop_object(&mut self, drop: &DropObject) {
        drop_objects(self.schema_mut(), drop);
    }

    fn create_view(&mut self, view: &CreateView) -> Result<()> {
        self.note_database(&view.name)?;
        let name = view.name.name.value.as_str();
        let columns = self.patterns.view_columns(view);
        let schema = self.schema_mut();
        if schema.view(name).is_some() && !view.or_replace {
            return Err(SchemaError::duplicate("view", name));
        }
        put_view(schema, view, columns);
        Ok(())
    }

    fn create_routine(&mut self, routine: &CreateRoutine) -> Result<()> {
        self.note_database(&routine.name)?;
        let session = self.session.clone();
        let schema = self.schema_mut();
        if routine_exists(schema, routine) {
            if routine.if_not_exists {
                return Ok(());
            }
            let kind = match routine.kind {
                RoutineKind::Function => "function",
                RoutineKind::Procedure => "procedure",
                RoutineKind::Event => "event",
            };
            return Err(SchemaError::duplicate(kind, &routine.name.name.value));
        }
        put_routine(schema, routine, &session);
        Ok(())
    }

    fn create_trigger(&mut self, trigger: &CreateTrigger) -> Result<()> {
        self.note_database(&trigger.name)?;
        let name = trigger.name.name.value.clone();
        let session = self.session.clone();
        self.note_database(&trigger.table)?;
        let table_name = trigger.table.name.value.as_str();
        let table = self.schema_mut().table_mut(table_name).ok_or_else(|| {
            SchemaError::InvalidState(format!(
                "Table `{table_name}` for trigger `{name}` does not exist"
            ))
        })?;
        if table.triggers.iter().any(|t| t.name == name) {
            return Err(SchemaError::duplicate("trigger", name));
        }
        put_trigger(table, trigger, &session);
        Ok(())
    }

    fn finish(mut self) -> DatabaseSchemaMetadata {
        for table in &mut self.metadata.schemas[0].tables {
            table.renumber_columns();
        }
        self.metadata
    }
}

fn view_column(name: &str) -> ColumnMetadata {
    ColumnMetadata {
        name: name.to_string(),
        ..ColumnMetadata::default()
    }
}

/// Adds or replaces a view. Known columns survive a replacement that
/// does not name any.
pub(crate) fn put_view(schema: &mut SchemaMetadata, view: &CreateView, columns: Vec<ColumnMetadata>) {
    let name = view.name.name.value.as_str();
    match schema.views.iter_mut().find(|v| v.name == name) {
        Some(existing) => {
            existing.definition.clone_from(&view.definition);
            if !columns.is_empty() {
                existing.columns = columns;
            }
        }
        None => schema.views.push(ViewMetadata {
            name: name.to_string(),
            definition: view.definition.clone(),
            comment: String::new(),
            columns,
        }),
    }
}

pub(crate) fn routine_exists(schema: &SchemaMetadata, routine: &CreateRoutine) -> bool {
    let name = routine.name.name.value.as_str();
    match routine.kind {
        RoutineKind::Function => schema.functions.iter().any(|f| f.name == name),
        RoutineKind::Procedure => schema.procedures.iter().any(|p| p.name == name),
        RoutineKind::Event => schema.events.iter().any(|e| e.name == name),
    }
}

/// Adds a routine, replacing one with the same name in place.
pub(crate) fn put_routine(schema: &mut SchemaMetadata, routine: &CreateRoutine, session: &Session) {
    let name = routine.name.name.value.clone();
    let definition = routine.definition.clone();
    let session = session.clone();
    match routine.kind {
        RoutineKind::Function => replace_or_push(
            &mut schema.functions,
            |f| f.name == name,
            FunctionMetadata {
                name: name.clone(),
                definition,
                sql_mode: session.sql_mode,
                character_set_client: session.character_set_client,
                collation_connection: session.collation_connection,
            },
        ),
        RoutineKind::Procedure => replace_or_push(
            &mut schema.procedures,
            |p| p.name == name,
            ProcedureMetadata {
                name: name.clone(),
                definition,
                sql_mode: session.sql_mode,
                character_set_client: session.character_set_client,
                collation_connection: session.collation_connection,
            },
        ),
        RoutineKind::Event => replace_or_push(
            &mut schema.events,
            |e| e.name == name,
            EventMetadata {
                name: name.clone(),
                definition,
                time_zone: session.time_zone,
                sql_mode: session.sql_mode,
                character_set_client: session.character_set_client,
                collation_connection: session.collation_connection,
            },
        ),
    }
}

/// Adds a trigger to its table, replacing one with the same name.
pub(crate) fn put_trigger(table: &mut TableMetadata, trigger: &CreateTrigger, session: &Session) {
    let name = trigger.name.name.value.clone();
    replace_or_push(
        &mut table.triggers,
        |t| t.name == name,
        TriggerMetadata {
            name: name.clone(),
            event: trigger.event.clone(),
            timing: trigger.timing.clone(),
            body: trigger.body.clone(),
            sql_mode: session.sql_mode.clone(),
            character_set_client: session.character_set_client.clone(),
            collation_connection: session.collation_connection.clone(),
        },
    );
}

fn replace_or_push<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool, item: T) {
    match items.iter_mut().find(|existing| matches(existing)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

/// Removes the views, routines, events or triggers a `DROP` names.
pub(crate) fn drop_objects(schema: &mut SchemaMetadata, drop: &DropObject) {
    for name in &drop.names {
        let name = name.name.value.as_str();
        match drop.kind {
            DropKind::View => schema.views.retain(|v| v.name != name),
            DropKind::Function => schema.functions.retain(|f| f.name != name),
            DropKind::Procedure => schema.procedures.retain(|p| p.name != name),
            DropKind::Event => schema.events.retain(|e| e.name != name),
            DropKind::Trigger => {
                for table in &mut schema.tables {
                    table.triggers.retain(|t| t.name != name);
                }
            }
        }
    }
}

/// Parses a DDL script into a snapshot.
///
/// # Errors
///
/// Returns [`SchemaError::Syntax`] for unparsable text, and structural
/// errors for duplicate objects, conflicting database qualifiers or
/// invalid partitioning.
pub fn parse_to_metadata(text: &str) -> Result<DatabaseSchemaMetadata> {
    let statements = parse_script(text)?;
    let mut builder = SnapshotBuilder::new()?;
    for parsed in &statements {
        builder.apply(parsed, text)?;
    }
    let metadata = builder.finish();
    debug!(
        database = %metadata.name,
        tables = metadata.schemas[0].tables.len(),
        views = metadata.schemas[0].views.len(),
        "parsed script into snapshot"
    );
    Ok(metadata)
}
