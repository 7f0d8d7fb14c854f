//! Table editing shared by snapshot parsing and the walk-through.
//!
//! Both build tables out of parsed column and constraint definitions and
//! then mutate them in place. A [`TableEditor`] in strict mode adds the
//! legality checks MySQL itself applies (default values, `ON UPDATE`,
//! single auto-increment column, existing key columns, NOT NULL spatial
//! keys) on top of the duplicate checks every caller gets.

use oxide_schema_core::model::{
    CheckConstraintMetadata, ColumnDefault, ColumnMetadata, ForeignKeyMetadata,
    GenerationKind, GenerationMetadata, IndexMetadata, TableMetadata, TablePartitionMetadata,
};
use oxide_schema_core::{Advice, AdviceCode, SchemaError};

use crate::lexer::Span;
use crate::parser::ast::{
    AlterItem, AttributeKind, CheckDef, ColumnDef, ColumnPosition, ConstraintKind, CreateTable,
    ForeignKeyDef, IndexDef, KeyPart, PartitionClause, TableConstraint, TableElement, TableOption,
};
use crate::types::{is_datetime_or_timestamp, is_expression_default_only, normalize_on_update};

const NO_ACTION: &str = "NO ACTION";

/// Why an edit was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    ColumnExists(String),
    ColumnNotExists(String),
    IndexExists(String),
    IndexNotExists(String),
    PrimaryKeyExists,
    IndexEmptyKeys(String),
    SpatialKeyNullable(String),
    InvalidDefault(String),
    NullDefaultForNotNull(String),
    OnUpdateNotDatetime(String),
    AutoIncrementExists,
    ForeignKeyExists(String),
    CheckExists(String),
}

impl Conflict {
    /// Human-readable message for a conflict on `table`.
    #[must_use]
    pub fn message(&self, table: &str) -> String {
        match self {
            Self::ColumnExists(c) => format!("Column `{c}` already exists in table `{table}`"),
            Self::ColumnNotExists(c) => format!("Column `{c}` does not exist in table `{table}`"),
            Self::IndexExists(i) => format!("Index `{i}` already exists in table `{table}`"),
            Self::IndexNotExists(i) => format!("Index `{i}` does not exist in table `{table}`"),
            Self::PrimaryKeyExists => format!("Primary key exists in table `{table}`"),
            Self::IndexEmptyKeys(i) => format!("Index `{i}` in table `{table}` has empty key"),
            Self::SpatialKeyNullable(c) => format!(
                "All parts of a SPATIAL index must be NOT NULL, but `{c}` is nullable"
            ),
            Self::InvalidDefault(c) => {
                format!("BLOB, TEXT, GEOMETRY or JSON column `{c}` can't have a default value")
            }
            Self::NullDefaultForNotNull(c) => format!("Invalid default value for column `{c}`"),
            Self::OnUpdateNotDatetime(c) => {
                format!("Column `{c}` use ON UPDATE but is not DATETIME or TIMESTAMP")
            }
            Self::AutoIncrementExists => {
                format!("There can be only one auto column for table `{table}`")
            }
            Self::ForeignKeyExists(f) => {
                format!("Foreign key `{f}` already exists in table `{table}`")
            }
            Self::CheckExists(c) => {
                format!("Check constraint `{c}` already exists in table `{table}`")
            }
        }
    }

    /// The walk-through advice for this conflict. Foreign keys and check
    /// constraints are not validated, so their conflicts yield nothing.
    #[must_use]
    pub fn to_advice(&self, table: &str, line: usize) -> Option<Advice> {
        let code = match self {
            Self::ColumnExists(_) => AdviceCode::ColumnExists,
            Self::ColumnNotExists(_) => AdviceCode::ColumnNotExists,
            Self::IndexExists(_) => AdviceCode::IndexExists,
            Self::IndexNotExists(_) => AdviceCode::IndexNotExists,
            Self::PrimaryKeyExists => AdviceCode::PrimaryKeyExists,
            Self::IndexEmptyKeys(_) => AdviceCode::IndexEmptyKeys,
            Self::SpatialKeyNullable(_) => AdviceCode::SpatialIndexKeyNullable,
            Self::InvalidDefault(_) => AdviceCode::InvalidColumnDefault,
            Self::NullDefaultForNotNull(_) => AdviceCode::SetNullDefaultForNotNullColumn,
            Self::OnUpdateNotDatetime(_) => AdviceCode::OnUpdateColumnNotDatetimeOrTimestamp,
            Self::AutoIncrementExists => AdviceCode::AutoIncrementExists,
            Self::ForeignKeyExists(_) | Self::CheckExists(_) => return None,
        };
        Some(Advice::error(code, self.message(table), line))
    }

    /// The structural error for this conflict outside the walk-through.
    #[must_use]
    pub fn into_error(self, table: &str) -> SchemaError {
        match self {
            Self::ColumnExists(name) => SchemaError::duplicate("column", name),
            Self::IndexExists(name) => SchemaError::duplicate("index", name),
            Self::PrimaryKeyExists => SchemaError::duplicate("index", IndexMetadata::PRIMARY),
            Self::ForeignKeyExists(name) => SchemaError::duplicate("foreign key", name),
            Self::CheckExists(name) => SchemaError::duplicate("check constraint", name),
            other => SchemaError::InvalidState(other.message(table)),
        }
    }
}

/// A conflict raised by one element of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementConflict {
    pub conflict: Conflict,
    /// Span of the offending column or constraint.
    pub span: Span,
}

/// Index flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
    Fulltext,
    Spatial,
}

impl IndexKind {
    /// Maps the `CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX` modifier.
    #[must_use]
    pub fn from_modifier(modifier: Option<&str>) -> Self {
        match modifier {
            Some(m) if m.eq_ignore_ascii_case("UNIQUE") => Self::Unique,
            Some(m) if m.eq_ignore_ascii_case("FULLTEXT") => Self::Fulltext,
            Some(m) if m.eq_ignore_ascii_case("SPATIAL") => Self::Spatial,
            _ => Self::Plain,
        }
    }
}

/// Keys declared inline on a column.
enum InlineKey {
    Primary,
    Unique,
    Check(CheckDef),
}

fn is_expression_key(expression: &str) -> bool {
    expression.starts_with('(')
}

fn is_parenthesized(default: &ColumnDefault) -> bool {
    matches!(default, ColumnDefault::Expression(e) if e.trim_start().starts_with('('))
}

/// Builds index metadata from a parsed index body.
#[must_use]
pub fn index_metadata(name: String, kind: IndexKind, def: &IndexDef) -> IndexMetadata {
    let has_length = def.keys.iter().any(|k| k.length.is_some());
    let has_descending = def.keys.iter().any(|k| k.descending);
    let index_type = match kind {
        IndexKind::Fulltext => String::from("FULLTEXT"),
        IndexKind::Spatial => String::from("SPATIAL"),
        _ => def.using.clone().unwrap_or_else(|| String::from("BTREE")),
    };
    let primary = kind == IndexKind::Primary;
    IndexMetadata {
        name,
        expressions: def.keys.iter().map(|k| k.expression.clone()).collect(),
        key_length: if has_length {
            def.keys.iter().map(|k| k.length.unwrap_or(-1)).collect()
        } else {
            Vec::new()
        },
        descending: if has_descending {
            def.keys.iter().map(|k| k.descending).collect()
        } else {
            Vec::new()
        },
        index_type,
        unique: primary || kind == IndexKind::Unique,
        primary,
        visible: primary || def.visible,
        comment: def.comment.clone().unwrap_or_default(),
    }
}

/// Settles `DEFAULT NULL`: NOT NULL columns lose it, nullable columns
/// without a default get it.
fn settle_default(column: &mut ColumnMetadata) {
    match (&column.default, column.nullable) {
        (Some(ColumnDefault::Null), false) => column.default = None,
        (None, true) => column.default = Some(ColumnDefault::Null),
        _ => {}
    }
}

/// Mutates one table.
pub struct TableEditor<'a> {
    table: &'a mut TableMetadata,
    strict: bool,
}

impl<'a> TableEditor<'a> {
    /// Creates an editor. `strict` enables MySQL's legality checks.
    pub fn new(table: &'a mut TableMetadata, strict: bool) -> Self {
        Self { table, strict }
    }

    /// Name of the edited table.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// The table as edited so far.
    #[must_use]
    pub fn table(&self) -> &TableMetadata {
        self.table
    }

    // ========================================================================
    // Columns
    // ========================================================================

    fn build_column(&self, def: &ColumnDef) -> Result<(ColumnMetadata, Vec<InlineKey>), Conflict> {
        let mut column = ColumnMetadata::new(&def.name.value, &def.data_type.text);
        let mut inline = Vec::new();
        for attribute in &def.attributes {
            match &attribute.kind {
                AttributeKind::Null => column.nullable = true,
                AttributeKind::NotNull => column.nullable = false,
                AttributeKind::Default(default) => column.default = Some(default.clone()),
                AttributeKind::OnUpdate(expression) => {
                    column.on_update = normalize_on_update(expression);
                }
                AttributeKind::AutoIncrement => column.default = Some(ColumnDefault::auto_increment()),
                AttributeKind::Comment(comment) => column.comment.clone_from(comment),
                AttributeKind::Collate(collation) => column.collation.clone_from(collation),
                AttributeKind::CharacterSet(charset) => column.character_set.clone_from(charset),
                AttributeKind::Generated { expression, stored } => {
                    column.generation = Some(GenerationMetadata {
                        kind: if *stored {
                            GenerationKind::Stored
                        } else {
                            GenerationKind::Virtual
                        },
                        expression: expression.clone(),
                    });
                }
                AttributeKind::PrimaryKey => {
                    column.nullable = false;
                    inline.push(InlineKey::Primary);
                }
                AttributeKind::Unique => inline.push(InlineKey::Unique),
                AttributeKind::Check(check) => inline.push(InlineKey::Check(check.clone())),
                // Inline REFERENCES is parsed but ignored, as MySQL does.
                _ => {}
            }
        }

        if self.strict {
            if let Some(default) = &column.default {
                if !default.is_null()
                    && !default.is_auto_increment()
                    && !is_parenthesized(default)
                    && is_expression_default_only(&column.column_type)
                {
                    return Err(Conflict::InvalidDefault(column.name));
                }
                if default.is_null() && !column.nullable {
                    return Err(Conflict::NullDefaultForNotNull(column.name));
                }
            }
            if !column.on_update.is_empty() && !is_datetime_or_timestamp(&column.column_type) {
                return Err(Conflict::OnUpdateNotDatetime(column.name));
            }
        }
        settle_default(&mut column);
        Ok((column, inline))
    }

    fn check_single_auto_increment(&self, column: &ColumnMetadata, replacing: Option<&str>) -> Result<(), Conflict> {
        if !self.strict || !column.is_auto_increment() {
            return Ok(());
        }
        let other = self
            .table
            .columns
            .iter()
            .any(|c| c.is_auto_increment() && Some(c.name.as_str()) != replacing);
        if other {
            return Err(Conflict::AutoIncrementExists);
        }
        Ok(())
    }

    fn position_index(&self, position: Option<&ColumnPosition>) -> usize {
        match position {
            Some(ColumnPosition::First) => 0,
            Some(ColumnPosition::After(name)) => self
                .table
                .columns
                .iter()
                .position(|c| c.name == *name)
                .map_or(self.table.columns.len(), |i| i + 1),
            None => self.table.columns.len(),
        }
    }

    fn apply_inline_keys(&mut self, column: &str, inline: Vec<InlineKey>) -> Result<(), Conflict> {
        for key in inline {
            let def = IndexDef {
                name: None,
                keys: vec![KeyPart {
                    expression: column.to_string(),
                    length: None,
                    descending: false,
                }],
                using: None,
                comment: None,
                visible: true,
            };
            match key {
                InlineKey::Primary => self.add_index(IndexKind::Primary, None, &def)?,
                InlineKey::Unique => self.add_index(IndexKind::Unique, None, &def)?,
                InlineKey::Check(check) => self.add_check(None, &check)?,
            }
        }
        Ok(())
    }

    /// Adds a column, with any inline keys, at `position` (default: last).
    ///
    /// # Errors
    ///
    /// Returns a conflict if the column exists or fails a strict check.
    pub fn add_column(&mut self, def: &ColumnDef, position: Option<&ColumnPosition>) -> Result<(), Conflict> {
        if self.table.column(&def.name.value).is_some() {
            return Err(Conflict::ColumnExists(def.name.value.clone()));
        }
        let (column, inline) = self.build_column(def)?;
        self.check_single_auto_increment(&column, None)?;
        let at = self.position_index(position);
        let name = column.name.clone();
        self.table.columns.insert(at, column);
        self.table.renumber_columns();
        self.apply_inline_keys(&name, inline)
    }

    /// Replaces a column definition (`MODIFY` / `CHANGE`), optionally
    /// renaming and moving it.
    ///
    /// # Errors
    ///
    /// Returns a conflict if `old_name` is missing, the new name is taken
    /// or the definition fails a strict check.
    pub fn change_column(
        &mut self,
        old_name: &str,
        def: &ColumnDef,
        position: Option<&ColumnPosition>,
    ) -> Result<(), Conflict> {
        let Some(idx) = self.table.columns.iter().position(|c| c.name == old_name) else {
            return Err(Conflict::ColumnNotExists(old_name.to_string()));
        };
        let new_name = def.name.value.as_str();
        if new_name != old_name && self.table.column(new_name).is_some() {
            return Err(Conflict::ColumnExists(new_name.to_string()));
        }
        let (mut column, inline) = self.build_column(def)?;
        self.check_single_auto_increment(&column, Some(old_name))?;

        // Key membership keeps the column NOT NULL.
        if self.is_primary_key_column(old_name) {
            column.nullable = false;
            settle_default(&mut column);
        }
        self.table.columns.remove(idx);
        if new_name != old_name {
            self.rename_references(old_name, new_name);
        }
        let at = match position {
            Some(_) => self.position_index(position),
            None => idx,
        };
        let name = column.name.clone();
        self.table.columns.insert(at.min(self.table.columns.len()), column);
        self.table.renumber_columns();
        self.apply_inline_keys(&name, inline)
    }

    /// Renames a column and every key that lists it.
    ///
    /// # Errors
    ///
    /// Returns a conflict if `old_name` is missing or `new_name` is taken.
    pub fn rename_column(&mut self, old_name: &str, new_name: &str) -> Result<(), Conflict> {
        if self.table.column(old_name).is_none() {
            return Err(Conflict::ColumnNotExists(old_name.to_string()));
        }
        if self.table.column(new_name).is_some() {
            return Err(Conflict::ColumnExists(new_name.to_string()));
        }
        if let Some(column) = self.table.column_mut(old_name) {
            column.name = new_name.to_string();
        }
        self.rename_references(old_name, new_name);
        Ok(())
    }

    fn rename_references(&mut self, old_name: &str, new_name: &str) {
        for index in &mut self.table.indexes {
            for expression in &mut index.expressions {
                if expression == old_name {
                    *expression = new_name.to_string();
                }
            }
        }
        for fk in &mut self.table.foreign_keys {
            for column in &mut fk.columns {
                if column == old_name {
                    *column = new_name.to_string();
                }
            }
        }
    }

    fn is_primary_key_column(&self, column: &str) -> bool {
        self.table
            .primary_key()
            .is_some_and(|pk| pk.expressions.iter().any(|e| e == column))
    }

    /// Drops a column. Keys lose the column; keys left empty are dropped.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the column does not exist.
    pub fn drop_column(&mut self, name: &str) -> Result<(), Conflict> {
        let Some(idx) = self.table.columns.iter().position(|c| c.name == name) else {
            return Err(Conflict::ColumnNotExists(name.to_string()));
        };
        self.table.columns.remove(idx);
        self.table.renumber_columns();

        for index in &mut self.table.indexes {
            let keep: Vec<bool> = index.expressions.iter().map(|e| e != name).collect();
            if keep.iter().all(|k| *k) {
                continue;
            }
            retain_flagged(&mut index.expressions, &keep);
            retain_flagged(&mut index.key_length, &keep);
            retain_flagged(&mut index.descending, &keep);
        }
        self.table.indexes.retain(|i| !i.expressions.is_empty());
        Ok(())
    }

    /// `ALTER COLUMN ... SET DEFAULT`.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the column is missing or, in strict mode, the
    /// default is not allowed for it.
    pub fn set_default(&mut self, name: &str, default: &ColumnDefault) -> Result<(), Conflict> {
        let strict = self.strict;
        let Some(column) = self.table.column_mut(name) else {
            return Err(Conflict::ColumnNotExists(name.to_string()));
        };
        if strict {
            if default.is_null() && !column.nullable {
                return Err(Conflict::NullDefaultForNotNull(name.to_string()));
            }
            if !default.is_null()
                && !is_parenthesized(default)
                && is_expression_default_only(&column.column_type)
            {
                return Err(Conflict::InvalidDefault(name.to_string()));
            }
        }
        column.default = Some(default.clone());
        settle_default(column);
        Ok(())
    }

    /// `ALTER COLUMN ... DROP DEFAULT`.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the column does not exist.
    pub fn drop_default(&mut self, name: &str) -> Result<(), Conflict> {
        let Some(column) = self.table.column_mut(name) else {
            return Err(Conflict::ColumnNotExists(name.to_string()));
        };
        column.default = None;
        settle_default(column);
        Ok(())
    }

    /// Checks that a column exists; used for visibility changes, which
    /// the snapshot does not track.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the column does not exist.
    pub fn require_column(&self, name: &str) -> Result<(), Conflict> {
        if self.table.column(name).is_none() {
            return Err(Conflict::ColumnNotExists(name.to_string()));
        }
        Ok(())
    }

    // ========================================================================
    // Indexes and constraints
    // ========================================================================

    fn unused_index_name(&self, first_key: &str) -> String {
        let base = if is_expression_key(first_key) {
            "functional_index"
        } else {
            first_key
        };
        let mut name = base.to_string();
        let mut suffix = 2;
        while self.table.index(&name).is_some() {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        name
    }

    /// Validates key columns: they must exist in strict mode, primary
    /// keys make them NOT NULL and spatial keys require NOT NULL.
    fn validate_keys(&mut self, kind: IndexKind, def: &IndexDef) -> Result<(), Conflict> {
        for key in &def.keys {
            if is_expression_key(&key.expression) {
                continue;
            }
            let strict = self.strict;
            let Some(column) = self.table.column_mut(&key.expression) else {
                if strict {
                    return Err(Conflict::ColumnNotExists(key.expression.clone()));
                }
                continue;
            };
            if kind == IndexKind::Primary {
                column.nullable = false;
                settle_default(column);
            }
            if strict && kind == IndexKind::Spatial && column.nullable {
                return Err(Conflict::SpatialKeyNullable(column.name.clone()));
            }
        }
        Ok(())
    }

    /// Adds an index. Unnamed indexes are named after their first key,
    /// with `_2`, `_3`, ... appended until the name is free.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the name or primary key is taken, a key
    /// column is missing, or a spatial key is nullable.
    pub fn add_index(&mut self, kind: IndexKind, name: Option<&str>, def: &IndexDef) -> Result<(), Conflict> {
        if kind == IndexKind::Primary && self.table.primary_key().is_some() {
            return Err(Conflict::PrimaryKeyExists);
        }
        self.validate_keys(kind, def)?;
        let name = match (kind, name) {
            (IndexKind::Primary, _) => IndexMetadata::PRIMARY.to_string(),
            (_, Some(name)) => {
                if self.table.index(name).is_some() {
                    return Err(Conflict::IndexExists(name.to_string()));
                }
                name.to_string()
            }
            (_, None) => match def.keys.first() {
                Some(first) => self.unused_index_name(&first.expression),
                None => return Err(Conflict::IndexEmptyKeys(String::new())),
            },
        };
        if def.keys.is_empty() {
            return Err(Conflict::IndexEmptyKeys(name));
        }
        self.table.indexes.push(index_metadata(name, kind, def));
        Ok(())
    }

    fn generated_name(&self, infix: &str, taken: impl Fn(&str) -> bool) -> String {
        let prefix = format!("{}_{infix}_", self.table.name);
        let mut n = 1;
        loop {
            let name = format!("{prefix}{n}");
            if !taken(&name) {
                return name;
            }
            n += 1;
        }
    }

    /// Adds a foreign key. Unnamed keys become `<table>_ibfk_<n>`.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the name is taken.
    pub fn add_foreign_key(&mut self, symbol: Option<&str>, def: &ForeignKeyDef) -> Result<(), Conflict> {
        let name = match symbol.or_else(|| def.index_name.as_ref().map(|i| i.value.as_str())) {
            Some(name) => {
                if self.table.foreign_keys.iter().any(|fk| fk.name == name) {
                    return Err(Conflict::ForeignKeyExists(name.to_string()));
                }
                name.to_string()
            }
            None => {
                let fks = &self.table.foreign_keys;
                self.generated_name("ibfk", |n| fks.iter().any(|fk| fk.name == n))
            }
        };
        let reference = &def.reference;
        self.table.foreign_keys.push(ForeignKeyMetadata {
            name,
            columns: def.columns.clone(),
            referenced_schema: reference.table.database_name().unwrap_or_default().to_string(),
            referenced_table: reference.table.name.value.clone(),
            referenced_columns: reference.columns.clone(),
            on_delete: reference.on_delete.clone().unwrap_or_else(|| NO_ACTION.to_string()),
            on_update: reference.on_update.clone().unwrap_or_else(|| NO_ACTION.to_string()),
        });
        Ok(())
    }

    /// Adds a check constraint. Unnamed checks become `<table>_chk_<n>`.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the name is taken.
    pub fn add_check(&mut self, symbol: Option<&str>, def: &CheckDef) -> Result<(), Conflict> {
        let name = match def.name.as_deref().or(symbol) {
            Some(name) => {
                if self.table.check_constraints.iter().any(|c| c.name == name) {
                    return Err(Conflict::CheckExists(name.to_string()));
                }
                name.to_string()
            }
            None => {
                let checks = &self.table.check_constraints;
                self.generated_name("chk", |n| checks.iter().any(|c| c.name == n))
            }
        };
        self.table.check_constraints.push(CheckConstraintMetadata {
            name,
            expression: def.expression.clone(),
        });
        Ok(())
    }

    /// Adds a table-level constraint.
    ///
    /// # Errors
    ///
    /// See [`Self::add_index`], [`Self::add_foreign_key`] and
    /// [`Self::add_check`].
    pub fn add_constraint(&mut self, constraint: &TableConstraint) -> Result<(), Conflict> {
        let symbol = constraint.symbol.as_ref().map(|s| s.value.as_str());
        let (kind, def) = match &constraint.kind {
            ConstraintKind::PrimaryKey(def) => (IndexKind::Primary, def),
            ConstraintKind::Unique(def) => (IndexKind::Unique, def),
            ConstraintKind::Index(def) => (IndexKind::Plain, def),
            ConstraintKind::Fulltext(def) => (IndexKind::Fulltext, def),
            ConstraintKind::Spatial(def) => (IndexKind::Spatial, def),
            ConstraintKind::ForeignKey(fk) => return self.add_foreign_key(symbol, fk),
            ConstraintKind::Check(check) => return self.add_check(symbol, check),
        };
        let name = def.name.as_ref().map(|n| n.value.as_str()).or(symbol);
        self.add_index(kind, name, def)
    }

    /// Drops an index by name.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the index does not exist.
    pub fn drop_index(&mut self, name: &str) -> Result<(), Conflict> {
        let Some(idx) = self.table.indexes.iter().position(|i| i.name == name) else {
            return Err(Conflict::IndexNotExists(name.to_string()));
        };
        self.table.indexes.remove(idx);
        Ok(())
    }

    /// Drops the primary key.
    ///
    /// # Errors
    ///
    /// Returns a conflict if there is no primary key.
    pub fn drop_primary_key(&mut self) -> Result<(), Conflict> {
        let Some(idx) = self.table.indexes.iter().position(|i| i.primary) else {
            return Err(Conflict::IndexNotExists(IndexMetadata::PRIMARY.to_string()));
        };
        self.table.indexes.remove(idx);
        Ok(())
    }

    /// Drops a foreign key if present; returns whether one was dropped.
    pub fn drop_foreign_key(&mut self, name: &str) -> bool {
        let before = self.table.foreign_keys.len();
        self.table.foreign_keys.retain(|fk| fk.name != name);
        before != self.table.foreign_keys.len()
    }

    /// Drops a check constraint if present; returns whether one was
    /// dropped.
    pub fn drop_check(&mut self, name: &str) -> bool {
        let before = self.table.check_constraints.len();
        self.table.check_constraints.retain(|c| c.name != name);
        before != self.table.check_constraints.len()
    }

    /// `DROP CONSTRAINT`: a check, a foreign key or a unique key.
    ///
    /// # Errors
    ///
    /// Returns a conflict if nothing carries the name.
    pub fn drop_constraint(&mut self, name: &str) -> Result<(), Conflict> {
        if self.drop_check(name) || self.drop_foreign_key(name) {
            return Ok(());
        }
        self.drop_index(name)
    }

    /// Renames an index.
    ///
    /// # Errors
    ///
    /// Returns a conflict if `old_name` is missing or `new_name` is taken.
    pub fn rename_index(&mut self, old_name: &str, new_name: &str) -> Result<(), Conflict> {
        if self.table.index(old_name).is_none() {
            return Err(Conflict::IndexNotExists(old_name.to_string()));
        }
        if self.table.index(new_name).is_some() {
            return Err(Conflict::IndexExists(new_name.to_string()));
        }
        if let Some(index) = self.table.index_mut(old_name) {
            index.name = new_name.to_string();
        }
        Ok(())
    }

    /// `ALTER INDEX ... VISIBLE | INVISIBLE`.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the index does not exist.
    pub fn set_index_visible(&mut self, name: &str, visible: bool) -> Result<(), Conflict> {
        let Some(index) = self.table.index_mut(name) else {
            return Err(Conflict::IndexNotExists(name.to_string()));
        };
        index.visible = visible;
        Ok(())
    }

    // ========================================================================
    // Table level
    // ========================================================================

    /// Applies `ENGINE`, `CHARSET`, `COLLATE` and `COMMENT`; other options
    /// are not tracked.
    pub fn apply_options(&mut self, options: &[TableOption]) {
        for option in options {
            match option.name.as_str() {
                "ENGINE" => self.table.engine.clone_from(&option.value),
                "CHARSET" => self.table.charset.clone_from(&option.value),
                "COLLATE" => self.table.collation.clone_from(&option.value),
                "COMMENT" => self.table.comment.clone_from(&option.value),
                _ => {}
            }
        }
    }

    /// Applies one table-local `ALTER TABLE` item. Renames of the table
    /// and new partitioning are left to the caller.
    ///
    /// # Errors
    ///
    /// Returns the conflict raised by the underlying edit.
    pub fn apply_alter_item(&mut self, item: &AlterItem) -> Result<(), Conflict> {
        match item {
            AlterItem::AddColumns { columns, position } => {
                for column in columns {
                    self.add_column(column, position.as_ref())?;
                }
                Ok(())
            }
            AlterItem::AddConstraint(constraint) => self.add_constraint(constraint),
            AlterItem::DropColumn(name) => self.drop_column(name),
            AlterItem::DropIndex(name) => self.drop_index(name),
            AlterItem::DropPrimaryKey => self.drop_primary_key(),
            AlterItem::DropForeignKey(name) => {
                self.drop_foreign_key(name);
                Ok(())
            }
            AlterItem::DropCheck(name) => {
                self.drop_check(name);
                Ok(())
            }
            AlterItem::DropConstraint(name) => self.drop_constraint(name),
            AlterItem::ModifyColumn { column, position } => {
                self.change_column(&column.name.value, column, position.as_ref())
            }
            AlterItem::ChangeColumn {
                old_name,
                column,
                position,
            } => self.change_column(old_name, column, position.as_ref()),
            AlterItem::RenameColumn { old_name, new_name } => self.rename_column(old_name, new_name),
            AlterItem::RenameIndex { old_name, new_name } => self.rename_index(old_name, new_name),
            AlterItem::SetDefault { column, default } => self.set_default(column, default),
            AlterItem::DropDefault(column) => self.drop_default(column),
            AlterItem::SetColumnVisible { column, .. } => self.require_column(column),
            AlterItem::SetIndexVisible { index, visible } => self.set_index_visible(index, *visible),
            AlterItem::TableOptions(options) => {
                self.apply_options(options);
                Ok(())
            }
            AlterItem::RemovePartitioning => {
                self.table.partitions.clear();
                Ok(())
            }
            AlterItem::RenameTable(_) | AlterItem::Partition(_) | AlterItem::Other => Ok(()),
        }
    }

    /// Adds one element of a `CREATE TABLE` list.
    ///
    /// # Errors
    ///
    /// See [`Self::add_column`] and [`Self::add_constraint`].
    pub fn add_element(&mut self, element: &TableElement) -> Result<(), Conflict> {
        match element {
            TableElement::Column(column) => self.add_column(column, None),
            TableElement::Constraint(constraint) => self.add_constraint(constraint),
        }
    }
}

/// Keeps the entries whose flag is set. Empty lists stay empty.
fn retain_flagged<T: Clone>(values: &mut Vec<T>, keep: &[bool]) {
    if values.is_empty() {
        return;
    }
    *values = values
        .iter()
        .zip(keep)
        .filter(|(_, keep)| **keep)
        .map(|(value, _)| value.clone())
        .collect();
}

/// Builds a table from a `CREATE TABLE` with an element list. Partitions
/// are left to the caller.
///
/// # Errors
///
/// Returns the first conflicting element.
pub fn build_table(create: &CreateTable, strict: bool) -> Result<TableMetadata, ElementConflict> {
    let mut table = TableMetadata::new(&create.name.name.value);
    let mut editor = TableEditor::new(&mut table, strict);
    for element in &create.elements {
        editor.add_element(element).map_err(|conflict| ElementConflict {
            conflict,
            span: element.span(),
        })?;
    }
    editor.apply_options(&create.options);
    Ok(table)
}

/// Column character sets and collations equal to the table's are
/// implied, and the printers leave them out.
pub fn drop_inherited_character_sets(table: &mut TableMetadata) {
    for column in &mut table.columns {
        if !table.charset.is_empty() && column.character_set.eq_ignore_ascii_case(&table.charset) {
            column.character_set.clear();
        }
        if !table.collation.is_empty() && column.collation.eq_ignore_ascii_case(&table.collation) {
            column.collation.clear();
        }
    }
}

/// Splits `text` on commas outside parentheses and quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

fn is_plain_identifier(text: &str) -> bool {
    let inner = text
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text);
    !inner.is_empty()
        && !inner.chars().all(|c| c.is_ascii_digit())
        && inner.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Backticks plain identifiers in a partition expression; other pieces
/// are kept as written.
#[must_use]
pub fn normalize_partition_expression(expression: &str) -> String {
    split_top_level(expression)
        .into_iter()
        .map(|piece| {
            if is_plain_identifier(piece) {
                format!("`{}`", piece.trim_matches('`'))
            } else {
                piece.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_partition_value(value: &str) -> String {
    split_top_level(value)
        .into_iter()
        .map(|piece| piece.replace('`', ""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Most partitions, subpartitions included, MySQL allows on one table.
pub const MAX_PARTITIONS: u64 = 8192;

fn check_partition_total(clause: &PartitionClause) -> Result<(), SchemaError> {
    let partitions = if clause.definitions.is_empty() {
        clause.count.unwrap_or(1)
    } else {
        u64::try_from(clause.definitions.len()).unwrap_or(u64::MAX)
    };
    let subpartitions = clause.subpartition.as_ref().map_or(1, |spec| {
        let explicit = clause
            .definitions
            .iter()
            .map(|d| u64::try_from(d.subpartitions.len()).unwrap_or(u64::MAX))
            .max()
            .unwrap_or(0);
        if explicit > 0 {
            explicit
        } else {
            spec.count.unwrap_or(1)
        }
    });
    match partitions.checked_mul(subpartitions.max(1)) {
        Some(total) if total <= MAX_PARTITIONS => Ok(()),
        _ => Err(SchemaError::InvalidPartition(format!(
            "too many partitions (including subpartitions), at most {MAX_PARTITIONS} are allowed"
        ))),
    }
}

/// Converts a partition clause into snapshot partitions.
///
/// `PARTITIONS n` without a list yields `p0..p(n-1)` with `use_default`
/// set to `n`; `SUBPARTITIONS m` yields `<partition>sp<i>` the same way.
///
/// # Errors
///
/// Returns [`SchemaError::InvalidPartition`] when the count disagrees
/// with the explicit list, a list is missing for RANGE/LIST, or the
/// table would exceed [`MAX_PARTITIONS`].
pub fn partitions_from_clause(clause: &PartitionClause) -> Result<Vec<TablePartitionMetadata>, SchemaError> {
    let expression = normalize_partition_expression(&clause.expression);
    let needs_list = clause.partition_type.preposition().is_some();
    if needs_list && clause.definitions.is_empty() {
        return Err(SchemaError::InvalidPartition(format!(
            "{} partitioning requires a partition list",
            clause.partition_type.as_sql()
        )));
    }
    if let Some(count) = clause.count {
        let matches = usize::try_from(count).is_ok_and(|c| c == clause.definitions.len());
        if !clause.definitions.is_empty() && !matches {
            return Err(SchemaError::InvalidPartition(format!(
                "PARTITIONS {count} does not match {} partition definitions",
                clause.definitions.len()
            )));
        }
    }

    check_partition_total(clause)?;

    let use_default = if clause.definitions.is_empty() {
        clause.count.unwrap_or(1).to_string()
    } else {
        String::new()
    };
    let names: Vec<(String, Option<String>, Vec<String>)> = if clause.definitions.is_empty() {
        let count = clause.count.unwrap_or(1);
        (0..count).map(|i| (format!("p{i}"), None, Vec::new())).collect()
    } else {
        clause
            .definitions
            .iter()
            .map(|d| (d.name.clone(), d.value.clone(), d.subpartitions.clone()))
            .collect()
    };

    let partitions = names
        .into_iter()
        .map(|(name, value, explicit_subs)| {
            let subpartitions = clause.subpartition.as_ref().map_or_else(Vec::new, |spec| {
                let sub_expression = normalize_partition_expression(&spec.expression);
                if explicit_subs.is_empty() {
                    let count = spec.count.unwrap_or(1);
                    (0..count)
                        .map(|i| TablePartitionMetadata {
                            name: format!("{name}sp{i}"),
                            partition_type: spec.partition_type,
                            expression: sub_expression.clone(),
                            use_default: count.to_string(),
                            ..TablePartitionMetadata::default()
                        })
                        .collect()
                } else {
                    explicit_subs
                        .iter()
                        .map(|sub| TablePartitionMetadata {
                            name: sub.clone(),
                            partition_type: spec.partition_type,
                            expression: sub_expression.clone(),
                            ..TablePartitionMetadata::default()
                        })
                        .collect()
                }
            });
            TablePartitionMetadata {
                name,
                partition_type: clause.partition_type,
                expression: expression.clone(),
                value: value
                    .map(|v| {
                        if v.eq_ignore_ascii_case("MAXVALUE") {
                            String::from("MAXVALUE")
                        } else {
                            normalize_partition_value(&v)
                        }
                    })
                    .unwrap_or_default(),
                use_default: use_default.clone(),
                subpartitions,
            }
        })
        .collect();
    Ok(partitions)
}
