//! Design-schema reconciler.
//!
//! Brings a hand-written schema file in line with a target snapshot while
//! touching as little text as possible. Every statement is copied
//! verbatim unless the target says otherwise:
//!
//! - a `CREATE TABLE` for a table that is gone is left out, and one for a
//!   changed table is patched clause by clause, keeping the separators,
//!   comments and layout of everything that did not change. Later
//!   `ALTER TABLE`, `CREATE INDEX` and `DROP INDEX` statements on such a
//!   table are folded into it and left out;
//! - views, functions and procedures are kept, rewritten or removed
//!   together with their `DROP ... IF EXISTS` companion, their session
//!   `SET` lines and their `DELIMITER` block;
//! - target objects the file never declares are appended at the end.
//!
//! Reconciling a file against its own snapshot returns the file
//! unchanged.

use std::collections::{HashMap, HashSet};

use oxide_schema_core::diff::{diff_table, DiffAction, ObjectDiff, TableDiff};
use oxide_schema_core::model::{
    DatabaseSchemaMetadata, SchemaMetadata, TableMetadata,
};
use oxide_schema_core::{Result, SchemaError};
use regex::Regex;
use tracing::{debug, trace};

use crate::catalog::{drop_inherited_character_sets, partitions_from_clause, TableEditor};
use crate::definition::{
    get_function_definition, get_procedure_definition, get_table_definition, get_view_definition,
};
use crate::generate::check_partitions;
use crate::lexer::{Lexer, Span, TokenKind};
use crate::parser::ast::{
    CreateRoutine, CreateTable, CreateView, DropKind, DropObject, ObjectName, RoutineKind,
    Statement, TableElement,
};
use crate::parse_to_metadata::parse_to_metadata;
use crate::parser::{parse_script, ChunkKind, ParsedStatement};
use crate::render::{
    check_clause, column_clause, foreign_key_clause, index_clause, partition_clause, quote_ident,
    quote_string, TableDefaults,
};

/// What happens to one chunk of the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Decision {
    Keep,
    Skip,
    /// The whole chunk text, leading trivia and delimiter included.
    Replace(String),
}

/// Reconciles `baseline` with `target`.
///
/// # Errors
///
/// Returns a syntax error when the baseline does not parse, a structural
/// error when a baseline table is inconsistent or names another
/// database, and [`SchemaError::Unsupported`] for target partitioning
/// that cannot be printed.
pub fn get_design_schema(baseline: &str, target: &DatabaseSchemaMetadata) -> Result<String> {
    let statements = parse_script(baseline)?;
    let current = parse_to_metadata(baseline)?;
    let empty = SchemaMetadata::default();
    let schema = target.schemas.first().unwrap_or(&empty);
    let current_schema = current.schemas.first().unwrap_or(&empty);

    let mut reconciler = Reconciler::new(baseline, target, schema, current_schema, &statements)?;
    let mut decisions = Vec::with_capacity(statements.len());
    for (idx, parsed) in statements.iter().enumerate() {
        decisions.push(reconciler.decide(idx, parsed)?);
    }
    reconciler.prune_companions(&mut decisions);

    let mut out = String::with_capacity(baseline.len());
    for (parsed, decision) in statements.iter().zip(&decisions) {
        match decision {
            Decision::Keep => out.push_str(parsed.chunk.text(baseline)),
            Decision::Skip => {}
            Decision::Replace(text) => out.push_str(text),
        }
    }
    reconciler.append_missing(&mut out)?;

    debug!(
        statements = statements.len(),
        kept = decisions.iter().filter(|d| **d == Decision::Keep).count(),
        skipped = decisions.iter().filter(|d| **d == Decision::Skip).count(),
        "reconciled design schema"
    );
    Ok(out)
}

struct Reconciler<'a> {
    source: &'a str,
    target: &'a DatabaseSchemaMetadata,
    schema: &'a SchemaMetadata,
    statements: &'a [ParsedStatement],
    /// The baseline as a snapshot, later `ALTER`s included.
    current: &'a SchemaMetadata,
    /// Index of the last `CREATE VIEW` for each view; earlier ones are
    /// placeholders.
    final_views: HashMap<String, usize>,
    seen_tables: HashSet<String>,
    /// Tables whose `CREATE TABLE` was rewritten to the target or left
    /// out. Later statements about them are left out too.
    folded_tables: HashSet<String>,
    seen_views: HashSet<String>,
    seen_functions: HashSet<String>,
    seen_procedures: HashSet<String>,
    session_set: Regex,
}

impl<'a> Reconciler<'a> {
    fn new(
        source: &'a str,
        target: &'a DatabaseSchemaMetadata,
        schema: &'a SchemaMetadata,
        current: &'a SchemaMetadata,
        statements: &'a [ParsedStatement],
    ) -> Result<Self> {
        let session_set = Regex::new(
            r"(?is)^(?:/\*!\d*\s*)?SET\s+(?:SESSION\s+|@@SESSION\.|@@)?(?:character_set_client|character_set_results|collation_connection|sql_mode|time_zone)\s*=",
        )
        .map_err(|e| SchemaError::InvalidState(e.to_string()))?;

        let mut final_views = HashMap::new();
        for (idx, parsed) in statements.iter().enumerate() {
            if let Statement::CreateView(view) = &parsed.statement {
                final_views.insert(view.name.name.value.clone(), idx);
            }
        }

        Ok(Self {
            source,
            target,
            schema,
            statements,
            current,
            final_views,
            seen_tables: HashSet::new(),
            folded_tables: HashSet::new(),
            seen_views: HashSet::new(),
            seen_functions: HashSet::new(),
            seen_procedures: HashSet::new(),
            session_set,
        })
    }

    fn decide(&mut self, idx: usize, parsed: &ParsedStatement) -> Result<Decision> {
        match &parsed.statement {
            Statement::CreateTable(create) => self.reconcile_table(parsed, create),
            Statement::CreateView(view) => Ok(self.reconcile_view(idx, parsed, view)),
            Statement::CreateRoutine(routine) => Ok(self.reconcile_routine(parsed, routine)),
            Statement::DropObject(drop) => Ok(self.reconcile_drop(drop)),
            Statement::AlterTable(alter) => Ok(self.reconcile_follow_up(&alter.name)),
            Statement::CreateIndex(create) => Ok(self.reconcile_follow_up(&create.table)),
            Statement::DropIndex(drop) => Ok(self.reconcile_follow_up(&drop.table)),
            _ => Ok(Decision::Keep),
        }
    }

    /// Rebuilds the chunk around a new statement body.
    fn replace_body(&self, parsed: &ParsedStatement, body: &str) -> Decision {
        let chunk = &parsed.chunk;
        let mut text = String::new();
        text.push_str(&self.source[chunk.range.start..chunk.body.start]);
        text.push_str(body);
        text.push_str(&self.source[chunk.body.end..chunk.range.end]);
        Decision::Replace(text)
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn reconcile_table(&mut self, parsed: &ParsedStatement, create: &CreateTable) -> Result<Decision> {
        if let Some(database) = create.name.database_name() {
            if !self.target.name.is_empty() && database != self.target.name {
                return Err(SchemaError::MultipleDatabases {
                    first: self.target.name.clone(),
                    second: database.to_string(),
                });
            }
        }

        let name = &create.name.name.value;
        let Some(wanted) = self.schema.table(name) else {
            trace!(table = %name, "table is gone, leaving it out");
            self.folded_tables.insert(name.clone());
            return Ok(Decision::Skip);
        };
        if !self.seen_tables.insert(name.clone()) {
            return Ok(Decision::Keep);
        }
        let unchanged = self
            .current
            .table(name)
            .is_some_and(|current| diff_table("", current, wanted).is_none());
        if unchanged {
            return Ok(Decision::Keep);
        }
        let Some(elements_span) = create.elements_span else {
            trace!(table = %name, "table has no element list, keeping it as written");
            return Ok(Decision::Keep);
        };

        let (baseline, owners) = baseline_table(create)?;
        self.folded_tables.insert(name.clone());
        let Some(diff) = diff_table("", &baseline, wanted) else {
            trace!(table = %name, "table definition already matches, dropping later changes");
            return Ok(Decision::Keep);
        };
        check_partitions(wanted)?;
        trace!(
            table = %name,
            columns = diff.column_changes.len(),
            indexes = diff.index_changes.len(),
            foreign_keys = diff.foreign_key_changes.len(),
            checks = diff.check_constraint_changes.len(),
            "patching table"
        );

        let surgery = TableSurgery {
            source: self.source,
            create,
            elements_span,
            owners: &owners,
            wanted,
            diff: &diff,
        };
        let body = parsed.chunk.body;
        let mut text = String::from(&self.source[body.start..elements_span.start]);
        text.push_str(&surgery.elements());
        text.push_str(&surgery.tail(body.end)?);
        Ok(self.replace_body(parsed, &text))
    }

    /// `ALTER TABLE`, `CREATE INDEX` and `DROP INDEX` after a rewritten
    /// `CREATE TABLE` are already part of it.
    fn reconcile_follow_up(&self, table: &ObjectName) -> Decision {
        if self.folded_tables.contains(&table.name.value) {
            trace!(table = %table.name.value, "folded into the table definition");
            Decision::Skip
        } else {
            Decision::Keep
        }
    }

    // ========================================================================
    // Views and routines
    // ========================================================================

    fn reconcile_view(&mut self, idx: usize, parsed: &ParsedStatement, view: &CreateView) -> Decision {
        let name = &view.name.name.value;
        let Some(wanted) = self.schema.view(name) else {
            trace!(view = %name, "view is gone, leaving it out");
            return Decision::Skip;
        };
        self.seen_views.insert(name.clone());
        if self.final_views.get(name) != Some(&idx)
            || wanted.definition.trim() == view.definition.trim()
        {
            return Decision::Keep;
        }

        trace!(view = %name, "rewriting view definition");
        let definition = wanted.definition.trim().trim_end_matches(';');
        let body = parsed.chunk.body_text(self.source);
        match body.strip_suffix(view.definition.as_str()) {
            Some(head) => self.replace_body(parsed, &format!("{head}{definition}")),
            None => self.replace_body(
                parsed,
                &format!(
                    "CREATE OR REPLACE VIEW {} AS {definition}",
                    quote_ident(name)
                ),
            ),
        }
    }

    fn reconcile_routine(&mut self, parsed: &ParsedStatement, routine: &CreateRoutine) -> Decision {
        let name = &routine.name.name.value;
        let wanted = match routine.kind {
            RoutineKind::Function => {
                self.seen_functions.insert(name.clone());
                self.schema
                    .functions
                    .iter()
                    .find(|f| &f.name == name)
                    .map(|f| f.definition.as_str())
            }
            RoutineKind::Procedure => {
                self.seen_procedures.insert(name.clone());
                self.schema
                    .procedures
                    .iter()
                    .find(|p| &p.name == name)
                    .map(|p| p.definition.as_str())
            }
            RoutineKind::Event => return Decision::Keep,
        };

        match wanted {
            None => {
                trace!(routine = %name, "routine is gone, leaving it out");
                Decision::Skip
            }
            Some(definition) if definition.trim() == routine.definition.trim() => Decision::Keep,
            Some(definition) => {
                trace!(routine = %name, "rewriting routine");
                self.replace_body(parsed, definition.trim().trim_end_matches(';'))
            }
        }
    }

    /// `DROP ... IF EXISTS` companions go with the objects they precede.
    fn reconcile_drop(&self, drop: &DropObject) -> Decision {
        let present = |name: &str| match drop.kind {
            DropKind::View => Some(self.schema.view(name).is_some()),
            DropKind::Function => Some(self.schema.functions.iter().any(|f| f.name == name)),
            DropKind::Procedure => Some(self.schema.procedures.iter().any(|p| p.name == name)),
            DropKind::Event | DropKind::Trigger => None,
        };
        let all_gone = drop
            .names
            .iter()
            .all(|n| present(&n.name.value) == Some(false));
        if drop.if_exists && all_gone && !drop.names.is_empty() {
            Decision::Skip
        } else {
            Decision::Keep
        }
    }

    // ========================================================================
    // Companion cleanup
    // ========================================================================

    fn delimiter_argument(&self, parsed: &ParsedStatement) -> Option<String> {
        (parsed.chunk.kind == ChunkKind::Delimiter).then(|| {
            parsed
                .chunk
                .body_text(self.source)
                .split_whitespace()
                .nth(1)
                .unwrap_or_default()
                .to_string()
        })
    }

    fn is_session_set(&self, parsed: &ParsedStatement) -> bool {
        parsed.chunk.kind == ChunkKind::Sql
            && parsed.statement == Statement::Other
            && self.session_set.is_match(parsed.chunk.body_text(self.source))
    }

    /// Drops `DELIMITER` blocks left empty and the session `SET` lines in
    /// front of removed routines.
    fn prune_companions(&self, decisions: &mut [Decision]) {
        let statements = self.statements;
        let mut i = 0;
        while i < statements.len() {
            let opens_block = self
                .delimiter_argument(&statements[i])
                .is_some_and(|d| !d.is_empty() && d != ";");
            if !opens_block {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            let mut has_sql = false;
            let mut all_skipped = true;
            while j < statements.len() && statements[j].chunk.kind != ChunkKind::Delimiter {
                if statements[j].chunk.kind == ChunkKind::Sql {
                    has_sql = true;
                    all_skipped &= decisions[j] == Decision::Skip;
                }
                j += 1;
            }
            if j < statements.len() && has_sql && all_skipped {
                decisions[i] = Decision::Skip;
                decisions[j] = Decision::Skip;
            }
            i = j;
        }

        for j in 0..statements.len() {
            let removed_routine = decisions[j] == Decision::Skip
                && matches!(
                    &statements[j].statement,
                    Statement::CreateRoutine(r) if r.kind != RoutineKind::Event
                );
            if !removed_routine {
                continue;
            }
            let mut k = j;
            while k > 0 {
                k -= 1;
                if self.is_session_set(&statements[k]) {
                    decisions[k] = Decision::Skip;
                } else if decisions[k] != Decision::Skip {
                    break;
                }
            }
        }
    }

    // ========================================================================
    // New objects
    // ========================================================================

    fn append_missing(&self, out: &mut String) -> Result<()> {
        let mut extra = String::new();
        for table in &self.schema.tables {
            if !self.seen_tables.contains(&table.name) {
                extra.push_str(&get_table_definition(table)?);
            }
        }
        for view in &self.schema.views {
            if !self.seen_views.contains(&view.name) {
                extra.push_str(&get_view_definition(view));
            }
        }
        for function in &self.schema.functions {
            if !self.seen_functions.contains(&function.name) {
                extra.push_str(&get_function_definition(function));
            }
        }
        for procedure in &self.schema.procedures {
            if !self.seen_procedures.contains(&procedure.name) {
                extra.push_str(&get_procedure_definition(procedure));
            }
        }
        if extra.is_empty() {
            return Ok(());
        }
        if !out.is_empty() {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.ends_with("\n\n") {
                out.push('\n');
            }
        }
        out.push_str(&extra);
        Ok(())
    }
}

// ============================================================================
// Table surgery
// ============================================================================

/// Objects a `CREATE TABLE` element declared.
#[derive(Debug, Default)]
struct Owned {
    column: Option<String>,
    indexes: Vec<String>,
    foreign_keys: Vec<String>,
    checks: Vec<String>,
}

/// Builds the baseline table the way the snapshot parser does, noting
/// which objects each element declared.
fn baseline_table(create: &CreateTable) -> Result<(TableMetadata, Vec<Owned>)> {
    let name = &create.name.name.value;
    let mut table = TableMetadata::new(name);
    let mut owners = Vec::with_capacity(create.elements.len());
    {
        let mut editor = TableEditor::new(&mut table, false);
        for element in &create.elements {
            let before = editor.table();
            let (indexes, foreign_keys, checks) = (
                before.indexes.len(),
                before.foreign_keys.len(),
                before.check_constraints.len(),
            );
            editor
                .add_element(element)
                .map_err(|conflict| conflict.into_error(name))?;
            let after = editor.table();
            owners.push(Owned {
                column: match element {
                    TableElement::Column(column) => Some(column.name.value.clone()),
                    TableElement::Constraint(_) => None,
                },
                indexes: after.indexes[indexes..].iter().map(|i| i.name.clone()).collect(),
                foreign_keys: after.foreign_keys[foreign_keys..]
                    .iter()
                    .map(|f| f.name.clone())
                    .collect(),
                checks: after.check_constraints[checks..]
                    .iter()
                    .map(|c| c.name.clone())
                    .collect(),
            });
        }
        editor.apply_options(&create.options);
    }
    if let Some(partition) = &create.partition {
        table.partitions = partitions_from_clause(partition)?;
    }
    drop_inherited_character_sets(&mut table);
    table.renumber_columns();
    Ok((table, owners))
}

/// Names removed (or replaced) and names added by a list of changes.
struct NameChanges {
    dropped: HashSet<String>,
    altered: HashSet<String>,
}

impl NameChanges {
    fn of<T>(changes: &[ObjectDiff<T>], name: impl Fn(&T) -> &str) -> Self {
        let mut dropped = HashSet::new();
        let mut altered = HashSet::new();
        for change in changes {
            match (change.action, &change.old) {
                (DiffAction::Drop, Some(old)) => {
                    dropped.insert(name(old).to_string());
                }
                (DiffAction::Alter, Some(old)) => {
                    altered.insert(name(old).to_string());
                }
                _ => {}
            }
        }
        Self { dropped, altered }
    }

    fn touches(&self, name: &str) -> bool {
        self.dropped.contains(name) || self.altered.contains(name)
    }
}

/// One element of the rebuilt list.
struct Piece {
    /// Text between the separating comma and the element.
    lead: String,
    text: String,
    /// Text between the element and the next comma.
    tail: String,
    column: Option<String>,
}

struct TableSurgery<'a> {
    source: &'a str,
    create: &'a CreateTable,
    elements_span: Span,
    owners: &'a [Owned],
    wanted: &'a TableMetadata,
    diff: &'a TableDiff,
}

impl TableSurgery<'_> {
    /// Splits the baseline gaps around commas: `(lead, tail)` per element
    /// plus the text before `)`.
    fn separators(&self) -> (Vec<String>, Vec<String>, String) {
        let elements = &self.create.elements;
        let mut leads = Vec::with_capacity(elements.len());
        let mut tails = vec![String::new(); elements.len()];
        let mut previous_end = self.elements_span.start + 1;
        for (i, element) in elements.iter().enumerate() {
            let gap = &self.source[previous_end..element.span().start];
            if i == 0 {
                leads.push(gap.to_string());
            } else {
                let comma = Lexer::new(gap)
                    .tokenize()
                    .into_iter()
                    .find(|t| t.kind == TokenKind::Comma);
                match comma {
                    Some(comma) => {
                        tails[i - 1] = gap[..comma.span.start].to_string();
                        leads.push(gap[comma.span.end..].to_string());
                    }
                    None => leads.push(gap.to_string()),
                }
            }
            previous_end = element.span().end;
        }
        let closing = self.source[previous_end..self.elements_span.end - 1].to_string();
        (leads, tails, closing)
    }

    fn default_lead(leads: &[String]) -> String {
        let plain = |s: &&String| s.chars().all(char::is_whitespace) && !s.is_empty();
        leads
            .get(1)
            .filter(plain)
            .or_else(|| leads.first().filter(plain))
            .cloned()
            .unwrap_or_else(|| String::from("\n  "))
    }

    /// The rebuilt `( ... )` element list.
    fn elements(&self) -> String {
        let (leads, tails, closing) = self.separators();
        let default_lead = Self::default_lead(&leads);
        let defaults = TableDefaults::of(self.wanted);

        let columns = NameChanges::of(&self.diff.column_changes, |c| c.name.as_str());
        let indexes = NameChanges::of(&self.diff.index_changes, |i| i.name.as_str());
        let foreign_keys = NameChanges::of(&self.diff.foreign_key_changes, |f| f.name.as_str());
        let checks = NameChanges::of(&self.diff.check_constraint_changes, |c| c.name.as_str());

        let mut handled = Handled::default();
        let mut pieces: Vec<Piece> = Vec::new();

        for (i, (element, owned)) in self.create.elements.iter().zip(self.owners).enumerate() {
            let baseline_piece = |text: String, column: Option<String>| Piece {
                lead: leads[i].clone(),
                text,
                tail: tails[i].clone(),
                column,
            };
            let verbatim = element.span().text(self.source).to_string();
            let owned_touched = owned.indexes.iter().any(|n| indexes.touches(n))
                || owned.foreign_keys.iter().any(|n| foreign_keys.touches(n))
                || owned.checks.iter().any(|n| checks.touches(n));

            if let Some(name) = &owned.column {
                let Some(column) = self.wanted.column(name) else {
                    continue;
                };
                handled.columns.insert(column.name.clone());
                if columns.touches(name) || owned_touched {
                    pieces.push(baseline_piece(
                        column_clause(column, defaults),
                        Some(name.clone()),
                    ));
                } else {
                    handled.claim(owned);
                    pieces.push(baseline_piece(verbatim, Some(name.clone())));
                }
                continue;
            }

            if !owned_touched {
                handled.claim(owned);
                pieces.push(baseline_piece(verbatim, None));
                continue;
            }

            let replacement = if let Some(index) = owned.indexes.first() {
                self.wanted.index(index).map(|wanted| {
                    handled.indexes.insert(wanted.name.clone());
                    index_clause(wanted)
                })
            } else if let Some(fk) = owned.foreign_keys.first() {
                self.wanted.foreign_keys.iter().find(|f| &f.name == fk).map(|wanted| {
                    handled.foreign_keys.insert(wanted.name.clone());
                    foreign_key_clause(wanted)
                })
            } else {
                owned.checks.first().and_then(|check| {
                    self.wanted
                        .check_constraints
                        .iter()
                        .find(|c| &c.name == check)
                        .map(|wanted| {
                            handled.checks.insert(wanted.name.clone());
                            check_clause(wanted)
                        })
                })
            };
            if let Some(text) = replacement {
                pieces.push(baseline_piece(text, None));
            }
        }

        // New columns go right after the column that precedes them in the
        // target.
        for (position, column) in self.wanted.columns.iter().enumerate() {
            if handled.columns.contains(&column.name) {
                continue;
            }
            let after = self.wanted.columns[..position].iter().rev().find_map(|previous| {
                pieces
                    .iter()
                    .position(|p| p.column.as_deref() == Some(previous.name.as_str()))
            });
            let at = match after {
                Some(idx) => idx + 1,
                None => pieces.iter().position(|p| p.column.is_some()).unwrap_or(0),
            };
            pieces.insert(
                at,
                Piece {
                    lead: default_lead.clone(),
                    text: column_clause(column, defaults),
                    tail: String::new(),
                    column: Some(column.name.clone()),
                },
            );
            handled.columns.insert(column.name.clone());
        }

        let mut appended: Vec<String> = Vec::new();
        let mut wanted_indexes: Vec<_> = self.wanted.indexes.iter().filter(|i| i.primary).collect();
        wanted_indexes.extend(self.wanted.indexes.iter().filter(|i| !i.primary));
        for index in wanted_indexes {
            if !handled.indexes.contains(&index.name) {
                appended.push(index_clause(index));
            }
        }
        for fk in &self.wanted.foreign_keys {
            if !handled.foreign_keys.contains(&fk.name) {
                appended.push(foreign_key_clause(fk));
            }
        }
        for check in &self.wanted.check_constraints {
            if !handled.checks.contains(&check.name) {
                appended.push(check_clause(check));
            }
        }
        pieces.extend(appended.into_iter().map(|text| Piece {
            lead: default_lead.clone(),
            text,
            tail: String::new(),
            column: None,
        }));

        let mut sql = String::from("(");
        for (k, piece) in pieces.iter().enumerate() {
            if k > 0 {
                sql.push(',');
            }
            sql.push_str(&piece.lead);
            sql.push_str(&piece.text);
            if k + 1 < pieces.len() {
                sql.push_str(&piece.tail);
            }
        }
        sql.push_str(&closing);
        sql.push(')');
        sql
    }

    /// Everything after `)` up to `end`, with table options and the
    /// partition clause patched.
    fn tail(&self, end: usize) -> Result<String> {
        let start = self.elements_span.end;
        let mut edits: Vec<(Span, String)> = Vec::new();
        let options = &self.create.options;
        let insert_at = options.last().map_or(start, |o| o.span.end);

        let wanted_options = [
            ("ENGINE", self.wanted.engine.as_str(), false),
            ("CHARSET", self.wanted.charset.as_str(), false),
            ("COLLATE", self.wanted.collation.as_str(), false),
            ("COMMENT", self.wanted.comment.as_str(), true),
        ];
        for (name, wanted, exact) in wanted_options {
            let last = options.iter().enumerate().rev().find(|(_, o)| o.name == name);
            match last {
                Some((idx, option)) => {
                    let same = if exact {
                        option.value == wanted
                    } else {
                        option.value.eq_ignore_ascii_case(wanted)
                    };
                    if same {
                        continue;
                    }
                    if wanted.is_empty() {
                        let from = idx.checked_sub(1).map_or(start, |p| options[p].span.end);
                        edits.push((Span::new(from, option.span.end), String::new()));
                    } else {
                        edits.push((option.span, option_text(name, wanted)));
                    }
                }
                None if !wanted.is_empty() => {
                    edits.push((
                        Span::new(insert_at, insert_at),
                        format!(" {}", option_text(name, wanted)),
                    ));
                }
                None => {}
            }
        }

        if !self.diff.partition_changes.is_empty() {
            match &self.create.partition {
                Some(clause) if self.wanted.partitions.is_empty() => {
                    edits.push((Span::new(insert_at, clause.span.end), String::new()));
                }
                Some(clause) => {
                    edits.push((
                        clause.span,
                        partition_clause(&self.wanted.partitions)?.trim_start().to_string(),
                    ));
                }
                None => {
                    edits.push((
                        Span::new(insert_at, insert_at),
                        partition_clause(&self.wanted.partitions)?,
                    ));
                }
            }
        }

        Ok(apply_edits(self.source, start, end, edits))
    }
}

/// Target objects already present in the rebuilt list.
#[derive(Debug, Default)]
struct Handled {
    columns: HashSet<String>,
    indexes: HashSet<String>,
    foreign_keys: HashSet<String>,
    checks: HashSet<String>,
}

impl Handled {
    /// Marks everything an element kept verbatim declares.
    fn claim(&mut self, owned: &Owned) {
        self.indexes.extend(owned.indexes.iter().cloned());
        self.foreign_keys.extend(owned.foreign_keys.iter().cloned());
        self.checks.extend(owned.checks.iter().cloned());
    }
}

fn option_text(name: &str, value: &str) -> String {
    match name {
        "CHARSET" => format!("DEFAULT CHARSET={value}"),
        "COMMENT" => format!("COMMENT={}", quote_string(value)),
        _ => format!("{name}={value}"),
    }
}

/// Copies `source[start..end]`, splicing in the edits. Edits are applied
/// in start order; insertions at the same offset keep their order.
fn apply_edits(source: &str, start: usize, end: usize, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);
    let mut out = String::new();
    let mut cursor = start;
    for (span, text) in edits {
        if span.start < cursor {
            continue;
        }
        out.push_str(&source[cursor..span.start]);
        out.push_str(&text);
        cursor = span.end;
    }
    if cursor < end {
        out.push_str(&source[cursor..end]);
    }
    out
}
