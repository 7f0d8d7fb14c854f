//! Recursive descent parser for MySQL DDL.

use oxide_schema_core::model::{ColumnDefault, PartitionType};
use tracing::warn;

use super::ast::{
    AlterItem, AlterTable, AttributeKind, CheckDef, ColumnAttribute, ColumnDef, ColumnPosition,
    ConstraintKind, CreateIndex, CreateRoutine, CreateTable, CreateTrigger, CreateView,
    DataType, DatabaseStatement, DropIndex, DropKind, DropObject, DropTable, ForeignKeyDef, Ident,
    IndexDef, KeyPart, ObjectName, PartitionClause, PartitionDef, ReferenceDef, RenameTable,
    RoutineKind, Statement, SubpartitionSpec, TableConstraint, TableElement, TableOption,
};
use super::error::ParseError;
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};
use crate::render::quote_string;
use crate::types::canonical_type;

/// Table option names accepted after the element list and in
/// `ALTER TABLE`.
const TABLE_OPTIONS: &[&str] = &[
    "AUTO_INCREMENT",
    "AUTOEXTEND_SIZE",
    "AVG_ROW_LENGTH",
    "CHARACTER",
    "CHARSET",
    "CHECKSUM",
    "COLLATE",
    "COMMENT",
    "COMPRESSION",
    "CONNECTION",
    "DELAY_KEY_WRITE",
    "ENCRYPTION",
    "ENGINE",
    "ENGINE_ATTRIBUTE",
    "INSERT_METHOD",
    "KEY_BLOCK_SIZE",
    "MAX_ROWS",
    "MIN_ROWS",
    "PACK_KEYS",
    "PASSWORD",
    "ROW_FORMAT",
    "SECONDARY_ENGINE",
    "SECONDARY_ENGINE_ATTRIBUTE",
    "STATS_AUTO_RECALC",
    "STATS_PERSISTENT",
    "STATS_SAMPLE_PAGES",
    "TABLESPACE",
    "UNION",
];

/// Column flags that may follow a data type.
const TYPE_FLAGS: &[&str] = &["unsigned", "signed", "zerofill", "binary", "ascii", "unicode", "byte"];

/// MySQL DDL parser over one statement.
pub struct Parser<'a> {
    source: &'a str,
    /// All tokens of the statement, trivia included, ending with EOF.
    tokens: Vec<Token>,
    /// Index of the current significant token.
    pos: usize,
    /// Index of the last consumed significant token.
    prev: Option<usize>,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a single statement.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let tokens = Lexer::new(source).tokenize();
        Self::with_tokens(source, tokens)
    }

    /// Creates a parser over a slice of a script's token stream. Spans
    /// stay absolute offsets into `source`.
    #[must_use]
    pub fn from_tokens(source: &'a str, tokens: &[Token]) -> Self {
        let end = tokens.last().map_or(0, |t| t.span.end);
        let mut owned: Vec<Token> = tokens.iter().filter(|t| !t.is_eof()).cloned().collect();
        owned.push(Token::new(TokenKind::Eof, Span::new(end, end)));
        Self::with_tokens(source, owned)
    }

    fn with_tokens(source: &'a str, tokens: Vec<Token>) -> Self {
        let mut parser = Self {
            source,
            tokens,
            pos: 0,
            prev: None,
        };
        parser.skip_trivia();
        parser
    }

    /// Parses the statement.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if a recognized DDL statement is malformed.
    /// Statements the engine does not interpret parse as
    /// [`Statement::Other`].
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match self.current().as_keyword() {
            Some(Keyword::Create) => self.parse_create()?,
            Some(Keyword::Alter) => self.parse_alter()?,
            Some(Keyword::Drop) => self.parse_drop()?,
            Some(Keyword::Rename) => self.parse_rename()?,
            Some(Keyword::Use) => {
                self.advance();
                Statement::Use(self.parse_ident()?)
            }
            _ => {
                self.consume_rest();
                Statement::Other
            }
        };
        self.expect_end()?;
        Ok(statement)
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    fn parse_create(&mut self) -> Result<Statement, ParseError> {
        let create_start = self.current().span.start;
        self.expect_keyword(Keyword::Create)?;

        let mut or_replace = false;
        let mut temporary = false;
        let mut index_modifier = None;
        loop {
            if self.eat_keyword(Keyword::Or) {
                self.expect_keyword(Keyword::Replace)?;
                or_replace = true;
            } else if self.eat_keyword(Keyword::Algorithm) {
                self.eat(&TokenKind::Eq);
                self.parse_word()?;
            } else if self.eat_keyword(Keyword::Definer) {
                self.eat(&TokenKind::Eq);
                self.skip_user()?;
            } else if self.eat_keyword(Keyword::Sql) {
                self.expect_keyword(Keyword::Security)?;
                self.parse_word()?;
            } else if self.eat_keyword(Keyword::Temporary) {
                temporary = true;
            } else if self.check_word("AGGREGATE") || self.check_word("ONLINE") {
                self.advance();
            } else if self.check_keyword(Keyword::Unique)
                || self.check_keyword(Keyword::Fulltext)
                || self.check_keyword(Keyword::Spatial)
            {
                index_modifier = Some(self.parse_word()?.to_ascii_uppercase());
            } else {
                break;
            }
        }

        match self.current().as_keyword() {
            Some(Keyword::Table) => Ok(Statement::CreateTable(self.parse_create_table(temporary)?)),
            Some(Keyword::View) => Ok(Statement::CreateView(self.parse_create_view(or_replace)?)),
            Some(Keyword::Index) => Ok(Statement::CreateIndex(self.parse_create_index(index_modifier)?)),
            Some(Keyword::Database | Keyword::Schema) => {
                Ok(Statement::CreateDatabase(self.parse_database_statement()?))
            }
            Some(Keyword::Function) => {
                Ok(Statement::CreateRoutine(self.parse_create_routine(RoutineKind::Function, create_start)?))
            }
            Some(Keyword::Procedure) => {
                Ok(Statement::CreateRoutine(self.parse_create_routine(RoutineKind::Procedure, create_start)?))
            }
            Some(Keyword::Event) => {
                Ok(Statement::CreateRoutine(self.parse_create_routine(RoutineKind::Event, create_start)?))
            }
            Some(Keyword::Trigger) => Ok(Statement::CreateTrigger(self.parse_create_trigger()?)),
            _ => {
                self.consume_rest();
                Ok(Statement::Other)
            }
        }
    }

    fn parse_create_table(&mut self, temporary: bool) -> Result<CreateTable, ParseError> {
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;

        let mut table = CreateTable {
            temporary,
            if_not_exists,
            name,
            elements_span: None,
            elements: Vec::new(),
            options: Vec::new(),
            partition: None,
            like: None,
            as_select: false,
        };

        if self.eat_keyword(Keyword::Like) {
            table.like = Some(self.parse_object_name()?);
            return Ok(table);
        }

        if self.check(&TokenKind::LeftParen) {
            if self.nth(1).is_keyword(Keyword::Like) {
                self.advance();
                self.advance();
                table.like = Some(self.parse_object_name()?);
                self.expect(&TokenKind::RightParen, ")")?;
                return Ok(table);
            }
            if self.nth(1).is_keyword(Keyword::Select) {
                table.as_select = true;
                self.consume_rest();
                return Ok(table);
            }
            let open = self.advance().span;
            loop {
                table.elements.push(self.parse_table_element()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            let close = self.expect(&TokenKind::RightParen, ")")?;
            table.elements_span = Some(open.merge(close));
        }

        table.options = self.parse_table_options()?;

        if self.check_keyword(Keyword::Partition) {
            table.partition = Some(self.parse_partition_clause()?);
        }

        if !self.eat_word("IGNORE") {
            self.eat_keyword(Keyword::Replace);
        }
        if self.eat_keyword(Keyword::As)
            || self.check_keyword(Keyword::Select)
            || self.check(&TokenKind::LeftParen)
        {
            table.as_select = true;
            self.consume_rest();
        }

        Ok(table)
    }

    fn is_constraint_start(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Key
                    | Keyword::Index
                    | Keyword::Fulltext
                    | Keyword::Spatial
                    | Keyword::Foreign
                    | Keyword::Check
            )
        )
    }

    fn parse_table_element(&mut self) -> Result<TableElement, ParseError> {
        if self.is_constraint_start() {
            Ok(TableElement::Constraint(self.parse_table_constraint()?))
        } else {
            Ok(TableElement::Column(self.parse_column_def()?))
        }
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Parses `name data_type [attribute ...]`.
    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let start = self.current().span.start;
        let name = self.parse_ident()?;
        let data_type = self.parse_data_type()?;
        let mut attributes = Vec::new();
        while !self.at_column_end() {
            attributes.push(self.parse_column_attribute()?);
        }
        Ok(ColumnDef {
            name,
            data_type,
            attributes,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn at_column_end(&self) -> bool {
        self.check(&TokenKind::Comma)
            || self.check(&TokenKind::RightParen)
            || self.at_end()
            || self.check_keyword(Keyword::First)
            || self.check_keyword(Keyword::After)
    }

    fn is_attribute_start(&self) -> bool {
        matches!(
            self.current().as_keyword(),
            Some(
                Keyword::Not
                    | Keyword::Null
                    | Keyword::Default
                    | Keyword::On
                    | Keyword::AutoIncrement
                    | Keyword::Unique
                    | Keyword::Primary
                    | Keyword::Key
                    | Keyword::Comment
                    | Keyword::Collate
                    | Keyword::Character
                    | Keyword::Charset
                    | Keyword::ColumnFormat
                    | Keyword::Storage
                    | Keyword::Visible
                    | Keyword::Invisible
                    | Keyword::Generated
                    | Keyword::Constraint
                    | Keyword::Check
                    | Keyword::References
                    | Keyword::Srid
                    | Keyword::Secondary
                    | Keyword::Serial
            )
        )
    }

    fn parse_data_type(&mut self) -> Result<DataType, ParseError> {
        let start = self.current().span.start;
        let mut base = self.parse_word()?.to_ascii_lowercase();

        let second = match base.as_str() {
            "double" => Some(&["precision"][..]),
            "character" | "char" => Some(&["varying"][..]),
            "national" => Some(&["char", "character", "varchar"][..]),
            "long" => Some(&["varchar", "varbinary"][..]),
            _ => None,
        };
        if let Some(words) = second {
            if let Some(word) = words.iter().find(|w| self.check_word(w)) {
                base = format!("{base} {word}");
                self.advance();
                if base.starts_with("national char") && self.eat_word("varying") {
                    base.push_str(" varying");
                }
            }
        }

        let args = if self.check(&TokenKind::LeftParen) {
            Some(self.parse_type_args()?)
        } else {
            None
        };

        let mut flags = Vec::new();
        while let Some(flag) = TYPE_FLAGS.iter().find(|f| self.check_word(f)) {
            flags.push(*flag);
            self.advance();
        }

        Ok(DataType {
            text: canonical_type(&base, args.as_deref(), &flags),
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Parses `(a, b, ...)` of a data type into `a,b,...`, lower-cased
    /// outside string literals.
    fn parse_type_args(&mut self) -> Result<String, ParseError> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut args = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        loop {
            let token = self.current().clone();
            match &token.kind {
                TokenKind::Eof => return Err(self.error_here(")")),
                TokenKind::RightParen if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::LeftParen => {
                    depth += 1;
                    current.push('(');
                }
                TokenKind::RightParen => {
                    depth -= 1;
                    current.push(')');
                }
                TokenKind::Comma if depth == 0 => args.push(std::mem::take(&mut current)),
                TokenKind::String(value) => current.push_str(&quote_string(value)),
                _ => current.push_str(&self.token_text(&token).to_ascii_lowercase()),
            }
            self.advance();
        }
        args.push(current);
        Ok(args.join(","))
    }

    fn parse_column_attribute(&mut self) -> Result<ColumnAttribute, ParseError> {
        let start = self.current().span.start;
        let mut value_span = Span::default();

        let kind = match self.current().as_keyword() {
            Some(Keyword::Not) => {
                self.advance();
                if self.eat_keyword(Keyword::Null) {
                    AttributeKind::NotNull
                } else {
                    self.expect_keyword(Keyword::Enforced)?;
                    AttributeKind::Enforced(false)
                }
            }
            Some(Keyword::Null) => {
                self.advance();
                AttributeKind::Null
            }
            Some(Keyword::Default) => {
                self.advance();
                let value_start = self.current().span.start;
                let default = self.parse_default_value()?;
                value_span = Span::new(value_start, self.prev_end());
                AttributeKind::Default(default)
            }
            Some(Keyword::On) => {
                self.advance();
                self.expect_keyword(Keyword::Update)?;
                let value_start = self.current().span.start;
                self.parse_word()?;
                if self.check(&TokenKind::LeftParen) {
                    self.skip_group()?;
                }
                value_span = Span::new(value_start, self.prev_end());
                AttributeKind::OnUpdate(value_span.text(self.source).to_string())
            }
            Some(Keyword::AutoIncrement) => {
                self.advance();
                AttributeKind::AutoIncrement
            }
            Some(Keyword::Unique) => {
                self.advance();
                self.eat_keyword(Keyword::Key);
                AttributeKind::Unique
            }
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                AttributeKind::PrimaryKey
            }
            Some(Keyword::Key) => {
                self.advance();
                AttributeKind::PrimaryKey
            }
            Some(Keyword::Comment) => {
                self.advance();
                value_span = self.current().span;
                AttributeKind::Comment(self.parse_string()?)
            }
            Some(Keyword::Collate) => {
                self.advance();
                self.eat(&TokenKind::Eq);
                AttributeKind::Collate(self.parse_word()?)
            }
            Some(Keyword::Character) => {
                self.advance();
                self.expect_keyword(Keyword::Set)?;
                AttributeKind::CharacterSet(self.parse_word()?)
            }
            Some(Keyword::Charset) => {
                self.advance();
                AttributeKind::CharacterSet(self.parse_word()?)
            }
            Some(Keyword::ColumnFormat) => {
                self.advance();
                AttributeKind::ColumnFormat(self.parse_word()?.to_ascii_uppercase())
            }
            Some(Keyword::Storage) => {
                self.advance();
                AttributeKind::Storage(self.parse_word()?.to_ascii_uppercase())
            }
            Some(Keyword::Visible) => {
                self.advance();
                AttributeKind::Visible(true)
            }
            Some(Keyword::Invisible) => {
                self.advance();
                AttributeKind::Visible(false)
            }
            Some(Keyword::Generated | Keyword::As) => {
                if self.eat_keyword(Keyword::Generated) {
                    self.expect_keyword(Keyword::Always)?;
                }
                self.expect_keyword(Keyword::As)?;
                let expression = self.parse_group_text()?;
                let stored = if self.eat_keyword(Keyword::Stored) {
                    true
                } else {
                    self.eat_keyword(Keyword::Virtual);
                    false
                };
                AttributeKind::Generated { expression, stored }
            }
            Some(Keyword::Constraint | Keyword::Check) => {
                let name = if self.eat_keyword(Keyword::Constraint) && !self.check_keyword(Keyword::Check) {
                    Some(self.parse_ident()?.value)
                } else {
                    None
                };
                AttributeKind::Check(self.parse_check_body(name)?)
            }
            Some(Keyword::Enforced) => {
                self.advance();
                AttributeKind::Enforced(true)
            }
            Some(Keyword::References) => AttributeKind::References(self.parse_reference()?),
            Some(Keyword::Srid) => {
                self.advance();
                AttributeKind::Srid(self.parse_word()?)
            }
            Some(Keyword::Secondary) => {
                self.advance();
                AttributeKind::Secondary
            }
            Some(Keyword::Serial) => {
                self.advance();
                self.expect_keyword(Keyword::Default)?;
                self.expect_keyword(Keyword::Value)?;
                AttributeKind::SerialDefaultValue
            }
            _ => return Err(self.error_here("column attribute")),
        };

        Ok(ColumnAttribute {
            kind,
            span: Span::new(start, self.prev_end()),
            value_span,
        })
    }

    /// Classifies a default by its lexical shape: `NULL`, a lone string
    /// literal, or anything else as expression text.
    fn parse_default_value(&mut self) -> Result<ColumnDefault, ParseError> {
        let start = self.current().span.start;
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(ColumnDefault::Null)
            }
            TokenKind::String(value) => {
                self.advance();
                if self.at_column_end() || self.is_attribute_start() {
                    return Ok(ColumnDefault::Value(value.clone()));
                }
                while !(self.at_column_end() || self.is_attribute_start()) {
                    self.advance();
                }
                let text = self.text(start, self.prev_end());
                warn!(default = text, "string literal followed by more tokens in DEFAULT, keeping as expression");
                Ok(ColumnDefault::Expression(text.to_string()))
            }
            TokenKind::LeftParen => {
                let span = self.skip_group()?;
                Ok(ColumnDefault::Expression(span.text(self.source).to_string()))
            }
            TokenKind::Plus | TokenKind::Minus => {
                self.advance();
                match self.current().kind {
                    TokenKind::Number(_) => {
                        self.advance();
                        Ok(ColumnDefault::Expression(self.text(start, self.prev_end()).to_string()))
                    }
                    _ => Err(self.error_here("number")),
                }
            }
            TokenKind::Number(_) | TokenKind::BinaryString(_) => {
                self.advance();
                Ok(ColumnDefault::Expression(self.token_text(&token).to_string()))
            }
            _ if token.is_name() => {
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    self.skip_group()?;
                } else if matches!(self.current().kind, TokenKind::String(_)) {
                    // Character set introducer, `_utf8mb4'x'`.
                    self.advance();
                }
                Ok(ColumnDefault::Expression(self.text(start, self.prev_end()).to_string()))
            }
            _ => Err(self.error_here("default value")),
        }
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    fn parse_table_constraint(&mut self) -> Result<TableConstraint, ParseError> {
        let start = self.current().span.start;
        let symbol = if self.eat_keyword(Keyword::Constraint) {
            if self.current().is_name()
                && !matches!(
                    self.current().as_keyword(),
                    Some(Keyword::Primary | Keyword::Unique | Keyword::Foreign | Keyword::Check)
                )
            {
                Some(self.parse_ident()?)
            } else {
                None
            }
        } else {
            None
        };

        let kind = match self.current().as_keyword() {
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                ConstraintKind::PrimaryKey(self.parse_index_body(false)?)
            }
            Some(Keyword::Unique) => {
                self.advance();
                if !self.eat_keyword(Keyword::Key) {
                    self.eat_keyword(Keyword::Index);
                }
                ConstraintKind::Unique(self.parse_index_body(true)?)
            }
            Some(Keyword::Key | Keyword::Index) => {
                self.advance();
                ConstraintKind::Index(self.parse_index_body(true)?)
            }
            Some(Keyword::Fulltext) => {
                self.advance();
                if !self.eat_keyword(Keyword::Key) {
                    self.eat_keyword(Keyword::Index);
                }
                ConstraintKind::Fulltext(self.parse_index_body(true)?)
            }
            Some(Keyword::Spatial) => {
                self.advance();
                if !self.eat_keyword(Keyword::Key) {
                    self.eat_keyword(Keyword::Index);
                }
                ConstraintKind::Spatial(self.parse_index_body(true)?)
            }
            Some(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                let index_name = if self.current().is_name() {
                    Some(self.parse_ident()?)
                } else {
                    None
                };
                let columns = self.parse_name_list()?;
                let reference = self.parse_reference()?;
                ConstraintKind::ForeignKey(ForeignKeyDef {
                    index_name,
                    columns,
                    reference,
                })
            }
            Some(Keyword::Check) => {
                let name = symbol.as_ref().map(|s| s.value.clone());
                ConstraintKind::Check(self.parse_check_body(name)?)
            }
            _ => return Err(self.error_here("PRIMARY, UNIQUE, KEY, INDEX, FOREIGN or CHECK")),
        };

        Ok(TableConstraint {
            symbol,
            kind,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// Parses `[name] [USING type] (key_parts) [options]`.
    fn parse_index_body(&mut self, allow_name: bool) -> Result<IndexDef, ParseError> {
        let mut index = IndexDef {
            visible: true,
            ..IndexDef::default()
        };
        if allow_name && self.current().is_name() && !self.check_keyword(Keyword::Using) {
            index.name = Some(self.parse_ident()?);
        }
        if self.eat_keyword(Keyword::Using) {
            index.using = Some(self.parse_word()?.to_ascii_uppercase());
        }
        index.keys = self.parse_key_parts()?;
        self.parse_index_options(&mut index)?;
        Ok(index)
    }

    fn parse_key_parts(&mut self) -> Result<Vec<KeyPart>, ParseError> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut parts = Vec::new();
        loop {
            let is_expression = self.check(&TokenKind::LeftParen);
            let expression = if is_expression {
                self.skip_group()?.text(self.source).to_string()
            } else {
                self.parse_ident()?.value
            };
            let length = if !is_expression && self.eat(&TokenKind::LeftParen) {
                let length = self.parse_integer()?;
                self.expect(&TokenKind::RightParen, ")")?;
                Some(length)
            } else {
                None
            };
            let descending = if self.eat_keyword(Keyword::Desc) {
                true
            } else {
                self.eat_keyword(Keyword::Asc);
                false
            };
            parts.push(KeyPart {
                expression,
                length,
                descending,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(parts)
    }

    fn parse_index_options(&mut self, index: &mut IndexDef) -> Result<(), ParseError> {
        loop {
            if self.eat_keyword(Keyword::Using) {
                index.using = Some(self.parse_word()?.to_ascii_uppercase());
            } else if self.eat_keyword(Keyword::Comment) {
                index.comment = Some(self.parse_string()?);
            } else if self.eat_keyword(Keyword::Visible) {
                index.visible = true;
            } else if self.eat_keyword(Keyword::Invisible) {
                index.visible = false;
            } else if self.eat_keyword(Keyword::With) {
                self.eat_word("PARSER");
                self.parse_word()?;
            } else if self.eat_word("KEY_BLOCK_SIZE")
                || self.eat_word("ENGINE_ATTRIBUTE")
                || self.eat_word("SECONDARY_ENGINE_ATTRIBUTE")
            {
                self.eat(&TokenKind::Eq);
                self.parse_option_value()?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_reference(&mut self) -> Result<ReferenceDef, ParseError> {
        self.expect_keyword(Keyword::References)?;
        let table = self.parse_object_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        let mut reference = ReferenceDef {
            table,
            columns,
            on_delete: None,
            on_update: None,
        };
        loop {
            if self.eat_word("MATCH") {
                self.parse_word()?;
            } else if self.check_keyword(Keyword::On) && self.nth(1).is_keyword(Keyword::Delete) {
                self.advance();
                self.advance();
                reference.on_delete = Some(self.parse_referential_action()?);
            } else if self.check_keyword(Keyword::On) && self.nth(1).is_keyword(Keyword::Update) {
                self.advance();
                self.advance();
                reference.on_update = Some(self.parse_referential_action()?);
            } else {
                return Ok(reference);
            }
        }
    }

    fn parse_referential_action(&mut self) -> Result<String, ParseError> {
        if self.eat_keyword(Keyword::Restrict) {
            Ok(String::from("RESTRICT"))
        } else if self.eat_keyword(Keyword::Cascade) {
            Ok(String::from("CASCADE"))
        } else if self.eat_keyword(Keyword::Set) {
            if self.eat_keyword(Keyword::Null) {
                Ok(String::from("SET NULL"))
            } else {
                self.expect_keyword(Keyword::Default)?;
                Ok(String::from("SET DEFAULT"))
            }
        } else if self.eat_keyword(Keyword::No) {
            self.expect_keyword(Keyword::Action)?;
            Ok(String::from("NO ACTION"))
        } else {
            Err(self.error_here("RESTRICT, CASCADE, SET NULL, SET DEFAULT or NO ACTION"))
        }
    }

    /// Parses `CHECK (expr) [[NOT] ENFORCED]`.
    fn parse_check_body(&mut self, name: Option<String>) -> Result<CheckDef, ParseError> {
        self.expect_keyword(Keyword::Check)?;
        let expression = self.parse_group_text()?;
        let enforced = if self.check_keyword(Keyword::Not) && self.nth(1).is_keyword(Keyword::Enforced) {
            self.advance();
            self.advance();
            false
        } else {
            self.eat_keyword(Keyword::Enforced);
            true
        };
        Ok(CheckDef {
            name,
            expression,
            enforced,
        })
    }

    // ========================================================================
    // Table options and partitions
    // ========================================================================

    fn option_starts_at(&self, n: usize) -> bool {
        let token = self.nth(n);
        if !token.is_name() || matches!(token.kind, TokenKind::QuotedIdentifier(_)) {
            return false;
        }
        let word = self.token_text(token).to_ascii_uppercase();
        match word.as_str() {
            "DEFAULT" => {
                let next = self.token_text(self.nth(n + 1)).to_ascii_uppercase();
                matches!(next.as_str(), "CHARSET" | "CHARACTER" | "COLLATE" | "ENCRYPTION")
            }
            "DATA" | "INDEX" => self.token_text(self.nth(n + 1)).eq_ignore_ascii_case("DIRECTORY"),
            "STORAGE" => true,
            _ => TABLE_OPTIONS.contains(&word.as_str()),
        }
    }

    fn parse_table_options(&mut self) -> Result<Vec<TableOption>, ParseError> {
        let mut options = Vec::new();
        loop {
            if !self.option_starts_at(0) {
                if self.check(&TokenKind::Comma) && self.option_starts_at(1) {
                    self.advance();
                    continue;
                }
                return Ok(options);
            }
            options.push(self.parse_table_option()?);
        }
    }

    fn parse_table_option(&mut self) -> Result<TableOption, ParseError> {
        let start = self.current().span.start;
        self.eat_keyword(Keyword::Default);
        let mut name = self.parse_word()?.to_ascii_uppercase();
        match name.as_str() {
            "CHARACTER" => {
                self.expect_keyword(Keyword::Set)?;
                name = String::from("CHARSET");
            }
            "DATA" | "INDEX" => {
                self.parse_word()?;
                name.push_str(" DIRECTORY");
            }
            "STORAGE" => {
                if self.eat_keyword(Keyword::Engine) {
                    name = String::from("ENGINE");
                }
            }
            _ => {}
        }
        self.eat(&TokenKind::Eq);
        let value = if name == "STORAGE" {
            self.parse_word()?
        } else {
            self.parse_option_value()?
        };
        Ok(TableOption {
            name,
            value,
            span: Span::new(start, self.prev_end()),
        })
    }

    /// A single option value: a string (unquoted), a word, a number or a
    /// parenthesized list kept as written.
    fn parse_option_value(&mut self) -> Result<String, ParseError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::String(value) => {
                self.advance();
                Ok(value.clone())
            }
            TokenKind::LeftParen => Ok(self.skip_group()?.text(self.source).to_string()),
            TokenKind::Number(_) | TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                self.advance();
                Ok(self.token_text(&token).to_string())
            }
            TokenKind::QuotedIdentifier(value) => {
                self.advance();
                Ok(value.clone())
            }
            _ => Err(self.error_here("option value")),
        }
    }

    fn parse_partition_clause(&mut self) -> Result<PartitionClause, ParseError> {
        let start = self.conditional_start_before(self.pos).unwrap_or(self.current().span.start);
        self.expect_keyword(Keyword::Partition)?;
        self.expect_keyword(Keyword::By)?;
        let (partition_type, expression) = self.parse_partition_type()?;
        let count = if self.eat_keyword(Keyword::Partitions) {
            Some(self.parse_count()?)
        } else {
            None
        };

        let subpartition = if self.eat_keyword(Keyword::Subpartition) {
            self.expect_keyword(Keyword::By)?;
            let (partition_type, expression) = self.parse_partition_type()?;
            let count = if self.eat_keyword(Keyword::Subpartitions) {
                Some(self.parse_count()?)
            } else {
                None
            };
            Some(SubpartitionSpec {
                partition_type,
                expression,
                count,
            })
        } else {
            None
        };

        let definitions = if self.check(&TokenKind::LeftParen) {
            self.parse_partition_definitions()?
        } else {
            Vec::new()
        };

        let end = self
            .conditional_end_after_prev()
            .unwrap_or_else(|| self.prev_end());
        Ok(PartitionClause {
            partition_type,
            expression,
            count,
            subpartition,
            definitions,
            span: Span::new(start, end),
        })
    }

    fn parse_partition_type(&mut self) -> Result<(PartitionType, String), ParseError> {
        let linear = self.eat_keyword(Keyword::Linear);
        if self.eat_keyword(Keyword::Hash) {
            let ty = if linear {
                PartitionType::LinearHash
            } else {
                PartitionType::Hash
            };
            return Ok((ty, self.parse_group_text()?));
        }
        if self.eat_keyword(Keyword::Key) {
            if self.eat_keyword(Keyword::Algorithm) {
                self.eat(&TokenKind::Eq);
                self.parse_word()?;
            }
            let ty = if linear {
                PartitionType::LinearKey
            } else {
                PartitionType::Key
            };
            return Ok((ty, self.parse_group_text()?));
        }
        if !linear && self.eat_keyword(Keyword::Range) {
            let ty = if self.eat_keyword(Keyword::Columns) {
                PartitionType::RangeColumns
            } else {
                PartitionType::Range
            };
            return Ok((ty, self.parse_group_text()?));
        }
        if !linear && self.eat_keyword(Keyword::List) {
            let ty = if self.eat_keyword(Keyword::Columns) {
                PartitionType::ListColumns
            } else {
                PartitionType::List
            };
            return Ok((ty, self.parse_group_text()?));
        }
        Err(self.error_here("HASH, KEY, RANGE or LIST"))
    }

    fn parse_partition_definitions(&mut self) -> Result<Vec<PartitionDef>, ParseError> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut definitions = Vec::new();
        loop {
            self.expect_keyword(Keyword::Partition)?;
            let name = self.parse_ident()?.value;
            let value = if self.eat_keyword(Keyword::Values) {
                if self.eat_keyword(Keyword::Less) {
                    self.expect_keyword(Keyword::Than)?;
                    if self.eat_keyword(Keyword::Maxvalue) {
                        Some(String::from("MAXVALUE"))
                    } else {
                        Some(self.parse_group_text()?)
                    }
                } else {
                    self.expect_keyword(Keyword::In)?;
                    Some(self.parse_group_text()?)
                }
            } else {
                None
            };
            self.skip_partition_options();

            let mut subpartitions = Vec::new();
            if self.eat(&TokenKind::LeftParen) {
                loop {
                    self.expect_keyword(Keyword::Subpartition)?;
                    subpartitions.push(self.parse_ident()?.value);
                    self.skip_partition_options();
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightParen, ")")?;
            }

            definitions.push(PartitionDef {
                name,
                value,
                subpartitions,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(definitions)
    }

    /// Skips `ENGINE = x`, `COMMENT = 'y'` and similar partition options.
    fn skip_partition_options(&mut self) {
        while !(self.at_end()
            || self.check(&TokenKind::Comma)
            || self.check(&TokenKind::LeftParen)
            || self.check(&TokenKind::RightParen))
        {
            self.advance();
        }
    }

    fn parse_count(&mut self) -> Result<u64, ParseError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Number(text) => {
                self.advance();
                text.parse()
                    .map_err(|_| ParseError::new(format!("Invalid count: {text}"), token.span))
            }
            _ => Err(self.error_here("number")),
        }
    }

    // ========================================================================
    // Views, routines, triggers, indexes, databases
    // ========================================================================

    fn parse_create_view(&mut self, or_replace: bool) -> Result<CreateView, ParseError> {
        self.expect_keyword(Keyword::View)?;
        let name = self.parse_object_name()?;
        let columns = if self.check(&TokenKind::LeftParen) {
            self.parse_name_list()?
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::As)?;
        let definition = self.rest_text().to_string();
        self.consume_rest();
        Ok(CreateView {
            or_replace,
            name,
            columns,
            definition,
        })
    }

    fn parse_create_routine(
        &mut self,
        kind: RoutineKind,
        create_start: usize,
    ) -> Result<CreateRoutine, ParseError> {
        self.advance();
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        let end = self.statement_end();
        let definition = self.text(create_start, end).to_string();
        self.consume_rest();
        Ok(CreateRoutine {
            kind,
            if_not_exists,
            name,
            definition,
        })
    }

    fn parse_create_trigger(&mut self) -> Result<CreateTrigger, ParseError> {
        self.expect_keyword(Keyword::Trigger)?;
        self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        let timing = if self.eat_keyword(Keyword::Before) {
            String::from("BEFORE")
        } else {
            self.expect_keyword(Keyword::After)?;
            String::from("AFTER")
        };
        let event = match self.current().as_keyword() {
            Some(kw @ (Keyword::Insert | Keyword::Update | Keyword::Delete)) => {
                self.advance();
                kw.as_str().to_string()
            }
            _ => return Err(self.error_here("INSERT, UPDATE or DELETE")),
        };
        self.expect_keyword(Keyword::On)?;
        let table = self.parse_object_name()?;
        self.expect_keyword(Keyword::For)?;
        self.expect_keyword(Keyword::Each)?;
        self.expect_keyword(Keyword::Row)?;
        if self.eat_keyword(Keyword::Follows) || self.eat_keyword(Keyword::Precedes) {
            self.parse_ident()?;
        }
        let body = self.rest_text().to_string();
        self.consume_rest();
        Ok(CreateTrigger {
            name,
            timing,
            event,
            table,
            body,
        })
    }

    fn parse_create_index(&mut self, modifier: Option<String>) -> Result<CreateIndex, ParseError> {
        self.expect_keyword(Keyword::Index)?;
        let mut index = IndexDef {
            name: Some(self.parse_ident()?),
            visible: true,
            ..IndexDef::default()
        };
        if self.eat_keyword(Keyword::Using) {
            index.using = Some(self.parse_word()?.to_ascii_uppercase());
        }
        self.expect_keyword(Keyword::On)?;
        let table = self.parse_object_name()?;
        index.keys = self.parse_key_parts()?;
        self.parse_index_options(&mut index)?;
        // ALGORITHM / LOCK clauses.
        self.consume_rest();
        Ok(CreateIndex {
            modifier,
            index,
            table,
        })
    }

    fn parse_database_statement(&mut self) -> Result<DatabaseStatement, ParseError> {
        self.advance(); // DATABASE | SCHEMA
        let if_exists = if self.check_keyword(Keyword::If) {
            self.advance();
            self.eat_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };
        let name = if self.current().is_name() && !self.option_starts_at(0) {
            self.parse_ident()?
        } else {
            Ident {
                value: String::new(),
                span: Span::new(self.current().span.start, self.current().span.start),
            }
        };
        let mut statement = DatabaseStatement {
            name,
            if_exists,
            charset: None,
            collation: None,
        };
        while self.option_starts_at(0) {
            let option = self.parse_table_option()?;
            match option.name.as_str() {
                "CHARSET" => statement.charset = Some(option.value),
                "COLLATE" => statement.collation = Some(option.value),
                _ => {}
            }
        }
        self.consume_rest();
        Ok(statement)
    }

    // ========================================================================
    // ALTER
    // ========================================================================

    fn parse_alter(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Alter)?;
        if self.check_keyword(Keyword::Database) || self.check_keyword(Keyword::Schema) {
            return Ok(Statement::AlterDatabase(self.parse_database_statement()?));
        }
        while self.eat_word("ONLINE") || self.eat_word("IGNORE") {}
        if !self.eat_keyword(Keyword::Table) {
            self.consume_rest();
            return Ok(Statement::Other);
        }
        let name = self.parse_object_name()?;
        let mut items = Vec::new();
        while !self.at_end() {
            items.push(self.parse_alter_item()?);
            self.eat(&TokenKind::Comma);
        }
        Ok(Statement::AlterTable(AlterTable { name, items }))
    }

    fn parse_alter_item(&mut self) -> Result<AlterItem, ParseError> {
        if self.option_starts_at(0) {
            return Ok(AlterItem::TableOptions(self.parse_table_options()?));
        }
        if self.check_keyword(Keyword::Partition) {
            return Ok(AlterItem::Partition(self.parse_partition_clause()?));
        }
        match self.current().as_keyword() {
            Some(Keyword::Add) => {
                self.advance();
                if self.check_keyword(Keyword::Partition) {
                    self.skip_alter_item();
                    return Ok(AlterItem::Other);
                }
                let explicit_column = self.eat_keyword(Keyword::Column);
                if !explicit_column && self.is_constraint_start() {
                    return Ok(AlterItem::AddConstraint(self.parse_table_constraint()?));
                }
                if self.eat(&TokenKind::LeftParen) {
                    let mut columns = Vec::new();
                    loop {
                        columns.push(self.parse_column_def()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RightParen, ")")?;
                    return Ok(AlterItem::AddColumns {
                        columns,
                        position: None,
                    });
                }
                let column = self.parse_column_def()?;
                let position = self.parse_column_position()?;
                Ok(AlterItem::AddColumns {
                    columns: vec![column],
                    position,
                })
            }
            Some(Keyword::Drop) => {
                self.advance();
                self.parse_alter_drop()
            }
            Some(Keyword::Modify) => {
                self.advance();
                self.eat_keyword(Keyword::Column);
                let column = self.parse_column_def()?;
                let position = self.parse_column_position()?;
                Ok(AlterItem::ModifyColumn { column, position })
            }
            Some(Keyword::Change) => {
                self.advance();
                self.eat_keyword(Keyword::Column);
                let old_name = self.parse_ident()?.value;
                let column = self.parse_column_def()?;
                let position = self.parse_column_position()?;
                Ok(AlterItem::ChangeColumn {
                    old_name,
                    column,
                    position,
                })
            }
            Some(Keyword::Rename) => {
                self.advance();
                if self.eat_keyword(Keyword::Column) {
                    let old_name = self.parse_ident()?.value;
                    self.expect_keyword(Keyword::To)?;
                    let new_name = self.parse_ident()?.value;
                    return Ok(AlterItem::RenameColumn { old_name, new_name });
                }
                if self.eat_keyword(Keyword::Index) || self.eat_keyword(Keyword::Key) {
                    let old_name = self.parse_ident()?.value;
                    self.expect_keyword(Keyword::To)?;
                    let new_name = self.parse_ident()?.value;
                    return Ok(AlterItem::RenameIndex { old_name, new_name });
                }
                if !self.eat_keyword(Keyword::To) {
                    self.eat_keyword(Keyword::As);
                }
                Ok(AlterItem::RenameTable(self.parse_object_name()?))
            }
            Some(Keyword::Alter) => {
                self.advance();
                self.parse_alter_alter()
            }
            Some(Keyword::Remove) => {
                self.advance();
                self.expect_keyword(Keyword::Partitioning)?;
                Ok(AlterItem::RemovePartitioning)
            }
            _ => {
                self.skip_alter_item();
                Ok(AlterItem::Other)
            }
        }
    }

    fn parse_alter_drop(&mut self) -> Result<AlterItem, ParseError> {
        match self.current().as_keyword() {
            Some(Keyword::Index | Keyword::Key) => {
                self.advance();
                Ok(AlterItem::DropIndex(self.parse_ident()?.value))
            }
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                Ok(AlterItem::DropPrimaryKey)
            }
            Some(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                Ok(AlterItem::DropForeignKey(self.parse_ident()?.value))
            }
            Some(Keyword::Check) => {
                self.advance();
                Ok(AlterItem::DropCheck(self.parse_ident()?.value))
            }
            Some(Keyword::Constraint) => {
                self.advance();
                Ok(AlterItem::DropConstraint(self.parse_ident()?.value))
            }
            Some(Keyword::Partition) => {
                self.skip_alter_item();
                Ok(AlterItem::Other)
            }
            _ => {
                self.eat_keyword(Keyword::Column);
                let name = self.parse_ident()?.value;
                self.eat_keyword(Keyword::Restrict);
                self.eat_keyword(Keyword::Cascade);
                Ok(AlterItem::DropColumn(name))
            }
        }
    }

    /// `ALTER [COLUMN] c ...` and `ALTER INDEX i ...`.
    fn parse_alter_alter(&mut self) -> Result<AlterItem, ParseError> {
        if self.eat_keyword(Keyword::Index) {
            let index = self.parse_ident()?.value;
            let visible = if self.eat_keyword(Keyword::Visible) {
                true
            } else {
                self.expect_keyword(Keyword::Invisible)?;
                false
            };
            return Ok(AlterItem::SetIndexVisible { index, visible });
        }
        if self.check_keyword(Keyword::Check) || self.check_keyword(Keyword::Constraint) {
            self.skip_alter_item();
            return Ok(AlterItem::Other);
        }
        self.eat_keyword(Keyword::Column);
        let column = self.parse_ident()?.value;
        if self.eat_keyword(Keyword::Set) {
            if self.eat_keyword(Keyword::Default) {
                let default = self.parse_default_value()?;
                return Ok(AlterItem::SetDefault { column, default });
            }
            let visible = if self.eat_keyword(Keyword::Visible) {
                true
            } else {
                self.expect_keyword(Keyword::Invisible)?;
                false
            };
            return Ok(AlterItem::SetColumnVisible { column, visible });
        }
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Default)?;
        Ok(AlterItem::DropDefault(column))
    }

    fn parse_column_position(&mut self) -> Result<Option<ColumnPosition>, ParseError> {
        if self.eat_keyword(Keyword::First) {
            return Ok(Some(ColumnPosition::First));
        }
        if self.eat_keyword(Keyword::After) {
            return Ok(Some(ColumnPosition::After(self.parse_ident()?.value)));
        }
        Ok(None)
    }

    fn skip_alter_item(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current().kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth = depth.saturating_sub(1),
                TokenKind::Comma if depth == 0 => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ========================================================================
    // DROP / RENAME
    // ========================================================================

    fn parse_drop(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Drop)?;
        let temporary = self.eat_keyword(Keyword::Temporary);
        let kind = match self.current().as_keyword() {
            Some(Keyword::Table) => {
                self.advance();
                let if_exists = self.parse_if_exists()?;
                let tables = self.parse_object_name_list()?;
                self.eat_keyword(Keyword::Restrict);
                self.eat_keyword(Keyword::Cascade);
                return Ok(Statement::DropTable(DropTable {
                    temporary,
                    if_exists,
                    tables,
                }));
            }
            Some(Keyword::Index) => {
                self.advance();
                let name = self.parse_ident()?;
                self.expect_keyword(Keyword::On)?;
                let table = self.parse_object_name()?;
                self.consume_rest();
                return Ok(Statement::DropIndex(DropIndex { name, table }));
            }
            Some(Keyword::Database | Keyword::Schema) => {
                return Ok(Statement::DropDatabase(self.parse_database_statement()?));
            }
            Some(Keyword::View) => DropKind::View,
            Some(Keyword::Function) => DropKind::Function,
            Some(Keyword::Procedure) => DropKind::Procedure,
            Some(Keyword::Event) => DropKind::Event,
            Some(Keyword::Trigger) => DropKind::Trigger,
            _ => {
                self.consume_rest();
                return Ok(Statement::Other);
            }
        };
        self.advance();
        let if_exists = self.parse_if_exists()?;
        let names = self.parse_object_name_list()?;
        self.eat_keyword(Keyword::Restrict);
        self.eat_keyword(Keyword::Cascade);
        Ok(Statement::DropObject(DropObject {
            kind,
            if_exists,
            names,
        }))
    }

    fn parse_rename(&mut self) -> Result<Statement, ParseError> {
        self.expect_keyword(Keyword::Rename)?;
        if !self.eat_keyword(Keyword::Table) {
            self.consume_rest();
            return Ok(Statement::Other);
        }
        let mut pairs = Vec::new();
        loop {
            let from = self.parse_object_name()?;
            self.expect_keyword(Keyword::To)?;
            let to = self.parse_object_name()?;
            pairs.push((from, to));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Statement::RenameTable(RenameTable { pairs }))
    }

    // ========================================================================
    // Shared pieces
    // ========================================================================

    fn parse_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if self.eat_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_if_exists(&mut self) -> Result<bool, ParseError> {
        if self.eat_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_ident(&mut self) -> Result<Ident, ParseError> {
        let token = self.current().clone();
        let value = match &token.kind {
            TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => name.clone(),
            TokenKind::Keyword(_) => self.token_text(&token).to_string(),
            _ => return Err(self.error_here("identifier")),
        };
        self.advance();
        Ok(Ident {
            value,
            span: token.span,
        })
    }

    fn parse_object_name(&mut self) -> Result<ObjectName, ParseError> {
        let first = self.parse_ident()?;
        if self.eat(&TokenKind::Dot) {
            let name = self.parse_ident()?;
            Ok(ObjectName {
                database: Some(first),
                name,
            })
        } else {
            Ok(ObjectName {
                database: None,
                name: first,
            })
        }
    }

    fn parse_object_name_list(&mut self) -> Result<Vec<ObjectName>, ParseError> {
        let mut names = vec![self.parse_object_name()?];
        while self.eat(&TokenKind::Comma) {
            names.push(self.parse_object_name()?);
        }
        Ok(names)
    }

    /// Parses `(a, b, ...)` into names.
    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&TokenKind::LeftParen, "(")?;
        let mut names = Vec::new();
        loop {
            names.push(self.parse_ident()?.value);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, ")")?;
        Ok(names)
    }

    /// A bare word: identifier, keyword or number text as written.
    fn parse_word(&mut self) -> Result<String, ParseError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::QuotedIdentifier(value) | TokenKind::String(value) => {
                self.advance();
                Ok(value.clone())
            }
            TokenKind::Identifier(_) | TokenKind::Keyword(_) | TokenKind::Number(_) => {
                self.advance();
                Ok(self.token_text(&token).to_string())
            }
            _ => Err(self.error_here("identifier")),
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here("string literal")),
        }
    }

    fn parse_integer(&mut self) -> Result<i64, ParseError> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Number(text) => {
                self.advance();
                text.parse()
                    .map_err(|_| ParseError::new(format!("Invalid integer: {text}"), token.span))
            }
            _ => Err(self.error_here("integer")),
        }
    }

    /// `'user'@'host'`, `user@host` or `CURRENT_USER[()]`.
    fn skip_user(&mut self) -> Result<(), ParseError> {
        self.parse_word()?;
        if matches!(self.current().kind, TokenKind::Variable(_)) {
            self.advance();
        } else if self.check(&TokenKind::LeftParen) {
            self.skip_group()?;
        }
        Ok(())
    }

    /// Consumes a parenthesized group and returns its span, parentheses
    /// included.
    fn skip_group(&mut self) -> Result<Span, ParseError> {
        let open = self.expect(&TokenKind::LeftParen, "(")?;
        let mut depth = 1usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => return Err(self.error_here(")")),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        let close = self.advance().span;
                        return Ok(open.merge(close));
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Consumes a parenthesized group and returns the trimmed text inside.
    fn parse_group_text(&mut self) -> Result<String, ParseError> {
        let span = self.skip_group()?;
        Ok(self
            .text(span.start + 1, span.end - 1)
            .trim()
            .to_string())
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    fn skip_trivia(&mut self) {
        while self.pos + 1 < self.tokens.len() && self.tokens[self.pos].is_trivia() {
            self.pos += 1;
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// The `n`-th significant token from the current one.
    fn nth(&self, n: usize) -> &Token {
        let mut seen = 0;
        for token in &self.tokens[self.pos..] {
            if token.is_trivia() {
                continue;
            }
            if seen == n || token.is_eof() {
                return token;
            }
            seen += 1;
        }
        &self.tokens[self.tokens.len() - 1]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !token.is_eof() {
            self.prev = Some(self.pos);
            self.pos += 1;
            self.skip_trivia();
        }
        token
    }

    fn prev_end(&self) -> usize {
        self.prev
            .map_or(self.current().span.start, |i| self.tokens[i].span.end)
    }

    fn at_end(&self) -> bool {
        self.current().is_eof()
    }

    fn consume_rest(&mut self) {
        while !self.at_end() {
            self.advance();
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error_here("end of statement"))
        }
    }

    /// End offset of the last significant token, ignoring trailing
    /// semicolons.
    fn statement_end(&self) -> usize {
        self.tokens
            .iter()
            .rev()
            .find(|t| !t.is_trivia() && !t.is_eof() && t.kind != TokenKind::Semicolon)
            .map_or(self.current().span.start, |t| t.span.end)
    }

    /// Text from the current token to the end of the statement.
    fn rest_text(&self) -> &'a str {
        let start = self.current().span.start;
        let end = self.statement_end().max(start);
        self.text(start, end).trim()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Span, ParseError> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(expected))
        }
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span, ParseError> {
        if self.check_keyword(keyword) {
            Ok(self.advance().span)
        } else {
            Err(self.error_here(keyword.as_str()))
        }
    }

    /// True if the current token is the unquoted word `word`.
    fn check_word(&self, word: &str) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Identifier(_) | TokenKind::Keyword(_)
        ) && self.token_text(self.current()).eq_ignore_ascii_case(word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn token_text(&self, token: &Token) -> &'a str {
        token.span.text(self.source)
    }

    fn text(&self, start: usize, end: usize) -> &'a str {
        self.source.get(start..end).unwrap_or("")
    }

    /// Start of a `/*!NNNNN` marker directly before token `index`.
    fn conditional_start_before(&self, index: usize) -> Option<usize> {
        self.tokens[..index]
            .iter()
            .rev()
            .take_while(|t| t.is_trivia())
            .find(|t| matches!(t.kind, TokenKind::ConditionalStart(_)))
            .map(|t| t.span.start)
    }

    /// End of a `*/` version-comment terminator directly after the last
    /// consumed token.
    fn conditional_end_after_prev(&self) -> Option<usize> {
        let prev = self.prev?;
        self.tokens[prev + 1..]
            .iter()
            .take_while(|t| t.is_trivia())
            .find(|t| t.kind == TokenKind::ConditionalEnd)
            .map(|t| t.span.end)
    }

    fn error_here(&self, expected: &str) -> ParseError {
        ParseError::unexpected(expected, self.current().kind.clone(), self.current().span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Statement {
        Parser::new(sql).parse_statement().unwrap()
    }

    fn create_table(sql: &str) -> CreateTable {
        match parse(sql) {
            Statement::CreateTable(table) => table,
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    fn column(table: &CreateTable, idx: usize) -> &ColumnDef {
        match &table.elements[idx] {
            TableElement::Column(column) => column,
            other => panic!("expected column, got {other:?}"),
        }
    }

    #[test]
    fn test_create_table_columns() {
        let sql = "CREATE TABLE IF NOT EXISTS `db`.`users` (\n  `id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT,\n  `name` VARCHAR(64) DEFAULT 'x' COMMENT 'it''s',\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";
        let table = create_table(sql);
        assert!(table.if_not_exists);
        assert_eq!(table.name.database_name(), Some("db"));
        assert_eq!(table.name.name.value, "users");
        assert_eq!(table.elements.len(), 3);

        let id = column(&table, 0);
        assert_eq!(id.data_type.text, "int(11) unsigned");
        assert_eq!(id.data_type.span.text(sql), "INT(11) UNSIGNED");
        assert_eq!(id.attributes[0].kind, AttributeKind::NotNull);
        assert_eq!(id.attributes[1].kind, AttributeKind::AutoIncrement);
        assert_eq!(id.span.text(sql), "`id` INT(11) UNSIGNED NOT NULL AUTO_INCREMENT");

        let name = column(&table, 1);
        assert_eq!(
            name.attributes[0].kind,
            AttributeKind::Default(ColumnDefault::Value("x".into()))
        );
        assert_eq!(name.attributes[0].value_span.text(sql), "'x'");
        assert_eq!(name.attributes[1].kind, AttributeKind::Comment("it's".into()));

        assert_eq!(table.options.len(), 2);
        assert_eq!(table.options[0].name, "ENGINE");
        assert_eq!(table.options[0].value, "InnoDB");
        assert_eq!(table.options[1].name, "CHARSET");
        assert_eq!(table.options[1].span.text(sql), "DEFAULT CHARSET=utf8mb4");
        let span = table.elements_span.unwrap();
        assert!(span.text(sql).starts_with('(') && span.text(sql).ends_with(')'));
    }

    #[test]
    fn test_default_classification() {
        let table = create_table(
            "CREATE TABLE t (a INT DEFAULT NULL, b INT DEFAULT -1, c TIMESTAMP DEFAULT CURRENT_TIMESTAMP(3), d JSON DEFAULT (json_array()), e VARCHAR(3) DEFAULT 'a' 'b', f VARCHAR(3) DEFAULT 'a' || 'b' NOT NULL)",
        );
        let defaults: Vec<_> = table
            .elements
            .iter()
            .map(|e| match e {
                TableElement::Column(c) => c.attributes[0].kind.clone(),
                TableElement::Constraint(_) => unreachable!(),
            })
            .collect();
        assert_eq!(defaults[0], AttributeKind::Default(ColumnDefault::Null));
        assert_eq!(defaults[1], AttributeKind::Default(ColumnDefault::Expression("-1".into())));
        assert_eq!(
            defaults[2],
            AttributeKind::Default(ColumnDefault::Expression("CURRENT_TIMESTAMP(3)".into()))
        );
        assert_eq!(
            defaults[3],
            AttributeKind::Default(ColumnDefault::Expression("(json_array())".into()))
        );
        assert_eq!(
            defaults[4],
            AttributeKind::Default(ColumnDefault::Expression("'a' 'b'".into()))
        );
        assert_eq!(
            defaults[5],
            AttributeKind::Default(ColumnDefault::Expression("'a' || 'b'".into()))
        );
    }

    #[test]
    fn test_constraints() {
        let table = create_table(
            "CREATE TABLE t (a INT, b INT, UNIQUE KEY uk_a (a), KEY (b DESC, (a + b)), CONSTRAINT fk FOREIGN KEY (a) REFERENCES p (id) ON DELETE CASCADE, CONSTRAINT c1 CHECK (a > 0) NOT ENFORCED, FULLTEXT KEY ft (b) COMMENT 'x')",
        );
        let kinds: Vec<_> = table
            .elements
            .iter()
            .filter_map(|e| match e {
                TableElement::Constraint(c) => Some(c),
                TableElement::Column(_) => None,
            })
            .collect();
        assert_eq!(kinds.len(), 5);
        match &kinds[0].kind {
            ConstraintKind::Unique(index) => {
                assert_eq!(index.name.as_ref().unwrap().value, "uk_a");
            }
            other => panic!("{other:?}"),
        }
        match &kinds[1].kind {
            ConstraintKind::Index(index) => {
                assert!(index.name.is_none());
                assert!(index.keys[0].descending);
                assert_eq!(index.keys[1].expression, "(a + b)");
            }
            other => panic!("{other:?}"),
        }
        match &kinds[2].kind {
            ConstraintKind::ForeignKey(fk) => {
                assert_eq!(kinds[2].symbol.as_ref().unwrap().value, "fk");
                assert_eq!(fk.columns, vec!["a"]);
                assert_eq!(fk.reference.table.name.value, "p");
                assert_eq!(fk.reference.on_delete.as_deref(), Some("CASCADE"));
            }
            other => panic!("{other:?}"),
        }
        match &kinds[3].kind {
            ConstraintKind::Check(check) => {
                assert_eq!(check.name.as_deref(), Some("c1"));
                assert_eq!(check.expression, "a > 0");
                assert!(!check.enforced);
            }
            other => panic!("{other:?}"),
        }
        match &kinds[4].kind {
            ConstraintKind::Fulltext(index) => {
                assert_eq!(index.comment.as_deref(), Some("x"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_partition_clause_span_includes_version_comment() {
        let sql = "CREATE TABLE t (id INT) ENGINE=InnoDB\n/*!50100 PARTITION BY RANGE (id)\n(PARTITION p0 VALUES LESS THAN (10) ENGINE = InnoDB,\n PARTITION p1 VALUES LESS THAN MAXVALUE ENGINE = InnoDB) */";
        let table = create_table(sql);
        let partition = table.partition.unwrap();
        assert_eq!(partition.partition_type, PartitionType::Range);
        assert_eq!(partition.expression, "id");
        assert_eq!(partition.definitions.len(), 2);
        assert_eq!(partition.definitions[0].value.as_deref(), Some("10"));
        assert_eq!(partition.definitions[1].value.as_deref(), Some("MAXVALUE"));
        assert!(partition.span.text(sql).starts_with("/*!50100"));
        assert!(partition.span.text(sql).ends_with("*/"));
    }

    #[test]
    fn test_hash_partitions_with_subpartitions() {
        let table = create_table(
            "CREATE TABLE t (id INT, d DATE) PARTITION BY RANGE (year(d)) SUBPARTITION BY LINEAR KEY (id) SUBPARTITIONS 2 (PARTITION p0 VALUES LESS THAN (1990), PARTITION p1 VALUES LESS THAN MAXVALUE)",
        );
        let partition = table.partition.unwrap();
        assert_eq!(partition.expression, "year(d)");
        let sub = partition.subpartition.unwrap();
        assert_eq!(sub.partition_type, PartitionType::LinearKey);
        assert_eq!(sub.count, Some(2));
    }

    #[test]
    fn test_generated_and_check_attributes() {
        let table = create_table(
            "CREATE TABLE t (a INT, b INT GENERATED ALWAYS AS (a * 2) STORED, c INT CONSTRAINT ck CHECK (c > 0))",
        );
        let b = column(&table, 1);
        assert_eq!(
            b.attributes[0].kind,
            AttributeKind::Generated {
                expression: "a * 2".into(),
                stored: true
            }
        );
        let c = column(&table, 2);
        match &c.attributes[0].kind {
            AttributeKind::Check(check) => assert_eq!(check.name.as_deref(), Some("ck")),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_create_table_like_and_as_select() {
        let like = create_table("CREATE TABLE t2 LIKE t1");
        assert_eq!(like.like.unwrap().name.value, "t1");
        let select = create_table("CREATE TABLE t2 AS SELECT * FROM t1");
        assert!(select.as_select);
    }

    #[test]
    fn test_create_view_and_routines() {
        match parse("CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `v` AS select 1 AS `a`") {
            Statement::CreateView(view) => {
                assert_eq!(view.name.name.value, "v");
                assert_eq!(view.definition, "select 1 AS `a`");
            }
            other => panic!("{other:?}"),
        }
        let sql = "CREATE DEFINER=`root`@`%` FUNCTION `f`(x INT) RETURNS int\nBEGIN RETURN x; END";
        match parse(sql) {
            Statement::CreateRoutine(routine) => {
                assert_eq!(routine.kind, RoutineKind::Function);
                assert_eq!(routine.name.name.value, "f");
                assert_eq!(routine.definition, sql);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_create_trigger() {
        match parse("CREATE TRIGGER trg BEFORE INSERT ON t FOR EACH ROW SET NEW.a = 1") {
            Statement::CreateTrigger(trigger) => {
                assert_eq!(trigger.timing, "BEFORE");
                assert_eq!(trigger.event, "INSERT");
                assert_eq!(trigger.table.name.value, "t");
                assert_eq!(trigger.body, "SET NEW.a = 1");
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_alter_table_items() {
        let statement = parse(
            "ALTER TABLE t ADD COLUMN c INT NOT NULL AFTER b, DROP INDEX idx, MODIFY a BIGINT FIRST, CHANGE b b2 INT, RENAME COLUMN x TO y, ALTER COLUMN a SET DEFAULT 1, ALTER INDEX i INVISIBLE, ENGINE=InnoDB, DROP PRIMARY KEY, ADD UNIQUE KEY u (a), ALGORITHM=INPLACE",
        );
        let Statement::AlterTable(alter) = statement else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(alter.items.len(), 11);
        assert!(matches!(
            &alter.items[0],
            AlterItem::AddColumns { position: Some(ColumnPosition::After(b)), .. } if b == "b"
        ));
        assert_eq!(alter.items[1], AlterItem::DropIndex("idx".into()));
        assert!(matches!(
            &alter.items[2],
            AlterItem::ModifyColumn { position: Some(ColumnPosition::First), .. }
        ));
        assert!(matches!(&alter.items[3], AlterItem::ChangeColumn { old_name, .. } if old_name == "b"));
        assert!(matches!(&alter.items[5], AlterItem::SetDefault { .. }));
        assert!(matches!(&alter.items[6], AlterItem::SetIndexVisible { visible: false, .. }));
        assert!(matches!(&alter.items[7], AlterItem::TableOptions(options) if options[0].name == "ENGINE"));
        assert_eq!(alter.items[8], AlterItem::DropPrimaryKey);
        assert!(matches!(&alter.items[9], AlterItem::AddConstraint(_)));
        assert_eq!(alter.items[10], AlterItem::Other);
    }

    #[test]
    fn test_drop_and_rename() {
        match parse("DROP TABLE IF EXISTS a, `b`") {
            Statement::DropTable(drop) => {
                assert!(drop.if_exists);
                assert_eq!(drop.tables.len(), 2);
            }
            other => panic!("{other:?}"),
        }
        match parse("DROP INDEX idx ON t") {
            Statement::DropIndex(drop) => assert_eq!(drop.table.name.value, "t"),
            other => panic!("{other:?}"),
        }
        match parse("RENAME TABLE a TO b, db.c TO db2.c") {
            Statement::RenameTable(rename) => assert_eq!(rename.pairs.len(), 2),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_other_statements() {
        assert_eq!(parse("SET NAMES utf8mb4"), Statement::Other);
        assert_eq!(parse("INSERT INTO t VALUES (1)"), Statement::Other);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(Parser::new("CREATE TABLE t (id INT").parse_statement().is_err());
        assert!(Parser::new("CREATE TABLE t (id INT BOGUS)").parse_statement().is_err());
        assert!(Parser::new("DROP TABLE").parse_statement().is_err());
    }
}
