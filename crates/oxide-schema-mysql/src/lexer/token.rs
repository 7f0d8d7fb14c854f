//! Token types for the MySQL lexer.

use super::Span;

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// MySQL keywords the DDL parser dispatches on.
        ///
        /// MySQL lets most keywords double as identifiers, so the parser
        /// accepts a keyword token wherever a name is expected.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Attempts to parse a keyword from a string (case-insensitive).
            #[must_use]
            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Returns the keyword as written in SQL.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    Action => "ACTION",
    Add => "ADD",
    After => "AFTER",
    Algorithm => "ALGORITHM",
    Alter => "ALTER",
    Always => "ALWAYS",
    As => "AS",
    Asc => "ASC",
    AutoIncrement => "AUTO_INCREMENT",
    Before => "BEFORE",
    Btree => "BTREE",
    By => "BY",
    Cascade => "CASCADE",
    Change => "CHANGE",
    Character => "CHARACTER",
    Charset => "CHARSET",
    Check => "CHECK",
    Collate => "COLLATE",
    Column => "COLUMN",
    ColumnFormat => "COLUMN_FORMAT",
    Columns => "COLUMNS",
    Comment => "COMMENT",
    Constraint => "CONSTRAINT",
    Create => "CREATE",
    Database => "DATABASE",
    Default => "DEFAULT",
    Definer => "DEFINER",
    Delete => "DELETE",
    Desc => "DESC",
    Drop => "DROP",
    Each => "EACH",
    Enforced => "ENFORCED",
    Engine => "ENGINE",
    Event => "EVENT",
    Exists => "EXISTS",
    First => "FIRST",
    Follows => "FOLLOWS",
    For => "FOR",
    Foreign => "FOREIGN",
    Fulltext => "FULLTEXT",
    Function => "FUNCTION",
    Generated => "GENERATED",
    Hash => "HASH",
    If => "IF",
    In => "IN",
    Index => "INDEX",
    Insert => "INSERT",
    Invisible => "INVISIBLE",
    Key => "KEY",
    Less => "LESS",
    Like => "LIKE",
    Linear => "LINEAR",
    List => "LIST",
    Maxvalue => "MAXVALUE",
    Modify => "MODIFY",
    No => "NO",
    Not => "NOT",
    Null => "NULL",
    On => "ON",
    Or => "OR",
    Partition => "PARTITION",
    Partitioning => "PARTITIONING",
    Partitions => "PARTITIONS",
    Precedes => "PRECEDES",
    Primary => "PRIMARY",
    Procedure => "PROCEDURE",
    Range => "RANGE",
    References => "REFERENCES",
    Remove => "REMOVE",
    Rename => "RENAME",
    Replace => "REPLACE",
    Restrict => "RESTRICT",
    Row => "ROW",
    Schema => "SCHEMA",
    Secondary => "SECONDARY",
    Security => "SECURITY",
    Select => "SELECT",
    Serial => "SERIAL",
    Set => "SET",
    Spatial => "SPATIAL",
    Sql => "SQL",
    Srid => "SRID",
    Storage => "STORAGE",
    Stored => "STORED",
    Subpartition => "SUBPARTITION",
    Subpartitions => "SUBPARTITIONS",
    Table => "TABLE",
    Temporary => "TEMPORARY",
    Than => "THAN",
    To => "TO",
    Trigger => "TRIGGER",
    Unique => "UNIQUE",
    Update => "UPDATE",
    Use => "USE",
    Using => "USING",
    Value => "VALUE",
    Values => "VALUES",
    View => "VIEW",
    Virtual => "VIRTUAL",
    Visible => "VISIBLE",
    With => "WITH",
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal, kept as written (`42`, `3.14`, `1e10`, `0x1F`).
    Number(String),
    /// Quoted string with escapes undone (`'it''s'` -> `it's`).
    String(String),
    /// Hex or bit string literal, kept as written (`X'0F'`, `b'101'`).
    BinaryString(String),

    // Identifiers and keywords
    /// Unquoted identifier.
    Identifier(String),
    /// Backtick-quoted identifier with doubled backticks undone.
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),
    /// User or system variable (`@x`, `@@sql_mode`), kept as written.
    Variable(String),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <=>
    NullSafeEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// !
    Bang,
    /// &&
    LogicalAnd,
    /// ||
    LogicalOr,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ^
    BitXor,
    /// ~
    BitNot,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// :=
    Assign,
    /// ->
    Arrow,
    /// ->>
    LongArrow,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// {
    LeftBrace,
    /// }
    RightBrace,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ?
    Question,

    // Trivia
    /// Spaces, tabs and newlines.
    Whitespace,
    /// `# ...`, `-- ...` or `/* ... */`.
    Comment,
    /// Opening of a version comment, `/*!50100`; the payload is the
    /// version number, 0 when absent.
    ConditionalStart(u32),
    /// `*/` closing a version comment.
    ConditionalEnd,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns true for whitespace, comments and version-comment markers.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::ConditionalStart(_)
                | TokenKind::ConditionalEnd
        )
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns true if this is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.as_keyword() == Some(keyword)
    }

    /// Returns true if the token can name an object: an identifier, a
    /// quoted identifier, or a keyword used as a name.
    #[must_use]
    pub const fn is_name(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) | TokenKind::Keyword(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Keyword::from_str("TABLE"), Some(Keyword::Table));
        assert_eq!(Keyword::from_str("table"), Some(Keyword::Table));
        assert_eq!(
            Keyword::from_str("auto_increment"),
            Some(Keyword::AutoIncrement)
        );
        assert_eq!(Keyword::from_str("not_a_keyword"), None);
    }

    #[test]
    fn test_keyword_as_str() {
        assert_eq!(Keyword::ColumnFormat.as_str(), "COLUMN_FORMAT");
        assert_eq!(Keyword::Subpartitions.as_str(), "SUBPARTITIONS");
    }

    #[test]
    fn test_token_predicates() {
        let eof = Token::new(TokenKind::Eof, Span::new(0, 0));
        let ws = Token::new(TokenKind::Whitespace, Span::new(0, 1));
        let kw = Token::new(TokenKind::Keyword(Keyword::Key), Span::new(0, 3));
        assert!(eof.is_eof());
        assert!(ws.is_trivia());
        assert!(kw.is_keyword(Keyword::Key));
        assert!(kw.is_name());
        assert!(!ws.is_name());
        assert_eq!(ws.as_keyword(), None);
    }
}
