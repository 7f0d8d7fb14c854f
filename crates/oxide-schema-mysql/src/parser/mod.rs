//! MySQL DDL parsing.
//!
//! A script is tokenized once, split into statement chunks, and each SQL
//! chunk is parsed from its slice of the token stream. All spans are
//! offsets into the original script.

pub mod ast;
mod error;
#[allow(clippy::module_inception)]
mod parser;
mod splitter;

pub use ast::Statement;
pub use error::ParseError;
pub use parser::Parser;
pub use splitter::{split, Chunk, ChunkKind, DEFAULT_DELIMITER};

use oxide_schema_core::{Result, SchemaError};

use crate::lexer::{Lexer, Token, TokenKind};

/// A chunk of a script with its parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    pub chunk: Chunk,
    /// [`Statement::Other`] for delimiter commands, trailing trivia and
    /// empty statements.
    pub statement: Statement,
}

impl ParsedStatement {
    /// The statement text without leading trivia or delimiter.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.chunk.body_text(source)
    }
}

/// Parses a whole script.
///
/// # Errors
///
/// Returns [`SchemaError::Syntax`] with the 1-based line of the first
/// lexical or syntax error.
pub fn parse_script(source: &str) -> Result<Vec<ParsedStatement>> {
    let tokens = Lexer::new(source).tokenize();
    if let Some(token) = tokens.iter().find(|t| matches!(t.kind, TokenKind::Error(_))) {
        return Err(lex_error(source, token));
    }
    split(source, &tokens)
        .into_iter()
        .map(|chunk| {
            let statement = if chunk.kind == ChunkKind::Sql && !chunk.tokens.is_empty() {
                Parser::from_tokens(source, &tokens[chunk.tokens.clone()])
                    .parse_statement()
                    .map_err(|e| e.into_schema_error(source))?
            } else {
                Statement::Other
            };
            Ok(ParsedStatement { chunk, statement })
        })
        .collect()
}

fn lex_error(source: &str, token: &Token) -> SchemaError {
    let message = match &token.kind {
        TokenKind::Error(message) => message.clone(),
        _ => String::from("Invalid token"),
    };
    ParseError::new(message, token.span).into_schema_error(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let source = "CREATE TABLE a (id INT);\nSET NAMES utf8;\nDROP TABLE a;\n";
        let statements = parse_script(source).unwrap();
        assert_eq!(statements.len(), 4);
        assert!(matches!(statements[0].statement, Statement::CreateTable(_)));
        assert_eq!(statements[1].statement, Statement::Other);
        assert!(matches!(statements[2].statement, Statement::DropTable(_)));
        assert_eq!(statements[3].chunk.kind, ChunkKind::Trivia);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let source = "CREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT BOGUS);";
        match parse_script(source) {
            Err(SchemaError::Syntax { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_lexical_error() {
        let source = "CREATE TABLE a (id INT COMMENT 'open";
        assert!(matches!(parse_script(source), Err(SchemaError::Syntax { line: 1, .. })));
    }
}
