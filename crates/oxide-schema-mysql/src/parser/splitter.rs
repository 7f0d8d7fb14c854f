//! Statement splitting.
//!
//! Splits a token stream into statement chunks the way the `mysql`
//! client does: statements end at the current delimiter, and a
//! `DELIMITER xx` line at statement start changes it. Chunks are
//! contiguous, so concatenating their ranges reproduces the input.

use std::ops::Range;

use crate::lexer::{line_at, Span, Token, TokenKind};

/// The delimiter in effect at the start of a script.
pub const DEFAULT_DELIMITER: &str = ";";

/// What a chunk holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// A SQL statement.
    Sql,
    /// A client `DELIMITER` command.
    Delimiter,
    /// Whitespace and comments after the last statement.
    Trivia,
}

/// One statement of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Full text range: leading trivia, the body and its delimiter.
    pub range: Span,
    /// The statement text without leading trivia or delimiter.
    pub body: Span,
    /// Token indices of the body, first to last significant token.
    pub tokens: Range<usize>,
    /// 1-based line where the body starts.
    pub line: usize,
    /// Delimiter that terminated the chunk; empty at end of input.
    pub delimiter: String,
}

impl Chunk {
    /// Returns the full chunk text.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.range.text(source)
    }

    /// Returns the statement text.
    #[must_use]
    pub fn body_text<'a>(&self, source: &'a str) -> &'a str {
        self.body.text(source)
    }
}

fn can_start_delimiter(token: &Token) -> bool {
    !token.is_trivia()
        && !matches!(
            token.kind,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::BinaryString(_)
                | TokenKind::Identifier(_)
                | TokenKind::QuotedIdentifier(_)
                | TokenKind::Keyword(_)
                | TokenKind::Variable(_)
                | TokenKind::Eof
        )
}

fn is_delimiter_command(source: &str, token: &Token) -> bool {
    matches!(&token.kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case("DELIMITER"))
        && token.span.text(source).eq_ignore_ascii_case("DELIMITER")
}

/// Splits `tokens`, as produced by [`crate::lexer::Lexer::tokenize`] over
/// `source`, into chunks.
#[must_use]
pub fn split(source: &str, tokens: &[Token]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut delimiter = String::from(DEFAULT_DELIMITER);
    let mut chunk_start = 0usize;
    let mut i = 0usize;

    while i < tokens.len() && !tokens[i].is_eof() {
        // Skip leading trivia.
        let first = match tokens[i..]
            .iter()
            .position(|t| !t.is_trivia())
            .map(|p| p + i)
        {
            Some(first) if !tokens[first].is_eof() => first,
            _ => break,
        };

        if is_delimiter_command(source, &tokens[first]) {
            let line_end = source[tokens[first].span.end..]
                .find('\n')
                .map_or(source.len(), |p| p + tokens[first].span.end);
            let mut last = first;
            let mut j = first + 1;
            while j < tokens.len() && !tokens[j].is_eof() && tokens[j].span.end <= line_end {
                if !tokens[j].is_trivia() {
                    last = j;
                }
                j += 1;
            }
            let end = tokens[last].span.end;
            let new_delimiter = source[tokens[first].span.end..end].trim();
            if !new_delimiter.is_empty() {
                delimiter = new_delimiter.to_string();
            }
            chunks.push(Chunk {
                kind: ChunkKind::Delimiter,
                range: Span::new(chunk_start, end),
                body: Span::new(tokens[first].span.start, end),
                tokens: first..last + 1,
                line: line_at(source, tokens[first].span.start),
                delimiter: String::new(),
            });
            chunk_start = end;
            i = last + 1;
            continue;
        }

        let mut last = first;
        let mut j = first;
        let mut terminated = None;
        while j < tokens.len() && !tokens[j].is_eof() {
            let token = &tokens[j];
            if can_start_delimiter(token)
                && source[token.span.start..].starts_with(delimiter.as_str())
            {
                let delimiter_end = token.span.start + delimiter.len();
                let mut k = j;
                while k < tokens.len() && !tokens[k].is_eof() && tokens[k].span.start < delimiter_end
                {
                    k += 1;
                }
                terminated = Some((k, delimiter_end));
                break;
            }
            if !token.is_trivia() {
                last = j;
            }
            j += 1;
        }

        let (next, end, used) = match terminated {
            Some((next, end)) => (next, end, delimiter.clone()),
            None => (j, tokens[last].span.end, String::new()),
        };
        // A bare delimiter has an empty body.
        let (body, body_tokens) = if terminated.is_some() && j == first {
            (Span::new(tokens[first].span.start, tokens[first].span.start), first..first)
        } else {
            (Span::new(tokens[first].span.start, tokens[last].span.end), first..last + 1)
        };
        chunks.push(Chunk {
            kind: ChunkKind::Sql,
            range: Span::new(chunk_start, end),
            body,
            tokens: body_tokens,
            line: line_at(source, tokens[first].span.start),
            delimiter: used,
        });
        chunk_start = end;
        i = next;
    }

    if chunk_start < source.len() {
        let end = source.len();
        chunks.push(Chunk {
            kind: ChunkKind::Trivia,
            range: Span::new(chunk_start, end),
            body: Span::new(end, end),
            tokens: tokens.len()..tokens.len(),
            line: line_at(source, end),
            delimiter: String::new(),
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn chunks(source: &str) -> Vec<Chunk> {
        let tokens = Lexer::new(source).tokenize();
        split(source, &tokens)
    }

    #[test]
    fn test_chunks_cover_input() {
        let source = "-- head\nCREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);\n-- tail\n";
        let chunks = chunks(source);
        let rebuilt: String = chunks.iter().map(|c| c.text(source)).collect();
        assert_eq!(rebuilt, source);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].body_text(source), "CREATE TABLE a (id INT)");
        assert_eq!(chunks[0].line, 2);
        assert_eq!(chunks[1].body_text(source), "CREATE TABLE b (id INT)");
        assert_eq!(chunks[1].line, 4);
        assert_eq!(chunks[2].kind, ChunkKind::Trivia);
    }

    #[test]
    fn test_semicolon_inside_string_does_not_split() {
        let source = "INSERT INTO t VALUES ('a;b'); SELECT 1";
        let chunks = chunks(source);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].body_text(source), "SELECT 1");
        assert!(chunks[1].delimiter.is_empty());
    }

    #[test]
    fn test_delimiter_command() {
        let source = "DELIMITER ;;\nCREATE PROCEDURE p() BEGIN SELECT 1; SELECT 2; END ;;\nDELIMITER ;\nSELECT 3;";
        let chunks = chunks(source);
        let kinds: Vec<_> = chunks.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChunkKind::Delimiter,
                ChunkKind::Sql,
                ChunkKind::Delimiter,
                ChunkKind::Sql
            ]
        );
        assert_eq!(
            chunks[1].body_text(source),
            "CREATE PROCEDURE p() BEGIN SELECT 1; SELECT 2; END"
        );
        assert_eq!(chunks[1].delimiter, ";;");
        assert_eq!(chunks[3].body_text(source), "SELECT 3");
        let rebuilt: String = chunks.iter().map(|c| c.text(source)).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_custom_symbol_delimiter() {
        let source = "DELIMITER $$\nSELECT 1$$\nDELIMITER ;\n";
        let chunks = chunks(source);
        assert_eq!(chunks[1].body_text(source), "SELECT 1");
        assert_eq!(chunks[1].delimiter, "$$");
    }

    #[test]
    fn test_empty_statement() {
        let source = ";;SELECT 1;";
        let chunks = chunks(source);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].body.is_empty());
        assert!(chunks[0].tokens.is_empty());
        assert_eq!(chunks[2].body_text(source), "SELECT 1");
    }
}
