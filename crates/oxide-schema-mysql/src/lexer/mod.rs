//! MySQL lexer.
//!
//! A hand-written lexer producing a lossless token stream: every byte of
//! the input belongs to exactly one token, trivia included.

mod span;
mod token;
mod tokenizer;

pub use span::{line_at, Span};
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
