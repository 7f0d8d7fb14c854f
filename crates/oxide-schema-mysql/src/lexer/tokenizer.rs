//! MySQL tokenizer.
//!
//! Unlike a plain SQL lexer, trivia is not skipped: whitespace and
//! comments come out as tokens so that the concatenation of all token
//! spans reproduces the input exactly. The design-schema reconciler
//! relies on this to copy untouched text byte for byte.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes MySQL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
    /// True while inside a `/*! ... */` version comment.
    in_conditional: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
            in_conditional: false,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Creates a span from start to current position.
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos)
    }

    /// Creates a token with the current span.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
    }

    fn continues_number_as_name(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn scan_whitespace(&mut self) -> Token {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        self.make_token(TokenKind::Whitespace)
    }

    /// Scans `#` and `-- ` comments up to, not including, the newline.
    fn scan_line_comment(&mut self) -> Token {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
        self.make_token(TokenKind::Comment)
    }

    /// Scans a block comment whose `/*` has been consumed. Version
    /// comments (`/*!`) only consume their opening marker.
    fn scan_block_comment(&mut self) -> Token {
        if self.peek() == Some('!') {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            let version = self.input[digits_start..self.pos].parse().unwrap_or(0);
            self.in_conditional = true;
            return self.make_token(TokenKind::ConditionalStart(version));
        }
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return self.make_token(TokenKind::Comment);
                }
                Some(_) => {}
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated block comment",
                    )));
                }
            }
        }
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(Self::is_identifier_char) {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];

        // Check if it's a keyword
        if let Some(keyword) = Keyword::from_str(text) {
            self.make_token(TokenKind::Keyword(keyword))
        } else {
            self.make_token(TokenKind::Identifier(String::from(text)))
        }
    }

    /// Scans a backtick-quoted identifier.
    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance(); // consume opening backtick
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('`') if self.peek() == Some('`') => {
                    value.push('`');
                    self.advance();
                }
                Some('`') => break,
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated quoted identifier",
                    )));
                }
            }
        }

        self.make_token(TokenKind::QuotedIdentifier(value))
    }

    /// Scans a number. A run of digits followed by letters is an
    /// identifier, as MySQL allows names such as `1st_col`.
    fn scan_number(&mut self) -> Token {
        if self.peek() == Some('0') && matches!(self.peek_next(), Some('x' | 'X' | 'b' | 'B')) {
            self.advance();
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.advance();
            }
            if self.peek().is_some_and(Self::continues_number_as_name) {
                return self.scan_identifier();
            }
            return self.make_token(TokenKind::Number(String::from(self.make_span().text(self.input))));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Check for decimal point
        if self.peek() == Some('.') && self.peek_next().is_none_or(|c| c.is_ascii_digit()) {
            self.advance(); // consume .
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Check for exponent
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let mut rest = self.input[self.pos..].chars().skip(1);
            let exponent = match rest.next() {
                Some('+' | '-') => rest.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent {
                self.advance(); // consume e/E
                if self.peek().is_some_and(|c| c == '+' || c == '-') {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        if self.peek().is_some_and(Self::continues_number_as_name) {
            return self.scan_identifier();
        }

        self.make_token(TokenKind::Number(String::from(
            &self.input[self.start..self.pos],
        )))
    }

    /// Scans a string literal. Both doubled quotes and backslash escapes
    /// are undone.
    fn scan_string(&mut self, quote: char) -> Token {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    // Check for escaped quote (double quote)
                    if self.peek() == Some(quote) {
                        value.push(quote);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.advance() {
                    Some('0') => value.push('\0'),
                    Some('b') => value.push('\u{8}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('Z') => value.push('\u{1a}'),
                    Some(c @ ('%' | '_')) => {
                        value.push('\\');
                        value.push(c);
                    }
                    Some(c) => value.push(c),
                    None => break,
                },
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated string literal",
                    )));
                }
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans `X'..'` or `B'..'` after the prefix letter.
    fn scan_binary_string(&mut self) -> Token {
        self.advance(); // consume opening quote
        loop {
            match self.advance() {
                Some('\'') => break,
                Some(_) => {}
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated binary string literal",
                    )));
                }
            }
        }
        self.make_token(TokenKind::BinaryString(String::from(
            &self.input[self.start..self.pos],
        )))
    }

    fn scan_variable(&mut self) -> Token {
        if self.peek() == Some('@') {
            self.advance();
        }
        match self.peek() {
            Some(q @ ('\'' | '"' | '`')) => {
                self.advance();
                while self.peek().is_some_and(|c| c != q) {
                    self.advance();
                }
                self.advance();
            }
            _ => {
                while self
                    .peek()
                    .is_some_and(|c| Self::is_identifier_char(c) || c == '.')
                {
                    self.advance();
                }
            }
        }
        self.make_token(TokenKind::Variable(String::from(
            &self.input[self.start..self.pos],
        )))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.start = self.pos;

        let c = match self.advance() {
            Some(c) => c,
            None => return self.make_token(TokenKind::Eof),
        };

        match c {
            c if c.is_whitespace() => self.scan_whitespace(),
            '#' => self.scan_line_comment(),
            '-' if self.peek() == Some('-')
                && self.peek_next().is_none_or(|c| c.is_whitespace()) =>
            {
                self.scan_line_comment()
            }
            '/' if self.peek() == Some('*') => {
                self.advance();
                self.scan_block_comment()
            }
            '*' if self.in_conditional && self.peek() == Some('/') => {
                self.advance();
                self.in_conditional = false;
                self.make_token(TokenKind::ConditionalEnd)
            }

            // Single-character tokens
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '~' => self.make_token(TokenKind::BitNot),
            '^' => self.make_token(TokenKind::BitXor),
            '?' => self.make_token(TokenKind::Question),
            '=' => self.make_token(TokenKind::Eq),
            '@' => self.scan_variable(),

            // Potentially multi-character tokens
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number()
            }
            '.' => self.make_token(TokenKind::Dot),
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self.make_token(TokenKind::LongArrow)
                    } else {
                        self.make_token(TokenKind::Arrow)
                    }
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            ':' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::Assign)
                } else {
                    self.make_token(TokenKind::Colon)
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self.make_token(TokenKind::NullSafeEq)
                    } else {
                        self.make_token(TokenKind::LtEq)
                    }
                } else if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else if self.peek() == Some('<') {
                    self.advance();
                    self.make_token(TokenKind::LeftShift)
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::RightShift)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::LogicalOr)
                } else {
                    self.make_token(TokenKind::BitOr)
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    self.make_token(TokenKind::LogicalAnd)
                } else {
                    self.make_token(TokenKind::BitAnd)
                }
            }

            // String literals
            '\'' | '"' => {
                self.pos = self.start; // Reset position to scan from quote
                self.scan_string(c)
            }

            // Quoted identifiers
            '`' => {
                self.pos = self.start;
                self.scan_quoted_identifier()
            }

            // Hex and bit strings
            'X' | 'x' | 'B' | 'b' if self.peek() == Some('\'') => self.scan_binary_string(),

            // Numbers
            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' || !c.is_ascii() => {
                self.pos = self.start;
                self.scan_identifier()
            }

            _ => self.make_token(TokenKind::Error(format!("Unexpected character: {c}"))),
        }
    }

    /// Tokenizes the entire input and returns all tokens, ending with
    /// [`TokenKind::Eof`].
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
