use std::{iter::Peekable, ops::Range};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

/// Tokenizes the whole source eagerly. The returned vector is never empty:
/// it always ends with a [`TokenKind::Eof`] token.
pub fn lex(src: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    loop {
        lexer.skip_whitespace();
        let kind = lexer.scan_token_kind();
        let done = kind == TokenKind::Eof;
        let token = lexer.produce(kind);
        lexer.tokens.push(token);
        if done {
            break;
        }
    }
    lexer.tokens
}

pub struct Lexer<'src> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' => Eof,
            '.' => Dot,
            ',' => Comma,
            '=' => Equal,
            ';' => Semicolon,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '!' => Bang,
            ':' => match self.peek() {
                '=' => self.advance_with(ColonEq),
                _ => Colon,
            },
            '-' => match self.peek() {
                '>' => self.advance_with(Arrow),
                _ => Invalid,
            },
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            _ => Invalid,
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_char = |c: char| c.is_ascii_alphabetic() || c == '_';

        while valid_identifier_char(self.peek()) {
            self.advance();
        }
        match KEYWORDS.get(self.substr()).cloned() {
            Some(keyword) => keyword,
            None => TokenKind::Identifier(self.substr().to_string()),
        }
    }

    // The only number literal in the language is the constant zero;
    // everything else is the lexer's problem to reject.
    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        match self.substr() {
            "0" => TokenKind::Zero,
            _ => TokenKind::Invalid,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
    }
}

impl Lexer<'_> {
    pub fn new(src: &str) -> Lexer<'_> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens: Vec::with_capacity(64),
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the current range.
    fn range(&self) -> Range<usize> {
        self.current_lo..self.cursor
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.range())
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        &self.src[self.range()]
    }

    /// Produces a token using the marked bounds.
    fn produce(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.span())
    }
}
