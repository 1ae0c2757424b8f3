//! Core Evolve lexer: converts source text to a token stream.
//!
//! Features:
//! - Keywords, identifiers, int/float/string literals
//! - One- and two-character operators (two-character forms win)
//! - Single-line comments stripped (`//`)
//! - Fail-fast: the first illegal character or unterminated string aborts
//!   the pass and no partial token list is returned

use evolve_types::{ErrorCode, EvolveError, Position, Result, SourceFile, Span};
use log::debug;

use crate::token::{Token, TokenKind};

/// The Evolve lexer.
pub struct Lexer<'src> {
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// The full source text.
    text: &'src str,
    /// Current position; `offset` is a byte offset into `text`.
    pos: Position,
}

/// Convenience wrapper around [`Lexer::lex`].
pub fn tokenize(source_file: &SourceFile) -> Result<Vec<Token>> {
    Lexer::new(source_file).lex()
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source_file,
            text: &source_file.source,
            pos: Position::default(),
        }
    }

    /// Lex the entire source file. The token stream always ends with `Eof`.
    pub fn lex(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('/') => self.skip_comment(),
                '0'..='9' => tokens.push(self.scan_number()),
                '"' => tokens.push(self.scan_string()?),
                'a'..='z' | 'A'..='Z' => tokens.push(self.scan_identifier()),
                _ => tokens.push(self.scan_operator()?),
            }
        }

        tokens.push(Token::new(TokenKind::Eof, Span::point(self.pos)));
        debug!(
            "lexed {} tokens from {}",
            tokens.len(),
            self.source_file.name
        );
        Ok(tokens)
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn rest(&self) -> &'src str {
        &self.text[self.pos.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos.advance(ch);
        Some(ch)
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.pos)
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, span: Span) -> EvolveError {
        EvolveError::new(self.source_file, code, message, span)
    }

    // ─────────────────────────────────────────────────────────────
    // Scanners
    // ─────────────────────────────────────────────────────────────

    /// Skip a `//` comment up to (not including) the newline.
    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Digits with at most one `.`; a second `.` ends the literal.
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => {}
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            self.advance();
        }

        let span = self.span_from(start);
        let text = &self.text[start.offset..self.pos.offset];
        let kind = if seen_dot {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                // Too wide for i64: keep the magnitude as a float.
                Err(_) => TokenKind::Float(text.parse().unwrap_or(f64::MAX)),
            }
        };
        Token::new(kind, span)
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let span = self.span_from(start);
        let text = &self.text[start.offset..self.pos.offset];
        let kind = TokenKind::from_keyword(text)
            .unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }

    /// Scan `"…"`. Reaching end of input before the closing quote fails.
    fn scan_string(&mut self) -> Result<Token> {
        let start = self.pos;
        self.advance(); // opening quote
        let content_start = self.pos.offset;

        loop {
            match self.advance() {
                Some('"') => break,
                Some(_) => {}
                None => {
                    return Err(self.error(
                        ErrorCode::UNTERMINATED_STRING,
                        "expected '\"' before end of input",
                        self.span_from(start),
                    ));
                }
            }
        }

        let content = &self.text[content_start..self.pos.offset - 1];
        Ok(Token::new(
            TokenKind::Str(content.to_string()),
            self.span_from(start),
        ))
    }

    fn scan_operator(&mut self) -> Result<Token> {
        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, Span::point(start)));
        };

        let two_char = match (ch, self.peek()) {
            ('=', Some('=')) => Some(TokenKind::EqEq),
            ('!', Some('=')) => Some(TokenKind::BangEq),
            ('>', Some('=')) => Some(TokenKind::GreaterEq),
            ('<', Some('=')) => Some(TokenKind::LessEq),
            _ => None,
        };
        if let Some(kind) = two_char {
            self.advance();
            return Ok(Token::new(kind, self.span_from(start)));
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '>' => TokenKind::Greater,
            '<' => TokenKind::Less,
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => {
                return Err(self.error(
                    ErrorCode::ILLEGAL_CHARACTER,
                    format!("'{ch}'"),
                    self.span_from(start),
                ));
            }
        };
        Ok(Token::new(kind, self.span_from(start)))
    }
}
