//! Core parser infrastructure: token cursor, error reporting, helpers.

use evolve_lexer::token::{Token, TokenKind};
use evolve_types::ast::{Node, NodeKind};
use evolve_types::{ErrorCode, EvolveError, Result, SourceFile, Span};
use log::debug;

use crate::scope::Scopes;

/// Deepest nesting of expressions and blocks the parser accepts. Each
/// parenthesis, unary operator, call argument, block body and chained
/// binary operator counts as one level.
pub const MAX_NESTING_DEPTH: usize = 1000;

/// Remaining stack below which nested parsing switches to a fresh segment.
const STACK_RED_ZONE: usize = 64 * 1024;

/// Size of each extra stack segment.
const STACK_SEGMENT: usize = 1024 * 1024;

/// The Evolve parser.
///
/// Consumes a token stream produced by the lexer and builds an AST,
/// checking declarations against a scoped table as it goes. The first
/// error aborts the parse.
pub struct Parser<'src> {
    /// The token stream (always ends with `Eof`).
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Names declared so far, by scope.
    pub(crate) scopes: Scopes,
    /// Current nesting level.
    pub(crate) depth: usize,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
        }
        Self {
            tokens,
            pos: 0,
            source_file,
            scopes: Scopes::new(Vec::<String>::new()),
            depth: 0,
        }
    }

    /// Treat `names` as already declared (host-provided natives, bindings
    /// left by earlier runs). Program code may shadow them.
    pub fn with_globals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Scopes::new(names);
        self
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind; `context` completes the message
    /// ("expected ')' after function arguments").
    pub(crate) fn expect(&mut self, expected: &TokenKind, context: &str) -> Result<Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!(
                    "expected '{}' {}, got '{}'",
                    expected,
                    context,
                    self.peek_kind()
                ),
            ))
        }
    }

    /// Expect an identifier. Keywords get a dedicated error.
    pub(crate) fn expect_name(&mut self, what: &str) -> Result<(String, Span)> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            kind if kind.is_keyword() => Err(self.error_at_current(
                ErrorCode::RESERVED_KEYWORD,
                format!("'{kind}' is a reserved keyword and cannot be used as a name"),
            )),
            kind => Err(self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected {what}, got '{kind}'"),
            )),
        }
    }

    /// Consume the `;` ending an assignment or expression statement. It
    /// may be left out before `}` or the end of input.
    pub(crate) fn expect_terminator(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.at_end()
        {
            Ok(())
        } else {
            Err(self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected ';' after statement, got '{}'", self.peek_kind()),
            ))
        }
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Run `parse` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.deepen()?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || parse(self));
        self.depth -= 1;
        result
    }

    /// Count one more nesting level; fails past [`MAX_NESTING_DEPTH`].
    pub(crate) fn deepen(&mut self) -> Result<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("expression nested too deeply (limit is {MAX_NESTING_DEPTH} levels)"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    // ── Declarations ──────────────────────────────────────────────────────────

    /// Fail if `name` is already declared in the innermost scope.
    pub(crate) fn check_not_redeclared(&self, name: &str, span: Span) -> Result<()> {
        if self.scopes.declared_locally(name) {
            Err(self.error_at(
                ErrorCode::ALREADY_DECLARED,
                format!("'{name}' is already declared"),
                span,
            ))
        } else {
            Ok(())
        }
    }

    /// Fail if `name` is not visible from the current scope.
    pub(crate) fn check_declared(&self, name: &str, span: Span) -> Result<()> {
        if self.scopes.is_visible(name) {
            Ok(())
        } else {
            Err(self.error_at(
                ErrorCode::UNDECLARED_NAME,
                format!("'{name}' is not defined"),
                span,
            ))
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Build an error at the current token position.
    pub(crate) fn error_at_current(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> EvolveError {
        self.error_at(code, message, self.current_span())
    }

    /// Build an error at a specific span.
    pub(crate) fn error_at(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> EvolveError {
        EvolveError::new(self.source_file, code, message, span)
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` node.
    pub fn parse(mut self) -> Result<Node> {
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
        }

        let (Some(first), Some(last)) = (statements.first(), statements.last()) else {
            return Err(self.error_at_current(
                ErrorCode::EMPTY_PROGRAM,
                "expected at least one statement",
            ));
        };
        let span = first.span.merge(last.span);
        debug!(
            "parsed {} top-level statements from {}",
            statements.len(),
            self.source_file.name
        );
        Ok(Node::new(NodeKind::Program(statements), span))
    }
}
