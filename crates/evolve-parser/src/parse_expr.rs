//! Expression parsing with operator precedence.
//!
//! Precedence (lowest → highest):
//! 4. `==`, `!=`, `<`, `>`, `<=`, `>=` (left-associative)
//! 3. `+`, `-`
//! 2. `*`, `/`
//! 1. unary `+`, `-`; literals, names, calls, parentheses

use evolve_lexer::token::TokenKind;
use evolve_types::ast::*;
use evolve_types::{ErrorCode, Result, Span};

use crate::parser::Parser;

impl<'src> Parser<'src> {
    /// Parse an expression, one nesting level below the caller.
    pub(crate) fn parse_expression(&mut self) -> Result<Node> {
        self.nested(Self::parse_comparison)
    }

    /// `Comparison = Arith { CompOp Arith }`
    fn parse_comparison(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_arith, |kind| match kind {
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::GreaterEq => Some(BinaryOperator::GreaterEq),
            TokenKind::LessEq => Some(BinaryOperator::LessEq),
            TokenKind::EqEq => Some(BinaryOperator::Eq),
            TokenKind::BangEq => Some(BinaryOperator::NotEq),
            _ => None,
        })
    }

    /// `Arith = Term { ("+" | "-") Term }`
    fn parse_arith(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_term, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Sub),
            _ => None,
        })
    }

    /// `Term = Factor { ("*" | "/") Factor }`
    fn parse_term(&mut self) -> Result<Node> {
        self.parse_binary(Self::parse_factor, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Mul),
            TokenKind::Slash => Some(BinaryOperator::Div),
            _ => None,
        })
    }

    /// One left-associative precedence level: `operand { op operand }`.
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> Result<Node>,
        operator: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Node> {
        let outer = self.depth;
        let result = self.parse_chain(operand, operator);
        self.depth = outer;
        result
    }

    /// Each operator deepens the left-leaning tree by one level.
    fn parse_chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Node>,
        operator: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> Result<Node> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.peek_kind()) {
            self.deepen()?;
            self.advance();
            let right = operand(self)?;
            let span = left.span.merge(right.span);
            left = Node::new(
                NodeKind::BinaryOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    /// `Factor = ("+" | "-") Factor | Literal | Name | Call | "(" Expr ")"`
    fn parse_factor(&mut self) -> Result<Node> {
        let start = self.current_span();
        match self.peek_kind().clone() {
            // ── Unary ───────────────────────────────────────────────────
            TokenKind::Plus | TokenKind::Minus => {
                let op = if self.advance().kind == TokenKind::Minus {
                    UnaryOperator::Minus
                } else {
                    UnaryOperator::Plus
                };
                let operand = self.nested(Self::parse_factor)?;
                let span = start.merge(operand.span);
                Ok(Node::new(
                    NodeKind::UnaryOp {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }

            // ── Literals ────────────────────────────────────────────────
            TokenKind::Int(n) => {
                self.advance();
                Ok(Node::new(NodeKind::NumberLiteral(n as f64), start))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Node::new(NodeKind::NumberLiteral(n), start))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Node::new(NodeKind::StringLiteral(s), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(Node::new(NodeKind::BooleanLiteral(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(Node::new(NodeKind::BooleanLiteral(false), start))
            }

            // ── Grouping ────────────────────────────────────────────────
            TokenKind::LParen => {
                self.advance(); // eat `(`
                let mut inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "to close parenthesis")?;
                inner.span = start.merge(self.previous_span());
                Ok(inner)
            }

            // ── Name or call ────────────────────────────────────────────
            TokenKind::Identifier(name) => {
                self.check_declared(&name, start)?;
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.parse_call(name, start)
                } else {
                    Ok(Node::new(NodeKind::VariableRef(name), start))
                }
            }

            kind => Err(self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!(
                    "expected int, float, string, identifier, '+', '-' or '(', got '{kind}'"
                ),
            )),
        }
    }

    /// Parse `(args...)` after a function name.
    fn parse_call(&mut self, name: String, start: Span) -> Result<Node> {
        self.advance(); // eat `(`
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "after function arguments")?;
        let span = start.merge(self.previous_span());
        Ok(Node::new(NodeKind::FunctionCall { name, args }, span))
    }
}
