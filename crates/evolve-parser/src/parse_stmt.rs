//! Statement parsing.

use crate::parser::Parser;
use evolve_lexer::token::TokenKind;
use evolve_types::ast::*;
use evolve_types::{ErrorCode, Result, Span};

impl<'src> Parser<'src> {
    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Result<Node> {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_decl(),
            TokenKind::Function => self.parse_function_def(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Identifier(_) if *self.look_ahead(1) == TokenKind::Eq => {
                self.parse_assignment()
            }
            _ => {
                // Expression statement (includes bare calls)
                let expr = self.parse_expression()?;
                self.expect_terminator()?;
                Ok(expr)
            }
        }
    }

    /// `var name = expr;`
    fn parse_var_decl(&mut self) -> Result<Node> {
        let start = self.advance().span; // eat `var`
        let (name, name_span) = self.expect_name("variable name after 'var'")?;
        self.check_not_redeclared(&name, name_span)?;
        self.expect(&TokenKind::Eq, "after variable name")?;
        let value = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon, "after variable declaration")?;
        let span = start.merge(self.previous_span());

        // Registered only once the initializer parsed: `var x = x;` needs an outer `x`.
        self.scopes.declare(&name);
        Ok(Node::new(
            NodeKind::VariableAssign {
                name,
                value: Box::new(value),
                is_declaration: true,
            },
            span,
        ))
    }

    /// `name = expr;`
    fn parse_assignment(&mut self) -> Result<Node> {
        let (name, name_span) = self.expect_name("variable name")?;
        self.check_declared(&name, name_span)?;
        self.advance(); // eat `=`
        let value = self.parse_expression()?;
        let span = name_span.merge(value.span);
        self.expect_terminator()?;
        Ok(Node::new(
            NodeKind::VariableAssign {
                name,
                value: Box::new(value),
                is_declaration: false,
            },
            span,
        ))
    }

    /// `function name(a, b) { stmts }`
    fn parse_function_def(&mut self) -> Result<Node> {
        let start = self.advance().span; // eat `function`
        let (name, name_span) = self.expect_name("function name after 'function'")?;
        self.check_not_redeclared(&name, name_span)?;
        // Declared before the body so the function can call itself.
        self.scopes.declare(&name);

        self.expect(&TokenKind::LParen, "after function name")?;
        let mut params: Vec<String> = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param, param_span) = self.expect_name("parameter name")?;
                if params.contains(&param) {
                    return Err(self.error_at(
                        ErrorCode::ALREADY_DECLARED,
                        format!("'{param}' is already declared"),
                        param_span,
                    ));
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "after parameters")?;

        let (body, body_span) = self.parse_body(&params)?;
        Ok(Node::new(
            NodeKind::FunctionDef { name, params, body },
            start.merge(body_span),
        ))
    }

    /// `if (c) { … } elseif (c) { … } else { … }`
    fn parse_if(&mut self) -> Result<Node> {
        let start = self.advance().span; // eat `if`
        let condition = self.parse_condition("if")?;
        let body = self.parse_block()?;

        let mut elseif_clauses = Vec::new();
        while self.eat(&TokenKind::ElseIf) {
            let condition = self.parse_condition("elseif")?;
            let body = self.parse_block()?;
            elseif_clauses.push(ElseIfClause { condition, body });
        }

        let else_body = if self.eat(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let span = start.merge(self.previous_span());
        Ok(Node::new(
            NodeKind::If(Box::new(IfNode {
                condition,
                body,
                elseif_clauses,
                else_body,
            })),
            span,
        ))
    }

    /// `( expr )` after `if` / `elseif`.
    fn parse_condition(&mut self, keyword: &str) -> Result<Node> {
        self.expect(&TokenKind::LParen, &format!("after '{keyword}'"))?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "after condition")?;
        Ok(condition)
    }

    /// `return;` or `return expr;`
    fn parse_return(&mut self) -> Result<Node> {
        let start = self.advance().span; // eat `return`
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(&TokenKind::Semicolon, "after return")?;
        let span = start.merge(self.previous_span());
        Ok(Node::new(NodeKind::Return(value), span))
    }

    /// A braced body as a `Block` node, in its own declaration scope.
    pub(crate) fn parse_block(&mut self) -> Result<Node> {
        let (statements, span) = self.parse_body(&[])?;
        Ok(Node::new(NodeKind::Block(statements), span))
    }

    /// `{ stmts }` with `names` pre-declared in the new scope.
    fn parse_body(&mut self, names: &[String]) -> Result<(Vec<Node>, Span)> {
        let start = self.expect(&TokenKind::LBrace, "to open block")?.span;
        self.scopes.push();
        for name in names {
            self.scopes.declare(name);
        }

        let statements = self.nested(|parser| {
            let mut statements = Vec::new();
            while !parser.check(&TokenKind::RBrace) && !parser.at_end() {
                statements.push(parser.parse_statement()?);
            }
            Ok(statements)
        })?;
        self.expect(&TokenKind::RBrace, "to close block")?;
        self.scopes.pop();

        Ok((statements, start.merge(self.previous_span())))
    }
}
