//! Evolve parser: converts a token stream into an AST.
//!
//! Name declarations are checked while parsing, against a stack of scopes
//! that follows `{ … }` nesting.

mod parse_expr;
mod parse_stmt;
mod parser;
mod scope;

pub use parser::{Parser, MAX_NESTING_DEPTH};

use evolve_lexer::Token;
use evolve_types::ast::Node;
use evolve_types::{Result, SourceFile};

/// Parse `tokens` with no predeclared names.
pub fn parse(tokens: Vec<Token>, source_file: &SourceFile) -> Result<Node> {
    Parser::new(tokens, source_file).parse()
}
