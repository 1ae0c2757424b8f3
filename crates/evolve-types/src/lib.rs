//! Shared types for the Evolve interpreter.
//!
//! This crate defines source positions, the AST, and the error type
//! used across the lexer, parser and evaluator.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCategory, ErrorCode, EvolveError, Frame};
pub use span::{Position, SourceFile, Span};

/// Result type used throughout the Evolve pipeline.
pub type Result<T> = std::result::Result<T, EvolveError>;
