//! Evolve interpreter: orchestrates the full pipeline.
//!
//! ```text
//! Evolve Source → Lexer → Parser → Evaluator → Value
//! ```
//!
//! [`run`] executes one program in a fresh environment with the builtins
//! installed. [`run_in`] executes against an environment the caller owns,
//! so bindings survive from one run to the next.

mod pipeline;

pub use pipeline::{parse_source, run, run_in};

pub use evolve_eval::{
    builtins, register_native, ConfigError, EvalConfig, Environment, NativeError, Value,
    ValueKind,
};
pub use evolve_types::{ErrorCategory, ErrorCode, EvolveError, Frame, Result, SourceFile, Span};
