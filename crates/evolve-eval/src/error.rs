//! Error types internal to the evaluator crate.
//!
//! User-facing failures are [`evolve_types::EvolveError`]s. The enums here
//! cover the two seams where foreign code reports problems: native
//! function handlers and evaluator configuration.

use thiserror::Error;

/// Failure reported by a native (host-provided) function.
///
/// The evaluator turns it into a runtime error at the call site.
#[derive(Debug, Error)]
pub enum NativeError {
    /// Wrong number of arguments.
    #[error("{name}() takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    /// An argument of the wrong kind.
    #[error("{name}() expects a {expected} argument, got {got}")]
    ArgumentKind {
        name: String,
        expected: &'static str,
        got: &'static str,
    },

    /// The arguments are outside the function's domain.
    #[error("{name}(): {message}")]
    Domain { name: String, message: String },

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else a host function wants to report.
    #[error("{0}")]
    Custom(String),
}

/// Invalid evaluator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid evaluator config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max_call_depth must be at least 1")]
    ZeroCallDepth,
}
