//! Evaluator configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default bound on nested user function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Display name of the root environment.
pub const DEFAULT_ROOT_NAME: &str = "<program>";

/// Limits and names used while evaluating a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Nested user calls allowed before evaluation fails with a
    /// recursion-limit error.
    pub max_call_depth: usize,
    /// Frame name shown for top-level code in tracebacks.
    pub root_name: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            root_name: DEFAULT_ROOT_NAME.to_string(),
        }
    }
}

impl EvalConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.max_call_depth == 0 {
            return Err(ConfigError::ZeroCallDepth);
        }
        Ok(config)
    }
}
