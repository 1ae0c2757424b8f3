//! Evolve tree-walking evaluator.
//!
//! Runs a parsed program against a chain of [`Environment`]s and produces
//! a [`Value`] or a runtime [`evolve_types::EvolveError`] with traceback.

pub mod builtins;
mod config;
mod env;
mod error;
mod evaluator;
mod value;

pub use config::{EvalConfig, DEFAULT_MAX_CALL_DEPTH, DEFAULT_ROOT_NAME};
pub use env::{Environment, WeakEnvironment};
pub use error::{ConfigError, NativeError};
pub use evaluator::Evaluator;
pub use value::{FunctionValue, NativeFn, NativeFunction, OpError, Value, ValueKind};

/// Bind a host function under `name` in `env`.
///
/// The handler receives the evaluated arguments. Returning `Ok(None)`
/// makes the call evaluate to zero; an `Err` becomes a runtime error at
/// the call site.
pub fn register_native<F>(env: &Environment, name: &str, handler: F)
where
    F: Fn(&[Value]) -> Result<Option<Value>, NativeError> + 'static,
{
    let native = NativeFunction::new(name, handler);
    env.set(name, Value::new(ValueKind::Native(native)).in_context(env));
}
