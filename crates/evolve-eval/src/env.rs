//! Chained runtime environments.
//!
//! An [`Environment`] is a cheap reference-counted handle. Each one owns
//! its local bindings and points at its lexical parent; lookups walk the
//! parent chain, writes are always local. Call frames additionally
//! remember the calling environment, the call site and the source the
//! call site lives in, which is what tracebacks follow.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::{Rc, Weak};

use evolve_types::{Frame, Span};

use crate::config::DEFAULT_ROOT_NAME;
use crate::value::Value;

#[derive(Debug)]
enum ScopeKind {
    Root,
    Call {
        caller: Environment,
        call_site: Span,
        caller_file: String,
    },
    /// `if` bodies. Not shown in tracebacks.
    Block,
}

struct Scope {
    name: String,
    kind: ScopeKind,
    parent: Option<Environment>,
    bindings: RefCell<BTreeMap<String, Value>>,
}

/// Handle to one environment in the chain.
#[derive(Clone)]
pub struct Environment(Rc<Scope>);

/// Non-owning handle, held by values to remember where they were made.
#[derive(Clone, Default)]
pub struct WeakEnvironment(Weak<Scope>);

impl Environment {
    /// A root environment named `<program>`.
    pub fn new() -> Self {
        Self::root(DEFAULT_ROOT_NAME)
    }

    /// A root environment with the given display name.
    pub fn root(name: impl Into<String>) -> Self {
        Self::with_scope(name.into(), ScopeKind::Root, None)
    }

    /// Frame for a call to `name`: lexically nested in `parent` (the
    /// function's defining environment), called from `caller` at
    /// `call_site` in the source named `caller_file`.
    pub(crate) fn call(
        name: &str,
        parent: &Environment,
        caller: &Environment,
        call_site: Span,
        caller_file: &str,
    ) -> Self {
        let kind = ScopeKind::Call {
            caller: caller.clone(),
            call_site,
            caller_file: caller_file.to_string(),
        };
        Self::with_scope(name.to_string(), kind, Some(parent.clone()))
    }

    /// Nested block scope; shares the display name of `parent`.
    pub(crate) fn block(parent: &Environment) -> Self {
        Self::with_scope(
            parent.0.name.clone(),
            ScopeKind::Block,
            Some(parent.clone()),
        )
    }

    fn with_scope(name: String, kind: ScopeKind, parent: Option<Environment>) -> Self {
        Self(Rc::new(Scope {
            name,
            kind,
            parent,
            bindings: RefCell::new(BTreeMap::new()),
        }))
    }

    /// Display name used in tracebacks.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// Look `name` up here, then in each parent.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(value) = current.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            env = current.parent();
        }
        None
    }

    /// Bind `name` in this environment's own bindings, shadowing any
    /// binding further up the chain.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    /// Every name visible from this environment, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        let mut env = Some(self);
        while let Some(current) = env {
            names.extend(current.0.bindings.borrow().keys().cloned());
            env = current.parent();
        }
        names.into_iter().collect()
    }

    /// Frames of the active calls, outermost first, for an error raised
    /// at `span` in source `file` while executing in this environment.
    pub fn traceback(&self, file: &str, span: Span) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut env = Some(self.clone());
        let mut file = file.to_string();
        let mut line = span.start.line;
        while let Some(current) = env.take() {
            match &current.0.kind {
                ScopeKind::Block => env = current.0.parent.clone(),
                ScopeKind::Root => {
                    frames.push(Frame::new(current.name(), file.as_str(), Some(line)));
                }
                ScopeKind::Call {
                    caller,
                    call_site,
                    caller_file,
                } => {
                    frames.push(Frame::new(current.name(), file.as_str(), Some(line)));
                    file = caller_file.clone();
                    line = call_site.start.line;
                    env = Some(caller.clone());
                }
            }
        }
        frames.reverse();
        frames
    }

    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment(Rc::downgrade(&self.0))
    }

    /// Whether both handles point at the same environment.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bindings may hold functions that capture this environment.
        f.debug_struct("Environment")
            .field("name", &self.0.name)
            .field("names", &self.0.bindings.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WeakEnvironment {
    pub fn upgrade(&self) -> Option<Environment> {
        self.0.upgrade().map(Environment)
    }
}

impl fmt::Debug for WeakEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(env) => write!(f, "WeakEnvironment({})", env.name()),
            None => f.write_str("WeakEnvironment(<dropped>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolve_types::Position;

    fn span_on_line(line: u32) -> Span {
        Span::point(Position::new(0, line, 0))
    }

    #[test]
    fn test_get_walks_parents() {
        let root = Environment::new();
        root.set("x", Value::number(1.0));
        let block = Environment::block(&root);
        assert_eq!(block.get("x"), Some(Value::number(1.0)));
        assert!(!block.contains_local("x"));
        assert!(block.get("y").is_none());
    }

    #[test]
    fn test_set_shadows_instead_of_updating_parent() {
        let root = Environment::new();
        root.set("x", Value::number(1.0));
        let block = Environment::block(&root);
        block.set("x", Value::number(2.0));
        assert_eq!(block.get("x"), Some(Value::number(2.0)));
        assert_eq!(root.get("x"), Some(Value::number(1.0)));
    }

    #[test]
    fn test_names_merges_chain() {
        let root = Environment::new();
        root.set("b", Value::number(1.0));
        root.set("a", Value::number(1.0));
        let block = Environment::block(&root);
        block.set("c", Value::number(1.0));
        block.set("a", Value::number(2.0));
        assert_eq!(block.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_traceback_follows_callers() {
        let root = Environment::new();
        let outer = Environment::call("outer", &root, &root, span_on_line(9), "main.ev");
        let inner = Environment::call("inner", &root, &outer, span_on_line(4), "main.ev");
        let block = Environment::block(&inner);

        let frames = block.traceback("main.ev", span_on_line(2));
        assert_eq!(
            frames,
            vec![
                Frame::new("<program>", "main.ev", Some(9)),
                Frame::new("outer", "main.ev", Some(4)),
                Frame::new("inner", "main.ev", Some(2)),
            ]
        );
    }

    #[test]
    fn test_traceback_names_the_caller_source() {
        let root = Environment::new();
        let helper = Environment::call("helper", &root, &root, span_on_line(3), "main.ev");

        let frames = helper.traceback("lib.ev", span_on_line(0));
        assert_eq!(
            frames,
            vec![
                Frame::new("<program>", "main.ev", Some(3)),
                Frame::new("helper", "lib.ev", Some(0)),
            ]
        );
    }

    #[test]
    fn test_weak_handle_does_not_keep_environment_alive() {
        let env = Environment::root("temp");
        let weak = env.downgrade();
        assert!(weak.upgrade().is_some_and(|e| e.ptr_eq(&env)));
        drop(env);
        assert!(weak.upgrade().is_none());
    }
}
