//! Parse-time declaration table.
//!
//! A stack of scopes mirroring runtime nesting: the bottom scope holds
//! names supplied by the embedder, the next one the program's top level,
//! and one more is pushed for every `{ … }` body.

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub(crate) struct Scopes {
    stack: Vec<BTreeSet<String>>,
}

impl Scopes {
    /// Prelude scope holding `globals`, plus an empty program scope.
    pub(crate) fn new<I, S>(globals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prelude = globals.into_iter().map(Into::into).collect();
        Self {
            stack: vec![prelude, BTreeSet::new()],
        }
    }

    pub(crate) fn push(&mut self) {
        self.stack.push(BTreeSet::new());
    }

    /// The prelude and program scopes are never popped.
    pub(crate) fn pop(&mut self) {
        if self.stack.len() > 2 {
            self.stack.pop();
        }
    }

    pub(crate) fn declare(&mut self, name: &str) {
        if let Some(scope) = self.stack.last_mut() {
            scope.insert(name.to_string());
        }
    }

    /// Whether `name` is already declared in the innermost scope.
    pub(crate) fn declared_locally(&self, name: &str) -> bool {
        self.stack.last().is_some_and(|s| s.contains(name))
    }

    /// Whether `name` is visible from the innermost scope.
    pub(crate) fn is_visible(&self, name: &str) -> bool {
        self.stack.iter().rev().any(|s| s.contains(name))
    }
}
