//! Runtime values and their operator semantics.

use std::fmt;
use std::rc::Rc;

use evolve_types::ast::{BinaryOperator, Node};
use evolve_types::{SourceFile, Span};

use crate::env::{Environment, WeakEnvironment};
use crate::error::NativeError;

/// Host function signature. Returning `Ok(None)` means "no value".
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Option<Value>, NativeError>>;

/// A runtime value.
///
/// Besides its payload a value remembers where it was produced: the span
/// of the expression and, weakly, the environment it was evaluated in.
/// Neither takes part in equality.
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Option<Span>,
    context: Option<WeakEnvironment>,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Function(FunctionValue),
    Native(NativeFunction),
}

/// A user-defined function together with its defining environment.
#[derive(Clone)]
pub struct FunctionValue {
    pub name: String,
    pub params: Rc<[String]>,
    pub body: Rc<[Node]>,
    /// Captured by reference so the function stays callable after the
    /// frame that defined it has returned.
    pub closure: Environment,
    /// Source the body was parsed from, for diagnostics.
    pub source: Rc<SourceFile>,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub handler: NativeFn,
}

/// Why a binary operation has no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpError {
    Illegal,
    DivisionByZero,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            span: None,
            context: None,
        }
    }

    pub fn number(n: f64) -> Self {
        Self::new(ValueKind::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ValueKind::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(ValueKind::Boolean(b))
    }

    /// Reposition the value.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Record the environment the value was produced in.
    pub fn in_context(mut self, env: &Environment) -> Self {
        self.context = Some(env.downgrade());
        self
    }

    /// The environment the value was produced in, if it is still alive.
    pub fn context(&self) -> Option<Environment> {
        self.context.as_ref().and_then(WeakEnvironment::upgrade)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Booleans use their payload; zero and the strings `"0"`, `"false"`
    /// and `"None"` are false; everything else is true.
    pub fn is_truthy(&self) -> bool {
        match &self.kind {
            ValueKind::Boolean(b) => *b,
            ValueKind::Number(n) => *n != 0.0,
            ValueKind::String(s) => !matches!(s.as_str(), "0" | "false" | "None"),
            ValueKind::Function(_) | ValueKind::Native(_) => true,
        }
    }

    /// Apply a binary operator with `self` as the left operand.
    pub fn binary(&self, op: BinaryOperator, rhs: &Value) -> Result<ValueKind, OpError> {
        use BinaryOperator::*;
        use ValueKind::{Boolean, Number, String};

        let kind = match (&self.kind, op, &rhs.kind) {
            (Number(a), Add, Number(b)) => Number(a + b),
            (Number(a), Sub, Number(b)) => Number(a - b),
            (Number(a), Mul, Number(b)) => Number(a * b),
            (Number(_), Div, Number(b)) if *b == 0.0 => return Err(OpError::DivisionByZero),
            (Number(a), Div, Number(b)) => Number(a / b),
            (String(a), Add, String(b)) => String(format!("{a}{b}")),

            (Number(a), Greater, Number(b)) => Boolean(a > b),
            (Number(a), Less, Number(b)) => Boolean(a < b),
            (Number(a), GreaterEq, Number(b)) => Boolean(a >= b),
            (Number(a), LessEq, Number(b)) => Boolean(a <= b),

            (Number(a), Eq, Number(b)) => Boolean(a == b),
            (Number(a), NotEq, Number(b)) => Boolean(a != b),
            (String(a), Eq, String(b)) => Boolean(a == b),
            (String(a), NotEq, String(b)) => Boolean(a != b),
            (Boolean(a), Eq, Boolean(b)) => Boolean(a == b),
            (Boolean(a), NotEq, Boolean(b)) => Boolean(a != b),

            _ => return Err(OpError::Illegal),
        };
        Ok(kind)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<ValueKind> for Value {
    fn from(kind: ValueKind) -> Self {
        Self::new(kind)
    }
}

impl ValueKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "Number",
            Self::String(_) => "String",
            Self::Boolean(_) => "Boolean",
            Self::Function(_) => "Function",
            Self::Native(_) => "BuiltInFunction",
        }
    }
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(&a.body, &b.body),
            (Self::Native(a), Self::Native(b)) => Rc::ptr_eq(&a.handler, &b.handler),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a fractional part.
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Function(func) => write!(f, "<function {}>", func.name),
            Self::Native(native) => write!(f, "<built-in function {}>", native.name),
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, NativeError> + 'static,
    {
        Self {
            name: name.into(),
            handler: Rc::new(handler),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}
