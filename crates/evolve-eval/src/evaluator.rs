//! Core statement and expression evaluator.

use std::rc::Rc;

use evolve_types::ast::*;
use evolve_types::{ErrorCode, EvolveError, Result, SourceFile, Span};
use log::{debug, trace};

use crate::config::EvalConfig;
use crate::env::Environment;
use crate::value::{FunctionValue, NativeFunction, OpError, Value, ValueKind};

/// Names rejected at variable references even though the lexer lets
/// some of them through as identifiers.
const RESERVED_NAMES: &[&str] = &["var", "if", "else", "while"];

/// Remaining stack below which `exec` switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each extra stack segment.
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// Outcome of executing a node.
#[derive(Debug)]
enum Flow {
    /// The node produced a value.
    Value(Value),
    /// The node produced nothing (an `if` with no matching branch).
    Nothing,
    /// A `return` is unwinding to the enclosing call.
    Return(Value),
}

/// The tree-walking evaluator.
///
/// Holds the source of the code being run (swapped while a function
/// defined in another source executes) and the current call depth.
pub struct Evaluator {
    source: Rc<SourceFile>,
    config: EvalConfig,
    depth: usize,
}

impl Evaluator {
    pub fn new(source: Rc<SourceFile>, config: EvalConfig) -> Self {
        Self {
            source,
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate `node` in `env`.
    ///
    /// A `return` outside any function stops the program and yields its
    /// value. `Ok(None)` means the node produced no value.
    pub fn evaluate(&mut self, node: &Node, env: &Environment) -> Result<Option<Value>> {
        let result = match self.exec(node, env)? {
            Flow::Value(value) | Flow::Return(value) => Some(value),
            Flow::Nothing => None,
        };
        debug!(
            "evaluated {} in '{}': {}",
            self.source.name,
            env.name(),
            result.as_ref().map_or("no value".to_string(), Value::to_string)
        );
        Ok(result)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ══════════════════════════════════════════════════════════════════════

    /// Every nested node and user call passes through here, so this is
    /// where the host stack is grown.
    fn exec(&mut self, node: &Node, env: &Environment) -> Result<Flow> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.dispatch(node, env))
    }

    fn dispatch(&mut self, node: &Node, env: &Environment) -> Result<Flow> {
        let span = node.span;
        match &node.kind {
            NodeKind::NumberLiteral(n) => Ok(self.literal(ValueKind::Number(*n), span, env)),
            NodeKind::StringLiteral(s) => {
                Ok(self.literal(ValueKind::String(s.clone()), span, env))
            }
            NodeKind::BooleanLiteral(b) => Ok(self.literal(ValueKind::Boolean(*b), span, env)),

            NodeKind::VariableRef(name) => self.exec_variable_ref(name, span, env),
            NodeKind::VariableAssign { name, value, .. } => self.exec_assign(name, value, env),

            NodeKind::BinaryOp { left, op, right } => {
                self.exec_binary(left, *op, right, span, env)
            }
            NodeKind::UnaryOp { op, operand } => self.exec_unary(*op, operand, span, env),

            NodeKind::FunctionCall { name, args } => self.exec_call(name, args, span, env),
            NodeKind::FunctionDef { name, params, body } => {
                Ok(self.exec_function_def(name, params, body, span, env))
            }
            NodeKind::Return(value) => self.exec_return(value.as_deref(), span, env),

            NodeKind::If(if_node) => self.exec_if(if_node, env),
            NodeKind::Block(statements) => self.exec_block(statements, span, env),
            NodeKind::Program(statements) => self.exec_statements(statements, env),
        }
    }

    /// Evaluate a node that must produce a value.
    fn value_of(&mut self, node: &Node, env: &Environment) -> Result<Value> {
        match self.exec(node, env)? {
            Flow::Value(value) | Flow::Return(value) => Ok(value),
            Flow::Nothing => Err(self.error(
                ErrorCode::NO_VALUE,
                "expression does not produce a value",
                node.span,
                env,
            )),
        }
    }

    /// Build a runtime error with the traceback of `env`.
    fn error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        env: &Environment,
    ) -> EvolveError {
        EvolveError::new(&self.source, code, message, span)
            .with_traceback(env.traceback(&self.source.name, span))
    }

    // ── Literals & Variables ─────────────────────────────────────────────

    fn literal(&self, kind: ValueKind, span: Span, env: &Environment) -> Flow {
        Flow::Value(Value::new(kind).at(span).in_context(env))
    }

    fn exec_variable_ref(&mut self, name: &str, span: Span, env: &Environment) -> Result<Flow> {
        if RESERVED_NAMES.contains(&name) {
            return Err(self.error(
                ErrorCode::RESERVED_NAME,
                format!("'{name}' is a reserved keyword and cannot be used as a variable name"),
                span,
                env,
            ));
        }
        match env.get(name) {
            Some(value) => Ok(Flow::Value(value.at(span))),
            None => Err(self.error(
                ErrorCode::NOT_DEFINED,
                format!("'{name}' is not defined"),
                span,
                env,
            )),
        }
    }

    /// Declarations and updates both bind in the current environment.
    fn exec_assign(&mut self, name: &str, value: &Node, env: &Environment) -> Result<Flow> {
        let value = self.value_of(value, env)?;
        env.set(name, value.clone());
        Ok(Flow::Value(value))
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn exec_binary(
        &mut self,
        left: &Node,
        op: BinaryOperator,
        right: &Node,
        span: Span,
        env: &Environment,
    ) -> Result<Flow> {
        let lhs = self.value_of(left, env)?;
        let rhs = self.value_of(right, env)?;
        match lhs.binary(op, &rhs) {
            Ok(kind) => Ok(Flow::Value(Value::new(kind).at(span).in_context(env))),
            Err(OpError::DivisionByZero) => Err(self.error(
                ErrorCode::DIVISION_BY_ZERO,
                "Division by zero",
                right.span,
                env,
            )),
            Err(OpError::Illegal) => Err(self.error(
                ErrorCode::ILLEGAL_OPERATION,
                format!(
                    "illegal operation '{op}' between {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
                env,
            )),
        }
    }

    fn exec_unary(
        &mut self,
        op: UnaryOperator,
        operand: &Node,
        span: Span,
        env: &Environment,
    ) -> Result<Flow> {
        let value = self.value_of(operand, env)?;
        let kind = match op {
            UnaryOperator::Plus => value.kind,
            UnaryOperator::Minus => match value.binary(BinaryOperator::Mul, &Value::number(-1.0)) {
                Ok(kind) => kind,
                Err(_) => {
                    return Err(self.error(
                        ErrorCode::ILLEGAL_OPERATION,
                        format!("illegal operation '-' on {}", value.type_name()),
                        span,
                        env,
                    ))
                }
            },
        };
        Ok(Flow::Value(Value::new(kind).at(span).in_context(env)))
    }

    // ── Functions ────────────────────────────────────────────────────────

    fn exec_function_def(
        &mut self,
        name: &str,
        params: &[String],
        body: &[Node],
        span: Span,
        env: &Environment,
    ) -> Flow {
        let function = FunctionValue {
            name: name.to_string(),
            params: params.into(),
            body: body.into(),
            closure: env.clone(),
            source: Rc::clone(&self.source),
        };
        let value = Value::new(ValueKind::Function(function))
            .at(span)
            .in_context(env);
        env.set(name, value.clone());
        Flow::Value(value)
    }

    fn exec_call(
        &mut self,
        name: &str,
        args: &[Node],
        span: Span,
        env: &Environment,
    ) -> Result<Flow> {
        let Some(callee) = env.get(name) else {
            return Err(self.error(
                ErrorCode::NOT_DEFINED,
                format!("'{name}' is not defined"),
                span,
                env,
            ));
        };

        let result = match callee.kind {
            ValueKind::Function(function) => {
                let values = self.eval_args(args, env)?;
                self.call_function(&function, values, span, env)?
            }
            ValueKind::Native(native) => {
                let values = self.eval_args(args, env)?;
                self.call_native(&native, &values, span, env)?
            }
            _ => {
                return Err(self.error(
                    ErrorCode::NOT_CALLABLE,
                    format!("'{name}' is not callable"),
                    span,
                    env,
                ))
            }
        };
        Ok(Flow::Value(result.at(span).in_context(env)))
    }

    fn eval_args(&mut self, args: &[Node], env: &Environment) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.value_of(arg, env)).collect()
    }

    /// Run a user function in a fresh frame whose parent is the
    /// function's defining environment.
    fn call_function(
        &mut self,
        function: &FunctionValue,
        args: Vec<Value>,
        span: Span,
        caller: &Environment,
    ) -> Result<Value> {
        if args.len() != function.params.len() {
            return Err(self.error(
                ErrorCode::ARITY_MISMATCH,
                format!(
                    "'{}' takes {} argument(s), got {}",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
                span,
                caller,
            ));
        }
        if self.depth >= self.config.max_call_depth {
            return Err(self.error(
                ErrorCode::RECURSION_LIMIT,
                "maximum recursion depth exceeded",
                span,
                caller,
            ));
        }

        let frame = Environment::call(
            &function.name,
            &function.closure,
            caller,
            span,
            &self.source.name,
        );
        for (param, arg) in function.params.iter().zip(args) {
            frame.set(param.as_str(), arg);
        }

        trace!("call {} (depth {})", function.name, self.depth + 1);
        self.depth += 1;
        let caller_source = std::mem::replace(&mut self.source, Rc::clone(&function.source));
        let flow = self.exec_statements(&function.body, &frame);
        self.source = caller_source;
        self.depth -= 1;

        Ok(match flow? {
            Flow::Value(value) | Flow::Return(value) => value,
            Flow::Nothing => Value::number(0.0),
        })
    }

    fn call_native(
        &mut self,
        native: &NativeFunction,
        args: &[Value],
        span: Span,
        env: &Environment,
    ) -> Result<Value> {
        trace!("call native {} with {} argument(s)", native.name, args.len());
        match (native.handler)(args) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(Value::number(0.0)),
            Err(e) => Err(self.error(ErrorCode::NATIVE_FAILURE, e.to_string(), span, env)),
        }
    }

    fn exec_return(&mut self, value: Option<&Node>, span: Span, env: &Environment) -> Result<Flow> {
        let value = match value {
            Some(node) => self.value_of(node, env)?,
            None => Value::number(0.0).at(span).in_context(env),
        };
        Ok(Flow::Return(value))
    }

    // ── Control Flow ─────────────────────────────────────────────────────

    /// The first truthy branch runs, in a block scope of its own.
    fn exec_if(&mut self, if_node: &IfNode, env: &Environment) -> Result<Flow> {
        if self.value_of(&if_node.condition, env)?.is_truthy() {
            return self.exec_branch(&if_node.body, env);
        }
        for clause in &if_node.elseif_clauses {
            if self.value_of(&clause.condition, env)?.is_truthy() {
                return self.exec_branch(&clause.body, env);
            }
        }
        match &if_node.else_body {
            Some(body) => self.exec_branch(body, env),
            None => Ok(Flow::Nothing),
        }
    }

    fn exec_branch(&mut self, body: &Node, env: &Environment) -> Result<Flow> {
        let scope = Environment::block(env);
        self.exec(body, &scope)
    }

    /// An empty block yields zero.
    fn exec_block(&mut self, statements: &[Node], span: Span, env: &Environment) -> Result<Flow> {
        if statements.is_empty() {
            return Ok(Flow::Value(Value::number(0.0).at(span).in_context(env)));
        }
        self.exec_statements(statements, env)
    }

    /// Run statements in order; the last one's result is the result. A
    /// `return` stops the sequence.
    fn exec_statements(&mut self, statements: &[Node], env: &Environment) -> Result<Flow> {
        let mut last = Flow::Nothing;
        for statement in statements {
            match self.exec(statement, env)? {
                flow @ Flow::Return(_) => return Ok(flow),
                flow => last = flow,
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_node(node: &Node) -> Result<Option<Value>> {
        let sf = Rc::new(SourceFile::new("test.ev", "x"));
        let env = Environment::new();
        Evaluator::new(sf, EvalConfig::default()).evaluate(node, &env)
    }

    fn node(kind: NodeKind) -> Box<Node> {
        Box::new(Node::new(kind, Span::default()))
    }

    #[test]
    fn test_literal_is_stamped_with_span() {
        let value = eval_node(&node(NodeKind::NumberLiteral(7.0))).unwrap().unwrap();
        assert_eq!(value.as_number(), Some(7.0));
        assert_eq!(value.span, Some(Span::default()));
    }

    #[test]
    fn test_unary_minus_on_string_is_illegal() {
        let expr = node(NodeKind::UnaryOp {
            op: UnaryOperator::Minus,
            operand: node(NodeKind::StringLiteral("a".into())),
        });
        let err = eval_node(&expr).unwrap_err();
        assert_eq!(err.code, ErrorCode::ILLEGAL_OPERATION);
        assert_eq!(err.message, "illegal operation '-' on String");
    }

    #[test]
    fn test_unary_plus_is_identity() {
        let expr = node(NodeKind::UnaryOp {
            op: UnaryOperator::Plus,
            operand: node(NodeKind::StringLiteral("a".into())),
        });
        assert_eq!(eval_node(&expr).unwrap(), Some(Value::string("a")));
    }

    #[test]
    fn test_empty_block_yields_zero() {
        let block = node(NodeKind::Block(vec![]));
        assert_eq!(eval_node(&block).unwrap(), Some(Value::number(0.0)));
    }

    #[test]
    fn test_reserved_name_reference() {
        let err = eval_node(&node(NodeKind::VariableRef("while".into()))).unwrap_err();
        assert_eq!(err.code, ErrorCode::RESERVED_NAME);
        assert_eq!(err.traceback.len(), 1);
    }

    #[test]
    fn test_top_level_return_stops_program() {
        let program = node(NodeKind::Program(vec![
            *node(NodeKind::Return(Some(node(NodeKind::NumberLiteral(1.0))))),
            *node(NodeKind::VariableRef("missing".into())),
        ]));
        assert_eq!(eval_node(&program).unwrap(), Some(Value::number(1.0)));
    }
}
