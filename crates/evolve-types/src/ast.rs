//! AST node types for the Evolve language.
//!
//! Every node carries a [`Span`] covering its own tokens and all of its
//! children. The node set is closed: the evaluator matches on
//! [`NodeKind`] exhaustively.

use crate::Span;
use std::fmt;

/// A spanned AST node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Integer and float literals both evaluate to a Number.
    NumberLiteral(f64),
    StringLiteral(String),
    BooleanLiteral(bool),

    VariableRef(String),
    /// `var name = value;` (`is_declaration`) or `name = value;`.
    VariableAssign {
        name: String,
        value: Box<Node>,
        is_declaration: bool,
    },

    BinaryOp {
        left: Box<Node>,
        op: BinaryOperator,
        right: Box<Node>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Node>,
    },

    FunctionCall {
        name: String,
        args: Vec<Node>,
    },
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Node>,
    },
    Return(Option<Box<Node>>),

    If(Box<IfNode>),
    Block(Vec<Node>),
    Program(Vec<Node>),
}

/// `if (cond) { … } elseif (cond) { … } else { … }`
///
/// Each body is a [`NodeKind::Block`] node.
#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Node,
    pub body: Node,
    pub elseif_clauses: Vec<ElseIfClause>,
    pub else_body: Option<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIfClause {
    pub condition: Node,
    pub body: Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Greater,
    Less,
    GreaterEq,
    LessEq,
    Eq,
    NotEq,
}

impl BinaryOperator {
    /// `true` for the six relational operators.
    pub fn is_relational(self) -> bool {
        !matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div)
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterEq => ">=",
            Self::LessEq => "<=",
            Self::Eq => "==",
            Self::NotEq => "!=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// Unary `+`; identity.
    Plus,
    /// Unary `-`; multiplies by -1.
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
        }
    }
}
