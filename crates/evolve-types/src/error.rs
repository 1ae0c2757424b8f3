use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    Runtime,
}

/// Numeric error code (E100–E399).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical errors (E100–E199) ──
    pub const ILLEGAL_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);

    // ── Syntax errors (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const EMPTY_PROGRAM: Self = Self(201);
    pub const ALREADY_DECLARED: Self = Self(202);
    pub const UNDECLARED_NAME: Self = Self(203);
    pub const RESERVED_KEYWORD: Self = Self(204);
    pub const NESTING_TOO_DEEP: Self = Self(205);

    // ── Runtime errors (E300–E399) ──
    pub const NOT_DEFINED: Self = Self(300);
    pub const NOT_CALLABLE: Self = Self(301);
    pub const ARITY_MISMATCH: Self = Self(302);
    pub const ILLEGAL_OPERATION: Self = Self(303);
    pub const DIVISION_BY_ZERO: Self = Self(304);
    pub const RECURSION_LIMIT: Self = Self(305);
    pub const RESERVED_NAME: Self = Self(306);
    pub const NO_VALUE: Self = Self(307);
    pub const NATIVE_FAILURE: Self = Self(308);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Lexical,
            200..=299 => ErrorCategory::Syntax,
            _ => ErrorCategory::Runtime,
        }
    }

    /// The error kind shown at the start of a rendered diagnostic.
    pub fn title(self) -> &'static str {
        match self {
            Self::ILLEGAL_CHARACTER => "Illegal Character",
            Self::UNTERMINATED_STRING => "Unterminated String",
            _ => match self.category() {
                ErrorCategory::Lexical => "Lexical Error",
                ErrorCategory::Syntax => "Invalid Syntax",
                ErrorCategory::Runtime => "Runtime Error",
            },
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Syntax => write!(f, "syntax"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// One traceback entry: the frame's display name, the source it was
/// executing and the 0-based line within it, if known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    /// A frame's source can differ from the error's when a function
    /// defined by an earlier run is called.
    #[serde(default)]
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Frame {
    pub fn new(name: impl Into<String>, file: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            line,
        }
    }
}

/// A structured Evolve error.
///
/// Lexical, syntax and runtime failures all use this type; the code
/// determines the category. Runtime errors also carry a traceback,
/// outermost frame first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolveError {
    /// Source file name.
    pub file: String,
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable details.
    pub message: String,
    pub span: Span,
    /// Source lines under the span with caret markers.
    pub excerpt: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub traceback: Vec<Frame>,
}

impl EvolveError {
    /// Create a new error located at `span` in `source`.
    pub fn new(
        source: &SourceFile,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            file: source.name.clone(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            excerpt: source.excerpt(span),
            traceback: Vec::new(),
        }
    }

    /// Attach a traceback (outermost frame first).
    pub fn with_traceback(mut self, traceback: Vec<Frame>) -> Self {
        self.traceback = traceback;
        self
    }

    /// 1-based line number for display.
    pub fn line(&self) -> u32 {
        self.span.start.line + 1
    }

    /// Structured JSON form of the error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for EvolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.traceback.is_empty() {
            writeln!(f, "Traceback (most recent call last):")?;
            for frame in &self.traceback {
                match frame.line {
                    Some(line) => writeln!(
                        f,
                        "  File {}, line {}, in {}",
                        frame.file,
                        line + 1,
                        frame.name
                    )?,
                    None => writeln!(f, "  In {}:", frame.name)?,
                }
            }
        }
        writeln!(f, "{}: {}", self.code.title(), self.message)?;
        writeln!(f, "File {}, line {}", self.file, self.line())?;
        write!(f, "\n{}", self.excerpt)
    }
}

impl std::error::Error for EvolveError {}
