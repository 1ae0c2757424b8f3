use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a source file.
///
/// All three coordinates are 0-based. Lines and columns are shifted to
/// 1-based only when rendered for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// Byte offset into the source text.
    pub offset: usize,
    pub line: u32,
    /// Column in characters.
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Step past `ch`. A newline moves to column 0 of the next line.
    pub fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }
}

/// Half-open source range: `end` points just past the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Create a new span.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a zero-width span at a single position.
    pub fn point(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Span::new(start, end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line + 1, self.start.column + 1)
    }
}

/// Holds the source text for error reporting.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a source line by 0-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line: u32) -> Option<&str> {
        let idx = line as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1)) // strip the \n
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Render every line `span` touches with a caret line underneath the
    /// covered columns. At least one caret is drawn per line.
    pub fn excerpt(&self, span: Span) -> String {
        let last = span.end.line.max(span.start.line);
        let mut out = String::new();
        for line_no in span.start.line..=last {
            let Some(text) = self.line(line_no) else {
                break;
            };
            let text = text.replace('\t', " ");
            let col_start = if line_no == span.start.line {
                span.start.column
            } else {
                0
            };
            let col_end = if line_no == last {
                span.end.column
            } else {
                text.chars().count() as u32
            };
            let carets = col_end.saturating_sub(col_start).max(1);

            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&text);
            out.push('\n');
            out.push_str(&" ".repeat(col_start as usize));
            out.push_str(&"^".repeat(carets as usize));
        }
        out
    }
}
