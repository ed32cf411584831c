//! Source Location Utilities
//!
//! Trees and edits are addressed by byte offset only. Rows and columns are
//! derived on demand from the source buffer, either one position at a time
//! or through a [`LineIndex`] when many lookups hit the same document.

use memchr::memchr_iter;
use std::fmt;

/// A position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourcePosition {
    /// Byte offset from start of input
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number in bytes (1-based)
    pub column: usize,
}

impl SourcePosition {
    /// Create a new source position
    #[inline]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Create a position at the start of input
    #[inline]
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Calculate position from an offset in the input
    pub fn from_offset(input: &[u8], offset: usize) -> Self {
        let offset = offset.min(input.len());
        let before = &input[..offset];
        let line = memchr_iter(b'\n', before).count() + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);

        Self {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

/// A range in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Start position
    pub start: SourcePosition,
    /// End position
    pub end: SourcePosition,
}

impl SourceSpan {
    /// Create a new span
    #[inline]
    pub fn new(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// Create a span from offsets
    pub fn from_offsets(input: &[u8], start_offset: usize, end_offset: usize) -> Self {
        Self {
            start: SourcePosition::from_offset(input, start_offset),
            end: SourcePosition::from_offset(input, end_offset),
        }
    }

    /// Get the length of this span in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Check if this is a zero-length span
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "line {}, columns {}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "line {}, column {} to line {}, column {}",
                self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}

/// Line start table for repeated offset lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Index the line starts of `input`
    pub fn new(input: &[u8]) -> Self {
        let mut line_starts = Vec::with_capacity(input.len() / 40 + 1);
        line_starts.push(0);
        line_starts.extend(memchr_iter(b'\n', input).map(|i| i + 1));
        Self {
            line_starts,
            len: input.len(),
        }
    }

    /// Number of lines (a trailing newline starts an empty last line)
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of `offset`, clamped to the input
    pub fn position(&self, offset: usize) -> SourcePosition {
        let offset = offset.min(self.len);
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        SourcePosition::new(offset, line, offset - line_start + 1)
    }

    /// Offset of a 1-based line and column, clamped to the input
    pub fn offset(&self, line: usize, column: usize) -> usize {
        match self.line_starts.get(line.saturating_sub(1)) {
            Some(&start) => (start + column.saturating_sub(1)).min(self.len),
            None => self.len,
        }
    }
}
