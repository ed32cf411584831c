//! External scanner extension point
//!
//! Some tokens cannot be described by literals or regular expressions because
//! they depend on what came before: whether a closing tag matches the element
//! that is open, whether an element ends without a closing tag, where a raw
//! text body stops. The grammar marks those places with
//! [`Atom::External`](super::grammar::Atom::External) and the engine asks an
//! [`ExternalScanner`] to resolve them.
//!
//! The scanner never owns state. Everything it remembers lives in a
//! [`ScannerState`] value that the engine threads through the parse,
//! snapshots on backtracking and stores on tree nodes for incremental reuse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::syntax_kind::SyntaxKind;

/// Tokens only the external scanner can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExternalKind {
    /// Name of a start tag; pushes the tag stack
    StartTagName,
    /// Name of an end tag matching the innermost open element; pops
    EndTagName,
    /// Name of an end tag that matches nothing; stack untouched
    ErroneousEndTagName,
    /// `/>`; pops
    SelfClosingTagDelimiter,
    /// Zero-width close of the innermost element; pops
    ImplicitEndTag,
    /// Verbatim body of a raw text element
    RawText,
    /// `<!-- ... -->`
    Comment,
}

impl ExternalKind {
    /// Kind of the token emitted into the tree (before aliasing)
    pub fn syntax_kind(self) -> SyntaxKind {
        match self {
            ExternalKind::StartTagName => SyntaxKind::StartTagName,
            ExternalKind::EndTagName => SyntaxKind::EndTagName,
            ExternalKind::ErroneousEndTagName => SyntaxKind::ErroneousEndTagName,
            ExternalKind::SelfClosingTagDelimiter => SyntaxKind::SlashRAngle,
            ExternalKind::ImplicitEndTag => SyntaxKind::Anonymous,
            ExternalKind::RawText => SyntaxKind::RawText,
            ExternalKind::Comment => SyntaxKind::Comment,
        }
    }

    /// Whether the engine skips whitespace before asking for this token
    pub fn skips_trivia(self) -> bool {
        !matches!(self, ExternalKind::RawText)
    }
}

/// Set of external kinds valid at a point of the grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ExternalSet(u8);

impl ExternalSet {
    /// The empty set
    pub const EMPTY: ExternalSet = ExternalSet(0);

    /// Set containing one kind
    #[inline]
    pub fn only(kind: ExternalKind) -> Self {
        ExternalSet(1 << kind as u8)
    }

    /// Add a kind
    #[inline]
    pub fn with(self, kind: ExternalKind) -> Self {
        ExternalSet(self.0 | (1 << kind as u8))
    }

    /// Membership test
    #[inline]
    pub fn contains(self, kind: ExternalKind) -> bool {
        self.0 & (1 << kind as u8) != 0
    }
}

impl FromIterator<ExternalKind> for ExternalSet {
    fn from_iter<I: IntoIterator<Item = ExternalKind>>(iter: I) -> Self {
        iter.into_iter().fold(ExternalSet::EMPTY, ExternalSet::with)
    }
}

/// Token returned by a scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedToken {
    /// Which external token was recognized
    pub kind: ExternalKind,
    /// End of the token (exclusive); equal to the start for zero-width tokens
    pub end: usize,
}

/// Read cursor handed to the scanner
///
/// Records the furthest byte looked at, including a look at the end of input,
/// so the engine knows which edits can change the scanner's answer.
#[derive(Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    examined: usize,
}

impl<'a> Cursor<'a> {
    /// Cursor at `pos`
    #[inline]
    pub fn new(input: &'a [u8], pos: usize) -> Self {
        Self {
            input,
            pos,
            examined: pos,
        }
    }

    /// Current position
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Byte at the cursor, `None` at end of input
    #[inline]
    pub fn peek(&mut self) -> Option<u8> {
        self.peek_at(0)
    }

    /// Byte `offset` bytes past the cursor
    #[inline]
    pub fn peek_at(&mut self, offset: usize) -> Option<u8> {
        let idx = self.pos + offset;
        self.examined = self.examined.max(idx + 1);
        self.input.get(idx).copied()
    }

    /// Move past one byte
    #[inline]
    pub fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    /// Move to an absolute position, never past the end of input
    #[inline]
    pub fn jump_to(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
        self.examined = self.examined.max(self.pos);
    }

    /// Skip ASCII whitespace
    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.advance();
        }
    }

    /// Everything from the cursor to the end of input
    ///
    /// Does not touch the examined extent; callers searching the slice
    /// report how far they looked with [`mark_examined`](Self::mark_examined).
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    /// Record that bytes up to `end` (exclusive) were looked at
    #[inline]
    pub fn mark_examined(&mut self, end: usize) {
        self.examined = self.examined.max(end);
    }

    /// Whether the cursor is at end of input
    #[inline]
    pub fn at_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Furthest byte looked at (exclusive); `len + 1` once end of input was seen
    #[inline]
    pub fn examined(&self) -> usize {
        self.examined
    }
}

/// Lexer mode carried between tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LexMode {
    /// Ordinary markup
    #[default]
    Data,
    /// Inside a raw text element, before its body was scanned
    RawText,
    /// Inside an unterminated comment
    Comment,
}

/// An element that is open on the tag stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenTag {
    /// Upper-cased tag name
    pub name: Arc<str>,
    /// Byte offset of the tag name
    pub start: usize,
}

/// Everything the scanner remembers between tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScannerState {
    /// Open elements, innermost last
    pub tags: Vec<OpenTag>,
    /// Current lexer mode
    pub mode: LexMode,
    /// Tag name whose end tag terminates raw text
    pub raw_terminator: Option<Arc<str>>,
}

impl ScannerState {
    /// Fresh state at the start of a document
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost open element
    #[inline]
    pub fn top(&self) -> Option<&OpenTag> {
        self.tags.last()
    }

    /// Number of open elements
    #[inline]
    pub fn depth(&self) -> usize {
        self.tags.len()
    }

    /// Open an element
    pub fn push(&mut self, name: Arc<str>, start: usize) {
        self.tags.push(OpenTag { name, start });
    }

    /// Close the innermost element
    ///
    /// Closing the element that armed raw text mode disarms it.
    pub fn pop(&mut self) -> Option<OpenTag> {
        let tag = self.tags.pop()?;
        if self.raw_terminator.as_deref() == Some(&*tag.name) {
            self.raw_terminator = None;
            if self.mode == LexMode::RawText {
                self.mode = LexMode::Data;
            }
        }
        Some(tag)
    }

    /// Whether an element with `name` is open anywhere on the stack
    pub fn is_open(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| &*tag.name == name)
    }

    /// Serialize to JSON
    #[inline]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON
    #[inline]
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}@{}", tag.name, tag.start)?;
        }
        write!(f, "] {:?}", self.mode)
    }
}

/// A hand-written lexer the grammar calls into
///
/// # Contract
///
/// - Only kinds in `valid` may be returned.
/// - On `None` the engine discards any change made to `state`.
/// - Work per call should be proportional to the bytes consumed.
pub trait ExternalScanner: Send + Sync {
    /// Try to recognize one token at the cursor
    fn scan(
        &self,
        cursor: &mut Cursor<'_>,
        valid: ExternalSet,
        state: &mut ScannerState,
    ) -> Option<ScannedToken>;

    /// Human-readable name for logs
    fn description(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_set() {
        let set: ExternalSet = [ExternalKind::EndTagName, ExternalKind::ErroneousEndTagName]
            .into_iter()
            .collect();
        assert!(set.contains(ExternalKind::EndTagName));
        assert!(set.contains(ExternalKind::ErroneousEndTagName));
        assert!(!set.contains(ExternalKind::RawText));
        assert!(!ExternalSet::EMPTY.contains(ExternalKind::Comment));
        assert!(ExternalSet::only(ExternalKind::Comment).contains(ExternalKind::Comment));
    }

    #[test]
    fn test_cursor_tracks_examined() {
        let mut cursor = Cursor::new(b"ab", 0);
        assert_eq!(cursor.peek(), Some(b'a'));
        assert_eq!(cursor.examined(), 1);
        cursor.advance();
        cursor.advance();
        assert!(cursor.at_eof());
        assert_eq!(cursor.examined(), 3);
        cursor.advance();
        assert_eq!(cursor.pos(), 2);
    }

    #[test]
    fn test_cursor_skip_whitespace() {
        let mut cursor = Cursor::new(b" \n\tx", 0);
        cursor.skip_whitespace();
        assert_eq!(cursor.pos(), 3);
        assert_eq!(cursor.rest(), b"x");
    }

    #[test]
    fn test_pop_disarms_raw_text() {
        let mut state = ScannerState::new();
        let name: Arc<str> = Arc::from("SCRIPT");
        state.push(name.clone(), 1);
        state.mode = LexMode::RawText;
        state.raw_terminator = Some(name);

        let tag = state.pop().unwrap();
        assert_eq!(&*tag.name, "SCRIPT");
        assert_eq!(state.mode, LexMode::Data);
        assert_eq!(state.raw_terminator, None);
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_state_json_roundtrip() {
        let mut state = ScannerState::new();
        state.push(Arc::from("DIV"), 0);
        state.push(Arc::from("P"), 5);
        let json = state.to_json().unwrap();
        let back = ScannerState::from_json(&json).unwrap();
        assert_eq!(back, state);
        assert!(back.is_open("DIV"));
        assert_eq!(back.to_string(), "[DIV@0 P@5] Data");
    }
}
