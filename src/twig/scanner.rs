//! Tag-stack scanner for HTML in Twig templates
//!
//! Resolves the tokens that depend on which elements are open: start and end
//! tag names, zero-width implicit end tags, `/>`, raw text bodies of
//! `<script>`/`<style>`, and comments. Tag names are compared upper-cased.

use std::sync::Arc;

use memchr::{memchr, memmem};

use crate::portable::scanner::{
    Cursor, ExternalKind, ExternalScanner, ExternalSet, LexMode, ScannedToken, ScannerState,
};

/// Elements that never have content
pub const VOID_ELEMENTS: [&str; 14] = [
    "AREA", "BASE", "BR", "COL", "EMBED", "HR", "IMG", "INPUT", "LINK", "META", "PARAM",
    "SOURCE", "TRACK", "WBR",
];

/// Elements whose body is not markup
pub const RAW_TEXT_ELEMENTS: [&str; 2] = ["SCRIPT", "STYLE"];

const NOT_IN_PARAGRAPH: [&str; 9] = ["P", "DIV", "TABLE", "H1", "H2", "H3", "H4", "H5", "H6"];

/// Whether `name` (upper-cased) is a void element
#[inline]
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Whether `name` (upper-cased) switches the scanner to raw text
#[inline]
pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Whether an open `parent` element may directly contain a `child` start tag
///
/// A start tag the innermost element cannot contain closes it implicitly.
pub fn can_contain(parent: &str, child: &str) -> bool {
    match parent {
        "TR" => matches!(child, "TD" | "TH"),
        "TABLE" => matches!(child, "TR" | "TBODY" | "THEAD" | "TFOOT" | "COLGROUP"),
        "UL" | "OL" => child == "LI",
        "DL" => matches!(child, "DT" | "DD"),
        "RUBY" => matches!(child, "RB" | "RT" | "RP"),
        "COLGROUP" => child == "COL",
        "TD" | "TH" => !matches!(child, "TD" | "TH" | "TR"),
        "RB" | "RT" | "RP" => !matches!(child, "RB" | "RT" | "RP"),
        "LI" => child != "LI",
        "DT" | "DD" => !matches!(child, "DT" | "DD"),
        "P" => !NOT_IN_PARAGRAPH.contains(&child),
        _ => true,
    }
}

/// Read `[A-Za-z][A-Za-z0-9:-]*` at the cursor, upper-cased
fn read_tag_name(cursor: &mut Cursor<'_>) -> Option<String> {
    if !cursor.peek()?.is_ascii_alphabetic() {
        return None;
    }
    let mut name = String::new();
    while let Some(b) = cursor.peek() {
        if !(b.is_ascii_alphanumeric() || b == b'-' || b == b':') {
            break;
        }
        name.push(char::from(b.to_ascii_uppercase()));
        cursor.advance();
    }
    Some(name)
}

#[inline]
fn token(kind: ExternalKind, end: usize) -> Option<ScannedToken> {
    Some(ScannedToken { kind, end })
}

/// The scanner of the Twig language
#[derive(Debug, Clone, Copy, Default)]
pub struct TwigScanner;

impl TwigScanner {
    fn start_tag_name(&self, cursor: &mut Cursor<'_>, state: &mut ScannerState) -> Option<ScannedToken> {
        let start = cursor.pos();
        let name: Arc<str> = Arc::from(read_tag_name(cursor)?);
        if is_raw_text_element(&name) {
            state.mode = LexMode::RawText;
            state.raw_terminator = Some(Arc::clone(&name));
        }
        state.push(name, start);
        token(ExternalKind::StartTagName, cursor.pos())
    }

    fn end_tag_name(
        &self,
        cursor: &mut Cursor<'_>,
        valid: ExternalSet,
        state: &mut ScannerState,
    ) -> Option<ScannedToken> {
        let name = read_tag_name(cursor)?;
        let closes_top = state.top().is_some_and(|top| *top.name == name);

        if closes_top && valid.contains(ExternalKind::EndTagName) {
            state.pop();
            token(ExternalKind::EndTagName, cursor.pos())
        } else if !closes_top && valid.contains(ExternalKind::ErroneousEndTagName) {
            token(ExternalKind::ErroneousEndTagName, cursor.pos())
        } else {
            None
        }
    }

    fn implicit_end_tag(&self, cursor: &mut Cursor<'_>, state: &mut ScannerState) -> Option<ScannedToken> {
        let start = cursor.pos();
        let top = Arc::clone(&state.top()?.name);

        let closes = match cursor.peek() {
            None => true,
            Some(b'<') => {
                if cursor.peek_at(1) == Some(b'/') {
                    cursor.jump_to(start + 2);
                    match read_tag_name(cursor) {
                        Some(name) if name == *top => false,
                        Some(name) => is_void_element(&top) || state.is_open(&name),
                        None => is_void_element(&top),
                    }
                } else {
                    cursor.jump_to(start + 1);
                    is_void_element(&top)
                        || read_tag_name(cursor).is_some_and(|name| !can_contain(&top, &name))
                }
            }
            Some(_) => is_void_element(&top),
        };

        if !closes {
            return None;
        }
        state.pop();
        token(ExternalKind::ImplicitEndTag, start)
    }

    fn self_closing_delimiter(&self, cursor: &mut Cursor<'_>, state: &mut ScannerState) -> Option<ScannedToken> {
        if cursor.peek() != Some(b'/') || cursor.peek_at(1) != Some(b'>') {
            return None;
        }
        cursor.advance();
        cursor.advance();
        state.pop();
        token(ExternalKind::SelfClosingTagDelimiter, cursor.pos())
    }

    fn raw_text(&self, cursor: &mut Cursor<'_>, state: &mut ScannerState) -> Option<ScannedToken> {
        if state.mode != LexMode::RawText {
            return None;
        }
        let terminator = state.raw_terminator.clone()?;
        let start = cursor.pos();
        let rest = cursor.rest();

        let mut from = 0;
        let body_len = loop {
            let Some(found) = memchr(b'<', &rest[from..]) else {
                cursor.mark_examined(start + rest.len() + 1);
                break rest.len();
            };
            let lt = from + found;
            let name_start = lt + 2;
            let name_end = name_start + terminator.len();
            cursor.mark_examined(start + name_end.min(rest.len() + 1));

            let is_end = rest.get(lt + 1) == Some(&b'/')
                && rest
                    .get(name_start..name_end)
                    .is_some_and(|name| name.eq_ignore_ascii_case(terminator.as_bytes()));
            if is_end {
                break lt;
            }
            from = lt + 1;
        };

        if body_len == 0 {
            return None;
        }
        state.mode = LexMode::Data;
        state.raw_terminator = None;
        token(ExternalKind::RawText, start + body_len)
    }

    fn comment(&self, cursor: &mut Cursor<'_>, state: &mut ScannerState) -> Option<ScannedToken> {
        let start = cursor.pos();
        for (i, expected) in b"<!--".iter().enumerate() {
            if cursor.peek_at(i) != Some(*expected) {
                return None;
            }
        }

        let body = &cursor.rest()[4..];
        match memmem::find(body, b"-->") {
            Some(found) => {
                let end = start + 4 + found + 3;
                cursor.jump_to(end);
                token(ExternalKind::Comment, end)
            }
            None => {
                let end = start + 4 + body.len();
                cursor.mark_examined(end + 1);
                cursor.jump_to(end);
                state.mode = LexMode::Comment;
                token(ExternalKind::Comment, end)
            }
        }
    }
}

impl ExternalScanner for TwigScanner {
    fn scan(
        &self,
        cursor: &mut Cursor<'_>,
        valid: ExternalSet,
        state: &mut ScannerState,
    ) -> Option<ScannedToken> {
        if valid.contains(ExternalKind::RawText) && state.mode == LexMode::RawText {
            return self.raw_text(cursor, state);
        }
        if valid.contains(ExternalKind::Comment) && cursor.peek() == Some(b'<') {
            if let Some(found) = self.comment(cursor, state) {
                return Some(found);
            }
        }
        if valid.contains(ExternalKind::ImplicitEndTag) {
            return self.implicit_end_tag(cursor, state);
        }
        if valid.contains(ExternalKind::StartTagName) {
            return self.start_tag_name(cursor, state);
        }
        if valid.contains(ExternalKind::EndTagName) || valid.contains(ExternalKind::ErroneousEndTagName) {
            return self.end_tag_name(cursor, valid, state);
        }
        if valid.contains(ExternalKind::SelfClosingTagDelimiter) {
            return self.self_closing_delimiter(cursor, state);
        }
        None
    }

    fn description(&self) -> &str {
        "html tag stack"
    }
}
