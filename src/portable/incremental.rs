//! Incremental Parsing Support
//!
//! A re-parse after an edit walks the new text from the start, like a fresh
//! parse, but whenever a node rule is invoked at a position where the old tree
//! has a node of the same rule, built from unchanged bytes and entered with
//! the same scanner state, that node is copied over instead of re-parsed.
//!
//! # Overview
//!
//! ```text
//!  old text   <div><p>a</p><b>x</b></div>
//!                          ^ edit: x -> yz
//!
//!  html_element div   examined 0..28   dirty (contains the edit)
//!  html_element p     examined 5..14   clean, reused in place
//!  html_element b     examined 13..22  dirty
//! ```
//!
//! Nodes are recorded with the position their rule was invoked at and the
//! furthest byte examined while parsing them. A node is dirty when an edit
//! touches `[parse_start, examined_end)`; clean nodes after the edit are
//! shifted by its length change.
//!
//! # Usage
//!
//! ```rust
//! use shopware_twig::{parse, parse_incremental, InputEdit};
//!
//! let old_text = b"<div><p>a</p><b>x</b></div>";
//! let old_tree = parse(old_text);
//!
//! let new_text = b"<div><p>a</p><b>yz</b></div>";
//! let edit = InputEdit::from_texts(old_text, new_text).unwrap();
//! let tree = parse_incremental(new_text, &old_tree, &[edit]);
//! assert_eq!(tree.to_sexp(), parse(new_text).to_sexp());
//! ```

use std::ops::Range;
use std::sync::Arc;

use ahash::RandomState;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::parser::log_debug;
use super::scanner::ScannerState;
use super::tree::{shift, NodeId, Tree};

/// A change to the input, in byte offsets
///
/// Edits in a list are applied one after another: the offsets of each edit
/// refer to the text produced by the edits before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEdit {
    /// Byte offset where the change starts
    pub start_byte: usize,
    /// End of the replaced range in the text before the edit
    pub old_end_byte: usize,
    /// End of the replacement in the text after the edit
    pub new_end_byte: usize,
}

impl InputEdit {
    /// Create a new edit
    #[inline]
    pub fn new(start_byte: usize, old_end_byte: usize, new_end_byte: usize) -> Self {
        Self {
            start_byte,
            old_end_byte: old_end_byte.max(start_byte),
            new_end_byte: new_end_byte.max(start_byte),
        }
    }

    /// Create an insertion edit
    #[inline]
    pub fn insert(offset: usize, length: usize) -> Self {
        Self::new(offset, offset, offset + length)
    }

    /// Create a deletion edit
    #[inline]
    pub fn delete(offset: usize, length: usize) -> Self {
        Self::new(offset, offset + length, offset)
    }

    /// Create a replacement edit
    #[inline]
    pub fn replace(offset: usize, old_length: usize, new_length: usize) -> Self {
        Self::new(offset, offset + old_length, offset + new_length)
    }

    /// The single edit turning `old` into `new`, or `None` if they are equal
    ///
    /// The edit covers everything between the common prefix and the common
    /// suffix of the two buffers.
    pub fn from_texts(old: &[u8], new: &[u8]) -> Option<Self> {
        let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        if prefix == old.len() && prefix == new.len() {
            return None;
        }
        let max_suffix = old.len().min(new.len()) - prefix;
        let suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        Some(Self::new(prefix, old.len() - suffix, new.len() - suffix))
    }

    /// Calculate the delta (change in length)
    #[inline]
    pub fn delta(&self) -> isize {
        self.new_end_byte as isize - self.old_end_byte as isize
    }

    /// Replaced range, in the text before the edit
    #[inline]
    pub fn old_range(&self) -> Range<usize> {
        self.start_byte..self.old_end_byte
    }

    /// Replacement range, in the text after the edit
    #[inline]
    pub fn new_range(&self) -> Range<usize> {
        self.start_byte..self.new_end_byte
    }

    /// Translate a position from old to new coordinates
    #[inline]
    pub fn translate_position(&self, pos: usize) -> usize {
        if pos <= self.start_byte {
            pos
        } else if pos <= self.old_end_byte {
            // Inside the replaced range: end of the replacement
            self.new_end_byte
        } else {
            shift(pos, self.delta())
        }
    }

    /// Whether a rule invoked at `parse_start` that looked at bytes up to
    /// `examined_end` may see a different input after this edit
    #[inline]
    pub fn touches(&self, parse_start: usize, examined_end: usize) -> bool {
        self.start_byte < examined_end
            && (self.old_end_byte > parse_start || self.start_byte > parse_start)
    }
}

/// A clean node of the old tree, in new coordinates
#[derive(Debug, Clone)]
pub(crate) struct ReuseCandidate {
    pub node: NodeId,
    /// Shift from old to new coordinates
    pub delta: isize,
    pub parse_start: usize,
    pub parse_end: usize,
    pub node_start: usize,
    pub node_end: usize,
    pub examined_end: usize,
    pub state_before: Arc<ScannerState>,
    pub state_after: Arc<ScannerState>,
}

impl ReuseCandidate {
    fn shift_by(&mut self, delta: isize) {
        self.delta += delta;
        self.parse_start = shift(self.parse_start, delta);
        self.parse_end = shift(self.parse_end, delta);
        self.node_start = shift(self.node_start, delta);
        self.node_end = shift(self.node_end, delta);
        self.examined_end = shift(self.examined_end, delta);
    }
}

/// Clean nodes of an old tree keyed by `(position, rule atom)`
pub(crate) struct ReuseIndex<'a> {
    old: &'a Tree,
    entries: HashMap<(usize, usize), ReuseCandidate, RandomState>,
    #[cfg(any(test, feature = "logging"))]
    discarded: usize,
}

impl<'a> ReuseIndex<'a> {
    /// Index the nodes of `old` that survive `edits`
    pub fn build(old: &'a Tree, edits: &[InputEdit]) -> Self {
        let mut live: Vec<ReuseCandidate> = old
            .preorder()
            .into_iter()
            .filter_map(|id| {
                let data = old.data(id);
                let info = data.reuse.as_ref()?;
                Some(ReuseCandidate {
                    node: id,
                    delta: 0,
                    parse_start: info.parse_start,
                    parse_end: info.parse_end,
                    node_start: data.start,
                    node_end: data.end,
                    examined_end: info.examined_end,
                    state_before: Arc::clone(&info.state_before),
                    state_after: Arc::clone(&info.state_after),
                })
            })
            .collect();
        #[cfg(any(test, feature = "logging"))]
        let recorded = live.len();

        for edit in edits {
            live.retain_mut(|c| {
                if edit.touches(c.parse_start, c.examined_end) {
                    return false;
                }
                if c.parse_start >= edit.old_end_byte {
                    c.shift_by(edit.delta());
                }
                true
            });
        }
        #[cfg(any(test, feature = "logging"))]
        let discarded = recorded - live.len();

        let mut entries = HashMap::with_capacity_and_hasher(live.len(), RandomState::new());
        for candidate in live {
            let atom = match &old.data(candidate.node).reuse {
                Some(info) => info.atom,
                None => continue,
            };
            // Pre-order: an outer node wins over an inner one with the same key
            entries
                .entry((candidate.parse_start, atom))
                .or_insert(candidate);
        }

        log_debug!(
            "reuse index: {} nodes recorded, {} discarded, {} indexed",
            recorded,
            discarded,
            entries.len()
        );
        Self {
            old,
            entries,
            #[cfg(any(test, feature = "logging"))]
            discarded,
        }
    }

    /// The node produced by `atom` at `pos`, if it was entered with `state`
    pub fn lookup(&self, pos: usize, atom: usize, state: &ScannerState) -> Option<ReuseCandidate> {
        let candidate = self.entries.get(&(pos, atom))?;
        (*candidate.state_before == *state).then(|| candidate.clone())
    }

    #[inline]
    pub fn old_tree(&self) -> &'a Tree {
        self.old
    }

    #[cfg(any(test, feature = "logging"))]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Nodes invalidated by the edits
    #[cfg(any(test, feature = "logging"))]
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twig;

    #[test]
    fn test_edit_constructors() {
        assert_eq!(InputEdit::insert(4, 3), InputEdit::new(4, 4, 7));
        assert_eq!(InputEdit::delete(4, 3), InputEdit::new(4, 7, 4));
        assert_eq!(InputEdit::replace(4, 3, 1).delta(), -2);
        assert_eq!(InputEdit::new(5, 2, 1), InputEdit::new(5, 5, 5));
    }

    #[test]
    fn test_translate_position() {
        let edit = InputEdit::replace(6, 5, 4);
        assert_eq!(edit.translate_position(3), 3);
        assert_eq!(edit.translate_position(6), 6);
        assert_eq!(edit.translate_position(8), 10);
        assert_eq!(edit.translate_position(11), 10);
        assert_eq!(edit.translate_position(20), 19);
        assert_eq!(edit.old_range(), 6..11);
        assert_eq!(edit.new_range(), 6..10);
    }

    #[test]
    fn test_from_texts() {
        assert_eq!(InputEdit::from_texts(b"abc", b"abc"), None);
        assert_eq!(
            InputEdit::from_texts(b"hello world", b"hello rust"),
            Some(InputEdit::new(6, 11, 10))
        );
        assert_eq!(
            InputEdit::from_texts(b"aaa", b"aaaa"),
            Some(InputEdit::new(3, 3, 4))
        );
        assert_eq!(
            InputEdit::from_texts(b"<p>x</p>", b"<p></p>"),
            Some(InputEdit::new(3, 4, 3))
        );
        assert_eq!(InputEdit::from_texts(b"", b"ab"), Some(InputEdit::new(0, 0, 2)));
    }

    #[test]
    fn test_touches() {
        // Rule invoked at 10, looked at bytes 10..20
        let (start, examined) = (10, 20);
        assert!(InputEdit::replace(12, 1, 1).touches(start, examined));
        assert!(InputEdit::insert(15, 1).touches(start, examined));
        assert!(InputEdit::delete(5, 6).touches(start, examined));
        assert!(InputEdit::insert(19, 2).touches(start, examined));
        assert!(!InputEdit::insert(20, 2).touches(start, examined));
        assert!(!InputEdit::insert(10, 2).touches(start, examined));
        assert!(!InputEdit::delete(5, 5).touches(start, examined));
    }

    #[test]
    fn test_index_drops_dirty_nodes_and_shifts_the_rest() {
        let old_text = b"<p>a</p> <i>b</i> <b>c</b>";
        let old = twig::parse(old_text);

        // Unchanged: every recorded node is reusable
        let unchanged = ReuseIndex::build(&old, &[]);
        assert_eq!(unchanged.discarded(), 0);
        assert!(unchanged.len() > 0);

        // Grow the text of the middle element
        let edit = InputEdit::insert(13, 2);
        let index = ReuseIndex::build(&old, &[edit]);
        assert!(index.discarded() > 0);

        let starts: Vec<_> = index.entries.values().map(|c| c.parse_start).collect();
        assert!(starts.contains(&0));
        assert!(!starts.contains(&8));
        let last = index
            .entries
            .values()
            .find(|c| c.node_start == 20 && c.node_end == 28)
            .expect("third element shifted by the insertion");
        assert_eq!(last.delta, 2);
        assert_eq!(last.node_end, 28);
    }

    #[test]
    fn test_lookup_requires_equal_state() {
        let old = twig::parse(b"<div><p>a</p></div>");
        let index = ReuseIndex::build(&old, &[]);
        let (&(pos, atom), candidate) = index
            .entries
            .iter()
            .find(|(_, c)| c.node_start == 5)
            .expect("inner element indexed");
        assert!(index.lookup(pos, atom, &candidate.state_before).is_some());
        assert!(index.lookup(pos, atom, &ScannerState::new()).is_none());
    }
}
