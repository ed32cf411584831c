//! Grammar types
//!
//! A grammar is an arena of [`Atom`]s addressed by index. Rules refer to each
//! other by index instead of by ownership, so mutually recursive productions
//! (an element whose children are elements) need no reference cycles. A built
//! grammar is never mutated and can be shared by any number of parses.

use serde::{Deserialize, Serialize};

use super::scanner::ExternalKind;
use super::syntax_kind::SyntaxKind;

/// Associativity of a precedence atom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Assoc {
    /// First matching alternative of the precedence level wins
    Left,
    /// Longest matching alternative of the precedence level wins
    Right,
    /// Same as `Left`; marks levels that never compete
    None,
}

/// Atom types that make up a grammar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Atom {
    /// Match a literal string
    Str {
        /// The string pattern to match
        pattern: String,
    },

    /// Match a literal word not followed by an identifier byte
    Keyword {
        /// The keyword
        pattern: String,
    },

    /// Match a regular expression anchored at the current position
    Re {
        /// The regex pattern to match
        pattern: String,
    },

    /// Match multiple atoms in sequence
    Sequence {
        /// Indices into atoms array
        atoms: Vec<usize>,
    },

    /// Try alternatives in order
    Alternative {
        /// Indices into atoms array
        atoms: Vec<usize>,
    },

    /// Repeat an atom (greedy, with min/max)
    Repetition {
        /// Index into atoms array
        atom: usize,
        /// Minimum number of repetitions
        min: usize,
        /// Maximum number of repetitions (None = unlimited)
        max: Option<usize>,
    },

    /// Reference to another atom
    Entity {
        /// Index into atoms array
        atom: usize,
    },

    /// Lookahead (doesn't consume input)
    Lookahead {
        /// Index into atoms array
        atom: usize,
        /// Whether this is a positive lookahead
        positive: bool,
    },

    /// Wrap the match of `atom` in a tree node
    Node {
        /// Node kind
        kind: SyntaxKind,
        /// Index into atoms array
        atom: usize,
    },

    /// Collapse the match of `atom` into one token, with no trivia inside
    Leaf {
        /// Token kind
        kind: SyntaxKind,
        /// Index into atoms array
        atom: usize,
    },

    /// Token resolved by the external scanner
    External {
        /// Requested token
        kind: ExternalKind,
    },

    /// Terminals inside do not skip leading whitespace
    Immediate {
        /// Index into atoms array
        atom: usize,
    },

    /// Precedence annotation, used to order the alternatives of a choice
    Precedence {
        /// Index into atoms array
        atom: usize,
        /// Higher priorities are tried first
        priority: i32,
        /// Tie-break among alternatives of equal priority
        assoc: Assoc,
    },

    /// Consume one byte as an `ERROR` token
    Error,
}

/// A complete grammar
///
/// Contains all atoms, the root atom index and the alias table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    /// All atoms in the grammar (referenced by index)
    pub atoms: Vec<Atom>,

    /// Index of the root atom
    pub root: usize,

    /// Internal kind to public kind
    pub aliases: Vec<(SyntaxKind, SyntaxKind)>,
}

impl Grammar {
    /// Create a new empty grammar
    #[inline]
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            root: 0,
            aliases: Vec::new(),
        }
    }

    /// Add an atom and return its index
    #[inline]
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        idx
    }

    /// Get an atom by index
    #[inline]
    pub fn get_atom(&self, idx: usize) -> Option<&Atom> {
        self.atoms.get(idx)
    }

    /// Get the root atom
    #[inline]
    pub fn root_atom(&self) -> Option<&Atom> {
        self.atoms.get(self.root)
    }

    /// Get total atom count
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Public kind for an internal kind; other kinds map to themselves
    #[inline]
    pub fn alias(&self, kind: SyntaxKind) -> SyntaxKind {
        self.aliases
            .iter()
            .find(|(from, _)| *from == kind)
            .map_or(kind, |(_, to)| *to)
    }

    /// Kinds this grammar can put into a tree, after aliasing, sorted
    pub fn produced_kinds(&self) -> Vec<SyntaxKind> {
        let mut kinds: Vec<SyntaxKind> = self
            .atoms
            .iter()
            .filter_map(|atom| match atom {
                Atom::Node { kind, .. } | Atom::Leaf { kind, .. } => Some(*kind),
                Atom::External { kind } if *kind != ExternalKind::ImplicitEndTag => {
                    Some(kind.syntax_kind())
                }
                _ => None,
            })
            .map(|kind| self.alias(kind))
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
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

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}
