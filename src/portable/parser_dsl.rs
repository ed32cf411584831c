//! Parser DSL - Rust Grammar Definition
//!
//! A fluent, composable API for writing grammars as Rust expressions. Each
//! combinator implements [`Parslet`] and lowers itself into atoms of a
//! [`GrammarBuilder`].
//!
//! # Example
//!
//! ```rust
//! use shopware_twig::portable::parser_dsl::*;
//! use shopware_twig::SyntaxKind;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("list", node(SyntaxKind::Arguments, str("(").then(ref_("items")).then(str(")"))))
//!     .rule("items", leaf(SyntaxKind::Variable, re("[a-z]+")).many())
//!     .build();
//! assert!(grammar.atom_count() > 0);
//! ```

use super::error::ParseError;
use super::grammar::{Assoc, Atom, Grammar};
use super::scanner::ExternalKind;
use super::syntax_kind::SyntaxKind;
use std::collections::HashMap;

/// Parslet trait - implemented by all parser combinators
pub trait Parslet: Send + Sync {
    /// Build this parslet into a Grammar
    fn build(self, builder: &mut GrammarBuilder) -> usize;
}

/// Grammar builder for constructing grammars
pub struct GrammarBuilder {
    /// All atoms in the grammar
    atoms: Vec<Atom>,

    /// Named rules and their atom indices
    rules: HashMap<String, usize>,

    /// For tracking forward references
    pending_entities: HashMap<usize, String>,

    /// Track insertion order for rules (first rule = root)
    first_rule: Option<String>,

    /// Internal kind to public kind
    aliases: Vec<(SyntaxKind, SyntaxKind)>,
}

impl GrammarBuilder {
    /// Create a new grammar builder
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            rules: HashMap::new(),
            pending_entities: HashMap::new(),
            first_rule: None,
            aliases: Vec::new(),
        }
    }

    /// Add a rule to the grammar
    pub fn rule(mut self, name: &str, parslet: impl Parslet) -> Self {
        let atom_idx = parslet.build(&mut self);
        self.rules.insert(name.to_string(), atom_idx);
        // Track first rule for root
        if self.first_rule.is_none() {
            self.first_rule = Some(name.to_string());
        }
        self
    }

    /// Present tokens of kind `internal` as `public` in the tree
    pub fn alias(mut self, internal: SyntaxKind, public: SyntaxKind) -> Self {
        self.aliases.push((internal, public));
        self
    }

    /// Add an atom directly
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        idx
    }

    /// Register a forward reference
    pub fn add_forward_ref(&mut self, atom_idx: usize, rule_name: String) {
        self.pending_entities.insert(atom_idx, rule_name);
    }

    /// Get the current number of atoms
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Build the final grammar
    ///
    /// References to rules that were never defined are left pointing at
    /// atom 0; use [`try_build`](Self::try_build) to reject them.
    pub fn build(self) -> Grammar {
        self.finish().0
    }

    /// Build the final grammar, failing on references to undefined rules
    pub fn try_build(self) -> Result<Grammar, ParseError> {
        let (grammar, mut missing) = self.finish();
        if missing.is_empty() {
            Ok(grammar)
        } else {
            missing.sort();
            missing.dedup();
            Err(ParseError::InvalidGrammar {
                reason: format!("undefined rules: {}", missing.join(", ")),
            })
        }
    }

    fn finish(self) -> (Grammar, Vec<String>) {
        // Resolve any pending entity references
        let mut atoms = self.atoms;
        let mut missing = Vec::new();
        for (idx, rule_name) in self.pending_entities {
            if let Some(Atom::Entity { atom }) = atoms.get_mut(idx) {
                match self.rules.get(&rule_name) {
                    Some(&target_idx) => *atom = target_idx,
                    None => missing.push(rule_name),
                }
            }
        }

        // Higher precedence first; equal precedence keeps written order
        let priorities: Vec<i32> = atoms
            .iter()
            .map(|atom| match atom {
                Atom::Precedence { priority, .. } => *priority,
                _ => 0,
            })
            .collect();
        for atom in &mut atoms {
            if let Atom::Alternative { atoms: alternatives } = atom {
                alternatives.sort_by_key(|&idx| std::cmp::Reverse(priorities[idx]));
            }
        }

        // Use first rule as root (preserving insertion order)
        let root = self
            .first_rule
            .and_then(|name| self.rules.get(&name).copied())
            .unwrap_or(0);

        (
            Grammar {
                atoms,
                root,
                aliases: self.aliases,
            },
            missing,
        )
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Terminals
// ============================================================================

/// Match a literal string
#[derive(Clone, Copy)]
pub struct Str<'a>(pub &'a str);

impl<'a> Parslet for Str<'a> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.add_atom(Atom::Str {
            pattern: self.0.to_string(),
        })
    }
}

/// Match a keyword (a literal not followed by `[A-Za-z0-9_]`)
#[derive(Clone, Copy)]
pub struct Keyword<'a>(pub &'a str);

impl<'a> Parslet for Keyword<'a> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.add_atom(Atom::Keyword {
            pattern: self.0.to_string(),
        })
    }
}

/// Match a regular expression
#[derive(Clone, Copy)]
pub struct Re<'a>(pub &'a str);

impl<'a> Parslet for Re<'a> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.add_atom(Atom::Re {
            pattern: self.0.to_string(),
        })
    }
}

/// A token resolved by the external scanner
#[derive(Clone, Copy)]
pub struct External(pub ExternalKind);

impl Parslet for External {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.add_atom(Atom::External { kind: self.0 })
    }
}

/// One byte of error recovery
#[derive(Clone, Copy, Default)]
pub struct ErrorByte;

impl Parslet for ErrorByte {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.add_atom(Atom::Error)
    }
}

/// A forward reference to a named rule (for recursive grammars)
#[derive(Clone, Copy)]
pub struct Ref<'a>(pub &'a str);

impl<'a> Parslet for Ref<'a> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let atom_idx = builder.add_atom(Atom::Entity { atom: 0 }); // Placeholder
        builder.add_forward_ref(atom_idx, self.0.to_string());
        atom_idx
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Sequence of two parslets (A.then(B) matches A then B)
#[derive(Clone, Copy)]
pub struct Sequence2<A, B> {
    first: A,
    second: B,
}

impl<A: Parslet, B: Parslet> Parslet for Sequence2<A, B> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let first_idx = self.first.build(builder);
        let second_idx = self.second.build(builder);
        builder.add_atom(Atom::Sequence {
            atoms: vec![first_idx, second_idx],
        })
    }
}

/// Alternative of two parslets (A.or(B) tries A, then B)
#[derive(Clone, Copy)]
pub struct Alternative2<A, B> {
    first: A,
    second: B,
}

impl<A: Parslet, B: Parslet> Parslet for Alternative2<A, B> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let first_idx = self.first.build(builder);
        let second_idx = self.second.build(builder);
        builder.add_atom(Atom::Alternative {
            atoms: vec![first_idx, second_idx],
        })
    }
}

/// Repetition (A.repeat(n, m) matches A n to m times)
#[derive(Clone, Copy)]
pub struct Repeat<P> {
    inner: P,
    min: usize,
    max: Option<usize>,
}

impl<P: Parslet> Parslet for Repeat<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Repetition {
            atom: inner_idx,
            min: self.min,
            max: self.max,
        })
    }
}

/// Lookahead (A.lookahead() doesn't consume input)
#[derive(Clone, Copy)]
pub struct Lookahead<P> {
    inner: P,
    positive: bool,
}

impl<P: Parslet> Parslet for Lookahead<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Lookahead {
            atom: inner_idx,
            positive: self.positive,
        })
    }
}

/// Wrap a match in a tree node
#[derive(Clone, Copy)]
pub struct Node<P> {
    kind: SyntaxKind,
    inner: P,
}

impl<P: Parslet> Parslet for Node<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Node {
            kind: self.kind,
            atom: inner_idx,
        })
    }
}

/// Collapse a match into a single token
#[derive(Clone, Copy)]
pub struct Leaf<P> {
    kind: SyntaxKind,
    inner: P,
}

impl<P: Parslet> Parslet for Leaf<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Leaf {
            kind: self.kind,
            atom: inner_idx,
        })
    }
}

/// No whitespace before the terminals of the inner parslet
#[derive(Clone, Copy)]
pub struct Immediate<P> {
    inner: P,
}

impl<P: Parslet> Parslet for Immediate<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Immediate { atom: inner_idx })
    }
}

/// Precedence annotation
#[derive(Clone, Copy)]
pub struct Prec<P> {
    inner: P,
    priority: i32,
    assoc: Assoc,
}

impl<P: Parslet> Parslet for Prec<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let inner_idx = self.inner.build(builder);
        builder.add_atom(Atom::Precedence {
            atom: inner_idx,
            priority: self.priority,
            assoc: self.assoc,
        })
    }
}

/// A type-erased parslet (for heterogeneous sequences/choices)
pub struct Dynamic(Box<dyn DynParslet>);

/// Trait for type-erased parslets
pub trait DynParslet: Send + Sync {
    /// Build this parslet into a grammar
    fn build_boxed(self: Box<Self>, builder: &mut GrammarBuilder) -> usize;
}

impl<P: Parslet + 'static> DynParslet for P {
    fn build_boxed(self: Box<Self>, builder: &mut GrammarBuilder) -> usize {
        (*self).build(builder)
    }
}

impl Parslet for Dynamic {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        self.0.build_boxed(builder)
    }
}

/// Convert any parslet to a dynamic one
pub fn dynamic<P: Parslet + 'static>(p: P) -> Dynamic {
    Dynamic(Box::new(p))
}

/// A sequence of multiple parslets
pub struct Sequence<P>(pub Vec<P>);

impl<P: Parslet> Parslet for Sequence<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let indices: Vec<usize> = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.add_atom(Atom::Sequence { atoms: indices })
    }
}

/// A choice of multiple parslets
pub struct Choice<P>(pub Vec<P>);

impl<P: Parslet> Parslet for Choice<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let indices: Vec<usize> = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.add_atom(Atom::Alternative { atoms: indices })
    }
}

// ============================================================================
// Extension trait for Parslet
// ============================================================================

/// Extension trait for Parslet with builder methods
pub trait ParsletExt: Parslet + Sized {
    /// Repeat this parser
    fn repeat(self, min: usize, max: Option<usize>) -> Repeat<Self> {
        Repeat {
            inner: self,
            min,
            max,
        }
    }

    /// Match zero or more times
    fn many(self) -> Repeat<Self> {
        self.repeat(0, None)
    }

    /// Match one or more times
    fn many1(self) -> Repeat<Self> {
        self.repeat(1, None)
    }

    /// Match optional (zero or one time)
    fn optional(self) -> Repeat<Self> {
        self.repeat(0, Some(1))
    }

    /// Positive lookahead (must match, doesn't consume)
    fn lookahead(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: true,
        }
    }

    /// Negative lookahead (must NOT match, doesn't consume)
    fn not_ahead(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: false,
        }
    }

    /// Sequence: A then B
    fn then<B: Parslet>(self, other: B) -> Sequence2<Self, B> {
        Sequence2 {
            first: self,
            second: other,
        }
    }

    /// Alternative: A or B
    fn or<B: Parslet>(self, other: B) -> Alternative2<Self, B> {
        Alternative2 {
            first: self,
            second: other,
        }
    }

    /// Terminals inside must start right where the previous token ended
    fn immediate(self) -> Immediate<Self> {
        Immediate { inner: self }
    }
}

impl<T: Parslet + Sized> ParsletExt for T {}

// ============================================================================
// Helper Functions
// ============================================================================

/// Match a literal string
pub fn str(s: &str) -> Str<'_> {
    Str(s)
}

/// Match a keyword
pub fn keyword(s: &str) -> Keyword<'_> {
    Keyword(s)
}

/// Match a regular expression
pub fn re(pattern: &str) -> Re<'_> {
    Re(pattern)
}

/// Forward reference to a rule
pub fn ref_(name: &str) -> Ref<'_> {
    Ref(name)
}

/// Token produced by the external scanner
pub fn external(kind: ExternalKind) -> External {
    External(kind)
}

/// One byte of error recovery
pub fn error_byte() -> ErrorByte {
    ErrorByte
}

/// Wrap `p` in a node of `kind`
pub fn node<P: Parslet>(kind: SyntaxKind, p: P) -> Node<P> {
    Node { kind, inner: p }
}

/// Collapse `p` into a token of `kind`
pub fn leaf<P: Parslet>(kind: SyntaxKind, p: P) -> Leaf<P> {
    Leaf { kind, inner: p }
}

/// Left-associative precedence
pub fn prec<P: Parslet>(priority: i32, p: P) -> Prec<P> {
    Prec {
        inner: p,
        priority,
        assoc: Assoc::Left,
    }
}

/// Right-associative precedence (longest match at the same level)
pub fn prec_right<P: Parslet>(priority: i32, p: P) -> Prec<P> {
    Prec {
        inner: p,
        priority,
        assoc: Assoc::Right,
    }
}

/// Create a sequence from multiple parslets
pub fn seq<I, P>(items: I) -> Sequence<P>
where
    I: IntoIterator<Item = P>,
{
    Sequence(items.into_iter().collect())
}

/// Create a choice from multiple parslets
pub fn choice<I, P>(items: I) -> Choice<P>
where
    I: IntoIterator<Item = P>,
{
    Choice(items.into_iter().collect())
}

// ============================================================================
// Macros for Arbitrary-Length Sequences and Alternatives
// ============================================================================

/// Sequence of any number of heterogeneous parslets
///
/// ```
/// use shopware_twig::all;
/// use shopware_twig::portable::parser_dsl::*;
///
/// let parser = all![str("{%"), keyword("parent"), str("("), str(")"), str("%}")];
/// ```
#[macro_export]
macro_rules! all {
    ($($p:expr),+ $(,)?) => {
        $crate::portable::parser_dsl::Sequence(vec![
            $($crate::portable::parser_dsl::dynamic($p)),+
        ])
    };
}

/// Choice among any number of heterogeneous parslets
///
/// ```
/// use shopware_twig::oneof;
/// use shopware_twig::portable::parser_dsl::*;
///
/// let parser = oneof![keyword("if"), keyword("endif"), re("[a-z]+")];
/// ```
#[macro_export]
macro_rules! oneof {
    ($($p:expr),+ $(,)?) => {
        $crate::portable::parser_dsl::Choice(vec![
            $($crate::portable::parser_dsl::dynamic($p)),+
        ])
    };
}

pub use crate::{all, oneof};
