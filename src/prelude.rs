//! Prelude module for convenient imports
//!
//! ```
//! use shopware_twig::prelude::*;
//!
//! let tree = parse(b"<br>");
//! assert_eq!(tree.root_node().kind(), SyntaxKind::Template);
//! ```
//!
//! # Re-exported Items
//!
//! ## Parsing
//! - [`parse()`], [`parse_incremental()`], [`parse_with_config()`]
//! - [`Language`] - shared Twig grammar and scanner
//! - [`ParserConfig`] - budget and limits
//! - [`InputEdit`] - byte-range edit for incremental re-parsing
//!
//! ## Trees
//! - [`Tree`], [`SyntaxNode`], [`SyntaxToken`], [`SyntaxElement`], [`SyntaxKind`]
//!
//! ## Grammar DSL
//! - [`GrammarBuilder`], [`Parslet`], [`ParsletExt`] and the terminal
//!   constructors, for grammars of other languages

// ============================================================================
// Parsing
// ============================================================================

pub use crate::portable::{InputEdit, ParseError, ParserConfig};
pub use crate::twig::{parse, parse_incremental, parse_with_config, Language};

// ============================================================================
// Trees
// ============================================================================

pub use crate::portable::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, Tree};

// ============================================================================
// Grammar DSL
// ============================================================================

pub use crate::portable::parser_dsl::{
    choice, external, keyword, leaf, node, re, ref_, seq, str, GrammarBuilder, Parslet,
    ParsletExt,
};
