//! Language independent core
//!
//! The engine knows nothing about Twig or HTML: a grammar is an arena of
//! atoms, context sensitive tokens come from an [`ExternalScanner`], and the
//! result is a concrete syntax tree over a closed [`SyntaxKind`] vocabulary.
//!
//! # Module Organization
//!
//! ## Core Types
//! - [`Grammar`] - atom arena with alias table
//! - [`Parser`] - backtracking engine with budget and node reuse
//! - [`Tree`] - arena-backed CST with borrowed handles
//!
//! ## Parser DSL
//! - [`parser_dsl`] - combinators compiled into a [`Grammar`]
//!
//! ## External Scanning
//! - [`scanner`] - scanner trait, cursor, and the serializable tag stack
//!
//! ## Incremental Parsing
//! - [`incremental`] - edits and the reuse index
//!
//! ## Developer Tools
//! - [`debug`] - tree printer, grammar diagrams, source excerpts

// ============================================================================
// Module Declarations
// ============================================================================

pub mod debug;
pub mod error;
pub mod grammar;
pub mod incremental;
pub mod parser;
pub mod parser_dsl;
pub mod regex_cache;
pub mod scanner;
pub mod source_location;
pub mod syntax_kind;
pub mod tree;

// Batch parsing (always available, uses rayon when feature is enabled)
pub mod parallel;

// ============================================================================
// Core Types
// ============================================================================

pub use error::ParseError;
pub use grammar::{Assoc, Atom, Grammar};
pub use parser::{ParseStats, Parser, ParserConfig};
pub use syntax_kind::SyntaxKind;
pub use tree::{NodeId, SyntaxElement, SyntaxNode, SyntaxToken, Tree};

// ============================================================================
// External Scanning
// ============================================================================

pub use scanner::{
    Cursor, ExternalKind, ExternalScanner, ExternalSet, LexMode, OpenTag, ScannedToken,
    ScannerState,
};

// ============================================================================
// Regex Cache
// ============================================================================

pub use regex_cache::{cache_size as regex_cache_size, get_or_compile as get_regex};

// ============================================================================
// Incremental Parsing
// ============================================================================

pub use incremental::InputEdit;

// ============================================================================
// Source Location
// ============================================================================

pub use source_location::{LineIndex, SourcePosition, SourceSpan};

// ============================================================================
// Developer Tools
// ============================================================================

pub use debug::{GrammarVisualizer, SourceFormatter, TreePrinter};

// ============================================================================
// Batch Parsing
// ============================================================================

pub use parallel::parse_batch;
