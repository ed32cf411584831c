//! shopware_twig - incremental concrete-syntax parser for Shopware templates
//!
//! Parses Shopware flavored Twig, HTML markup mixed with `{% ... %}`
//! directives, into a lossless concrete syntax tree. It provides:
//! - A PEG engine over an arena of atoms, with an external scanner for
//!   context sensitive tokens (tag names, raw text, comments, implicit ends)
//! - Error recovery that never fails: every byte ends up in some token
//! - Incremental re-parsing that reuses subtrees untouched by an edit
//! - Budgets on operations, byte offset, recursion, input size and time
//! - Developer tools (tree printer, grammar diagrams)
//!
//! ## Quick Start
//!
//! ```rust
//! use shopware_twig::{parse, SyntaxKind};
//!
//! let source = b"<div><span>Hello</span></div>";
//! let tree = parse(source);
//! assert_eq!(
//!     tree.to_sexp(),
//!     "(template (html_element (html_start_tag (html_tag_name)) \
//!      (html_element (html_start_tag (html_tag_name)) (content) \
//!      (html_end_tag (html_tag_name))) (html_end_tag (html_tag_name))))"
//! );
//!
//! let div = tree.root_node().child_node(SyntaxKind::HtmlElement).unwrap();
//! assert_eq!(div.byte_range(), 0..source.len());
//! ```
//!
//! ## Incremental Re-parsing
//!
//! ```rust
//! use shopware_twig::{parse, parse_incremental, InputEdit};
//!
//! let old = b"<p>Hello</p><p>World</p>";
//! let new = b"<p>Hello</p><p>Big World</p>";
//! let old_tree = parse(old);
//!
//! let edit = InputEdit::insert(15, 4);
//! let tree = parse_incremental(new, &old_tree, &[edit]);
//! assert_eq!(tree.to_sexp(), parse(new).to_sexp());
//! ```
//!
//! ## Feature Flags
//!
//! - `logging` - Enable debug logging using the `log` crate
//! - `parallel` - Parse batches of templates on the rayon thread pool

// Lint configuration for production quality
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
// Allow some pedantic lints that are too noisy
#![allow(clippy::module_inception)]
#![allow(clippy::redundant_closure)]

// Prelude module for convenient imports
pub mod prelude;

// Language independent engine
pub mod portable;

// Shopware flavored Twig
pub mod twig;

/// Re-export commonly used types for convenience
pub use portable::{
    // Debug tools
    debug::{GrammarVisualizer, SourceFormatter, TreePrinter},
    Grammar,
    InputEdit,
    ParseError,
    ParseStats,
    Parser,
    ParserConfig,
    ScannerState,
    SyntaxElement,
    SyntaxKind,
    SyntaxNode,
    SyntaxToken,
    Tree,
};

pub use twig::{parse, parse_batch, parse_incremental, parse_with_config, Language};
