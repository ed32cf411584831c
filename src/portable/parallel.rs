//! Batch parsing
//!
//! Parses many independent documents, such as every template of a theme, in
//! one call. With the `parallel` feature the documents are spread over the
//! rayon thread pool; without it they are parsed one after another. Each
//! document gets its own parser, scanner state and tree, so nothing is shared
//! but the grammar.
//!
//! ```toml
//! [dependencies]
//! shopware_twig = { version = "0.1", features = ["parallel"] }
//! ```
//!
//! ```rust
//! use shopware_twig::twig;
//!
//! let sources: [&[u8]; 2] = [b"<p>a</p>", b"{% block b %}"];
//! let trees = twig::parse_batch(&sources);
//! assert_eq!(trees.len(), 2);
//! assert_eq!(
//!     trees[1].to_sexp(),
//!     "(template (statement_directive (tag_statement (tag) (variable))))"
//! );
//! ```

use super::grammar::Grammar;
use super::parser::{Parser, ParserConfig};
use super::scanner::ExternalScanner;
use super::tree::Tree;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

fn parse_one(
    grammar: &Grammar,
    scanner: &dyn ExternalScanner,
    input: &[u8],
    config: ParserConfig,
) -> Tree {
    Parser::new(grammar, scanner, input).with_config(config).parse()
}

/// Parse every input, returning the trees in input order
#[cfg(feature = "rayon")]
pub fn parse_batch<I>(
    grammar: &Grammar,
    scanner: &dyn ExternalScanner,
    inputs: &[I],
    config: ParserConfig,
) -> Vec<Tree>
where
    I: AsRef<[u8]> + Sync,
{
    inputs
        .par_iter()
        .map(|input| parse_one(grammar, scanner, input.as_ref(), config))
        .collect()
}

/// Parse every input sequentially (fallback when rayon is not available)
#[cfg(not(feature = "rayon"))]
pub fn parse_batch<I>(
    grammar: &Grammar,
    scanner: &dyn ExternalScanner,
    inputs: &[I],
    config: ParserConfig,
) -> Vec<Tree>
where
    I: AsRef<[u8]> + Sync,
{
    inputs
        .iter()
        .map(|input| parse_one(grammar, scanner, input.as_ref(), config))
        .collect()
}
