//! Shopware flavored Twig
//!
//! HTML markup mixed with `{% ... %}` directives, as found in Shopware
//! storefront and administration templates.
//!
//! ```rust
//! use shopware_twig::twig;
//!
//! let tree = twig::parse(b"<div>{% block x %}{% endblock %}</div>");
//! assert_eq!(
//!     tree.to_sexp(),
//!     "(template (html_element (html_start_tag (html_tag_name)) \
//!      (statement_directive (tag_statement (tag) (variable))) \
//!      (statement_directive (tag_statement (tag))) \
//!      (html_end_tag (html_tag_name))))"
//! );
//! ```

pub mod directive;
pub mod grammar;
pub mod scanner;

use std::sync::OnceLock;

use crate::portable::grammar::Grammar;
use crate::portable::incremental::InputEdit;
use crate::portable::parallel;
use crate::portable::parser::{log_debug, Parser, ParserConfig};
use crate::portable::tree::Tree;

pub use scanner::TwigScanner;

/// Grammar and scanner of the language, built once per process
#[derive(Debug)]
pub struct Language {
    grammar: Grammar,
    scanner: TwigScanner,
}

impl Language {
    /// The shared instance
    pub fn get() -> &'static Language {
        static LANGUAGE: OnceLock<Language> = OnceLock::new();
        LANGUAGE.get_or_init(|| {
            let grammar = grammar::twig_grammar();
            log_debug!("twig grammar built: {} atoms", grammar.atom_count());
            Language {
                grammar,
                scanner: TwigScanner,
            }
        })
    }

    /// Language name
    pub fn name(&self) -> &'static str {
        "shopware_twig"
    }

    /// The rule arena
    #[inline]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The tag-stack scanner
    #[inline]
    pub fn scanner(&self) -> &TwigScanner {
        &self.scanner
    }

    /// A parser over `source` with default limits
    pub fn parser<'a>(&'a self, source: &'a [u8]) -> Parser<'a> {
        Parser::new(&self.grammar, &self.scanner, source)
    }
}

/// Parse a template
pub fn parse(source: &[u8]) -> Tree {
    Language::get().parser(source).parse()
}

/// Parse a template under explicit limits
pub fn parse_with_config(source: &[u8], config: ParserConfig) -> Tree {
    Language::get().parser(source).with_config(config).parse()
}

/// Re-parse after `edits`, reusing what `old_tree` still gets right
///
/// `old_tree` must have been parsed from the text the edits were applied to.
/// The result is the same tree a fresh [`parse`] of `source` gives.
pub fn parse_incremental(source: &[u8], old_tree: &Tree, edits: &[InputEdit]) -> Tree {
    Language::get()
        .parser(source)
        .with_previous_tree(old_tree, edits)
        .parse()
}

/// Parse many templates, in parallel with the `parallel` feature
pub fn parse_batch<I>(sources: &[I]) -> Vec<Tree>
where
    I: AsRef<[u8]> + Sync,
{
    let language = Language::get();
    parallel::parse_batch(
        &language.grammar,
        &language.scanner,
        sources,
        ParserConfig::default(),
    )
}
