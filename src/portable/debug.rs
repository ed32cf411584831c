//! Developer Experience Tools
//!
//! Debugging and visualization helpers for trees and grammars.
//!
//! # Features
//! - Tree pretty printing (`KIND@start..end "text"`, one element per line)
//! - Grammar visualization (GraphViz DOT)
//! - Source excerpts with a position marker

use std::fmt::{self, Write};

use super::grammar::{Assoc, Atom, Grammar};
use super::source_location::LineIndex;
use super::tree::{SyntaxElement, SyntaxNode, Tree};

/// Parse tree pretty printer
///
/// ```rust
/// use shopware_twig::{parse, TreePrinter};
///
/// let source = b"<b>hi</b>";
/// let tree = parse(source);
/// let printed = TreePrinter::new().print(&tree, source);
/// assert!(printed.starts_with("template@0..9\n  html_element@0..9\n"));
/// assert!(printed.contains("    content@3..5 \"hi\"\n"));
/// ```
pub struct TreePrinter {
    /// Indentation string
    indent: String,
    /// Maximum depth to print
    max_depth: Option<usize>,
    /// Print whitespace tokens
    trivia: bool,
}

impl TreePrinter {
    /// Create a new tree printer
    pub fn new() -> Self {
        Self {
            indent: "  ".to_string(),
            max_depth: None,
            trivia: true,
        }
    }

    /// Set the indentation string
    pub fn indent(mut self, indent: &str) -> Self {
        self.indent = indent.to_string();
        self
    }

    /// Set the maximum depth to print
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Leave `whitespace` tokens out
    pub fn hide_trivia(mut self) -> Self {
        self.trivia = false;
        self
    }

    /// Print a whole tree
    pub fn print(&self, tree: &Tree, source: &[u8]) -> String {
        self.print_node(tree.root_node(), source)
    }

    /// Print a subtree
    pub fn print_node(&self, node: SyntaxNode<'_>, source: &[u8]) -> String {
        let mut output = String::new();
        match self.write_node(node, source, 0, &mut output) {
            Ok(()) => output,
            Err(_) => String::new(),
        }
    }

    fn write_node(
        &self,
        node: SyntaxNode<'_>,
        source: &[u8],
        depth: usize,
        output: &mut String,
    ) -> fmt::Result {
        let indent = self.indent.repeat(depth);
        if let Some(max) = self.max_depth {
            if depth > max {
                return writeln!(output, "{}...", indent);
            }
        }

        writeln!(output, "{}{:?}", indent, node)?;
        for child in node.children() {
            match child {
                SyntaxElement::Node(inner) => self.write_node(inner, source, depth + 1, output)?,
                SyntaxElement::Token(token) => {
                    if !self.trivia && token.kind().is_trivia() {
                        continue;
                    }
                    let text = String::from_utf8_lossy(token.text(source));
                    writeln!(
                        output,
                        "{}{}{:?} {:?}",
                        indent, self.indent, token, text
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

/// Grammar visualizer
pub struct GrammarVisualizer<'a> {
    grammar: &'a Grammar,
}

impl<'a> GrammarVisualizer<'a> {
    /// Create a new grammar visualizer
    pub fn new(grammar: &'a Grammar) -> Self {
        Self { grammar }
    }

    /// Generate a GraphViz DOT diagram
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        match self.write_dot(&mut output) {
            Ok(()) => output,
            Err(_) => String::new(),
        }
    }

    fn write_dot(&self, output: &mut String) -> fmt::Result {
        output.push_str("digraph Grammar {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n");

        for (i, atom) in self.grammar.atoms.iter().enumerate() {
            writeln!(output, "  a{} [label={:?}]", i, format!("{}: {}", i, atom_label(atom)))?;
            for child in atom_children(atom) {
                writeln!(output, "  a{} -> a{}", i, child)?;
            }
        }

        writeln!(
            output,
            "  a{} [style=filled, fillcolor=lightblue]",
            self.grammar.root
        )?;
        output.push_str("}\n");
        Ok(())
    }
}

fn atom_children(atom: &Atom) -> Vec<usize> {
    match atom {
        Atom::Sequence { atoms } | Atom::Alternative { atoms } => atoms.clone(),
        Atom::Repetition { atom, .. }
        | Atom::Entity { atom }
        | Atom::Lookahead { atom, .. }
        | Atom::Node { atom, .. }
        | Atom::Leaf { atom, .. }
        | Atom::Immediate { atom }
        | Atom::Precedence { atom, .. } => vec![*atom],
        Atom::Str { .. }
        | Atom::Keyword { .. }
        | Atom::Re { .. }
        | Atom::External { .. }
        | Atom::Error => Vec::new(),
    }
}

fn atom_label(atom: &Atom) -> String {
    match atom {
        Atom::Str { pattern } => format!("str({:?})", pattern),
        Atom::Keyword { pattern } => format!("keyword({:?})", pattern),
        Atom::Re { pattern } => format!("re({:?})", pattern),
        Atom::Sequence { atoms } => format!("seq({})", atoms.len()),
        Atom::Alternative { atoms } => format!("alt({})", atoms.len()),
        Atom::Repetition { min, max, .. } => match max {
            Some(max) => format!("rep({}..{})", min, max),
            None => format!("rep({}..)", min),
        },
        Atom::Entity { .. } => "entity".to_string(),
        Atom::Lookahead { positive: true, .. } => "lookahead(+)".to_string(),
        Atom::Lookahead { positive: false, .. } => "lookahead(-)".to_string(),
        Atom::Node { kind, .. } => format!("node({})", kind),
        Atom::Leaf { kind, .. } => format!("leaf({})", kind),
        Atom::External { kind } => format!("external({:?})", kind),
        Atom::Immediate { .. } => "immediate".to_string(),
        Atom::Precedence {
            priority, assoc, ..
        } => match assoc {
            Assoc::Right => format!("prec.right({})", priority),
            Assoc::Left | Assoc::None => format!("prec({})", priority),
        },
        Atom::Error => "error".to_string(),
    }
}

/// Source excerpts
pub struct SourceFormatter;

impl SourceFormatter {
    /// Format the line holding `offset` and `context_lines` around it, with
    /// a marker under the offset
    pub fn format_line(source: &[u8], offset: usize, context_lines: usize) -> String {
        let index = LineIndex::new(source);
        let position = index.position(offset);
        let first = position.line.saturating_sub(context_lines).max(1);
        let last = (position.line + context_lines).min(index.line_count());

        let mut output = String::new();
        for line in first..=last {
            let start = index.offset(line, 1);
            let end = if line < index.line_count() {
                index.offset(line + 1, 1).saturating_sub(1)
            } else {
                source.len()
            };
            let content = String::from_utf8_lossy(&source[start..end.max(start)]);
            output.push_str(&format!("{:4} | {}\n", line, content));
            if line == position.line {
                output.push_str("     | ");
                output.push_str(&" ".repeat(position.column - 1));
                output.push_str("^\n");
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portable::syntax_kind::SyntaxKind;
    use crate::twig::{self, Language};

    #[test]
    fn test_tree_printer() {
        let source = b"<p>a b</p>";
        let tree = twig::parse(source);
        let printed = TreePrinter::new().print(&tree, source);
        let expected = "\
template@0..10
  html_element@0..10
    html_start_tag@0..3
      <@0..1 \"<\"
      html_tag_name@1..2 \"p\"
      >@2..3 \">\"
    content@3..6 \"a b\"
    html_end_tag@6..10
      </@6..8 \"</\"
      html_tag_name@8..9 \"p\"
      >@9..10 \">\"
";
        assert_eq!(printed, expected);
    }

    #[test]
    fn test_tree_printer_options() {
        let source = b"<div> <p>x</p> </div>";
        let tree = twig::parse(source);

        let printed = TreePrinter::new().hide_trivia().print(&tree, source);
        assert!(!printed.contains("whitespace"));

        let shallow = TreePrinter::new().max_depth(1).indent("\t").print(&tree, source);
        assert!(shallow.contains("\t\t...\n"));
        assert!(!shallow.contains("html_tag_name"));

        let element = tree.root_node().child_node(SyntaxKind::HtmlElement).unwrap();
        assert!(TreePrinter::new()
            .print_node(element, source)
            .starts_with("html_element@0..21"));
    }

    #[test]
    fn test_grammar_visualizer() {
        let dot = GrammarVisualizer::new(Language::get().grammar()).to_dot();
        assert!(dot.starts_with("digraph Grammar {"));
        assert!(dot.contains("node(html_element)"));
        assert!(dot.contains("external(StartTagName)"));
        assert!(dot.contains("prec.right(1)"));
    }

    #[test]
    fn test_source_formatter() {
        let input = b"line one\nline two\nline three";
        let formatted = SourceFormatter::format_line(input, 11, 1);
        assert_eq!(
            formatted,
            "   1 | line one\n   2 | line two\n     |   ^\n   3 | line three\n"
        );
    }
}
