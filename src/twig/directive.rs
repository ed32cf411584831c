//! Typed views over `{% ... %}` directives
//!
//! ```rust
//! use shopware_twig::parse;
//! use shopware_twig::twig::directive::{directives, DirectiveBody};
//!
//! let source = b"{% block content %}<p>hi</p>{% endblock %}";
//! let tree = parse(source);
//! let names: Vec<_> = directives(&tree)
//!     .filter_map(|d| match d.body()? {
//!         DirectiveBody::Tag(tag) => tag.variable_text(source),
//!         _ => None,
//!     })
//!     .collect();
//! assert_eq!(names, ["content"]);
//! ```

use crate::portable::syntax_kind::SyntaxKind;
use crate::portable::tree::{SyntaxNode, SyntaxToken, Tree};

fn token_text<'s>(token: Option<SyntaxToken<'_>>, source: &'s [u8]) -> Option<&'s str> {
    token?.utf8_text(source).ok()
}

/// Every directive of a tree, in document order
pub fn directives(tree: &Tree) -> impl Iterator<Item = StatementDirective<'_>> + '_ {
    tree.root_node().descendants().filter_map(StatementDirective::cast)
}

/// A `statement_directive` node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementDirective<'t>(SyntaxNode<'t>);

impl<'t> StatementDirective<'t> {
    /// View `node` as a directive if it is one
    pub fn cast(node: SyntaxNode<'t>) -> Option<Self> {
        (node.kind() == SyntaxKind::StatementDirective).then_some(Self(node))
    }

    /// Underlying node
    #[inline]
    pub fn syntax(&self) -> SyntaxNode<'t> {
        self.0
    }

    /// What the directive says
    ///
    /// Anything that is not an `if`, a block tag or `parent()` but looks like
    /// a call is a [`DirectiveBody::FunctionCall`].
    pub fn body(&self) -> Option<DirectiveBody<'t>> {
        self.0.child_nodes().find_map(|node| match node.kind() {
            SyntaxKind::IfStatement => Some(DirectiveBody::If(IfStatement(node))),
            SyntaxKind::TagStatement => Some(DirectiveBody::Tag(TagStatement(node))),
            SyntaxKind::ParentStatement => Some(DirectiveBody::Parent(ParentStatement(node))),
            SyntaxKind::FunctionCall => Some(DirectiveBody::FunctionCall(FunctionCall(node))),
            _ => None,
        })
    }
}

/// Body of a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveBody<'t> {
    /// `{% if name %}`
    If(IfStatement<'t>),
    /// `{% block name %}`, `{% endblock %}`, bare `{% if %}` / `{% endif %}`
    Tag(TagStatement<'t>),
    /// `{% parent() %}`
    Parent(ParentStatement<'t>),
    /// `{% name(args) %}`
    FunctionCall(FunctionCall<'t>),
}

impl<'t> DirectiveBody<'t> {
    /// Underlying node
    pub fn syntax(&self) -> SyntaxNode<'t> {
        match self {
            DirectiveBody::If(n) => n.0,
            DirectiveBody::Tag(n) => n.0,
            DirectiveBody::Parent(n) => n.0,
            DirectiveBody::FunctionCall(n) => n.0,
        }
    }
}

/// `conditional variable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfStatement<'t>(SyntaxNode<'t>);

impl<'t> IfStatement<'t> {
    /// The `if` / `endif` keyword
    pub fn conditional(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::Conditional)
    }

    /// The tested variable
    pub fn variable(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::Variable)
    }

    /// Text of the tested variable
    pub fn variable_text<'s>(&self, source: &'s [u8]) -> Option<&'s str> {
        token_text(self.variable(), source)
    }
}

/// `tag variable?` or a bare `conditional`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagStatement<'t>(SyntaxNode<'t>);

impl<'t> TagStatement<'t> {
    /// `block` / `endblock`
    pub fn tag(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::Tag)
    }

    /// `if` / `endif` without a condition
    pub fn conditional(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::Conditional)
    }

    /// Block name
    pub fn variable(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::Variable)
    }

    /// Text of the block name
    pub fn variable_text<'s>(&self, source: &'s [u8]) -> Option<&'s str> {
        token_text(self.variable(), source)
    }

    /// Whether this opens a block (`block`) rather than closing one
    pub fn opens_block(&self, source: &[u8]) -> bool {
        token_text(self.tag(), source) == Some("block")
    }
}

/// `parent()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentStatement<'t>(SyntaxNode<'t>);

impl<'t> ParentStatement<'t> {
    /// Underlying node
    pub fn syntax(&self) -> SyntaxNode<'t> {
        self.0
    }
}

/// `function_identifier arguments`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionCall<'t>(SyntaxNode<'t>);

impl<'t> FunctionCall<'t> {
    /// The called name
    pub fn identifier(&self) -> Option<SyntaxToken<'t>> {
        self.0.child_token(SyntaxKind::FunctionIdentifier)
    }

    /// Text of the called name
    pub fn name<'s>(&self, source: &'s [u8]) -> Option<&'s str> {
        token_text(self.identifier(), source)
    }

    /// Argument variables, in order
    pub fn arguments(&self) -> impl Iterator<Item = SyntaxToken<'t>> + 't {
        self.0
            .child_node(SyntaxKind::Arguments)
            .into_iter()
            .flat_map(|args| args.child_tokens())
            .filter(|t| t.kind() == SyntaxKind::Variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twig::parse;

    fn first_body(source: &[u8]) -> (Tree, Option<SyntaxKind>) {
        let tree = parse(source);
        let kind = directives(&tree)
            .next()
            .and_then(|d| d.body())
            .map(|b| b.syntax().kind());
        (tree, kind)
    }

    #[test]
    fn test_if_statement() {
        let source = b"{% if isActive %}";
        let tree = parse(source);
        let directive = directives(&tree).next().unwrap();
        let Some(DirectiveBody::If(stmt)) = directive.body() else {
            panic!("expected if statement");
        };
        assert_eq!(stmt.variable_text(source), Some("isActive"));
        assert_eq!(stmt.conditional().unwrap().text(source), b"if");
    }

    #[test]
    fn test_block_tags() {
        let source = b"{% block page_content %}{% endblock %}";
        let tree = parse(source);
        let tags: Vec<_> = directives(&tree)
            .filter_map(|d| match d.body() {
                Some(DirectiveBody::Tag(tag)) => Some(tag),
                _ => None,
            })
            .collect();
        assert_eq!(tags.len(), 2);
        assert!(tags[0].opens_block(source));
        assert_eq!(tags[0].variable_text(source), Some("page_content"));
        assert!(!tags[1].opens_block(source));
        assert!(tags[1].variable().is_none());
    }

    #[test]
    fn test_bare_conditional_is_a_tag_statement() {
        let (_, kind) = first_body(b"{% endif %}");
        assert_eq!(kind, Some(SyntaxKind::TagStatement));
    }

    #[test]
    fn test_parent() {
        let (_, kind) = first_body(b"{% parent() %}");
        assert_eq!(kind, Some(SyntaxKind::ParentStatement));
    }

    #[test]
    fn test_function_call_fallback() {
        let source = b"{% sw_icon(name, size) %}";
        let tree = parse(source);
        let directive = directives(&tree).next().unwrap();
        let Some(DirectiveBody::FunctionCall(call)) = directive.body() else {
            panic!("expected function call");
        };
        assert_eq!(call.name(source), Some("sw_icon"));
        let args: Vec<_> = call
            .arguments()
            .map(|t| t.utf8_text(source).unwrap())
            .collect();
        assert_eq!(args, ["name", "size"]);
    }

    #[test]
    fn test_cast_rejects_other_nodes() {
        let tree = parse(b"<p></p>");
        assert!(tree
            .root_node()
            .descendants()
            .all(|n| StatementDirective::cast(n).is_none()));
    }
}
