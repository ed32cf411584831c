//! Concrete syntax tree
//!
//! Nodes live in a flat arena and address their children as a slice of a
//! shared element pool, so a whole tree is three vectors and cloning it is
//! cheap to reason about. Handles ([`SyntaxNode`], [`SyntaxToken`]) borrow the
//! tree and are `Copy`.
//!
//! Every byte of the input belongs to exactly one token. Whitespace is kept as
//! `whitespace` tokens, hoisted out of nodes so that a node's range starts at
//! its first significant token and ends at its last.

use std::fmt::{self, Write as _};
use std::ops::Range;
use std::sync::Arc;

use super::error::ParseError;
use super::scanner::ScannerState;
use super::source_location::SourcePosition;
use super::syntax_kind::SyntaxKind;

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A leaf of the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    /// Token kind (already aliased)
    pub kind: SyntaxKind,
    /// Start byte (inclusive)
    pub start: usize,
    /// End byte (exclusive)
    pub end: usize,
}

impl Token {
    #[inline]
    pub(crate) fn shifted(self, delta: isize) -> Self {
        Self {
            kind: self.kind,
            start: shift(self.start, delta),
            end: shift(self.end, delta),
        }
    }
}

#[inline]
pub(crate) fn shift(pos: usize, delta: isize) -> usize {
    pos.saturating_add_signed(delta)
}

/// Child slot of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Element {
    Node(NodeId),
    Token(Token),
}

impl Element {
    #[inline]
    fn is_trivia(&self) -> bool {
        matches!(self, Element::Token(t) if t.kind.is_trivia())
    }
}

/// What a later incremental parse needs to know to reuse a node
#[derive(Debug, Clone)]
pub(crate) struct ReuseInfo {
    /// Grammar atom that produced the node
    pub atom: usize,
    /// Position the atom was invoked at, before leading whitespace
    pub parse_start: usize,
    /// Position after the atom, including trailing whitespace
    pub parse_end: usize,
    /// Furthest byte looked at while parsing the node (exclusive)
    pub examined_end: usize,
    /// Scanner state when the atom was invoked
    pub state_before: Arc<ScannerState>,
    /// Scanner state after the atom matched
    pub state_after: Arc<ScannerState>,
}

impl ReuseInfo {
    fn shifted(&self, delta: isize) -> Self {
        Self {
            atom: self.atom,
            parse_start: shift(self.parse_start, delta),
            parse_end: shift(self.parse_end, delta),
            examined_end: shift(self.examined_end, delta),
            state_before: Arc::clone(&self.state_before),
            state_after: Arc::clone(&self.state_after),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: SyntaxKind,
    pub start: usize,
    pub end: usize,
    children: (u32, u32),
    parent: Option<NodeId>,
    pub reuse: Option<ReuseInfo>,
}

/// Position in the builder that can be restored on backtracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BuilderMark {
    stack: usize,
    nodes: usize,
    pool: usize,
}

/// Incremental tree construction used by the parser
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
    pool: Vec<Element>,
    stack: Vec<Element>,
}

impl TreeBuilder {
    pub fn with_capacity(input_len: usize) -> Self {
        let estimate = (input_len / 4).clamp(16, 1 << 20);
        Self {
            nodes: Vec::with_capacity(estimate / 2),
            pool: Vec::with_capacity(estimate),
            stack: Vec::with_capacity(64),
        }
    }

    #[inline]
    pub fn mark(&self) -> BuilderMark {
        BuilderMark {
            stack: self.stack.len(),
            nodes: self.nodes.len(),
            pool: self.pool.len(),
        }
    }

    #[inline]
    pub fn restore(&mut self, mark: BuilderMark) {
        self.stack.truncate(mark.stack);
        self.nodes.truncate(mark.nodes);
        self.pool.truncate(mark.pool);
    }

    #[inline]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Emit a token; empty tokens are dropped
    #[inline]
    pub fn token(&mut self, kind: SyntaxKind, start: usize, end: usize) {
        if end > start {
            self.stack.push(Element::Token(Token { kind, start, end }));
        }
    }

    /// Wrap everything emitted since `from` in a node
    ///
    /// Leading and trailing whitespace stays outside the node.
    pub fn close_node(&mut self, kind: SyntaxKind, from: usize, reuse: Option<ReuseInfo>) {
        let items = self.stack.split_off(from);
        let lead = items.iter().take_while(|e| e.is_trivia()).count();
        let trail = items[lead..]
            .iter()
            .rev()
            .take_while(|e| e.is_trivia())
            .count();
        let body = &items[lead..items.len() - trail];

        let (start, end) = match self.range_of(body) {
            Some(range) => range,
            None => {
                let at = reuse.as_ref().map_or(0, |r| r.parse_start);
                (at, at)
            }
        };

        self.stack.extend_from_slice(&items[..lead]);
        let id = self.alloc(kind, start, end, body, reuse);
        self.stack.push(Element::Node(id));
        self.stack.extend_from_slice(&items[items.len() - trail..]);
    }

    /// Copy a node of an older tree, shifted by `delta`, onto the stack
    pub fn graft(&mut self, old: &Tree, id: NodeId, delta: isize) {
        let new_id = self.copy_node(old, id, delta);
        self.stack.push(Element::Node(new_id));
    }

    fn copy_node(&mut self, old: &Tree, id: NodeId, delta: isize) -> NodeId {
        let data = &old.nodes[id.index()];
        let children: Vec<Element> = old
            .children_of(id)
            .iter()
            .map(|element| match *element {
                Element::Token(token) => Element::Token(token.shifted(delta)),
                Element::Node(child) => Element::Node(self.copy_node(old, child, delta)),
            })
            .collect();
        self.alloc(
            data.kind,
            shift(data.start, delta),
            shift(data.end, delta),
            &children,
            data.reuse.as_ref().map(|r| r.shifted(delta)),
        )
    }

    fn alloc(
        &mut self,
        kind: SyntaxKind,
        start: usize,
        end: usize,
        children: &[Element],
        reuse: Option<ReuseInfo>,
    ) -> NodeId {
        let first = self.pool.len() as u32;
        self.pool.extend_from_slice(children);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            start,
            end,
            children: (first, children.len() as u32),
            parent: None,
            reuse,
        });
        id
    }

    fn range_of(&self, elements: &[Element]) -> Option<(usize, usize)> {
        let first = elements.first()?;
        let last = elements.last()?;
        Some((self.element_start(first), self.element_end(last)))
    }

    #[inline]
    fn element_start(&self, element: &Element) -> usize {
        match element {
            Element::Token(t) => t.start,
            Element::Node(id) => self.nodes[id.index()].start,
        }
    }

    #[inline]
    fn element_end(&self, element: &Element) -> usize {
        match element {
            Element::Token(t) => t.end,
            Element::Node(id) => self.nodes[id.index()].end,
        }
    }

    /// Wrap the whole stack in the root node spanning `[0, len)`
    pub fn finish(
        mut self,
        root_kind: SyntaxKind,
        len: usize,
        final_state: ScannerState,
        stop_reason: Option<ParseError>,
    ) -> Tree {
        let items = std::mem::take(&mut self.stack);
        let root = self.alloc(root_kind, 0, len, &items, None);

        let mut nodes = self.nodes;
        for idx in 0..nodes.len() {
            let (first, count) = nodes[idx].children;
            for element in &self.pool[first as usize..(first + count) as usize] {
                if let Element::Node(child) = element {
                    nodes[child.index()].parent = Some(NodeId(idx as u32));
                }
            }
        }

        Tree {
            nodes,
            pool: self.pool,
            root,
            len,
            final_state,
            stop_reason,
        }
    }
}

/// A parsed document
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    pool: Vec<Element>,
    root: NodeId,
    len: usize,
    final_state: ScannerState,
    stop_reason: Option<ParseError>,
}

impl Tree {
    /// The `template` node spanning the whole input
    #[inline]
    pub fn root_node(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: self.root,
        }
    }

    /// Length of the parsed input in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the parsed input was empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes, root included
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Scanner state after the last byte
    #[inline]
    pub fn final_state(&self) -> &ScannerState {
        &self.final_state
    }

    /// Whether a budget or limit cut the parse short
    #[inline]
    pub fn is_partial(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Why the parse was cut short, if it was
    #[inline]
    pub fn stop_reason(&self) -> Option<&ParseError> {
        self.stop_reason.as_ref()
    }

    /// Node by id
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<SyntaxNode<'_>> {
        (id.index() < self.nodes.len()).then_some(SyntaxNode { tree: self, id })
    }

    /// All tokens in document order
    pub fn tokens(&self) -> Vec<SyntaxToken<'_>> {
        let mut out = Vec::new();
        self.collect_tokens(self.root, &mut out);
        out
    }

    fn collect_tokens<'t>(&'t self, id: NodeId, out: &mut Vec<SyntaxToken<'t>>) {
        for element in self.children_of(id) {
            match *element {
                Element::Token(token) => out.push(SyntaxToken {
                    tree: self,
                    parent: id,
                    token,
                }),
                Element::Node(child) => self.collect_tokens(child, out),
            }
        }
    }

    /// Tree-sitter style s-expression of the named structure
    ///
    /// ```
    /// let tree = shopware_twig::parse(b"<br>");
    /// assert_eq!(
    ///     tree.to_sexp(),
    ///     "(template (html_element (html_start_tag (html_tag_name))))"
    /// );
    /// ```
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_sexp(self.root, &mut out);
        out
    }

    fn write_sexp(&self, id: NodeId, out: &mut String) -> fmt::Result {
        write!(out, "({}", self.nodes[id.index()].kind)?;
        for element in self.children_of(id) {
            match element {
                Element::Node(child) => {
                    out.push(' ');
                    self.write_sexp(*child, out)?;
                }
                Element::Token(token) if token.kind.is_named() => {
                    write!(out, " ({})", token.kind)?;
                }
                Element::Token(_) => {}
            }
        }
        out.push(')');
        Ok(())
    }

    #[inline]
    pub(crate) fn children_of(&self, id: NodeId) -> &[Element] {
        let (first, count) = self.nodes[id.index()].children;
        &self.pool[first as usize..(first + count) as usize]
    }

    #[inline]
    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    /// Node ids in pre-order
    pub(crate) fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(
                self.children_of(id)
                    .iter()
                    .rev()
                    .filter_map(|e| match e {
                        Element::Node(child) => Some(*child),
                        Element::Token(_) => None,
                    }),
            );
        }
        order
    }
}

/// A node handle
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t Tree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    /// Node id within its tree
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node kind
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.tree.data(self.id).kind
    }

    /// Start byte
    #[inline]
    pub fn start_byte(&self) -> usize {
        self.tree.data(self.id).start
    }

    /// End byte (exclusive)
    #[inline]
    pub fn end_byte(&self) -> usize {
        self.tree.data(self.id).end
    }

    /// Byte range
    #[inline]
    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    /// Line/column of the start, derived from `source`
    pub fn start_position(&self, source: &[u8]) -> SourcePosition {
        SourcePosition::from_offset(source, self.start_byte())
    }

    /// Enclosing node
    #[inline]
    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.tree.data(self.id).parent.map(|id| SyntaxNode {
            tree: self.tree,
            id,
        })
    }

    /// Children, nodes and tokens, in order
    pub fn children(&self) -> impl Iterator<Item = SyntaxElement<'t>> + 't {
        let tree = self.tree;
        let parent = self.id;
        tree.children_of(parent)
            .iter()
            .map(move |element| SyntaxElement::new(tree, parent, *element))
    }

    /// Child nodes only
    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.children().filter_map(SyntaxElement::into_node)
    }

    /// Child tokens only
    pub fn child_tokens(&self) -> impl Iterator<Item = SyntaxToken<'t>> + 't {
        self.children().filter_map(SyntaxElement::into_token)
    }

    /// Children that are not whitespace
    pub fn significant_children(&self) -> impl Iterator<Item = SyntaxElement<'t>> + 't {
        self.children().filter(|e| !e.kind().is_trivia())
    }

    /// First child node of `kind`
    pub fn child_node(&self, kind: SyntaxKind) -> Option<SyntaxNode<'t>> {
        self.child_nodes().find(|n| n.kind() == kind)
    }

    /// First child token of `kind`
    pub fn child_token(&self, kind: SyntaxKind) -> Option<SyntaxToken<'t>> {
        self.child_tokens().find(|t| t.kind() == kind)
    }

    /// This node and all nodes below it, in pre-order
    pub fn descendants(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        let mut pending = vec![self.id];
        std::iter::from_fn(move || {
            let id = pending.pop()?;
            pending.extend(tree.children_of(id).iter().rev().filter_map(|e| match e {
                Element::Node(child) => Some(*child),
                Element::Token(_) => None,
            }));
            Some(SyntaxNode { tree, id })
        })
    }

    /// Whether an `ERROR` token occurs below this node
    pub fn has_error(&self) -> bool {
        self.descendants()
            .any(|n| n.child_tokens().any(|t| t.kind() == SyntaxKind::Error))
    }

    /// Source bytes of this node
    #[inline]
    pub fn text<'s>(&self, source: &'s [u8]) -> &'s [u8] {
        source.get(self.byte_range()).unwrap_or_default()
    }

    /// Source text of this node
    #[inline]
    pub fn utf8_text<'s>(&self, source: &'s [u8]) -> Result<&'s str, std::str::Utf8Error> {
        std::str::from_utf8(self.text(source))
    }

    /// The tree this node belongs to
    #[inline]
    pub fn tree(&self) -> &'t Tree {
        self.tree
    }
}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.kind(), self.start_byte(), self.end_byte())
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

/// A token handle
#[derive(Clone, Copy)]
pub struct SyntaxToken<'t> {
    tree: &'t Tree,
    parent: NodeId,
    token: Token,
}

impl<'t> SyntaxToken<'t> {
    /// Token kind
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        self.token.kind
    }

    /// Start byte
    #[inline]
    pub fn start_byte(&self) -> usize {
        self.token.start
    }

    /// End byte (exclusive)
    #[inline]
    pub fn end_byte(&self) -> usize {
        self.token.end
    }

    /// Byte range
    #[inline]
    pub fn byte_range(&self) -> Range<usize> {
        self.token.start..self.token.end
    }

    /// Enclosing node
    #[inline]
    pub fn parent(&self) -> SyntaxNode<'t> {
        SyntaxNode {
            tree: self.tree,
            id: self.parent,
        }
    }

    /// Source bytes of this token
    #[inline]
    pub fn text<'s>(&self, source: &'s [u8]) -> &'s [u8] {
        source.get(self.byte_range()).unwrap_or_default()
    }

    /// Source text of this token
    #[inline]
    pub fn utf8_text<'s>(&self, source: &'s [u8]) -> Result<&'s str, std::str::Utf8Error> {
        std::str::from_utf8(self.text(source))
    }
}

impl fmt::Debug for SyntaxToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}..{}", self.kind(), self.start_byte(), self.end_byte())
    }
}

/// Either a node or a token
#[derive(Debug, Clone, Copy)]
pub enum SyntaxElement<'t> {
    /// Inner node
    Node(SyntaxNode<'t>),
    /// Leaf token
    Token(SyntaxToken<'t>),
}

impl<'t> SyntaxElement<'t> {
    fn new(tree: &'t Tree, parent: NodeId, element: Element) -> Self {
        match element {
            Element::Node(id) => SyntaxElement::Node(SyntaxNode { tree, id }),
            Element::Token(token) => SyntaxElement::Token(SyntaxToken {
                tree,
                parent,
                token,
            }),
        }
    }

    /// Kind of the node or token
    #[inline]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            SyntaxElement::Node(n) => n.kind(),
            SyntaxElement::Token(t) => t.kind(),
        }
    }

    /// Byte range of the node or token
    #[inline]
    pub fn byte_range(&self) -> Range<usize> {
        match self {
            SyntaxElement::Node(n) => n.byte_range(),
            SyntaxElement::Token(t) => t.byte_range(),
        }
    }

    /// The node, if this is one
    #[inline]
    pub fn into_node(self) -> Option<SyntaxNode<'t>> {
        match self {
            SyntaxElement::Node(n) => Some(n),
            SyntaxElement::Token(_) => None,
        }
    }

    /// The token, if this is one
    #[inline]
    pub fn into_token(self) -> Option<SyntaxToken<'t>> {
        match self {
            SyntaxElement::Node(_) => None,
            SyntaxElement::Token(t) => Some(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        // "<b> x</b>" built by hand
        let mut builder = TreeBuilder::with_capacity(9);
        let element = builder.stack_len();

        let tag = builder.stack_len();
        builder.token(SyntaxKind::LAngle, 0, 1);
        builder.token(SyntaxKind::HtmlTagName, 1, 2);
        builder.token(SyntaxKind::RAngle, 2, 3);
        builder.close_node(SyntaxKind::HtmlStartTag, tag, None);

        builder.token(SyntaxKind::Whitespace, 3, 4);
        builder.token(SyntaxKind::Content, 4, 5);

        let tag = builder.stack_len();
        builder.token(SyntaxKind::LAngleSlash, 5, 7);
        builder.token(SyntaxKind::HtmlTagName, 7, 8);
        builder.token(SyntaxKind::RAngle, 8, 9);
        builder.close_node(SyntaxKind::HtmlEndTag, tag, None);

        builder.close_node(SyntaxKind::HtmlElement, element, None);
        builder.finish(SyntaxKind::Template, 9, ScannerState::new(), None)
    }

    #[test]
    fn test_structure_and_parents() {
        let tree = sample();
        let root = tree.root_node();
        assert_eq!(root.kind(), SyntaxKind::Template);
        assert_eq!(root.byte_range(), 0..9);

        let element = root.child_nodes().next().unwrap();
        assert_eq!(element.kind(), SyntaxKind::HtmlElement);
        assert_eq!(element.parent(), Some(root));
        assert_eq!(
            element
                .significant_children()
                .map(|e| e.kind())
                .collect::<Vec<_>>(),
            vec![
                SyntaxKind::HtmlStartTag,
                SyntaxKind::Content,
                SyntaxKind::HtmlEndTag
            ]
        );
        assert_eq!(element.child_nodes().count(), 2);
        assert_eq!(element.byte_range(), 0..9);
        assert!(root.parent().is_none());
        assert!(!tree.is_partial());
    }

    #[test]
    fn test_trivia_hoisting() {
        let mut builder = TreeBuilder::with_capacity(6);
        let from = builder.stack_len();
        builder.token(SyntaxKind::Whitespace, 0, 1);
        builder.token(SyntaxKind::DirectiveOpen, 1, 3);
        builder.token(SyntaxKind::DirectiveClose, 3, 5);
        builder.token(SyntaxKind::Whitespace, 5, 6);
        builder.close_node(SyntaxKind::StatementDirective, from, None);
        let tree = builder.finish(SyntaxKind::Template, 6, ScannerState::new(), None);

        let kinds: Vec<SyntaxKind> = tree.root_node().children().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::Whitespace,
                SyntaxKind::StatementDirective,
                SyntaxKind::Whitespace
            ]
        );
        let directive = tree
            .root_node()
            .child_node(SyntaxKind::StatementDirective)
            .unwrap();
        assert_eq!(directive.byte_range(), 1..5);
    }

    #[test]
    fn test_sexp_and_tokens() {
        let tree = sample();
        assert_eq!(
            tree.to_sexp(),
            "(template (html_element (html_start_tag (html_tag_name)) (content) (html_end_tag (html_tag_name))))"
        );

        let tokens = tree.tokens();
        assert_eq!(tokens.len(), 8);
        let mut at = 0;
        for token in &tokens {
            assert_eq!(token.start_byte(), at);
            at = token.end_byte();
        }
        assert_eq!(at, 9);
    }

    #[test]
    fn test_text_and_descendants() {
        let tree = sample();
        let source = b"<b> x</b>";
        let root = tree.root_node();
        let names: Vec<&[u8]> = root
            .descendants()
            .flat_map(|n| n.child_tokens().collect::<Vec<_>>())
            .filter(|t| t.kind() == SyntaxKind::HtmlTagName)
            .map(|t| t.text(source))
            .collect();
        assert_eq!(names, vec![b"b".as_slice(), b"b".as_slice()]);
        assert_eq!(root.descendants().count(), tree.node_count());
        assert!(!root.has_error());
    }

    #[test]
    fn test_restore_discards_nodes() {
        let mut builder = TreeBuilder::with_capacity(4);
        let mark = builder.mark();
        let from = builder.stack_len();
        builder.token(SyntaxKind::Variable, 0, 2);
        builder.close_node(SyntaxKind::IfStatement, from, None);
        builder.restore(mark);
        builder.token(SyntaxKind::Error, 0, 1);
        builder.token(SyntaxKind::Content, 1, 1);
        let tree = builder.finish(SyntaxKind::Template, 1, ScannerState::new(), None);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.to_sexp(), "(template (ERROR))");
        assert!(tree.root_node().has_error());
    }
}
