//! Node and token kinds
//!
//! A single closed vocabulary covers every node and token the parser can
//! produce. Named kinds form the public surface of the tree; anonymous kinds
//! are punctuation and keywords; `Whitespace` and `Error` are produced by the
//! engine itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of node or token in a concrete syntax tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyntaxKind {
    // ========================================================================
    // Public node kinds
    // ========================================================================
    /// Root of every tree
    Template,
    /// Run of text between markup
    Content,
    /// An element, explicitly, implicitly or self closed
    HtmlElement,
    /// `<name attr...>`
    HtmlStartTag,
    /// `</name>`
    HtmlEndTag,
    /// `<name attr.../>`
    HtmlSelfClosingTag,
    /// A closing tag that matches no open element
    ErroneousEndTag,
    /// `name` or `name=value`
    HtmlAttribute,
    /// Attribute name
    HtmlAttributeName,
    /// Unquoted value, or the interior of a quoted one
    HtmlAttributeValue,
    /// `"..."` or `'...'`
    HtmlQuotedAttributeValue,
    /// `<!DOCTYPE ...>`
    HtmlDoctype,
    /// `&name;`, `&#NNN;` or `&#xHEX;`
    HtmlEntity,
    /// `{% ... %}`
    StatementDirective,
    /// `if`/`endif` followed by a variable
    IfStatement,
    /// `block`/`endblock` with an optional variable, or a bare conditional
    TagStatement,
    /// `if` or `endif`
    Conditional,
    /// Identifier operand of a directive
    Variable,
    /// `parent()`
    ParentStatement,
    /// Any other directive written as a call
    FunctionCall,
    /// Name of a called directive
    FunctionIdentifier,
    /// Parenthesized argument list
    Arguments,

    // ========================================================================
    // Named leaf kinds
    // ========================================================================
    /// Tag name inside a start, end or self-closing tag
    HtmlTagName,
    /// Tag name inside an erroneous end tag
    ErroneousEndTagName,
    /// Verbatim body of `script`/`style`
    RawText,
    /// `<!-- ... -->`
    Comment,
    /// `block` or `endblock`
    Tag,

    // ========================================================================
    // Internal kinds, aliased before they reach the tree
    // ========================================================================
    /// Scanner tag name of a start tag
    StartTagName,
    /// Scanner tag name of a matching end tag
    EndTagName,

    // ========================================================================
    // Anonymous kinds
    // ========================================================================
    /// `<`
    LAngle,
    /// `>`
    RAngle,
    /// `</`
    LAngleSlash,
    /// `/>`
    SlashRAngle,
    /// `=`
    Equals,
    /// `"`
    DoubleQuote,
    /// `'`
    SingleQuote,
    /// `{%`
    DirectiveOpen,
    /// `%}`
    DirectiveClose,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `if` keyword
    IfKw,
    /// `endif` keyword
    EndifKw,
    /// `block` keyword
    BlockKw,
    /// `endblock` keyword
    EndblockKw,
    /// `parent` keyword
    ParentKw,
    /// Any other unnamed terminal
    Anonymous,

    // ========================================================================
    // Engine kinds
    // ========================================================================
    /// Skipped whitespace
    Whitespace,
    /// One byte that starts no valid token
    Error,
}

impl SyntaxKind {
    /// Public node kinds, in declaration order
    pub const PUBLIC_NODES: [SyntaxKind; 22] = [
        SyntaxKind::Template,
        SyntaxKind::Content,
        SyntaxKind::HtmlElement,
        SyntaxKind::HtmlStartTag,
        SyntaxKind::HtmlEndTag,
        SyntaxKind::HtmlSelfClosingTag,
        SyntaxKind::ErroneousEndTag,
        SyntaxKind::HtmlAttribute,
        SyntaxKind::HtmlAttributeName,
        SyntaxKind::HtmlAttributeValue,
        SyntaxKind::HtmlQuotedAttributeValue,
        SyntaxKind::HtmlDoctype,
        SyntaxKind::HtmlEntity,
        SyntaxKind::StatementDirective,
        SyntaxKind::IfStatement,
        SyntaxKind::TagStatement,
        SyntaxKind::Conditional,
        SyntaxKind::Variable,
        SyntaxKind::ParentStatement,
        SyntaxKind::FunctionCall,
        SyntaxKind::FunctionIdentifier,
        SyntaxKind::Arguments,
    ];

    /// The tree-sitter style name of this kind
    pub fn name(self) -> &'static str {
        use SyntaxKind::*;
        match self {
            Template => "template",
            Content => "content",
            HtmlElement => "html_element",
            HtmlStartTag => "html_start_tag",
            HtmlEndTag => "html_end_tag",
            HtmlSelfClosingTag => "html_self_closing_tag",
            ErroneousEndTag => "erroneous_end_tag",
            HtmlAttribute => "html_attribute",
            HtmlAttributeName => "html_attribute_name",
            HtmlAttributeValue => "html_attribute_value",
            HtmlQuotedAttributeValue => "html_quoted_attribute_value",
            HtmlDoctype => "html_doctype",
            HtmlEntity => "html_entity",
            StatementDirective => "statement_directive",
            IfStatement => "if_statement",
            TagStatement => "tag_statement",
            Conditional => "conditional",
            Variable => "variable",
            ParentStatement => "parent_statement",
            FunctionCall => "function_call",
            FunctionIdentifier => "function_identifier",
            Arguments => "arguments",
            HtmlTagName => "html_tag_name",
            ErroneousEndTagName => "erroneous_end_tag_name",
            RawText => "raw_text",
            Comment => "comment",
            Tag => "tag",
            StartTagName => "_start_tag_name",
            EndTagName => "_end_tag_name",
            LAngle => "<",
            RAngle => ">",
            LAngleSlash => "</",
            SlashRAngle => "/>",
            Equals => "=",
            DoubleQuote => "\"",
            SingleQuote => "'",
            DirectiveOpen => "{%",
            DirectiveClose => "%}",
            LParen => "(",
            RParen => ")",
            Comma => ",",
            IfKw => "if",
            EndifKw => "endif",
            BlockKw => "block",
            EndblockKw => "endblock",
            ParentKw => "parent",
            Anonymous => "_anonymous",
            Whitespace => "whitespace",
            Error => "ERROR",
        }
    }

    /// Kind of the token produced by a literal terminal
    pub fn from_literal(literal: &str) -> SyntaxKind {
        use SyntaxKind::*;
        match literal {
            "<" => LAngle,
            ">" => RAngle,
            "</" => LAngleSlash,
            "/>" => SlashRAngle,
            "=" => Equals,
            "\"" => DoubleQuote,
            "'" => SingleQuote,
            "{%" => DirectiveOpen,
            "%}" => DirectiveClose,
            "(" => LParen,
            ")" => RParen,
            "," => Comma,
            "if" => IfKw,
            "endif" => EndifKw,
            "block" => BlockKw,
            "endblock" => EndblockKw,
            "parent" => ParentKw,
            _ => Anonymous,
        }
    }

    /// Look a named kind up by its tree-sitter name
    pub fn from_name(name: &str) -> Option<SyntaxKind> {
        Self::PUBLIC_NODES
            .iter()
            .chain(
                [
                    SyntaxKind::HtmlTagName,
                    SyntaxKind::ErroneousEndTagName,
                    SyntaxKind::RawText,
                    SyntaxKind::Comment,
                    SyntaxKind::Tag,
                ]
                .iter(),
            )
            .copied()
            .find(|kind| kind.name() == name)
    }

    /// Named kinds show up in s-expressions
    #[inline]
    pub fn is_named(self) -> bool {
        (self as u16) <= (SyntaxKind::Tag as u16) || self == SyntaxKind::Error
    }

    /// Internal kinds never appear in a finished tree
    #[inline]
    pub fn is_internal(self) -> bool {
        matches!(self, SyntaxKind::StartTagName | SyntaxKind::EndTagName)
    }

    /// Whitespace is the only trivia
    #[inline]
    pub fn is_trivia(self) -> bool {
        self == SyntaxKind::Whitespace
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_vocabulary_is_named() {
        for kind in SyntaxKind::PUBLIC_NODES {
            assert!(kind.is_named(), "{} should be named", kind);
            assert!(!kind.is_internal());
        }
    }

    #[test]
    fn test_literal_lookup() {
        assert_eq!(SyntaxKind::from_literal("{%"), SyntaxKind::DirectiveOpen);
        assert_eq!(SyntaxKind::from_literal("/>"), SyntaxKind::SlashRAngle);
        assert_eq!(SyntaxKind::from_literal("endblock"), SyntaxKind::EndblockKw);
        assert_eq!(SyntaxKind::from_literal("???"), SyntaxKind::Anonymous);
        assert!(!SyntaxKind::from_literal("<").is_named());
    }

    #[test]
    fn test_name_roundtrip() {
        assert_eq!(
            SyntaxKind::from_name("html_quoted_attribute_value"),
            Some(SyntaxKind::HtmlQuotedAttributeValue)
        );
        assert_eq!(SyntaxKind::from_name("raw_text"), Some(SyntaxKind::RawText));
        assert_eq!(SyntaxKind::from_name("<"), None);
    }

    #[test]
    fn test_engine_kinds() {
        assert!(SyntaxKind::Whitespace.is_trivia());
        assert!(!SyntaxKind::Whitespace.is_named());
        assert!(SyntaxKind::Error.is_named());
        assert_eq!(SyntaxKind::Error.to_string(), "ERROR");
    }
}
