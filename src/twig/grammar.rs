//! Rules of Shopware flavored Twig
//!
//! The template is a flat sequence of directives, elements, doctypes,
//! entities, text and comments. Elements nest through the tag stack kept by
//! [`TwigScanner`](super::scanner::TwigScanner); directives are not paired,
//! so `{% block %}` and `{% endblock %}` are siblings.

use crate::portable::error::ParseError;
use crate::portable::grammar::Grammar;
use crate::portable::parser_dsl::*;
use crate::portable::scanner::ExternalKind;
use crate::portable::syntax_kind::SyntaxKind;

/// Text up to the next markup opener, without surrounding whitespace
pub const CONTENT_PATTERN: &str = r"[^<>&{\s]([^<>&{]*[^<>&{\s])?";
/// Attribute names, including `:prop`, `@event` and `v-bind:x`
pub const ATTRIBUTE_NAME_PATTERN: &str = r"[a-zA-Z_:@][a-zA-Z0-9_:.\-]*";
/// Unquoted attribute values
pub const ATTRIBUTE_VALUE_PATTERN: &str = r#"[^>\s"'=]+"#;
/// Named, decimal and hexadecimal character references
pub const ENTITY_PATTERN: &str = r"&(?:[a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);";
/// `<!doctype ...>`, unterminated runs to the end of input
pub const DOCTYPE_PATTERN: &str = r"(?i)<!doctype[^>]*>?";

/// The Twig grammar
pub fn twig_grammar() -> Grammar {
    rules().build()
}

/// The Twig grammar, failing on unresolved rule references
pub fn try_twig_grammar() -> Result<Grammar, ParseError> {
    rules().try_build()
}

fn rules() -> GrammarBuilder {
    use SyntaxKind::*;

    GrammarBuilder::new()
        .rule(
            "template",
            node(
                Template,
                oneof![
                    ref_("statement_directive"),
                    ref_("html_element"),
                    ref_("html_doctype"),
                    ref_("html_entity"),
                    prec_right(1, ref_("content")),
                    ref_("erroneous_end_tag"),
                    ref_("comment"),
                    prec(-1, error_byte()),
                ]
                .many(),
            ),
        )
        .rule("content", leaf(Content, re(CONTENT_PATTERN)))
        // ====================================================================
        // Markup
        // ====================================================================
        .rule(
            "html_element",
            node(
                HtmlElement,
                oneof![
                    all![
                        ref_("html_start_tag"),
                        external(ExternalKind::RawText).optional(),
                        external(ExternalKind::ImplicitEndTag)
                            .not_ahead()
                            .then(ref_("_node"))
                            .many(),
                        ref_("html_end_tag").or(external(ExternalKind::ImplicitEndTag)),
                    ],
                    ref_("html_self_closing_tag"),
                ],
            ),
        )
        .rule(
            "_node",
            oneof![
                ref_("html_element"),
                ref_("statement_directive"),
                ref_("html_entity"),
                ref_("content"),
                ref_("comment"),
                ref_("erroneous_end_tag"),
                ref_("html_end_tag").not_ahead().then(error_byte()),
            ],
        )
        .rule(
            "html_start_tag",
            node(
                HtmlStartTag,
                all![
                    str("<"),
                    external(ExternalKind::StartTagName).immediate(),
                    ref_("html_attribute").many(),
                    str(">"),
                ],
            ),
        )
        .rule(
            "html_self_closing_tag",
            node(
                HtmlSelfClosingTag,
                all![
                    str("<"),
                    external(ExternalKind::StartTagName).immediate(),
                    ref_("html_attribute").many(),
                    external(ExternalKind::SelfClosingTagDelimiter),
                ],
            ),
        )
        .rule(
            "html_end_tag",
            node(
                HtmlEndTag,
                all![
                    str("</"),
                    external(ExternalKind::EndTagName).immediate(),
                    str(">"),
                ],
            ),
        )
        .rule(
            "erroneous_end_tag",
            node(
                ErroneousEndTag,
                all![
                    str("</"),
                    external(ExternalKind::ErroneousEndTagName).immediate(),
                    str(">"),
                ],
            ),
        )
        .rule(
            "html_attribute",
            node(
                HtmlAttribute,
                leaf(HtmlAttributeName, re(ATTRIBUTE_NAME_PATTERN)).then(
                    str("=")
                        .then(oneof![
                            leaf(HtmlAttributeValue, re(ATTRIBUTE_VALUE_PATTERN)),
                            ref_("html_quoted_attribute_value"),
                        ])
                        .optional(),
                ),
            ),
        )
        .rule(
            "html_quoted_attribute_value",
            node(
                HtmlQuotedAttributeValue,
                oneof![
                    str("\"").then(
                        leaf(HtmlAttributeValue, re(r#"[^"]+"#))
                            .optional()
                            .then(str("\""))
                            .immediate()
                    ),
                    str("'").then(
                        leaf(HtmlAttributeValue, re(r"[^']+"))
                            .optional()
                            .then(str("'"))
                            .immediate()
                    ),
                ],
            ),
        )
        .rule("html_doctype", leaf(HtmlDoctype, re(DOCTYPE_PATTERN)))
        .rule("html_entity", leaf(HtmlEntity, re(ENTITY_PATTERN)))
        .rule("comment", external(ExternalKind::Comment))
        // ====================================================================
        // Directives
        // ====================================================================
        .rule(
            "statement_directive",
            node(
                StatementDirective,
                str("{%").then(oneof![
                    ref_("if_statement").then(str("%}")),
                    ref_("tag_statement").then(str("%}")),
                    ref_("parent_statement").then(str("%}")),
                    ref_("function_call").then(str("%}")),
                ]),
            ),
        )
        .rule(
            "if_statement",
            node(IfStatement, ref_("conditional").then(ref_("variable"))),
        )
        .rule(
            "tag_statement",
            node(
                TagStatement,
                oneof![
                    ref_("tag").then(ref_("variable").optional()),
                    ref_("conditional"),
                ],
            ),
        )
        .rule("tag", leaf(Tag, keyword("block").or(keyword("endblock"))))
        .rule(
            "conditional",
            leaf(Conditional, keyword("if").or(keyword("endif"))),
        )
        .rule("variable", leaf(Variable, re("[a-zA-Z0-9_]+")))
        .rule(
            "parent_statement",
            node(
                ParentStatement,
                all![keyword("parent"), str("("), str(")")],
            ),
        )
        .rule(
            "function_call",
            node(
                FunctionCall,
                leaf(FunctionIdentifier, re("[a-zA-Z_][a-zA-Z0-9_]*")).then(ref_("arguments")),
            ),
        )
        .rule(
            "arguments",
            node(
                Arguments,
                all![
                    str("("),
                    ref_("variable")
                        .then(str(",").then(ref_("variable")).many())
                        .optional(),
                    str(")"),
                ],
            ),
        )
        .alias(SyntaxKind::StartTagName, SyntaxKind::HtmlTagName)
        .alias(SyntaxKind::EndTagName, SyntaxKind::HtmlTagName)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portable::grammar::Atom;
    use crate::portable::regex_cache;

    #[test]
    fn test_all_references_resolve() {
        assert!(try_twig_grammar().is_ok());
    }

    #[test]
    fn test_root_is_a_template_repetition() {
        let grammar = twig_grammar();
        let Some(Atom::Node { kind, atom }) = grammar.root_atom() else {
            panic!("root is not a node");
        };
        assert_eq!(*kind, SyntaxKind::Template);
        assert!(matches!(
            grammar.get_atom(*atom),
            Some(Atom::Repetition { min: 0, max: None, .. })
        ));
    }

    #[test]
    fn test_produces_the_public_vocabulary() {
        let produced = twig_grammar().produced_kinds();
        for kind in SyntaxKind::PUBLIC_NODES {
            assert!(produced.contains(&kind), "{} is never produced", kind);
        }
        for token in [
            SyntaxKind::HtmlTagName,
            SyntaxKind::ErroneousEndTagName,
            SyntaxKind::RawText,
            SyntaxKind::Comment,
            SyntaxKind::Tag,
        ] {
            assert!(produced.contains(&token));
        }
        assert!(!produced.contains(&SyntaxKind::StartTagName));
        assert!(!produced.contains(&SyntaxKind::EndTagName));
    }

    #[test]
    fn test_patterns_compile() {
        for pattern in [
            CONTENT_PATTERN,
            ATTRIBUTE_NAME_PATTERN,
            ATTRIBUTE_VALUE_PATTERN,
            ENTITY_PATTERN,
            DOCTYPE_PATTERN,
        ] {
            assert!(regex_cache::get_or_compile(pattern).is_some(), "{}", pattern);
        }
    }

    #[test]
    fn test_content_never_ends_on_whitespace() {
        let content = regex_cache::get_or_compile(CONTENT_PATTERN).unwrap();
        let m = content.find(b"Hello world  <b>").unwrap();
        assert_eq!(m.as_bytes(), b"Hello world");
        assert!(content.find(b" x").is_none());
        assert!(content.find(b"{% if %}").is_none());
    }

    #[test]
    fn test_grammar_json_roundtrip() {
        let grammar = twig_grammar();
        let json = grammar.to_json().unwrap();
        assert_eq!(Grammar::from_json(&json).unwrap(), grammar);
    }
}
