//! Integration tests for incremental re-parsing
//!
//! These tests cover:
//! - Equality of incremental and fresh parses
//! - Node reuse across edits
//! - Scanner state sensitivity of reuse
//! - Sequences of edits

use shopware_twig::{parse, parse_incremental, InputEdit, Language, ParseStats, Tree};

type Shape = Vec<(String, std::ops::Range<usize>)>;

/// Every node and token with its range, in document order
fn shape(tree: &Tree) -> Shape {
    let mut out: Shape = tree
        .root_node()
        .descendants()
        .map(|n| (format!("node {}", n.kind()), n.byte_range()))
        .collect();
    out.extend(
        tree.tokens()
            .into_iter()
            .map(|t| (format!("token {}", t.kind()), t.byte_range())),
    );
    out
}

fn assert_same_tree(incremental: &Tree, fresh: &Tree) {
    assert_eq!(incremental.to_sexp(), fresh.to_sexp());
    assert_eq!(shape(incremental), shape(fresh));
    assert_eq!(incremental.final_state(), fresh.final_state());
}

/// Apply `edit` to `old`, replacing the old range with `inserted`
fn apply(old: &[u8], start: usize, old_end: usize, inserted: &[u8]) -> (Vec<u8>, InputEdit) {
    let mut new = old[..start].to_vec();
    new.extend_from_slice(inserted);
    new.extend_from_slice(&old[old_end..]);
    (new, InputEdit::new(start, old_end, start + inserted.len()))
}

fn reparse_with_stats(source: &[u8], old: &Tree, edits: &[InputEdit]) -> (Tree, ParseStats) {
    Language::get()
        .parser(source)
        .with_previous_tree(old, edits)
        .parse_with_stats()
}

// ============================================================================
// Equality with Fresh Parses
// ============================================================================

#[test]
fn test_edit_inside_content() {
    let old = b"<div><p>Hello</p><p>World</p></div>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 8, 13, b"Goodbye");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
}

#[test]
fn test_edit_changes_structure() {
    let old = b"<div><p>x</p></div>";
    let old_tree = parse(old);

    // `</p>` becomes `</b>`: the paragraph is now closed by `</div>`
    let (new, edit) = apply(old, 11, 12, b"b");
    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
    assert!(tree.to_sexp().contains("erroneous_end_tag"));
}

#[test]
fn test_edit_turns_text_into_raw_text() {
    let old = b"<div>a < b</div><p>x</p>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 1, 4, b"script");
    assert_eq!(&new[..], b"<script>a < b</div><p>x</p>");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
}

#[test]
fn test_edit_opens_a_comment() {
    let old = b"<p>a</p> <i>b</i>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 8, 8, b"<!--");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
    assert_eq!(
        tree.to_sexp(),
        "(template (html_element (html_start_tag (html_tag_name)) (content) \
         (html_end_tag (html_tag_name))) (comment))"
    );
}

#[test]
fn test_edit_inside_directive() {
    let old = b"{% block a %}<p>x</p>{% endblock %}";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 3, 8, b"if");
    assert_eq!(&new[..], b"{% if a %}<p>x</p>{% endblock %}");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
}

#[test]
fn test_delete_everything() {
    let old = b"<div>x</div>";
    let old_tree = parse(old);
    let tree = parse_incremental(b"", &old_tree, &[InputEdit::delete(0, old.len())]);
    assert_eq!(tree.to_sexp(), "(template)");
    assert!(tree.is_empty());
}

#[test]
fn test_append_at_end_of_unclosed_element() {
    let old = b"<div>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 5, 5, b"x</div>");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
    assert!(tree.to_sexp().contains("html_end_tag"));
}

#[test]
fn test_edit_then_inverse() {
    let original = b"<ul><li>one<li>two</ul>{% if x %}";
    let original_tree = parse(original);

    let (edited, edit) = apply(original, 8, 11, b"<b>three</b>");
    let edited_tree = parse_incremental(&edited, &original_tree, &[edit]);
    assert_same_tree(&edited_tree, &parse(&edited));

    let inverse = InputEdit::new(8, 8 + 12, 11);
    let restored = parse_incremental(original, &edited_tree, &[inverse]);
    assert_same_tree(&restored, &original_tree);
}

#[test]
fn test_sequential_edits() {
    let v0 = b"<p>a</p><p>b</p><p>c</p>";
    let (v1, e1) = apply(v0, 3, 4, b"alpha");
    let (v2, e2) = apply(&v1, v1.len() - 5, v1.len() - 4, b"gamma");

    let tree = parse_incremental(&v2, &parse(v0), &[e1, e2]);
    assert_same_tree(&tree, &parse(&v2));
}

#[test]
fn test_edit_from_texts() {
    let old = b"<div class=\"a\">text</div>";
    let new = b"<div class=\"abc\">text</div>";
    let edit = InputEdit::from_texts(old, new).unwrap();
    assert_eq!(edit, InputEdit::new(13, 13, 15));

    let tree = parse_incremental(new, &parse(old), &[edit]);
    assert_same_tree(&tree, &parse(new));
}

// ============================================================================
// Reuse
// ============================================================================

#[test]
fn test_untouched_elements_are_reused() {
    let old = b"<p>a</p><i>b</i>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 0, 0, b"xx");

    let (tree, stats) = reparse_with_stats(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
    assert_eq!(stats.reused_nodes, 2);
    assert_eq!(stats.reused_bytes, 16);
}

#[test]
fn test_no_edits_reuses_top_level_items() {
    let source = b"<p>a</p> {% block b %} <br>";
    let old_tree = parse(source);
    let (tree, stats) = reparse_with_stats(source, &old_tree, &[]);
    assert_same_tree(&tree, &old_tree);
    assert!(stats.reused_nodes >= 2);

    let (_, fresh_stats) = Language::get().parser(source).parse_with_stats();
    assert!(stats.operations < fresh_stats.operations);
}

#[test]
fn test_reuse_requires_equal_scanner_state() {
    // The paragraph was parsed at top level; after the insertion it sits
    // inside a div, where the scanner state differs.
    let old = b"<p>x</p>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 0, 0, b"<div>");

    let (tree, stats) = reparse_with_stats(&new, &old_tree, &[edit]);
    assert_same_tree(&tree, &parse(&new));
    assert_eq!(stats.reused_nodes, 0);
}

#[test]
fn test_reused_nodes_are_shifted() {
    let old = b"<b>1</b><i>2</i>";
    let old_tree = parse(old);
    let (new, edit) = apply(old, 0, 0, b"abc");

    let tree = parse_incremental(&new, &old_tree, &[edit]);
    let ranges: Vec<_> = tree
        .root_node()
        .child_nodes()
        .map(|n| n.byte_range())
        .collect();
    assert_eq!(ranges, [3..11, 11..19]);
}
