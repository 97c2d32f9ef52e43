//! End-to-end resolution of embedded languages
//!
//! Pages go through the whole chain: markup, scripts, style sheets and inline
//! style attributes, with node positions checked against the original text.

use chainlint::chain::{extract, rewrite, ChainResolver, ChainSpec};
use chainlint::forest::SyntaxStore;
use chainlint::lang::LanguageTag;
use chainlint::syntax::Point;

const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <style>
    body { margin: 0; }
  </style>
  <script>
  <!--
    var legacy = true;
  -->
  </script>
</head>
<body style="color: red; padding: 1px">
  <script>
    eval(input);
  </script>
</body>
</html>
"#;

fn page_chain() -> ChainSpec {
    ChainSpec::new(LanguageTag::Html)
        .with_child(
            ChainSpec::nested(LanguageTag::JavaScript, extract::html_script())
                .with_rewriter(rewrite::strip_comment_wrapper()),
        )
        .with_child(ChainSpec::nested(LanguageTag::Css, extract::html_style()))
        .with_child(
            ChainSpec::nested(LanguageTag::Css, extract::html_attribute("style"))
                .with_rewriter(rewrite::wrap("*{", "}")),
        )
}

fn store() -> SyntaxStore {
    SyntaxStore::new(
        ChainResolver::new()
            .resolve(PAGE.as_bytes(), &page_chain())
            .unwrap(),
    )
}

fn position_of(needle: &str) -> (usize, Point) {
    let offset = PAGE.find(needle).unwrap();
    let before = &PAGE[..offset];
    let row = before.matches('\n').count();
    let column = offset - before.rfind('\n').map_or(0, |i| i + 1);
    (offset, Point::new(row, column))
}

#[test]
fn test_every_region_gets_a_tree() {
    let store = store();
    assert_eq!(
        store.languages(),
        &[LanguageTag::Html, LanguageTag::JavaScript, LanguageTag::Css]
    );
    assert_eq!(store.syntaxes(LanguageTag::JavaScript).len(), 2);
    // The <style> body first, then the inline attribute.
    assert_eq!(store.syntaxes(LanguageTag::Css).len(), 2);
    for tree in store.syntaxes(LanguageTag::JavaScript) {
        assert!(!tree.has_error(), "{}", tree.to_sexp());
    }

    let html = store.get_syntax(LanguageTag::Html).unwrap();
    assert_eq!(html.walk().count(), html.node_count());
    assert!(html.walk().all(|node| node.end_index() <= PAGE.len()));
}

#[test]
fn test_legacy_script_positions_survive_the_rewrite() {
    let store = store();
    let matches = store
        .query(LanguageTag::JavaScript, "(variable_declarator name: (identifier) @name)")
        .unwrap();
    assert_eq!(matches.len(), 1);

    let node = matches[0].capture("name").unwrap();
    let (offset, point) = position_of("legacy");
    assert_eq!(node.start_index(), offset);
    assert_eq!(node.start_position(), point);
    assert_eq!(node.text(), "legacy");
}

#[test]
fn test_second_script_is_second_occurrence() {
    let store = store();
    let all = store
        .query_all(
            LanguageTag::JavaScript,
            r#"(call_expression function: (identifier) @fn (#eq? @fn "eval")) @call"#,
        )
        .unwrap();
    assert_eq!(all.len(), 1);
    let call = all[0].capture("call").unwrap();
    assert_eq!(call.tree().occurrence(), 1);
    assert_eq!(call.start_index(), position_of("eval(input)").0);

    // Occurrence 0 has no eval.
    let first = store
        .query(
            LanguageTag::JavaScript,
            r#"(call_expression function: (identifier) @fn (#eq? @fn "eval"))"#,
        )
        .unwrap();
    assert!(first.is_empty());
}

#[test]
fn test_inline_style_declarations_point_into_the_attribute() {
    let store = store();
    let inline = &store.syntaxes(LanguageTag::Css)[1];
    assert!(inline.is_rewritten());

    let names: Vec<_> = inline
        .descendants_of_type(&["property_name"], None)
        .into_iter()
        .map(|node| (node.text().into_owned(), node.start_index()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("color".to_string(), position_of("color: red").0),
            ("padding".to_string(), position_of("padding").0),
        ]
    );
}

#[test]
fn test_navigation_across_a_nested_tree() {
    let store = store();
    let css = store.get_syntax(LanguageTag::Css).unwrap();
    let (offset, _) = position_of("margin");

    let leaf = css.descendant_for_index(offset, offset + 6).unwrap();
    assert_eq!(leaf.kind(), "property_name");
    let declaration = leaf.closest(&["declaration"]).unwrap();
    assert_eq!(declaration.text(), "margin: 0;");
    let rule = declaration.closest(&["rule_set"]).unwrap();
    assert_eq!(rule.named_children().next().unwrap().text(), "body");
    assert!(leaf.closest(&["property_name"]).is_none());
}

#[test]
fn test_bounded_descendants_only_include_intersecting_nodes() {
    let store = store();
    let html = store.get_syntax(LanguageTag::Html).unwrap();
    let (start, start_point) = position_of("<body");
    let end_point = Point::new(start_point.row, start_point.column + 5);

    let tags = html.descendants_of_type(&["tag_name"], Some((start_point, end_point)));
    assert!(!tags.is_empty());
    for tag in &tags {
        assert!(tag.end_index() >= start);
        assert!(tag.start_index() <= start + 5);
    }
    assert_eq!(tags[0].text(), "body");
}
