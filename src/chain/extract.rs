//! Builtin range extractors.
//!
//! Every extractor reports ranges in its parent's parsed bytes, taken from
//! [`SyntaxNode::local_range`].

use crate::chain::spec::RangeExtractor;
use crate::syntax::{SyntaxNode, SyntaxTree};
use std::ops::Range;

const SCRIPT_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "text/ecmascript",
    "application/ecmascript",
    "module",
];

/// Bodies of `<script>` elements holding JavaScript. Scripts whose `type`
/// names another format (JSON data, templates) are skipped.
pub fn html_script() -> RangeExtractor {
    RangeExtractor::new("html-script", |tree, bytes| {
        element_bodies(tree, "script_element")
            .filter(|element| is_javascript(*element, bytes))
            .filter_map(raw_text)
            .collect()
    })
}

/// Bodies of `<style>` elements.
pub fn html_style() -> RangeExtractor {
    RangeExtractor::new("html-style", |tree, _bytes| {
        element_bodies(tree, "style_element")
            .filter_map(raw_text)
            .collect()
    })
}

/// Values of every attribute called `name` (ASCII case-insensitive), without
/// the quotes.
pub fn html_attribute(name: impl Into<String>) -> RangeExtractor {
    let name = name.into();
    let label = format!("html-attribute[{name}]");
    RangeExtractor::new(label, move |tree, bytes| {
        tree.descendants_of_type(&["attribute"], None)
            .into_iter()
            .filter(|attribute| {
                attribute_name(*attribute, bytes).is_some_and(|n| n.eq_ignore_ascii_case(&name))
            })
            .filter_map(attribute_value)
            .collect()
    })
}

/// Nodes of the given kinds, optionally only those nested inside a node of
/// one of the `within` kinds. Nodes inside an already selected node are not
/// reported again.
pub fn kinds(kinds: Vec<String>, within: Vec<String>) -> RangeExtractor {
    let label = format!("kinds[{}]", kinds.join(","));
    RangeExtractor::new(label, move |tree, _bytes| {
        let kinds: Vec<&str> = kinds.iter().map(String::as_str).collect();
        let within: Vec<&str> = within.iter().map(String::as_str).collect();

        let mut ranges: Vec<Range<usize>> = Vec::new();
        for node in tree.root_node().walk() {
            if !kinds.contains(&node.kind()) {
                continue;
            }
            if !within.is_empty() && node.closest(&within).is_none() {
                continue;
            }
            let local = node.local_range();
            if ranges.last().is_some_and(|last| local.end <= last.end) {
                continue;
            }
            ranges.push(local);
        }
        ranges
    })
}

fn element_bodies<'t>(
    tree: &'t SyntaxTree,
    kind: &'static str,
) -> impl Iterator<Item = SyntaxNode<'t>> {
    tree.descendants_of_type(&[kind], None).into_iter()
}

fn raw_text(element: SyntaxNode<'_>) -> Option<Range<usize>> {
    element
        .children()
        .find(|child| child.kind() == "raw_text")
        .map(|child| child.local_range())
}

fn is_javascript(script: SyntaxNode<'_>, bytes: &[u8]) -> bool {
    let Some(start_tag) = script.children().find(|c| c.kind() == "start_tag") else {
        return true;
    };
    let declared = start_tag
        .children()
        .filter(|c| c.kind() == "attribute")
        .find(|a| attribute_name(*a, bytes).is_some_and(|n| n.eq_ignore_ascii_case("type")))
        .and_then(attribute_value);

    let Some(range) = declared else {
        return true;
    };
    // Bytes that do not belong to the tree cannot vouch for the type.
    let Some(value) = bytes.get(range) else {
        return false;
    };
    let value = String::from_utf8_lossy(value).trim().to_ascii_lowercase();
    value.is_empty() || SCRIPT_TYPES.contains(&value.as_str())
}

fn attribute_name<'b>(attribute: SyntaxNode<'_>, bytes: &'b [u8]) -> Option<&'b str> {
    let name = attribute
        .children()
        .find(|c| c.kind() == "attribute_name")?;
    std::str::from_utf8(bytes.get(name.local_range())?).ok()
}

fn attribute_value(attribute: SyntaxNode<'_>) -> Option<Range<usize>> {
    attribute.children().find_map(|child| match child.kind() {
        "attribute_value" => Some(child.local_range()),
        "quoted_attribute_value" => child
            .children()
            .find(|c| c.kind() == "attribute_value")
            .map(|c| c.local_range()),
        _ => None,
    })
}
