//! Immutable syntax trees backed by a node arena.
//!
//! A [`SyntaxTree`] copies the structure of a tree-sitter tree into a flat
//! arena. Parent, child and sibling links are [`NodeId`] indices into that
//! arena, so navigation never creates ownership cycles. Node ranges are
//! stored in the coordinates of the original file buffer, already mapped
//! through the tree's [`OffsetMap`].

use crate::lang::LanguageTag;
use crate::syntax::node::{SyntaxNode, Walk};
use crate::syntax::offsets::OffsetMap;
use crate::syntax::position::{ByteRange, Point};
use crate::syntax::source::SourceText;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tree_sitter::Tree;

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: &'static str,
    pub(crate) named: bool,
    pub(crate) error: bool,
    pub(crate) missing: bool,
    pub(crate) extra: bool,
    pub(crate) has_error: bool,
    pub(crate) field: Option<&'static str>,
    pub(crate) local: Range<usize>,
    pub(crate) range: ByteRange,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Position among the parent's children.
    pub(crate) slot: usize,
}

pub struct SyntaxTree {
    language: LanguageTag,
    occurrence: usize,
    tree: Tree,
    nodes: Vec<NodeData>,
    by_ts_id: HashMap<usize, NodeId>,
    map: OffsetMap,
    origin: ByteRange,
    source: Arc<SourceText>,
}

impl SyntaxTree {
    /// Wrap a parsed tree. `map` translates offsets in the bytes that were
    /// parsed into offsets of `source`.
    pub fn new(
        language: LanguageTag,
        occurrence: usize,
        tree: Tree,
        map: OffsetMap,
        source: Arc<SourceText>,
    ) -> Self {
        let (nodes, by_ts_id) = build_arena(&tree, &map, &source);
        let span = map.target_span();
        let origin = source.range(span.start, span.end);
        Self {
            language,
            occurrence,
            tree,
            nodes,
            by_ts_id,
            map,
            origin,
            source,
        }
    }

    pub fn language(&self) -> LanguageTag {
        self.language
    }

    /// Zero-based index of this tree among the trees of its language.
    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// Region of the original buffer this tree was parsed from.
    pub fn origin(&self) -> ByteRange {
        self.origin
    }

    pub fn offset_map(&self) -> &OffsetMap {
        &self.map
    }

    /// True when the parsed bytes were produced by a rewriter somewhere in
    /// this tree's ancestry and differ in layout from the original.
    pub fn is_rewritten(&self) -> bool {
        !self.map.is_linear()
    }

    pub fn source(&self) -> &Arc<SourceText> {
        &self.source
    }

    /// The underlying tree-sitter tree. Its offsets are local to the parsed
    /// bytes, not to the original buffer.
    pub fn ts_tree(&self) -> &Tree {
        &self.tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root_node(&self) -> SyntaxNode<'_> {
        SyntaxNode::new(self, NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> Option<SyntaxNode<'_>> {
        (id.0 < self.nodes.len()).then(|| SyntaxNode::new(self, id))
    }

    /// Every node in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = SyntaxNode<'_>> {
        (0..self.nodes.len()).map(move |idx| SyntaxNode::new(self, NodeId(idx)))
    }

    /// Pre-order walk from the root.
    pub fn walk(&self) -> Walk<'_> {
        self.root_node().walk()
    }

    pub fn has_error(&self) -> bool {
        self.root_node().has_error()
    }

    /// ERROR and MISSING nodes produced by the grammar's error recovery.
    pub fn error_nodes(&self) -> Vec<SyntaxNode<'_>> {
        self.nodes()
            .filter(|node| node.is_error() || node.is_missing())
            .collect()
    }

    pub fn to_sexp(&self) -> String {
        self.tree.root_node().to_sexp()
    }

    /// Smallest node spanning `start..end` (original buffer offsets).
    pub fn descendant_for_index(&self, start: usize, end: usize) -> Option<SyntaxNode<'_>> {
        self.root_node().descendant_for_index(start, end)
    }

    /// Smallest named node spanning `start..end`.
    pub fn named_descendant_for_index(
        &self,
        start: usize,
        end: usize,
    ) -> Option<SyntaxNode<'_>> {
        self.root_node().named_descendant_for_index(start, end)
    }

    /// Smallest node spanning the given points.
    pub fn descendant_for_position(&self, start: Point, end: Point) -> Option<SyntaxNode<'_>> {
        self.root_node().descendant_for_position(start, end)
    }

    pub fn named_descendant_for_position(
        &self,
        start: Point,
        end: Point,
    ) -> Option<SyntaxNode<'_>> {
        self.root_node().named_descendant_for_position(start, end)
    }

    /// See [`SyntaxNode::descendants_of_type`].
    pub fn descendants_of_type(
        &self,
        types: &[&str],
        bounds: Option<(Point, Point)>,
    ) -> Vec<SyntaxNode<'_>> {
        self.root_node().descendants_of_type(types, bounds)
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn node_for_ts(&self, node: tree_sitter::Node<'_>) -> Option<SyntaxNode<'_>> {
        self.by_ts_id
            .get(&node.id())
            .map(|&id| SyntaxNode::new(self, id))
    }

    /// Original bytes behind a range of the parsed bytes.
    pub(crate) fn original_bytes(&self, local: Range<usize>) -> &[u8] {
        let (start, end) = self.map.map_range(local.start, local.end);
        self.source.slice(start, end)
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("language", &self.language)
            .field("occurrence", &self.occurrence)
            .field("origin", &self.origin.as_range())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

type Pending<'a> = (tree_sitter::Node<'a>, Option<NodeId>, Option<&'static str>, usize);

fn build_arena(
    tree: &Tree,
    map: &OffsetMap,
    source: &SourceText,
) -> (Vec<NodeData>, HashMap<usize, NodeId>) {
    let mut nodes: Vec<NodeData> = Vec::new();
    let mut by_ts_id = HashMap::new();
    let mut stack: Vec<Pending<'_>> = vec![(tree.root_node(), None, None, 0)];

    while let Some((node, parent, field, slot)) = stack.pop() {
        let id = NodeId(nodes.len());
        let local = node.byte_range();
        let (mut start, mut end) = map.map_range(local.start, local.end);
        // Empty nodes on a deletion boundary can map beside their parent.
        if let Some(parent) = parent {
            let outer = &nodes[parent.0].range;
            start = start.clamp(outer.start_index, outer.end_index);
            end = end.clamp(start, outer.end_index);
        }

        nodes.push(NodeData {
            kind: node.kind(),
            named: node.is_named(),
            error: node.is_error(),
            missing: node.is_missing(),
            extra: node.is_extra(),
            has_error: node.has_error(),
            field,
            local,
            range: source.range(start, end),
            parent,
            children: Vec::new(),
            slot,
        });
        by_ts_id.insert(node.id(), id);
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }

        let mut children = Vec::with_capacity(node.child_count());
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                children.push((cursor.node(), cursor.field_name()));
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        // Reversed so children pop, and land in the arena, in document order.
        for (slot, (child, field)) in children.into_iter().enumerate().rev() {
            stack.push((child, Some(id), field, slot));
        }
    }

    (nodes, by_ts_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::grammar::{Grammar, TreeSitterGrammars};

    fn parse(language: LanguageTag, text: &str) -> SyntaxTree {
        let tree = TreeSitterGrammars.parse(language, text.as_bytes()).unwrap();
        let source = Arc::new(SourceText::new(text));
        SyntaxTree::new(language, 0, tree, OffsetMap::identity(text.len()), source)
    }

    #[test]
    fn arena_mirrors_tree_sitter_structure() {
        let text = "let a = 1;\nlet b = 2;";
        let tree = parse(LanguageTag::JavaScript, text);
        let root = tree.root_node();

        assert_eq!(root.kind(), "program");
        assert_eq!(root.child_count(), 2);
        assert_eq!(tree.node_count(), tree.nodes().count());
        for node in tree.nodes() {
            for child in node.children() {
                assert_eq!(child.parent(), Some(node));
                assert!(node.range().contains(&child.range()));
            }
        }
    }

    #[test]
    fn ranges_agree_with_tree_sitter_without_rewrites() {
        let text = "a {\n  color: red;\n}\n";
        let tree = parse(LanguageTag::Css, text);
        let mut ts_nodes = Vec::new();
        let mut cursor = tree.ts_tree().walk();
        collect_preorder(&mut cursor, &mut ts_nodes);

        assert_eq!(ts_nodes.len(), tree.node_count());
        for (node, (bytes, start, end)) in tree.nodes().zip(ts_nodes) {
            assert_eq!(node.range().as_range(), bytes);
            assert_eq!(node.start_position(), start);
            assert_eq!(node.end_position(), end);
            assert!(node.end_index() <= text.len());
        }
    }

    fn collect_preorder(
        cursor: &mut tree_sitter::TreeCursor<'_>,
        out: &mut Vec<(Range<usize>, Point, Point)>,
    ) {
        let node = cursor.node();
        out.push((
            node.byte_range(),
            node.start_position().into(),
            node.end_position().into(),
        ));
        if cursor.goto_first_child() {
            loop {
                collect_preorder(cursor, out);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }

    #[test]
    fn error_nodes_are_reported() {
        let tree = parse(LanguageTag::JavaScript, "let = ;");
        assert!(tree.has_error());
        assert!(!tree.error_nodes().is_empty());

        let tree = parse(LanguageTag::JavaScript, "let ok = 1;");
        assert!(!tree.has_error());
        assert!(tree.error_nodes().is_empty());
    }

    #[test]
    fn missing_tokens_are_surfaced() {
        let text = "if (x) { y()";
        let tree = parse(LanguageTag::JavaScript, text);
        assert!(tree.has_error());

        let missing = tree.nodes().find(|node| node.is_missing()).unwrap();
        assert_eq!(missing.kind(), "}");
        assert!(!missing.is_error());
        assert_eq!(missing.range().as_range(), 12..12);
        assert_eq!(missing.start_position(), Point::new(0, 12));

        let mut ancestor = missing.parent();
        while let Some(node) = ancestor {
            assert!(node.has_error(), "{} should carry the error", node.kind());
            assert!(node.range().contains(&missing.range()));
            ancestor = node.parent();
        }
    }

    #[test]
    fn shifted_tree_reports_original_offsets() {
        let text = "<script>var x = 1;</script>";
        let local = "var x = 1;";
        let ts = TreeSitterGrammars
            .parse(LanguageTag::JavaScript, local.as_bytes())
            .unwrap();
        let tree = SyntaxTree::new(
            LanguageTag::JavaScript,
            0,
            ts,
            OffsetMap::shifted(local.len(), 8),
            Arc::new(SourceText::new(text)),
        );

        let root = tree.root_node();
        assert_eq!(root.range().as_range(), 8..18);
        assert_eq!(root.local_range(), 0..10);
        assert_eq!(root.text(), "var x = 1;");
        assert_eq!(tree.origin().as_range(), 8..18);
        assert!(!tree.is_rewritten());
    }
}
