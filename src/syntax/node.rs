use crate::syntax::position::{ByteRange, Point};
use crate::syntax::tree::{NodeData, NodeId, SyntaxTree};
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

/// A lightweight handle to one node of a [`SyntaxTree`].
///
/// Handles are `Copy` and compare equal when they point at the same node of
/// the same tree. All ranges are in original-buffer coordinates.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    pub(crate) fn new(tree: &'t SyntaxTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    fn data(&self) -> &'t NodeData {
        self.tree.data(self.id)
    }

    fn at(&self, id: NodeId) -> SyntaxNode<'t> {
        SyntaxNode::new(self.tree, id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> &'static str {
        self.data().kind
    }

    pub fn is_named(&self) -> bool {
        self.data().named
    }

    pub fn is_error(&self) -> bool {
        self.data().error
    }

    pub fn is_missing(&self) -> bool {
        self.data().missing
    }

    pub fn is_extra(&self) -> bool {
        self.data().extra
    }

    /// True when this node or any descendant is an ERROR or MISSING node.
    pub fn has_error(&self) -> bool {
        self.data().has_error
    }

    pub fn range(&self) -> ByteRange {
        self.data().range
    }

    pub fn start_index(&self) -> usize {
        self.data().range.start_index
    }

    pub fn end_index(&self) -> usize {
        self.data().range.end_index
    }

    pub fn start_position(&self) -> Point {
        self.data().range.start_position
    }

    pub fn end_position(&self) -> Point {
        self.data().range.end_position
    }

    /// Range in the bytes that were actually parsed for this tree.
    pub fn local_range(&self) -> Range<usize> {
        self.data().local.clone()
    }

    /// Original text covered by this node.
    pub fn text(&self) -> Cow<'t, str> {
        let range = self.range();
        String::from_utf8_lossy(self.tree.source().slice(range.start_index, range.end_index))
    }

    /// Field name under which the parent holds this node.
    pub fn field_name(&self) -> Option<&'static str> {
        self.data().field
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.data().parent.map(|id| self.at(id))
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    pub fn child(&self, index: usize) -> Option<SyntaxNode<'t>> {
        self.data().children.get(index).map(|&id| self.at(id))
    }

    pub fn first_child(&self) -> Option<SyntaxNode<'t>> {
        self.child(0)
    }

    pub fn last_child(&self) -> Option<SyntaxNode<'t>> {
        self.data().children.last().map(|&id| self.at(id))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| SyntaxNode::new(tree, id))
    }

    pub fn named_children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.children().filter(|child| child.is_named())
    }

    pub fn child_by_field_name(&self, field: &str) -> Option<SyntaxNode<'t>> {
        self.children().find(|child| child.field_name() == Some(field))
    }

    pub fn next_sibling(&self) -> Option<SyntaxNode<'t>> {
        let parent = self.parent()?;
        parent.child(self.data().slot + 1)
    }

    pub fn prev_sibling(&self) -> Option<SyntaxNode<'t>> {
        let parent = self.parent()?;
        let slot = self.data().slot.checked_sub(1)?;
        parent.child(slot)
    }

    pub fn next_named_sibling(&self) -> Option<SyntaxNode<'t>> {
        let mut node = self.next_sibling();
        while let Some(candidate) = node {
            if candidate.is_named() {
                return Some(candidate);
            }
            node = candidate.next_sibling();
        }
        None
    }

    pub fn prev_named_sibling(&self) -> Option<SyntaxNode<'t>> {
        let mut node = self.prev_sibling();
        while let Some(candidate) = node {
            if candidate.is_named() {
                return Some(candidate);
            }
            node = candidate.prev_sibling();
        }
        None
    }

    /// Pre-order walk over this node and its descendants.
    pub fn walk(&self) -> Walk<'t> {
        Walk {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Nearest strict ancestor whose kind is one of `types`.
    ///
    /// The node itself is never returned, even when its own kind matches.
    pub fn closest(&self, types: &[&str]) -> Option<SyntaxNode<'t>> {
        let mut node = self.parent();
        while let Some(candidate) = node {
            if types.contains(&candidate.kind()) {
                return Some(candidate);
            }
            node = candidate.parent();
        }
        None
    }

    /// Descendants (named and anonymous alike) whose kind is one of `types`,
    /// in pre-order. The node itself is not included.
    ///
    /// With `bounds`, only nodes that intersect the inclusive point span are
    /// returned: nothing that starts after its end or ends before its start.
    pub fn descendants_of_type(
        &self,
        types: &[&str],
        bounds: Option<(Point, Point)>,
    ) -> Vec<SyntaxNode<'t>> {
        let bytes = bounds.map(|(start, end)| {
            let source = self.tree.source();
            let (start, end) = if start <= end { (start, end) } else { (end, start) };
            (source.offset_of(start), source.offset_of(end))
        });
        self.collect_of_type(types, bytes)
    }

    /// Byte-offset form of [`descendants_of_type`](Self::descendants_of_type).
    pub fn descendants_of_type_in(
        &self,
        types: &[&str],
        range: Range<usize>,
    ) -> Vec<SyntaxNode<'t>> {
        self.collect_of_type(types, Some((range.start, range.end.max(range.start))))
    }

    fn collect_of_type(&self, types: &[&str], bounds: Option<(usize, usize)>) -> Vec<SyntaxNode<'t>> {
        let intersects = |node: &SyntaxNode<'t>| match bounds {
            Some((start, end)) => node.end_index() >= start && node.start_index() <= end,
            None => true,
        };

        let mut found = Vec::new();
        let mut stack: Vec<SyntaxNode<'t>> = self.children().rev().collect();
        while let Some(node) = stack.pop() {
            // Children lie inside their parent, so a miss prunes the subtree.
            if !intersects(&node) {
                continue;
            }
            if types.contains(&node.kind()) {
                found.push(node);
            }
            stack.extend(node.children().rev());
        }
        found
    }

    /// Smallest node within this one that spans `start..end`.
    ///
    /// A zero-width probe on the boundary between two nodes selects the node
    /// that starts there. Returns `None` when this node does not span the
    /// range at all.
    pub fn descendant_for_index(&self, start: usize, end: usize) -> Option<SyntaxNode<'t>> {
        self.descend(start, end, false)
    }

    /// Like [`descendant_for_index`](Self::descendant_for_index) but only
    /// named nodes qualify.
    pub fn named_descendant_for_index(&self, start: usize, end: usize) -> Option<SyntaxNode<'t>> {
        self.descend(start, end, true)
    }

    pub fn descendant_for_position(&self, start: Point, end: Point) -> Option<SyntaxNode<'t>> {
        let source = self.tree.source();
        self.descend(source.offset_of(start), source.offset_of(end), false)
    }

    pub fn named_descendant_for_position(
        &self,
        start: Point,
        end: Point,
    ) -> Option<SyntaxNode<'t>> {
        let source = self.tree.source();
        self.descend(source.offset_of(start), source.offset_of(end), true)
    }

    fn descend(&self, start: usize, end: usize, named_only: bool) -> Option<SyntaxNode<'t>> {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if !self.covers(start, end) {
            return None;
        }

        let mut best = (!named_only || self.is_named()).then_some(*self);
        let mut current = *self;
        loop {
            let next = current
                .children()
                .find(|child| child.spans(start, end))
                .or_else(|| current.children().find(|child| child.covers(start, end)));
            let Some(child) = next else { break };
            if !named_only || child.is_named() {
                best = Some(child);
            }
            current = child;
        }
        best
    }

    fn covers(&self, start: usize, end: usize) -> bool {
        self.start_index() <= start && end <= self.end_index()
    }

    fn spans(&self, start: usize, end: usize) -> bool {
        self.covers(start, end) && (start < self.end_index() || self.start_index() == self.end_index())
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}..{}] ({}-{})",
            self.kind(),
            self.start_index(),
            self.end_index(),
            self.start_position(),
            self.end_position()
        )
    }
}

/// Pre-order iterator returned by [`SyntaxNode::walk`].
pub struct Walk<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Walk<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.data(id).children.iter().rev().copied());
        Some(SyntaxNode::new(self.tree, id))
    }
}
