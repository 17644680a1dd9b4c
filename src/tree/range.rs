//! Live ranges and boundary-point arithmetic
//!
//! Boundary points are ordered the way the DOM orders them: a point is
//! reduced to the child-index path of its node followed by its offset, and
//! two points compare lexicographically. A point before child `i` of an
//! element is therefore before anything inside that child, and a point after
//! the last child is after everything inside it.

use std::cmp::Ordering;

use super::OrderedTree;

/// A position inside a tree: a node plus an offset into it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Boundary<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> Boundary<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A range between two boundary points of a live tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveRange<N> {
    pub start: Boundary<N>,
    pub end: Boundary<N>,
}

impl<N: Copy + Eq> LiveRange<N> {
    pub fn new(start_node: N, start_offset: usize, end_node: N, end_offset: usize) -> Self {
        Self {
            start: Boundary::new(start_node, start_offset),
            end: Boundary::new(end_node, end_offset),
        }
    }

    /// Both boundaries are the same point
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Start does not come after end in document order
    pub fn is_ordered<T>(&self, tree: &T) -> bool
    where
        T: OrderedTree<Node = N> + ?Sized,
    {
        matches!(
            compare_boundaries(tree, self.start, self.end),
            Some(Ordering::Less | Ordering::Equal)
        )
    }

    /// Deepest node containing both boundaries
    pub fn common_ancestor<T>(&self, tree: &T) -> Option<N>
    where
        T: OrderedTree<Node = N> + ?Sized,
    {
        common_ancestor(tree, self.start.node, self.end.node)
    }

    /// Text covered by the range, measured within `root`
    pub fn text<T>(&self, tree: &T, root: N) -> Option<String>
    where
        T: OrderedTree<Node = N> + ?Sized,
    {
        let start = text_offset(tree, root, self.start)?;
        let end = text_offset(tree, root, self.end)?;
        if start > end {
            return None;
        }
        Some(
            tree.text_content(root)
                .chars()
                .skip(start)
                .take(end - start)
                .collect(),
        )
    }
}

/// Child-index path from the top of the tree down to `node`, plus that top
fn node_path<T>(tree: &T, node: T::Node) -> (T::Node, Vec<usize>)
where
    T: OrderedTree + ?Sized,
{
    let mut path = Vec::new();
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        match tree.index_in_parent(current) {
            Some(index) => path.push(index),
            None => break,
        }
        current = parent;
    }
    path.reverse();
    (current, path)
}

fn boundary_key<T>(tree: &T, boundary: Boundary<T::Node>) -> (T::Node, Vec<usize>)
where
    T: OrderedTree + ?Sized,
{
    let (top, mut key) = node_path(tree, boundary.node);
    key.push(boundary.offset);
    (top, key)
}

/// Orders two boundary points. `None` when they live in disconnected trees.
pub fn compare_boundaries<T>(
    tree: &T,
    a: Boundary<T::Node>,
    b: Boundary<T::Node>,
) -> Option<Ordering>
where
    T: OrderedTree + ?Sized,
{
    if a.node == b.node {
        return Some(a.offset.cmp(&b.offset));
    }
    let (top_a, key_a) = boundary_key(tree, a);
    let (top_b, key_b) = boundary_key(tree, b);
    if top_a != top_b {
        return None;
    }
    Some(key_a.cmp(&key_b))
}

/// Deepest node that contains both `a` and `b`
pub fn common_ancestor<T>(tree: &T, a: T::Node, b: T::Node) -> Option<T::Node>
where
    T: OrderedTree + ?Sized,
{
    let mut ancestors = Vec::new();
    let mut current = Some(a);
    while let Some(node) = current {
        ancestors.push(node);
        current = tree.parent(node);
    }

    let mut current = Some(b);
    while let Some(node) = current {
        if ancestors.contains(&node) {
            return Some(node);
        }
        current = tree.parent(node);
    }
    None
}

/// Text leaves under `root` in document order
pub fn text_leaves<T>(tree: &T, root: T::Node) -> Vec<T::Node>
where
    T: OrderedTree + ?Sized,
{
    let mut leaves = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if tree.is_text(node) {
            leaves.push(node);
            continue;
        }
        for index in (0..tree.child_count(node)).rev() {
            if let Some(child) = tree.child(node, index) {
                stack.push(child);
            }
        }
    }
    leaves
}

/// Number of characters of `root`'s text that precede `boundary`.
///
/// Returns `None` when the boundary lies outside `root`.
pub fn text_offset<T>(tree: &T, root: T::Node, boundary: Boundary<T::Node>) -> Option<usize>
where
    T: OrderedTree + ?Sized,
{
    if !tree.contains(root, boundary.node) {
        return None;
    }

    let (_, key) = boundary_key(tree, boundary);
    let mut consumed = 0;
    for leaf in text_leaves(tree, root) {
        let len = tree.content_len(leaf);
        if leaf == boundary.node {
            return Some(consumed + boundary.offset.min(len));
        }
        let (_, leaf_key) = boundary_key(tree, Boundary::new(leaf, 0));
        if key < leaf_key {
            return Some(consumed);
        }
        consumed += len;
    }
    Some(consumed)
}

/// Which side of a leaf edge a text offset should land on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Resolve to the leaf that starts at the offset (range starts)
    Forward,
    /// Resolve to the leaf that ends at the offset (range ends)
    Backward,
}

/// Maps a character offset within `root` back to a text leaf and an offset
/// inside it. Empty leaves are never returned.
pub fn locate_text_offset<T>(
    tree: &T,
    root: T::Node,
    offset: usize,
    affinity: Affinity,
) -> Option<(T::Node, usize)>
where
    T: OrderedTree + ?Sized,
{
    let mut consumed = 0;
    for leaf in text_leaves(tree, root) {
        let len = tree.content_len(leaf);
        if len == 0 {
            continue;
        }
        let hit = match affinity {
            Affinity::Forward => offset >= consumed && offset < consumed + len,
            Affinity::Backward => offset > consumed && offset <= consumed + len,
        };
        if hit {
            return Some((leaf, offset - consumed));
        }
        consumed += len;
    }
    None
}
