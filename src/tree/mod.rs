//! Ordered content trees
//!
//! Anchoring, capture and rendering never talk to a platform document
//! directly. They go through the traits in this module, which any tree with
//! stable child ordering can implement: a browser DOM behind a binding, a
//! parsed XHTML chapter, or the in-memory [`ContentTree`] shipped here.
//!
//! # Offsets
//!
//! Offsets inside text leaves count Unicode scalar values. Offsets on any
//! other node count children, exactly like DOM boundary points.

mod content;
mod error;
mod range;

use std::fmt::Debug;
use std::hash::Hash;

pub use content::{ContentTree, NodeId, NodeKind, Rect};
pub use error::TreeError;
pub use range::{
    common_ancestor, compare_boundaries, locate_text_offset, text_leaves, text_offset, Affinity,
    Boundary, LiveRange,
};

/// Read access to a tree whose children have a stable order.
pub trait OrderedTree {
    /// Handle to a node. Cheap to copy and compare.
    type Node: Copy + Eq + Hash + Debug;

    /// The topmost node of the tree.
    fn root(&self) -> Self::Node;

    /// Parent of `node`, `None` for the root or a detached node.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// Number of children of `node` (always zero for text leaves).
    fn child_count(&self, node: Self::Node) -> usize;

    /// Child of `node` at `index`, `None` when out of bounds.
    fn child(&self, node: Self::Node, index: usize) -> Option<Self::Node>;

    /// Text of a text leaf, `None` for every other node.
    fn text(&self, node: Self::Node) -> Option<&str>;

    fn is_text(&self, node: Self::Node) -> bool {
        self.text(node).is_some()
    }

    /// Position of `node` among its parent's children.
    fn index_in_parent(&self, node: Self::Node) -> Option<usize> {
        let parent = self.parent(node)?;
        (0..self.child_count(parent)).find(|&i| self.child(parent, i) == Some(node))
    }

    /// Largest valid boundary offset inside `node`: the char length for text
    /// leaves, the child count otherwise.
    fn content_len(&self, node: Self::Node) -> usize {
        match self.text(node) {
            Some(text) => text.chars().count(),
            None => self.child_count(node),
        }
    }

    /// Whether `node` is `ancestor` or lies underneath it.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Concatenated text of every text leaf under `node`, in document order.
    fn text_content(&self, node: Self::Node) -> String {
        text_leaves(self, node)
            .into_iter()
            .filter_map(|leaf| self.text(leaf))
            .collect()
    }
}

/// Structural edits needed to add and remove decoration wrappers.
///
/// Every edit preserves the visible characters and their order. Errors mean
/// the tree no longer looks the way the caller expected (a foreign edit got
/// in between).
pub trait MutableTree: OrderedTree {
    /// Splits a text leaf at char offset `at`. The original keeps the head;
    /// the returned new sibling, inserted right after it, holds the tail.
    fn split_text(&mut self, node: Self::Node, at: usize) -> Result<Self::Node, TreeError>;

    /// Moves children `at..` of an element into a shallow copy of it inserted
    /// right after the original. Returns the copy.
    fn split_element(&mut self, node: Self::Node, at: usize) -> Result<Self::Node, TreeError>;

    /// Inserts a new `tag` element under `parent` at index `start` and moves
    /// children `start..end` into it.
    fn wrap_children(
        &mut self,
        parent: Self::Node,
        start: usize,
        end: usize,
        tag: &str,
    ) -> Result<Self::Node, TreeError>;

    /// Moves an element's children into its parent at its position and
    /// detaches the element.
    fn unwrap(&mut self, node: Self::Node) -> Result<(), TreeError>;

    /// Folds `node` into its previous sibling: text is appended to text,
    /// children to an element of the same tag. `node` is detached.
    fn merge_into_previous(&mut self, node: Self::Node) -> Result<(), TreeError>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str)
        -> Result<(), TreeError>;

    fn remove_attribute(&mut self, node: Self::Node, name: &str) -> Result<(), TreeError>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Previous sibling of `node`, if any.
    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }
}

/// A tree that is also on screen: it can be hit-tested and scrolled.
pub trait RenderHost: MutableTree {
    /// Deepest node painted at viewport coordinate `(x, y)`.
    fn node_at_point(&self, x: f64, y: f64) -> Option<Self::Node>;

    /// Scrolls so that `node` is centred in the viewport.
    fn scroll_into_view(&mut self, node: Self::Node);
}

/// Access to the user's current selection, the way a browser exposes
/// `window.getSelection()`.
pub trait SelectionSource: OrderedTree {
    fn current_selection(&self) -> Option<LiveRange<Self::Node>>;

    fn clear_selection(&mut self);
}
