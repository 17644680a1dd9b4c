//! Anchor types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::OrderedTree;

/// Structural coordinate of a node: child indices from the container down.
///
/// Displays dot-separated (`"2.0.5"`). The empty path is the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid node path segment: {0:?}")]
pub struct NodePathError(pub String);

impl NodePath {
    pub fn new(segments: Vec<usize>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path from `root` down to `node`, `None` when `node` is not under `root`
    pub fn of<T>(tree: &T, root: T::Node, node: T::Node) -> Option<Self>
    where
        T: OrderedTree + ?Sized,
    {
        let mut segments = Vec::new();
        let mut current = node;
        while current != root {
            segments.push(tree.index_in_parent(current)?);
            current = tree.parent(current)?;
        }
        segments.reverse();
        Some(Self(segments))
    }

    /// Walks the path down from `root`. `None` as soon as an index is out of
    /// bounds.
    pub fn resolve<T>(&self, tree: &T, root: T::Node) -> Option<T::Node>
    where
        T: OrderedTree + ?Sized,
    {
        self.0
            .iter()
            .try_fold(root, |node, &index| tree.child(node, index))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = NodePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }
        s.split(['.', '/'])
            .map(|segment| {
                segment
                    .parse::<usize>()
                    .map_err(|_| NodePathError(segment.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// Persisted, structure-relative encoding of a highlighted range.
///
/// Field names on the wire match the stored highlight documents
/// (`articleId`, `startNode`, `endNode`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchoredPosition {
    #[serde(rename = "articleId")]
    pub document_ref: String,
    /// Text at anchoring time. Kept for display, not used for positioning.
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    #[serde(rename = "startNode")]
    pub start_path: String,
    #[serde(rename = "endNode")]
    pub end_path: String,
    /// Short SHA-256 prefix of the anchored text, absent on legacy records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_digest: Option<String>,
}

impl AnchoredPosition {
    pub fn start_node_path(&self) -> Result<NodePath, NodePathError> {
        self.start_path.parse()
    }

    pub fn end_node_path(&self) -> Result<NodePath, NodePathError> {
        self.end_path.parse()
    }
}
