//! Tree error types

use thiserror::Error;

/// Errors raised by structural tree edits and XHTML parsing
#[derive(Debug, Error)]
pub enum TreeError {
    /// Node handle does not belong to this tree
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Operation needs a text leaf
    #[error("Not a text node: {0}")]
    NotText(String),

    /// Operation needs an element
    #[error("Not an element: {0}")]
    NotElement(String),

    /// Node has no parent to operate in
    #[error("Node is detached: {0}")]
    Detached(String),

    /// Index or offset past the end of a node
    #[error("Index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Two nodes cannot be merged
    #[error("Incompatible nodes: {0}")]
    Incompatible(String),

    /// Source document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}
