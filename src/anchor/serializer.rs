//! Converting selections to anchored positions and back

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{AnchoredPosition, NodePath};
use crate::capture::TextSelection;
use crate::tree::{LiveRange, OrderedTree};

const TEXT_DIGEST_LEN: usize = 16;

/// Short content fingerprint stored alongside an anchor
pub fn text_digest(text: &str) -> String {
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    digest[..TEXT_DIGEST_LEN].to_string()
}

/// Records the structural position of `selection` relative to `root`.
///
/// Returns `None` if either boundary lies outside `root`.
pub fn serialize<T>(
    tree: &T,
    root: T::Node,
    selection: &TextSelection<T::Node>,
    document_ref: &str,
) -> Option<AnchoredPosition>
where
    T: OrderedTree + ?Sized,
{
    let Some(start_path) = NodePath::of(tree, root, selection.start_node) else {
        warn!(document_ref, "Selection start is outside the anchoring root");
        return None;
    };
    let Some(end_path) = NodePath::of(tree, root, selection.end_node) else {
        warn!(document_ref, "Selection end is outside the anchoring root");
        return None;
    };

    let text_digest = selection.range.text(tree, root).map(|t| text_digest(&t));

    Some(AnchoredPosition {
        document_ref: document_ref.to_string(),
        text: selection.text.clone(),
        start_offset: selection.start_offset,
        end_offset: selection.end_offset,
        start_path: start_path.to_string(),
        end_path: end_path.to_string(),
        text_digest,
    })
}

/// Rebuilds a live range from a stored position.
///
/// Every failure here is an expected outcome once content has changed, so
/// the result is `None` rather than an error.
pub fn deserialize<T>(
    tree: &T,
    root: T::Node,
    position: &AnchoredPosition,
) -> Option<LiveRange<T::Node>>
where
    T: OrderedTree + ?Sized,
{
    let (start_path, end_path) = match (position.start_node_path(), position.end_node_path()) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "Unparseable anchor path");
            return None;
        }
    };

    let Some(start_node) = start_path.resolve(tree, root) else {
        debug!(path = %start_path, "Start path no longer resolves");
        return None;
    };
    let Some(end_node) = end_path.resolve(tree, root) else {
        debug!(path = %end_path, "End path no longer resolves");
        return None;
    };

    if position.start_offset > tree.content_len(start_node)
        || position.end_offset > tree.content_len(end_node)
    {
        debug!(
            start_offset = position.start_offset,
            end_offset = position.end_offset,
            "Anchor offset out of bounds"
        );
        return None;
    }

    let range = LiveRange::new(start_node, position.start_offset, end_node, position.end_offset);
    if !range.is_ordered(tree) {
        debug!("Anchor boundaries are reversed");
        return None;
    }

    if let Some(expected) = &position.text_digest {
        let actual = range.text(tree, root).map(|t| text_digest(&t));
        if actual.as_deref() != Some(expected.as_str()) {
            debug!(expected = %expected, "Anchored text changed since it was stored");
            return None;
        }
    }

    Some(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ContentTree, NodeId};

    const CHAPTER: &str =
        "<article><p>The <em>quick</em> brown fox</p><p>jumps over the lazy dog</p></article>";

    fn selection(tree: &ContentTree, range: LiveRange<NodeId>) -> TextSelection<NodeId> {
        TextSelection {
            text: range.text(tree, tree.root()).unwrap(),
            range,
            start_node: range.start.node,
            start_offset: range.start.offset,
            end_node: range.end.node,
            end_offset: range.end.offset,
        }
    }

    fn anchor(tree: &ContentTree, range: LiveRange<NodeId>) -> AnchoredPosition {
        let root = tree.root();
        serialize(tree, root, &selection(tree, range), "my-first-article").unwrap()
    }

    #[test]
    fn test_text_digest_is_sha256_prefix() {
        assert_eq!(text_digest("quick"), "22c72aa82ce77c82");
    }

    #[test]
    fn test_round_trip_across_elements() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p1 = tree.child(root, 0).unwrap();
        let p2 = tree.child(root, 1).unwrap();
        let quick = tree.child(tree.child(p1, 1).unwrap(), 0).unwrap();
        let jumps = tree.child(p2, 0).unwrap();

        let range = LiveRange::new(quick, 2, jumps, 5);
        let position = anchor(&tree, range);
        assert_eq!(position.start_path, "0.1.0");
        assert_eq!(position.end_path, "1.0");
        assert_eq!(position.text, "ick brown foxjumps");

        let restored = deserialize(&tree, root, &position).unwrap();
        assert_eq!(restored, range);
        assert_eq!(restored.text(&tree, root).unwrap(), position.text);
    }

    #[test]
    fn test_element_boundaries_round_trip() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p1 = tree.child(root, 0).unwrap();

        let range = LiveRange::new(p1, 1, p1, 2);
        let position = anchor(&tree, range);
        assert_eq!(position.start_path, "0");
        assert_eq!(position.text, "quick");
        assert_eq!(deserialize(&tree, root, &position), Some(range));
    }

    #[test]
    fn test_path_past_end_fails_closed() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p1 = tree.child(root, 0).unwrap();
        let leaf = tree.child(p1, 0).unwrap();
        let mut position = anchor(&tree, LiveRange::new(leaf, 0, leaf, 3));

        position.end_path = "0.7".into();
        assert!(deserialize(&tree, root, &position).is_none());

        position.end_path = "0.x".into();
        assert!(deserialize(&tree, root, &position).is_none());
    }

    #[test]
    fn test_offset_overflow_fails_closed() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p1 = tree.child(root, 0).unwrap();
        let leaf = tree.child(p1, 0).unwrap();
        let mut position = anchor(&tree, LiveRange::new(leaf, 0, leaf, 3));
        position.text_digest = None;

        position.end_offset = 5;
        assert!(deserialize(&tree, root, &position).is_none());
    }

    #[test]
    fn test_reversed_boundaries_fail_closed() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let position = AnchoredPosition {
            document_ref: "doc".into(),
            text: String::new(),
            start_offset: 0,
            end_offset: 2,
            start_path: "1.0".into(),
            end_path: "0.0".into(),
            text_digest: None,
        };
        assert!(deserialize(&tree, root, &position).is_none());
    }

    #[test]
    fn test_in_place_text_change_is_detected() {
        let mut tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p2 = tree.child(root, 1).unwrap();
        let leaf = tree.child(p2, 0).unwrap();
        let position = anchor(&tree, LiveRange::new(leaf, 6, leaf, 10));
        assert_eq!(position.text, "over");

        // Same structure, different characters
        tree.set_text(leaf, "leaps under the lazy dog").unwrap();
        assert!(deserialize(&tree, root, &position).is_none());

        // Legacy records carry no digest and resolve structurally
        let legacy = AnchoredPosition {
            text_digest: None,
            ..position
        };
        assert!(deserialize(&tree, root, &legacy).is_some());
    }

    #[test]
    fn test_serialize_outside_root_returns_none() {
        let tree = ContentTree::parse_xhtml(CHAPTER).unwrap();
        let root = tree.root();
        let p1 = tree.child(root, 0).unwrap();
        let p2 = tree.child(root, 1).unwrap();
        let leaf = tree.child(p1, 0).unwrap();
        let sel = selection(&tree, LiveRange::new(leaf, 0, leaf, 3));
        assert!(serialize(&tree, p2, &sel, "doc").is_none());
    }
}
