//! Decoration handles and the wrapping they perform
//!
//! Wrapping a span that crosses element boundaries needs partially covered
//! nodes to be split first, the way a DOM range extraction does it. Every
//! split is written to the decoration's edit log so that removal can merge
//! the pieces back and leave the container exactly as it was.

use std::ops::Range;

use tracing::{debug, warn};

use super::grouping::OverlapGroup;
use super::types::{HighlightSegment, RendererConfig};
use crate::tree::{common_ancestor, locate_text_offset, Affinity, MutableTree, TreeError};

pub(crate) const WRAPPER_TAG: &str = "mark";
pub(crate) const OVERLAP_ATTRIBUTE: &str = "data-overlap-count";
pub(crate) const PULSE_ATTRIBUTE: &str = "data-pulse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Edit<N> {
    SplitText { original: N, created: N },
    SplitElement { original: N, created: N },
}

/// An applied decoration covering one overlap group.
///
/// Handles are only valid until the next apply or clear.
#[derive(Debug, Clone)]
pub struct Decoration<N> {
    primary_id: String,
    record_ids: Vec<String>,
    overlap_count: usize,
    range: Range<usize>,
    pub(crate) wrapper: N,
    pub(crate) edits: Vec<Edit<N>>,
}

impl<N: Copy> Decoration<N> {
    /// Id of the earliest record in the group
    pub fn id(&self) -> &str {
        &self.primary_id
    }

    pub fn record_ids(&self) -> &[String] {
        &self.record_ids
    }

    pub fn covers(&self, id: &str) -> bool {
        self.record_ids.iter().any(|r| r == id)
    }

    /// Capped number of contributing records
    pub fn overlap_count(&self) -> usize {
        self.overlap_count
    }

    /// Covered characters, as absolute offsets in the container text
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }
}

/// `#RRGGBB` plus an alpha byte that rises with the overlap count
pub(crate) fn background(color: &str, overlap_count: usize) -> String {
    let steps = overlap_count.saturating_sub(1).min(8) as u32;
    let alpha = 0x40 + steps * 0x18;
    format!("{color}{alpha:02x}")
}

fn tooltip(members: &[&HighlightSegment]) -> String {
    members
        .iter()
        .map(|s| {
            let name = s.user_name.as_deref().unwrap_or("Anonymous");
            match s.note.as_deref() {
                Some(note) if !note.is_empty() => format!("{name}: {note}"),
                _ => name.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits and wraps the text of `group` inside `container`.
///
/// Edits are pushed to `edits` as they happen, so the caller can undo a
/// partial application when this returns an error.
pub(crate) fn wrap_group<T>(
    tree: &mut T,
    container: T::Node,
    group: &OverlapGroup,
    edits: &mut Vec<Edit<T::Node>>,
) -> Result<T::Node, TreeError>
where
    T: MutableTree + ?Sized,
{
    let missing = |what: &str| TreeError::Incompatible(format!("{what} offset not found"));

    let (end_leaf, end_offset) =
        locate_text_offset(tree, container, group.end, Affinity::Backward).ok_or_else(|| missing("end"))?;
    let mut end_node = end_leaf;
    if end_offset < tree.content_len(end_leaf) {
        let created = tree.split_text(end_leaf, end_offset)?;
        edits.push(Edit::SplitText {
            original: end_leaf,
            created,
        });
    }

    let (start_leaf, start_offset) =
        locate_text_offset(tree, container, group.start, Affinity::Forward)
            .ok_or_else(|| missing("start"))?;
    let mut start_node = start_leaf;
    if start_offset > 0 {
        let created = tree.split_text(start_leaf, start_offset)?;
        edits.push(Edit::SplitText {
            original: start_leaf,
            created,
        });
        if start_leaf == end_node {
            end_node = created;
        }
        start_node = created;
    }

    let ancestor = if start_node == end_node {
        tree.parent(start_node)
    } else {
        common_ancestor(tree, start_node, end_node)
    }
    .ok_or_else(|| TreeError::Detached(format!("{start_node:?}")))?;

    // Start side: every partially covered ancestor keeps its head and the
    // covered tail moves into a clone.
    let mut start_top = start_node;
    loop {
        let parent = tree
            .parent(start_top)
            .ok_or_else(|| TreeError::Detached(format!("{start_top:?}")))?;
        if parent == ancestor {
            break;
        }
        let index = tree
            .index_in_parent(start_top)
            .ok_or_else(|| TreeError::Detached(format!("{start_top:?}")))?;
        start_top = if index > 0 {
            let created = tree.split_element(parent, index)?;
            edits.push(Edit::SplitElement {
                original: parent,
                created,
            });
            created
        } else {
            parent
        };
    }

    // End side: the uncovered tail moves out into a clone.
    let mut end_top = end_node;
    loop {
        let parent = tree
            .parent(end_top)
            .ok_or_else(|| TreeError::Detached(format!("{end_top:?}")))?;
        if parent == ancestor {
            break;
        }
        let index = tree
            .index_in_parent(end_top)
            .ok_or_else(|| TreeError::Detached(format!("{end_top:?}")))?;
        if index + 1 < tree.child_count(parent) {
            let created = tree.split_element(parent, index + 1)?;
            edits.push(Edit::SplitElement {
                original: parent,
                created,
            });
        }
        end_top = parent;
    }

    let first = tree
        .index_in_parent(start_top)
        .ok_or_else(|| TreeError::Detached(format!("{start_top:?}")))?;
    let last = tree
        .index_in_parent(end_top)
        .ok_or_else(|| TreeError::Detached(format!("{end_top:?}")))?;
    if first > last {
        return Err(TreeError::Incompatible(format!(
            "start child {first} after end child {last}"
        )));
    }

    debug!(
        start = group.start,
        end = group.end,
        splits = edits.len(),
        "Wrapping overlap group"
    );
    tree.wrap_children(ancestor, first, last + 1, WRAPPER_TAG)
}

/// Creates the decoration for `group`, wrapper attributes included
pub(crate) fn decorate<T>(
    tree: &mut T,
    container: T::Node,
    group: &OverlapGroup,
    segments: &[HighlightSegment],
    config: &RendererConfig,
) -> Result<Decoration<T::Node>, (TreeError, Vec<Edit<T::Node>>, Option<T::Node>)>
where
    T: MutableTree + ?Sized,
{
    let mut edits = Vec::new();
    let wrapper = match wrap_group(tree, container, group, &mut edits) {
        Ok(wrapper) => wrapper,
        Err(e) => return Err((e, edits, None)),
    };

    let members: Vec<&HighlightSegment> = group.records.iter().map(|&i| &segments[i]).collect();
    let primary = members[0];
    let overlap_count = group.overlap_count(config.max_overlap_count);
    let color = primary.color.as_deref().unwrap_or(&config.default_color);
    let style = format!(
        "background-color: {}; border-bottom: 2px solid {}",
        background(color, overlap_count),
        color
    );

    let attributes = [
        ("class", config.class_name.clone()),
        (config.id_attribute.as_str(), primary.id.clone()),
        (OVERLAP_ATTRIBUTE, overlap_count.to_string()),
        ("title", tooltip(&members)),
        ("style", style),
    ];
    for (name, value) in &attributes {
        if let Err(e) = tree.set_attribute(wrapper, name, value) {
            return Err((e, edits, Some(wrapper)));
        }
    }

    Ok(Decoration {
        primary_id: primary.id.clone(),
        record_ids: members.iter().map(|s| s.id.clone()).collect(),
        overlap_count,
        range: group.start..group.end,
        wrapper,
        edits,
    })
}

/// Reverses a decoration: unwraps it, then merges split pieces back in
/// reverse order. Keeps going past individual failures and returns how many
/// steps failed.
pub(crate) fn undo<T>(tree: &mut T, wrapper: Option<T::Node>, edits: &[Edit<T::Node>]) -> usize
where
    T: MutableTree + ?Sized,
{
    let mut failures = 0;
    if let Some(wrapper) = wrapper {
        if let Err(e) = tree.unwrap(wrapper) {
            warn!(error = %e, "Failed to unwrap decoration");
            failures += 1;
        }
    }

    for edit in edits.iter().rev() {
        let (Edit::SplitText { original, created } | Edit::SplitElement { original, created }) =
            *edit;
        if tree.previous_sibling(created) != Some(original) {
            warn!(?original, ?created, "Split pieces are no longer adjacent");
            failures += 1;
            continue;
        }
        if let Err(e) = tree.merge_into_previous(created) {
            warn!(error = %e, "Failed to merge split pieces");
            failures += 1;
        }
    }
    failures
}
