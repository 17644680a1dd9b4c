//! Selection validation helpers

use thiserror::Error;

use super::{CaptureOptions, TextSelection};
use crate::tree::{LiveRange, OrderedTree};

/// Why a candidate selection did not qualify
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionRejection {
    #[error("selection too short ({len} < {min})")]
    TooShort { len: usize, min: usize },

    #[error("selection too long ({len} > {max})")]
    TooLong { len: usize, max: usize },

    #[error("selection is collapsed")]
    Collapsed,

    #[error("selection end comes before its start")]
    Reversed,

    #[error("selection lies outside the container")]
    OutsideContainer,
}

/// Trims and collapses every run of whitespace to a single space
pub fn normalize_selected_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs the capture pipeline over a candidate range.
///
/// Length limits apply to the normalized text, but the returned selection
/// keeps the raw range text.
pub fn validate_text_selection<T>(
    tree: &T,
    container: T::Node,
    range: LiveRange<T::Node>,
    options: &CaptureOptions,
) -> Result<TextSelection<T::Node>, SelectionRejection>
where
    T: OrderedTree + ?Sized,
{
    let raw = range.text(tree, tree.root()).unwrap_or_default();
    let len = normalize_selected_text(&raw).chars().count();
    if len < options.min_selection_length {
        return Err(SelectionRejection::TooShort {
            len,
            min: options.min_selection_length,
        });
    }
    if len > options.max_selection_length {
        return Err(SelectionRejection::TooLong {
            len,
            max: options.max_selection_length,
        });
    }

    if range.is_collapsed() {
        return Err(SelectionRejection::Collapsed);
    }
    if !range.is_ordered(tree) {
        return Err(SelectionRejection::Reversed);
    }

    match range.common_ancestor(tree) {
        Some(ancestor) if tree.contains(container, ancestor) => {}
        _ => return Err(SelectionRejection::OutsideContainer),
    }

    Ok(TextSelection {
        text: raw,
        range,
        start_node: range.start.node,
        start_offset: range.start.offset,
        end_node: range.end.node,
        end_offset: range.end.offset,
    })
}
