//! Highlight rendering
//!
//! Stored highlights are resolved against the live container, grouped into
//! maximal overlapping runs and wrapped one `<mark>` per run. Decorations
//! are runtime-only; each apply pass tears down the previous one first.

mod decoration;
mod grouping;
mod renderer;
mod types;

pub use decoration::Decoration;
pub use grouping::{group_overlapping, OverlapGroup, ResolvedSpan};
pub use renderer::HighlightRenderer;
pub use types::{ApplyReport, HighlightSegment, RendererConfig};
