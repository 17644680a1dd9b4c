//! Position anchoring
//!
//! A captured selection is stored as two structural paths (child indices
//! from the article container down to each boundary node) plus the in-node
//! offsets. Resolution walks the same paths back down and fails closed: if
//! any index, offset or the stored text fingerprint no longer fits, the
//! highlight is reported unresolvable instead of landing on the wrong words.

mod serializer;
mod types;

pub use serializer::{deserialize, serialize, text_digest};
pub use types::{AnchoredPosition, NodePath, NodePathError};
