//! Highlight records and their storage
//!
//! The store itself lives outside this crate's concern; [`HighlightStore`]
//! is the narrow interface the rest of the system needs from it.

mod error;
mod service;
mod store;
mod types;

pub use error::StoreError;
pub use service::HighlightService;
pub use store::{HighlightStore, MemoryHighlightStore, StoreScan};
pub use types::{HighlightDraft, HighlightRecord, HighlightUpdate, NewHighlight, DEFAULT_COLOR};

pub(crate) use store::new_record;
