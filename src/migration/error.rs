//! Migration errors

use thiserror::Error;

use crate::highlights::StoreError;
use crate::identity::HighlightHash;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Hash {hash} is shared by distinct highlights: {}", record_ids.join(", "))]
    HashCollision {
        hash: HighlightHash,
        record_ids: Vec<String>,
    },

    #[error("Record has no usable anchor: {0}")]
    InvalidAnchor(String),

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,
}
