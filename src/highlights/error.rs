//! Highlight store errors

use thiserror::Error;

/// A store rejected or failed an operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Highlight not found: {0}")]
    NotFound(String),

    #[error("Invalid stored record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
