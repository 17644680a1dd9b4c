//! Error types for the highlight core

use thiserror::Error;

use crate::config::ConfigError;
use crate::highlights::StoreError;
use crate::ledger::LedgerError;
use crate::migration::MigrationError;
use crate::tree::TreeError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Cannot anchor selection: {0}")]
    Anchor(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Content tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
