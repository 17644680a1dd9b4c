//! SQLite persistence for highlight records
//!
//! Everything lives in the one `highlights` table described in [`schema`].

mod highlights;
mod schema;

pub use highlights::*;
pub use schema::*;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use tracing::debug;

use crate::highlights::StoreError;

const MAX_CONNECTIONS: u32 = 5;

/// Opens the highlight database at `url`, creating the file and the
/// `highlights` table when they are missing
pub async fn open_pool(url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    initialize_schema(&pool).await?;
    debug!(url, "Highlight database ready");

    Ok(pool)
}

/// [`open_pool`] wrapped in a [`SqliteHighlightStore`]
pub async fn open_store(url: &str) -> Result<SqliteHighlightStore, StoreError> {
    Ok(SqliteHighlightStore::new(open_pool(url).await?))
}

