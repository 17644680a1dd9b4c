//! Highlight table layout

use sqlx::SqlitePool;

use crate::highlights::StoreError;

/// Creates the `highlights` table and its indexes when they are missing
pub async fn initialize_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(SCHEMA_SQL).execute(pool).await?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Highlights anchored in article text
CREATE TABLE IF NOT EXISTS highlights (
    id TEXT PRIMARY KEY,
    article_id TEXT NOT NULL,
    -- Reference fed into the identity hash (article slug)
    document_ref TEXT NOT NULL,
    text TEXT NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    -- Structural paths, dot separated child indices
    start_path TEXT NOT NULL,
    end_path TEXT NOT NULL,
    text_digest TEXT,
    user_id TEXT NOT NULL,
    user_name TEXT,
    is_public INTEGER NOT NULL DEFAULT 0,
    note TEXT,
    color TEXT NOT NULL DEFAULT '#FFEB3B',
    -- Ledger join key, NULL until backfilled
    highlight_hash TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_highlights_document_ref ON highlights(document_ref);
CREATE INDEX IF NOT EXISTS idx_highlights_article_id ON highlights(article_id);
CREATE INDEX IF NOT EXISTS idx_highlights_user_id ON highlights(user_id);
CREATE INDEX IF NOT EXISTS idx_highlights_hash ON highlights(highlight_hash);
"#;
