//! Highlights database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::warn;

use crate::anchor::AnchoredPosition;
use crate::highlights::{
    new_record, HighlightRecord, HighlightStore, HighlightUpdate, NewHighlight, StoreError,
    StoreScan,
};
use crate::identity::HighlightHash;

const SELECT_COLUMNS: &str = r#"
    SELECT id, article_id, document_ref, text, start_offset, end_offset,
           start_path, end_path, text_digest, user_id, user_name, is_public,
           note, color, highlight_hash, created_at, updated_at
    FROM highlights
"#;

/// Highlight row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
struct HighlightRow {
    id: String,
    article_id: String,
    document_ref: String,
    text: String,
    start_offset: i64,
    end_offset: i64,
    start_path: String,
    end_path: String,
    text_digest: Option<String>,
    user_id: String,
    user_name: Option<String>,
    is_public: bool,
    note: Option<String>,
    color: String,
    highlight_hash: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<HighlightRow> for HighlightRecord {
    type Error = StoreError;

    fn try_from(row: HighlightRow) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StoreError::InvalidRecord {
            id: row.id.clone(),
            reason,
        };
        let offset = |value: i64| usize::try_from(value).map_err(|_| invalid(format!("negative offset {value}")));
        let timestamp = |value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| invalid(format!("bad timestamp {value:?}: {e}")))
        };

        let highlight_hash = row
            .highlight_hash
            .as_deref()
            .map(|h| h.parse::<HighlightHash>())
            .transpose()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(HighlightRecord {
            anchor: AnchoredPosition {
                document_ref: row.document_ref.clone(),
                text: row.text.clone(),
                start_offset: offset(row.start_offset)?,
                end_offset: offset(row.end_offset)?,
                start_path: row.start_path.clone(),
                end_path: row.end_path.clone(),
                text_digest: row.text_digest.clone(),
            },
            created_at: timestamp(&row.created_at)?,
            updated_at: timestamp(&row.updated_at)?,
            highlight_hash,
            id: row.id.clone(),
            article_id: row.article_id.clone(),
            user_id: row.user_id.clone(),
            user_name: row.user_name.clone(),
            is_public: row.is_public,
            note: row.note.clone(),
            color: row.color.clone(),
        })
    }
}

/// SQLite-backed highlight store
#[derive(Debug, Clone)]
pub struct SqliteHighlightStore {
    pool: SqlitePool,
}

impl SqliteHighlightStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Writes a record as-is, keeping its id and timestamps
    pub async fn insert(&self, record: &HighlightRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO highlights (id, article_id, document_ref, text, start_offset, end_offset,
                                    start_path, end_path, text_digest, user_id, user_name, is_public,
                                    note, color, highlight_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.article_id)
        .bind(&record.anchor.document_ref)
        .bind(&record.anchor.text)
        .bind(record.anchor.start_offset as i64)
        .bind(record.anchor.end_offset as i64)
        .bind(&record.anchor.start_path)
        .bind(&record.anchor.end_path)
        .bind(&record.anchor.text_digest)
        .bind(&record.user_id)
        .bind(&record.user_name)
        .bind(record.is_public)
        .bind(&record.note)
        .bind(&record.color)
        .bind(record.highlight_hash.as_ref().map(|h| h.as_str()))
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Converts rows one by one so a corrupt row only costs itself
    async fn fetch(&self, filter: &str, bind: Option<&str>) -> Result<StoreScan, StoreError> {
        let sql = format!("{SELECT_COLUMNS} {filter} ORDER BY created_at ASC, id ASC");
        let mut query = sqlx::query_as::<_, HighlightRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }

        let mut scan = StoreScan::default();
        for row in query.fetch_all(&self.pool).await? {
            let id = row.id.clone();
            match HighlightRecord::try_from(row) {
                Ok(record) => scan.records.push(record),
                Err(e) => scan.unreadable.push((id, e)),
            }
        }
        Ok(scan)
    }

    async fn fetch_readable(&self, filter: &str, bind: Option<&str>) -> Result<Vec<HighlightRecord>, StoreError> {
        let scan = self.fetch(filter, bind).await?;
        for (id, e) in &scan.unreadable {
            warn!(id = %id, error = %e, "Skipping unreadable highlight row");
        }
        Ok(scan.records)
    }
}

#[async_trait]
impl HighlightStore for SqliteHighlightStore {
    async fn create(&self, new: NewHighlight) -> Result<HighlightRecord, StoreError> {
        let record = new_record(new);
        self.insert(&record).await?;
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<HighlightRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        sqlx::query_as::<_, HighlightRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(HighlightRecord::try_from)
            .transpose()
    }

    async fn update(
        &self,
        id: &str,
        update: &HighlightUpdate,
    ) -> Result<HighlightRecord, StoreError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE highlights
            SET note = COALESCE(?, note),
                color = COALESCE(?, color),
                is_public = COALESCE(?, is_public),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.note)
        .bind(&update.color)
        .bind(update.is_public)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM highlights WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, document_ref: &str) -> Result<Vec<HighlightRecord>, StoreError> {
        self.fetch_readable("WHERE document_ref = ?", Some(document_ref)).await
    }

    async fn list_all(&self) -> Result<Vec<HighlightRecord>, StoreError> {
        self.fetch_readable("", None).await
    }

    async fn scan_all(&self) -> Result<StoreScan, StoreError> {
        self.fetch("", None).await
    }

    async fn set_highlight_hash(&self, id: &str, hash: &HighlightHash) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE highlights SET highlight_hash = ?, updated_at = ? WHERE id = ?",
        )
        .bind(hash.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
