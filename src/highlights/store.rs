//! Highlight store abstraction and the in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::StoreError;
use super::types::{HighlightRecord, HighlightUpdate, NewHighlight, DEFAULT_COLOR};
use crate::identity::HighlightHash;

/// Durable storage for highlight records
#[async_trait]
pub trait HighlightStore: Send + Sync {
    async fn create(&self, new: NewHighlight) -> Result<HighlightRecord, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<HighlightRecord>, StoreError>;

    /// Changes note, colour or visibility. Fails with `NotFound` for an
    /// unknown id.
    async fn update(&self, id: &str, update: &HighlightUpdate)
        -> Result<HighlightRecord, StoreError>;

    /// Returns whether a record was removed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Records anchored in one document, oldest first. Rows the store
    /// cannot read are left out.
    async fn list(&self, document_ref: &str) -> Result<Vec<HighlightRecord>, StoreError>;

    /// Every readable record, oldest first
    async fn list_all(&self) -> Result<Vec<HighlightRecord>, StoreError>;

    /// Every record, oldest first, with rows that could not be read kept
    /// apart instead of failing the whole listing
    async fn scan_all(&self) -> Result<StoreScan, StoreError> {
        Ok(StoreScan {
            records: self.list_all().await?,
            unreadable: Vec::new(),
        })
    }

    async fn set_highlight_hash(&self, id: &str, hash: &HighlightHash) -> Result<(), StoreError>;
}

/// Result of a full scan that tolerates bad rows
#[derive(Debug, Default)]
pub struct StoreScan {
    pub records: Vec<HighlightRecord>,
    /// Record id and what was wrong with the stored row
    pub unreadable: Vec<(String, StoreError)>,
}

pub(crate) fn new_record(new: NewHighlight) -> HighlightRecord {
    let now = Utc::now();
    HighlightRecord {
        id: Uuid::new_v4().to_string(),
        article_id: new.article_id,
        anchor: new.anchor,
        user_id: new.user_id,
        user_name: new.user_name,
        is_public: new.is_public,
        note: new.note,
        color: new.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        highlight_hash: new.highlight_hash,
        created_at: now,
        updated_at: now,
    }
}

fn sorted(mut records: Vec<HighlightRecord>) -> Vec<HighlightRecord> {
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    records
}

/// Process-local store, for tests and offline tooling
#[derive(Debug, Default)]
pub struct MemoryHighlightStore {
    records: RwLock<HashMap<String, HighlightRecord>>,
}

impl MemoryHighlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with existing records, ids and timestamps untouched
    pub fn with_records(records: impl IntoIterator<Item = HighlightRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Inserts or replaces a record as-is
    pub async fn insert(&self, record: HighlightRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl HighlightStore for MemoryHighlightStore {
    async fn create(&self, new: NewHighlight) -> Result<HighlightRecord, StoreError> {
        let record = new_record(new);
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<HighlightRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        update: &HighlightUpdate,
    ) -> Result<HighlightRecord, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply_to(record, Utc::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn list(&self, document_ref: &str) -> Result<Vec<HighlightRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(sorted(
            records
                .values()
                .filter(|r| r.document_ref() == document_ref)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all(&self) -> Result<Vec<HighlightRecord>, StoreError> {
        Ok(sorted(self.records.read().await.values().cloned().collect()))
    }

    async fn set_highlight_hash(&self, id: &str, hash: &HighlightHash) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.highlight_hash = Some(hash.clone());
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::AnchoredPosition;

    fn new_highlight(document_ref: &str, text: &str) -> NewHighlight {
        NewHighlight {
            article_id: "article-1".into(),
            anchor: AnchoredPosition {
                document_ref: document_ref.into(),
                text: text.into(),
                start_offset: 0,
                end_offset: text.chars().count(),
                start_path: "0".into(),
                end_path: "0".into(),
                text_digest: None,
            },
            user_id: "user-1".into(),
            user_name: None,
            is_public: false,
            note: None,
            color: None,
            highlight_hash: None,
        }
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = MemoryHighlightStore::new();
        let created = store.create(new_highlight("doc", "words")).await.unwrap();
        assert_eq!(created.color, DEFAULT_COLOR);

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        assert!(store.delete(&created.id).await.unwrap());
        assert!(!store.delete(&created.id).await.unwrap());
        assert!(store.get(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_changes_cosmetic_fields_only() {
        let store = MemoryHighlightStore::new();
        let created = store.create(new_highlight("doc", "words")).await.unwrap();

        let update = HighlightUpdate {
            note: Some("remember".into()),
            is_public: Some(true),
            ..HighlightUpdate::default()
        };
        let updated = store.update(&created.id, &update).await.unwrap();
        assert_eq!(updated.note.as_deref(), Some("remember"));
        assert!(updated.is_public);
        assert_eq!(updated.anchor, created.anchor);
        assert_eq!(updated.color, created.color);

        let missing = store.update("nope", &update).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_document() {
        let store = MemoryHighlightStore::new();
        store.create(new_highlight("a", "one")).await.unwrap();
        store.create(new_highlight("b", "two")).await.unwrap();
        store.create(new_highlight("a", "three")).await.unwrap();

        let listed = store.list("a").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|r| r.document_ref() == "a"));
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_set_highlight_hash() {
        let store = MemoryHighlightStore::new();
        let created = store.create(new_highlight("doc", "words")).await.unwrap();
        let hash = created.computed_hash();

        store.set_highlight_hash(&created.id, &hash).await.unwrap();
        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.highlight_hash, Some(hash.clone()));

        assert!(store.set_highlight_hash("nope", &hash).await.is_err());
    }
}
