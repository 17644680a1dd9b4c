//! Highlight record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anchor::AnchoredPosition;
use crate::identity::{self, HighlightHash};
use crate::render::HighlightSegment;

pub const DEFAULT_COLOR: &str = "#FFEB3B";

/// A stored highlight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRecord {
    pub id: String,
    /// Store-side article identifier
    pub article_id: String,
    pub anchor: AnchoredPosition,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub color: String,
    /// Ledger join key; missing on records created before it existed
    #[serde(rename = "highlightId", default, skip_serializing_if = "Option::is_none")]
    pub highlight_hash: Option<HighlightHash>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HighlightRecord {
    pub fn document_ref(&self) -> &str {
        &self.anchor.document_ref
    }

    /// The identity hash this record should carry
    pub fn computed_hash(&self) -> HighlightHash {
        identity::generate(
            &self.anchor.document_ref,
            &self.anchor.text,
            self.anchor.start_offset,
            self.anchor.end_offset,
        )
    }

    /// Whether two records describe the same words at the same place, which
    /// is the only case where sharing an identity hash is legitimate
    pub fn same_logical_highlight(&self, other: &HighlightRecord) -> bool {
        self.anchor.document_ref == other.anchor.document_ref
            && self.anchor.start_offset == other.anchor.start_offset
            && self.anchor.end_offset == other.anchor.end_offset
            && identity::text_prefix(&self.anchor.text) == identity::text_prefix(&other.anchor.text)
    }

    /// View of the record used by the renderer
    pub fn segment(&self) -> HighlightSegment {
        HighlightSegment {
            id: self.id.clone(),
            anchor: self.anchor.clone(),
            color: Some(self.color.clone()),
            note: self.note.clone(),
            user_name: self.user_name.clone(),
        }
    }
}

/// Creation payload for a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHighlight {
    pub article_id: String,
    pub anchor: AnchoredPosition,
    pub user_id: String,
    pub user_name: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub note: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "highlightId")]
    pub highlight_hash: Option<HighlightHash>,
}

/// Fields a reader may change after creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightUpdate {
    pub note: Option<String>,
    pub color: Option<String>,
    pub is_public: Option<bool>,
}

impl HighlightUpdate {
    pub fn is_empty(&self) -> bool {
        self.note.is_none() && self.color.is_none() && self.is_public.is_none()
    }

    pub(crate) fn apply_to(&self, record: &mut HighlightRecord, now: DateTime<Utc>) {
        if let Some(note) = &self.note {
            record.note = Some(note.clone());
        }
        if let Some(color) = &self.color {
            record.color = color.clone();
        }
        if let Some(is_public) = self.is_public {
            record.is_public = is_public;
        }
        record.updated_at = now;
    }
}

/// What a reader supplies when turning a selection into a highlight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightDraft {
    pub article_id: String,
    /// Reference fed into the identity hash (the article slug)
    pub document_ref: String,
    pub user_id: String,
    pub user_name: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub note: Option<String>,
    pub color: Option<String>,
}
