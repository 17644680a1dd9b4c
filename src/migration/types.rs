//! Migration report types

use serde::Serialize;

use crate::identity::HighlightHash;
use crate::ledger::HighlightTotal;

/// Read-only summary of the record set before a backfill
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub total: usize,
    pub with_hash: usize,
    pub without_hash: usize,
    pub percentage_complete: f64,
    /// Same words highlighted more than once in one document
    pub duplicate_texts: Vec<DuplicateText>,
    /// Stored hashes that no longer match their anchor
    pub stale_hashes: Vec<StaleHash>,
    /// Stored rows that could not be read as records
    pub unreadable: Vec<RecordError>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateText {
    /// `document_ref:text prefix`
    pub key: String,
    pub count: usize,
    pub record_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleHash {
    pub record_id: String,
    pub stored: HighlightHash,
    pub computed: HighlightHash,
}

/// One hash claimed by highlights that are not the same passage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub hash: HighlightHash,
    pub record_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    pub record_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunReport {
    pub would_update: usize,
    pub would_skip: usize,
    pub collisions: Vec<Collision>,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<RecordError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Passed,
    Failed,
}

/// Several records carrying one stored hash
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateHash {
    pub highlight_hash: HighlightHash,
    pub count: usize,
    pub text: String,
    pub user_ids: Vec<String>,
    pub is_different_users: bool,
    /// One reader holding the same hash twice
    pub is_critical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub total: usize,
    pub with_hash: usize,
    pub without_hash: usize,
    pub total_payments: usize,
    pub valid_payment_links: usize,
    /// Transaction ids of payments that join to no record
    pub orphaned_payments: Vec<String>,
    pub duplicate_hashes: Vec<DuplicateHash>,
    pub collisions: Vec<Collision>,
    /// Tips received per stored hash
    pub tip_totals: Vec<HighlightTotal>,
    pub unreadable: Vec<RecordError>,
    pub critical: Vec<String>,
    pub warnings: Vec<String>,
}
