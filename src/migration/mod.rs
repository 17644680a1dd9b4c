//! Identity hash backfill
//!
//! Records created before identity hashes existed carry none, so tips cannot
//! be joined to them. The backfill runs in phases: `audit` to see where the
//! data stands, `dry_run` to preview, `migrate` to write, and `validate` to
//! check the result against the ledger.

mod error;
mod types;

pub use error::MigrationError;
pub use types::{
    AuditReport, Collision, DryRunReport, DuplicateHash, DuplicateText, MigrationReport,
    RecordError, StaleHash, ValidationReport, ValidationStatus,
};

use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use crate::highlights::{HighlightRecord, HighlightStore, StoreScan};
use crate::identity::{self, HighlightHash};
use crate::ledger::{self, LedgerClient};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// What a backfill would do to the current record set
#[derive(Debug, Default)]
struct Plan {
    writes: Vec<(String, HighlightHash)>,
    skipped: usize,
    collisions: Vec<Collision>,
    /// Records that cannot be read or hashed, or whose hash is taken
    rejected: Vec<(String, MigrationError)>,
}

impl Plan {
    fn build(scan: StoreScan) -> Self {
        let mut plan = Plan::default();
        let StoreScan { records, unreadable } = scan;
        for (id, e) in unreadable {
            warn!(id = %id, error = %e, "Unreadable record left out of the backfill");
            plan.rejected.push((id, MigrationError::Store(e)));
        }
        let mut claims: BTreeMap<HighlightHash, Vec<(&HighlightRecord, bool)>> = BTreeMap::new();

        for record in &records {
            if let Some(hash) = &record.highlight_hash {
                plan.skipped += 1;
                claims.entry(hash.clone()).or_default().push((record, false));
                continue;
            }
            if record.document_ref().is_empty() {
                plan.rejected.push((
                    record.id.clone(),
                    MigrationError::InvalidAnchor("missing document reference".into()),
                ));
                continue;
            }
            if record.anchor.end_offset < record.anchor.start_offset {
                plan.rejected.push((
                    record.id.clone(),
                    MigrationError::InvalidAnchor(format!(
                        "end offset {} before start offset {}",
                        record.anchor.end_offset, record.anchor.start_offset
                    )),
                ));
                continue;
            }
            claims
                .entry(record.computed_hash())
                .or_default()
                .push((record, true));
        }

        for (hash, claimants) in claims {
            let first = claimants[0].0;
            let distinct = claimants
                .iter()
                .any(|(record, _)| !record.same_logical_highlight(first));

            if distinct {
                let record_ids: Vec<String> = claimants.iter().map(|(r, _)| r.id.clone()).collect();
                warn!(%hash, records = ?record_ids, "Hash collision between distinct highlights");
                for (record, _) in claimants.iter().filter(|(_, pending)| *pending) {
                    plan.rejected.push((
                        record.id.clone(),
                        MigrationError::HashCollision {
                            hash: hash.clone(),
                            record_ids: record_ids.clone(),
                        },
                    ));
                }
                plan.collisions.push(Collision { hash, record_ids });
                continue;
            }

            for (record, pending) in claimants {
                if pending {
                    plan.writes.push((record.id.clone(), hash.clone()));
                }
            }
        }

        plan
    }

    fn rejected_errors(&self) -> impl Iterator<Item = RecordError> + '_ {
        self.rejected.iter().map(|(id, e)| RecordError {
            record_id: id.clone(),
            message: e.to_string(),
        })
    }
}

/// Backfills identity hashes over every record in a store
pub struct Backfill<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: HighlightStore + ?Sized> Backfill<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn audit(&self) -> Result<AuditReport, MigrationError> {
        let StoreScan { records, unreadable } = self.store.scan_all().await?;
        let unreadable: Vec<RecordError> = unreadable
            .into_iter()
            .map(|(record_id, e)| RecordError {
                record_id,
                message: e.to_string(),
            })
            .collect();
        let total = records.len() + unreadable.len();
        let with_hash = records.iter().filter(|r| r.highlight_hash.is_some()).count();

        let mut texts: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in &records {
            let key = format!("{}:{}", record.document_ref(), identity::text_prefix(&record.anchor.text));
            texts.entry(key).or_default().push(record.id.clone());
        }
        let duplicate_texts: Vec<DuplicateText> = texts
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(key, record_ids)| DuplicateText {
                key,
                count: record_ids.len(),
                record_ids,
            })
            .collect();

        let stale_hashes: Vec<StaleHash> = records
            .iter()
            .filter_map(|record| {
                let stored = record.highlight_hash.clone()?;
                let computed = record.computed_hash();
                (stored != computed).then(|| StaleHash {
                    record_id: record.id.clone(),
                    stored,
                    computed,
                })
            })
            .collect();

        let mut recommendations = Vec::new();
        if with_hash < total {
            recommendations.push(format!(
                "{} records need an identity hash; run dry-run, then migrate",
                total - with_hash
            ));
        } else {
            recommendations.push("Every record carries an identity hash".to_string());
        }
        if !duplicate_texts.is_empty() {
            recommendations.push(format!(
                "{} duplicate text patterns; usually intentional when readers differ",
                duplicate_texts.len()
            ));
        }
        if !stale_hashes.is_empty() {
            recommendations.push(format!(
                "{} stored hashes no longer match their anchor; payments keep the stored value",
                stale_hashes.len()
            ));
        }
        if !unreadable.is_empty() {
            recommendations.push(format!(
                "{} stored rows cannot be read and must be repaired by hand",
                unreadable.len()
            ));
        }

        let percentage_complete = if total == 0 {
            0.0
        } else {
            with_hash as f64 / total as f64 * 100.0
        };

        info!(total, with_hash, "Audit complete");
        Ok(AuditReport {
            total,
            with_hash,
            without_hash: total - with_hash,
            percentage_complete,
            duplicate_texts,
            stale_hashes,
            unreadable,
            recommendations,
        })
    }

    /// Reports what [`Backfill::migrate`] would do without writing anything
    pub async fn dry_run(&self) -> Result<DryRunReport, MigrationError> {
        let plan = Plan::build(self.store.scan_all().await?);

        let errors = plan
            .rejected_errors()
            .filter(|e| !plan.collisions.iter().any(|c| c.record_ids.contains(&e.record_id)))
            .collect();

        Ok(DryRunReport {
            would_update: plan.writes.len(),
            would_skip: plan.skipped,
            collisions: plan.collisions,
            errors,
        })
    }

    /// Writes missing identity hashes, `batch_size` records at a time.
    ///
    /// A record that fails is counted and reported; the rest still run.
    pub async fn migrate(&self, batch_size: usize) -> Result<MigrationReport, MigrationError> {
        if batch_size == 0 {
            return Err(MigrationError::InvalidBatchSize);
        }

        let plan = Plan::build(self.store.scan_all().await?);
        let mut report = MigrationReport {
            skipped: plan.skipped,
            failed: plan.rejected.len(),
            errors: plan.rejected_errors().collect(),
            ..MigrationReport::default()
        };

        let batches = plan.writes.len().div_ceil(batch_size);
        for (index, batch) in plan.writes.chunks(batch_size).enumerate() {
            for (id, hash) in batch {
                match self.store.set_highlight_hash(id, hash).await {
                    Ok(()) => report.updated += 1,
                    Err(e) => {
                        warn!(id = %id, error = %e, "Failed to store identity hash");
                        report.failed += 1;
                        report.errors.push(RecordError {
                            record_id: id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            info!(
                batch = index + 1,
                batches,
                size = batch.len(),
                updated = report.updated,
                "Backfill batch done"
            );
        }

        info!(
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "Backfill complete"
        );
        Ok(report)
    }

    /// Checks the backfilled records against the payments a ledger holds.
    ///
    /// Linked payments come from asking the ledger for the stored hashes; any
    /// other payment in the ledger is orphaned.
    pub async fn validate<L>(&self, ledger: &L) -> Result<ValidationReport, MigrationError>
    where
        L: LedgerClient + ?Sized,
    {
        let StoreScan { records, unreadable } = self.store.scan_all().await?;
        let unreadable: Vec<RecordError> = unreadable
            .into_iter()
            .map(|(record_id, e)| RecordError {
                record_id,
                message: e.to_string(),
            })
            .collect();
        let total = records.len();
        let with_hash = records.iter().filter(|r| r.highlight_hash.is_some()).count();

        let mut by_hash: BTreeMap<&HighlightHash, Vec<&HighlightRecord>> = BTreeMap::new();
        for record in &records {
            if let Some(hash) = &record.highlight_hash {
                by_hash.entry(hash).or_default().push(record);
            }
        }

        let mut duplicate_hashes = Vec::new();
        let mut collisions = Vec::new();
        for (hash, holders) in by_hash.iter().filter(|(_, holders)| holders.len() > 1) {
            let first = holders[0];
            if holders.iter().any(|r| !r.same_logical_highlight(first)) {
                collisions.push(Collision {
                    hash: (*hash).clone(),
                    record_ids: holders.iter().map(|r| r.id.clone()).collect(),
                });
            }
            let is_different_users = holders.iter().any(|r| r.user_id != first.user_id);
            duplicate_hashes.push(DuplicateHash {
                highlight_hash: (*hash).clone(),
                count: holders.len(),
                text: identity::text_prefix(&first.anchor.text),
                user_ids: holders.iter().map(|r| r.user_id.clone()).collect(),
                is_different_users,
                is_critical: !is_different_users,
            });
        }

        let stored: Vec<HighlightHash> = by_hash.keys().map(|h| (*h).clone()).collect();
        let linked = ledger.fetch_by_identity_hashes(&stored).await?;
        let payments = ledger.list_payments().await?;
        let linked_ids: HashSet<&str> = linked.iter().map(|p| p.tx_id.as_str()).collect();
        let orphaned_payments: Vec<String> = payments
            .iter()
            .filter(|p| !linked_ids.contains(p.tx_id.as_str()))
            .map(|p| p.tx_id.clone())
            .collect();
        let joined = ledger::reconcile(&records, &linked);
        let valid_payment_links = joined.totals.iter().map(|t| t.payment_count).sum();

        let mut critical = Vec::new();
        if with_hash < total {
            critical.push(format!("{} records still missing an identity hash", total - with_hash));
        }
        if !orphaned_payments.is_empty() {
            critical.push(format!(
                "{} payments match no highlight",
                orphaned_payments.len()
            ));
        }
        if !collisions.is_empty() {
            critical.push(format!(
                "{} hashes shared by distinct highlights",
                collisions.len()
            ));
        }
        if !unreadable.is_empty() {
            critical.push(format!("{} stored rows cannot be read", unreadable.len()));
        }

        let mut warnings = Vec::new();
        let same_user = duplicate_hashes.iter().filter(|d| d.is_critical).count();
        if same_user > 0 {
            warnings.push(format!("{same_user} duplicate hashes held by a single reader"));
        }
        let intentional = duplicate_hashes.len() - same_user;
        if intentional > 0 {
            warnings.push(format!(
                "{intentional} intentional duplicates (different readers, same passage)"
            ));
        }

        let status = if critical.is_empty() {
            ValidationStatus::Passed
        } else {
            ValidationStatus::Failed
        };
        info!(?status, total, with_hash, payments = payments.len(), "Validation complete");

        Ok(ValidationReport {
            status,
            total,
            with_hash,
            without_hash: total - with_hash,
            total_payments: payments.len(),
            valid_payment_links,
            orphaned_payments,
            duplicate_hashes,
            collisions,
            tip_totals: joined.totals,
            unreadable,
            critical,
            warnings,
        })
    }
}
