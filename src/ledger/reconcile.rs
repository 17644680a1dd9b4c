//! Joining payments to highlight records

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::PaymentRecord;
use crate::highlights::HighlightRecord;
use crate::identity::HighlightHash;

/// Tips received by one identity hash
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightTotal {
    pub highlight_hash: HighlightHash,
    /// Records carrying the hash; more than one for shared passages
    pub record_ids: Vec<String>,
    pub payment_count: usize,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub totals: Vec<HighlightTotal>,
    /// Payments whose memo matches no stored highlight hash
    pub orphaned: Vec<PaymentRecord>,
}

impl Reconciliation {
    pub fn total_for(&self, hash: &HighlightHash) -> Option<&HighlightTotal> {
        self.totals.iter().find(|t| &t.highlight_hash == hash)
    }
}

/// Attributes each payment to the records holding the hash named in its memo.
///
/// Only stored hashes count: a record that has not been backfilled cannot be
/// found by the ledger either.
pub fn reconcile(records: &[HighlightRecord], payments: &[PaymentRecord]) -> Reconciliation {
    let mut totals: BTreeMap<HighlightHash, HighlightTotal> = BTreeMap::new();
    for record in records {
        if let Some(hash) = &record.highlight_hash {
            totals
                .entry(hash.clone())
                .or_insert_with(|| HighlightTotal {
                    highlight_hash: hash.clone(),
                    record_ids: Vec::new(),
                    payment_count: 0,
                    amount_cents: 0,
                })
                .record_ids
                .push(record.id.clone());
        }
    }

    let mut orphaned = Vec::new();
    for payment in payments {
        match payment
            .memo
            .highlight_hash()
            .and_then(|hash| totals.get_mut(&hash))
        {
            Some(total) => {
                total.payment_count += 1;
                total.amount_cents += payment.amount_cents;
            }
            None => {
                debug!(tx_id = %payment.tx_id, memo = %payment.memo, "Payment matches no highlight");
                orphaned.push(payment.clone());
            }
        }
    }

    Reconciliation {
        totals: totals.into_values().filter(|t| t.payment_count > 0).collect(),
        orphaned,
    }
}
