//! Ledger payments keyed by highlight identity
//!
//! A tip is an on-ledger payment whose memo carries the identity hash of the
//! highlighted passage. Joining payments back to highlight records only works
//! while that hash is stable, which is what [`crate::identity`] guarantees.

mod reconcile;

pub use reconcile::{reconcile, HighlightTotal, Reconciliation};

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::identity::HighlightHash;

/// Text memos on the ledger hold at most this many bytes
pub const MEMO_MAX_BYTES: usize = 28;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Memo is {len} bytes, the ledger allows {MEMO_MAX_BYTES}")]
    MemoTooLong { len: usize },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed payment data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Payment memo text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Memo(String);

impl Memo {
    pub fn new(text: impl Into<String>) -> Result<Self, LedgerError> {
        let text = text.into();
        if text.len() > MEMO_MAX_BYTES {
            return Err(LedgerError::MemoTooLong { len: text.len() });
        }
        Ok(Self(text))
    }

    /// The memo a tip on this highlight carries
    pub fn for_highlight(hash: &HighlightHash) -> Self {
        // Identity hashes are 28 ASCII hex characters.
        Self(hash.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity hash this memo references, if it is one
    pub fn highlight_hash(&self) -> Option<HighlightHash> {
        self.0.parse().ok()
    }
}

impl TryFrom<String> for Memo {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Memo> for String {
    fn from(memo: Memo) -> Self {
        memo.0
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A settled payment as read from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub tx_id: String,
    pub memo: Memo,
    pub amount_cents: i64,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default)]
    pub ledger: u64,
    pub created_at: DateTime<Utc>,
}

fn default_network() -> String {
    "TESTNET".to_string()
}

/// Read access to payments on the ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Payments whose memo names one of `hashes`
    async fn fetch_by_identity_hashes(
        &self,
        hashes: &[HighlightHash],
    ) -> Result<Vec<PaymentRecord>, LedgerError>;

    /// Every tip payment the ledger knows about, joined or not
    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError>;
}

/// Payments held in memory, for tests and for offline exports
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    payments: RwLock<Vec<PaymentRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON array of payment records
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let payments: Vec<PaymentRecord> = serde_json::from_str(json)?;
        Ok(Self {
            payments: RwLock::new(payments),
        })
    }

    pub async fn record(&self, payment: PaymentRecord) {
        self.payments.write().await.push(payment);
    }

    pub async fn payments(&self) -> Vec<PaymentRecord> {
        self.payments.read().await.clone()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn fetch_by_identity_hashes(
        &self,
        hashes: &[HighlightHash],
    ) -> Result<Vec<PaymentRecord>, LedgerError> {
        let wanted: HashSet<&str> = hashes.iter().map(HighlightHash::as_str).collect();
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| wanted.contains(p.memo.as_str()))
            .cloned()
            .collect())
    }

    async fn list_payments(&self) -> Result<Vec<PaymentRecord>, LedgerError> {
        Ok(self.payments().await)
    }
}
