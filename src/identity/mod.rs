//! Highlight identity hashing
//!
//! The identity hash is the only key shared between the reader's browser,
//! the highlight store and the payment ledger. Every implementation must
//! produce the same 28 hex characters for the same inputs:
//!
//! ```text
//! sha256("{document_ref}:{start}:{end}:{text prefix}")[..28]
//! ```
//!
//! The text prefix is the first 50 UTF-16 code units of the selected text,
//! which is what `String.prototype.slice(0, 50)` yields in the browser. A
//! surrogate pair cut in half becomes U+FFFD once re-encoded as UTF-8.

pub mod vectors;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hex characters kept from the digest. Fits a 28-byte ledger memo.
pub const HASH_LEN: usize = 28;

/// UTF-16 code units of selected text that feed the hash
pub const TEXT_PREFIX_UNITS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid highlight hash: {0:?}")]
pub struct InvalidHighlightHash(pub String);

/// A validated identity hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HighlightHash(String);

impl HighlightHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for HighlightHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HighlightHash {
    type Err = InvalidHighlightHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidHighlightHash(s.to_string()))
        }
    }
}

impl TryFrom<String> for HighlightHash {
    type Error = InvalidHighlightHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidHighlightHash(value))
        }
    }
}

impl From<HighlightHash> for String {
    fn from(hash: HighlightHash) -> Self {
        hash.0
    }
}

/// First [`TEXT_PREFIX_UNITS`] UTF-16 code units of `text`
pub fn text_prefix(text: &str) -> String {
    let units: Vec<u16> = text.encode_utf16().take(TEXT_PREFIX_UNITS).collect();
    String::from_utf16_lossy(&units)
}

/// The exact string that gets hashed
pub fn canonical_input(document_ref: &str, text: &str, start_offset: usize, end_offset: usize) -> String {
    format!(
        "{}:{}:{}:{}",
        document_ref,
        start_offset,
        end_offset,
        text_prefix(text)
    )
}

/// Derives the identity hash of a highlight
pub fn generate(document_ref: &str, text: &str, start_offset: usize, end_offset: usize) -> HighlightHash {
    let input = canonical_input(document_ref, text, start_offset, end_offset);
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    HighlightHash(digest[..HASH_LEN].to_string())
}

/// Awaitable form of [`generate`], for callers mirroring hosts whose digest
/// primitive is asynchronous
pub async fn generate_async(
    document_ref: &str,
    text: &str,
    start_offset: usize,
    end_offset: usize,
) -> HighlightHash {
    generate(document_ref, text, start_offset, end_offset)
}

/// Format check: exactly 28 lowercase hex characters
pub fn is_valid(candidate: &str) -> bool {
    candidate.len() == HASH_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
