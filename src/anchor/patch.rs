//! Reflow-tolerant patch tokens
//!
//! A patch token fingerprints the whitespace-normalized quote so that a
//! relocated block can be verified even when the renderer re-serialized its
//! text (collapsed whitespace, re-wrapped lines).
//!
//! Token format: `@@{ordinal}:{normalized_chars}:{sha256_prefix}`

use sha2::{Digest, Sha256};
use std::fmt;

use crate::content::normalize_whitespace;

/// Hex characters of the digest kept in the token
const DIGEST_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorPatch {
    pub ordinal: u32,
    pub normalized_len: usize,
    pub digest: String,
}

impl AnchorPatch {
    /// Fingerprint `quote` as found at block `ordinal`
    pub fn new(ordinal: u32, quote: &str) -> Self {
        let normalized = normalize_whitespace(quote);
        Self {
            ordinal,
            normalized_len: normalized.chars().count(),
            digest: digest(&normalized),
        }
    }

    /// Parse a token produced by `to_string`
    pub fn parse(token: &str) -> Option<Self> {
        let body = token.strip_prefix("@@")?;
        let mut parts = body.splitn(3, ':');
        let ordinal = parts.next()?.parse().ok()?;
        let normalized_len = parts.next()?.parse().ok()?;
        let digest = parts.next()?;
        if digest.len() != DIGEST_LEN || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            ordinal,
            normalized_len,
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// Whether `text` is the fingerprinted quote up to whitespace changes
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_whitespace(text);
        normalized.chars().count() == self.normalized_len && digest(&normalized) == self.digest
    }
}

impl fmt::Display for AnchorPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@@{}:{}:{}", self.ordinal, self.normalized_len, self.digest)
    }
}

fn digest(normalized: &str) -> String {
    let hash = Sha256::digest(normalized.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(DIGEST_LEN);
    hex
}
