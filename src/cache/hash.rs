//! Content hashing for cache diagnostics and query logging.

use sha2::{Digest, Sha256};

/// Hex characters kept by [`fingerprint`].
const FINGERPRINT_LEN: usize = 12;

/// Compute the SHA256 hash of `text`.
///
/// Returns a 64-character lowercase hexadecimal string.
pub fn compute_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Short stable identifier for SQL text, safe to log.
///
/// Whitespace runs are collapsed first so reformatting a query keeps its
/// fingerprint.
pub fn fingerprint(sql: &str) -> String {
    let canonical = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hash = compute_hash(&canonical);
    hash.truncate(FINGERPRINT_LEN);
    hash
}
