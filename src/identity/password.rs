//! Password hashing
//!
//! Passwords are stored as unsalted SHA-256 digests rendered as lowercase
//! hex. The scheme is kept for compatibility with credentials issued by
//! earlier deployments; it is a known weakness. Without a salt, equal
//! passwords hash to equal digests and precomputed-table attacks apply, so
//! do not reuse this module for anything security-critical.

use sha2::{Digest, Sha256};

/// Hash a password to a 64-character lowercase hex digest.
///
/// Deterministic: the same input always yields the same digest.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
