//! Cryptographic utilities for credential handling.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 digest of the input.
fn sha256(input: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher.finalize().into()
}

/// Compares two strings in constant time.
///
/// Both inputs are hashed first so the comparison always touches a
/// fixed number of bytes regardless of input length, and the byte-wise
/// comparison itself does not short-circuit.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (sha256(a), sha256(b));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
