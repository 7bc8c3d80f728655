//! # Hashing
//!
//! SHA-256, and only SHA-256. The signing path hashes every message before
//! it reaches Ed25519 (see [`super::signatures`]), and other implementations
//! of the protocol expect exactly that digest, so there is no room for a
//! faster hash here.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data` as a fixed-size array.
///
/// # Example
///
/// ```
/// use tapauth_protocol::crypto::sha256;
///
/// let digest = sha256(b"tap");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
