//! Error types for the crypto engine.
//!
//! Two families live here: *argument* errors (the caller handed us a key,
//! nonce or signature of the wrong fixed length: a programming error) and
//! *authentication* errors (an AEAD tag didn't check out; treat as
//! tampering). A signature that simply doesn't verify is neither; that's a
//! `false`, not an error.

use thiserror::Error;

/// Errors produced by the crypto engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key had the wrong length for its algorithm.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength {
        /// Length the algorithm requires.
        expected: usize,
        /// Length we were given.
        got: usize,
    },

    /// An Ed25519 signature wasn't 64 bytes.
    #[error("invalid signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Key material arrived as text and wasn't valid hex.
    #[error("invalid hex-encoded key material")]
    InvalidHex,

    /// Decryption failed: wrong key, wrong nonce, or a modified/truncated
    /// ciphertext. We don't say which.
    #[error("authentication failed -- ciphertext rejected")]
    AuthenticationFailed,

    /// Encryption failed (only possible for absurdly large plaintexts).
    #[error("encryption failed")]
    EncryptFailed,

    /// X25519 produced an all-zero shared secret (low-order peer key).
    #[error("key agreement failed: non-contributory peer public key")]
    KeyAgreementFailed,

    /// HKDF refused the requested output length.
    #[error("session key derivation failed")]
    KeyDerivationFailed,
}

impl CryptoError {
    /// `true` for errors caused by malformed caller input rather than by
    /// the data under test.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyLength { .. }
                | Self::InvalidSignatureLength(_)
                | Self::InvalidHex
        )
    }
}
