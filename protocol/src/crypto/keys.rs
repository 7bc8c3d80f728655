//! # Signing Keys
//!
//! Ed25519 keypairs for payers and merchant terminals.
//!
//! The core never stores keys. A key-material provider (secure element,
//! keystore, whatever the platform offers) hands us 32 raw seed bytes per
//! operation and we build a [`SigningKeypair`] from them on the spot.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - `Debug` prints the public half only.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use std::fmt;

use ed25519_dalek::SigningKey;

use crate::config::{SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH};

use super::error::CryptoError;
use super::signatures;

/// An Ed25519 keypair derived from a 32-byte seed.
///
/// `SigningKeypair` intentionally does NOT implement `Serialize`. Exporting
/// a private key should be a deliberate call to [`seed_bytes`](Self::seed_bytes),
/// not a side effect of shoving a struct into JSON.
///
/// # Examples
///
/// ```
/// use tapauth_protocol::crypto::SigningKeypair;
///
/// let kp = SigningKeypair::from_seed(&[7u8; 32]);
/// let sig = kp.sign(b"pay 25.00 EUR");
/// assert!(kp.verify(b"pay 25.00 EUR", &sig));
/// ```
pub struct SigningKeypair {
    signing_key: SigningKey,
}

impl SigningKeypair {
    /// Build a keypair from a 32-byte seed. In Ed25519 the seed *is* the
    /// secret key; the public key is re-derived from it.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Build a keypair from an untrusted byte slice, checking its length.
    pub fn from_slice(seed: &[u8]) -> Result<Self, CryptoError> {
        let seed: &[u8; SIGNING_KEY_LENGTH] =
            seed.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SIGNING_KEY_LENGTH,
                got: seed.len(),
            })?;
        Ok(Self::from_seed(seed))
    }

    /// Build a keypair from a hex-encoded seed.
    ///
    /// Convenience for the terminal binary and test fixtures. Please don't
    /// keep raw hex seeds in files in production.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Self::from_slice(&bytes)
    }

    /// The 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; VERIFYING_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The public key, hex-encoded. Safe to log.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Export the raw seed. **Handle with extreme care.**
    pub fn seed_bytes(&self) -> [u8; SIGNING_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Sign `data` using the protocol's digest-then-sign rule.
    /// See [`signatures::sign`].
    pub fn sign(&self, data: &[u8]) -> [u8; 64] {
        signatures::sign(self, data)
    }

    /// Verify a signature produced by [`sign`](Self::sign) against our own
    /// public key.
    pub fn verify(&self, data: &[u8], signature: &[u8; 64]) -> bool {
        signatures::verify(&self.public_key_bytes(), data, signature)
    }
}

impl Clone for SigningKeypair {
    /// Allowed, but every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeypair(pub={})", self.public_key_hex())
    }
}

impl PartialEq for SigningKeypair {
    /// Compared by public key, never by secret bytes.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for SigningKeypair {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc8032_test_vector_1_public_key() {
        // RFC 8032 §7.1, TEST 1.
        let kp = SigningKeypair::from_hex(
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
        )
        .unwrap();
        assert_eq!(
            kp.public_key_hex(),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn deterministic_from_seed() {
        let kp1 = SigningKeypair::from_seed(&[42u8; 32]);
        let kp2 = SigningKeypair::from_seed(&[42u8; 32]);
        assert_eq!(kp1, kp2);
        assert_ne!(kp1, SigningKeypair::from_seed(&[43u8; 32]));
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = SigningKeypair::from_slice(&[0u8; 31]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                got: 31
            }
        );
        assert!(err.is_argument_error());
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert_eq!(
            SigningKeypair::from_hex("not-hex").unwrap_err(),
            CryptoError::InvalidHex
        );
        assert!(SigningKeypair::from_hex("deadbeef").is_err());
    }

    #[test]
    fn seed_roundtrip() {
        let kp = SigningKeypair::from_seed(&[9u8; 32]);
        let restored = SigningKeypair::from_seed(&kp.seed_bytes());
        assert_eq!(kp.public_key_bytes(), restored.public_key_bytes());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = SigningKeypair::from_seed(&[1u8; 32]);
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("SigningKeypair(pub="));
        assert!(!debug_str.contains(&hex::encode([1u8; 32])));
    }
}
