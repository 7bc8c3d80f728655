//! # Key Agreement
//!
//! X25519 Diffie-Hellman followed by HKDF-SHA-256, producing the 32-byte
//! ChaCha20-Poly1305 keys used for token payloads and breadcrumbs.
//!
//! ## Key Derivation
//!
//! The raw DH output is NOT used directly as an encryption key; it's a
//! curve point with algebraic structure, not a uniform string. We run it
//! through HKDF with:
//!
//! - **salt**: supplied by the caller (typically the token or challenge
//!   nonce), so each exchange gets its own key;
//! - **info**: [`SESSION_KEY_CONTEXT`], a fixed, versioned context string.
//!
//! Both sides feed the same salt, and X25519 is commutative, so
//! `derive(A_priv, B_pub, s) == derive(B_priv, A_pub, s)`.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::config::{AGREEMENT_KEY_LENGTH, SESSION_KEY_CONTEXT, SESSION_KEY_LENGTH};

use super::error::CryptoError;

/// A static X25519 keypair supplied by the key-material provider.
#[derive(Clone)]
pub struct AgreementKeypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl AgreementKeypair {
    /// Build from 32 raw private key bytes (clamping happens inside X25519).
    pub fn from_bytes(private_key: [u8; AGREEMENT_KEY_LENGTH]) -> Self {
        let secret = StaticSecret::from(private_key);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Build from a hex-encoded private key.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| CryptoError::InvalidHex)?;
        Ok(Self::from_bytes(key_array(&bytes)?))
    }

    /// The public key to hand to the peer.
    pub fn public_key_bytes(&self) -> [u8; AGREEMENT_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Export the private key. Same warnings as every other secret export.
    pub fn private_key_bytes(&self) -> [u8; AGREEMENT_KEY_LENGTH] {
        self.secret.to_bytes()
    }

    /// Derive the session key shared with `their_public`.
    pub fn derive_session_key(
        &self,
        their_public: &[u8; AGREEMENT_KEY_LENGTH],
        salt: &[u8],
    ) -> Result<[u8; SESSION_KEY_LENGTH], CryptoError> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(*their_public));
        if !shared.was_contributory() {
            return Err(CryptoError::KeyAgreementFailed);
        }
        expand(shared.as_bytes(), salt)
    }
}

impl fmt::Debug for AgreementKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AgreementKeypair(pub={})",
            hex::encode(self.public_key_bytes())
        )
    }
}

/// Derive a session key from raw private and public key slices.
///
/// Length-checks both keys; a wrong length is an argument error.
pub fn derive_session_key(
    my_private: &[u8],
    their_public: &[u8],
    salt: &[u8],
) -> Result<[u8; SESSION_KEY_LENGTH], CryptoError> {
    let keypair = AgreementKeypair::from_bytes(key_array(my_private)?);
    keypair.derive_session_key(&key_array(their_public)?, salt)
}

fn expand(ikm: &[u8], salt: &[u8]) -> Result<[u8; SESSION_KEY_LENGTH], CryptoError> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; SESSION_KEY_LENGTH];
    hkdf.expand(SESSION_KEY_CONTEXT, &mut okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    Ok(okm)
}

fn key_array(bytes: &[u8]) -> Result<[u8; AGREEMENT_KEY_LENGTH], CryptoError> {
    bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: AGREEMENT_KEY_LENGTH,
        got: bytes.len(),
    })
}
