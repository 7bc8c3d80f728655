//! # Crypto Engine
//!
//! One object that bundles every primitive the orchestrator needs and owns
//! the randomness source. It is constructed once and handed to
//! [`PaymentProtocol`](crate::exchange::PaymentProtocol); there are no
//! process-wide cipher or RNG handles anywhere in the crate.
//!
//! Cloning is cheap (an `Arc` bump) and clones share the same source.

use std::sync::Arc;

use crate::config::{
    AEAD_KEY_LENGTH, AEAD_NONCE_LENGTH, NONCE_LENGTH, SESSION_KEY_LENGTH, SIGNATURE_LENGTH,
    VERIFYING_KEY_LENGTH,
};

use super::agreement::{self, AgreementKeypair};
use super::encryption::{self, SealedBox};
use super::error::CryptoError;
use super::keys::SigningKeypair;
use super::random::{OsRandom, RandomSource, SeededRandom};
use super::signatures;

/// Stateless crypto facade over an injectable [`RandomSource`].
#[derive(Clone)]
pub struct CryptoEngine {
    random: Arc<dyn RandomSource>,
}

impl CryptoEngine {
    /// Engine backed by the given randomness source.
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Engine backed by the OS CSPRNG. What production uses.
    pub fn with_os_rng() -> Self {
        Self::new(Arc::new(OsRandom))
    }

    /// Deterministic engine for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(Arc::new(SeededRandom::new(seed)))
    }

    /// `n` cryptographically secure random bytes.
    pub fn random_nonce(&self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.random.fill_bytes(&mut out);
        out
    }

    /// A fresh 16-byte protocol nonce.
    pub fn protocol_nonce(&self) -> [u8; NONCE_LENGTH] {
        let mut out = [0u8; NONCE_LENGTH];
        self.random.fill_bytes(&mut out);
        out
    }

    /// A fresh 12-byte AEAD nonce: a 16-byte protocol nonce truncated to
    /// its first 12 bytes.
    pub fn aead_nonce(&self) -> [u8; AEAD_NONCE_LENGTH] {
        let full = self.protocol_nonce();
        let mut out = [0u8; AEAD_NONCE_LENGTH];
        out.copy_from_slice(&full[..AEAD_NONCE_LENGTH]);
        out
    }

    /// Generate an Ed25519 keypair from this engine's randomness.
    pub fn generate_signing_keypair(&self) -> SigningKeypair {
        let mut seed = [0u8; 32];
        self.random.fill_bytes(&mut seed);
        SigningKeypair::from_seed(&seed)
    }

    /// Generate an X25519 keypair from this engine's randomness.
    pub fn generate_agreement_keypair(&self) -> AgreementKeypair {
        let mut secret = [0u8; 32];
        self.random.fill_bytes(&mut secret);
        AgreementKeypair::from_bytes(secret)
    }

    /// X25519 + HKDF-SHA-256. See [`agreement`](super::agreement).
    pub fn derive_session_key(
        &self,
        my_private: &[u8],
        their_public: &[u8],
        salt: &[u8],
    ) -> Result<[u8; SESSION_KEY_LENGTH], CryptoError> {
        agreement::derive_session_key(my_private, their_public, salt)
    }

    /// Ed25519 over SHA-256(data).
    pub fn sign(&self, data: &[u8], keypair: &SigningKeypair) -> [u8; SIGNATURE_LENGTH] {
        signatures::sign(keypair, data)
    }

    /// Verify an Ed25519-over-SHA-256 signature.
    pub fn verify(
        &self,
        data: &[u8],
        signature: &[u8; SIGNATURE_LENGTH],
        public_key: &[u8; VERIFYING_KEY_LENGTH],
    ) -> bool {
        signatures::verify(public_key, data, signature)
    }

    /// ChaCha20-Poly1305 encryption. Generates a nonce when `nonce` is `None`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key: &[u8; AEAD_KEY_LENGTH],
        nonce: Option<[u8; AEAD_NONCE_LENGTH]>,
    ) -> Result<SealedBox, CryptoError> {
        let nonce = nonce.unwrap_or_else(|| self.aead_nonce());
        let ciphertext = encryption::encrypt(key, &nonce, plaintext)?;
        Ok(SealedBox { ciphertext, nonce })
    }

    /// ChaCha20-Poly1305 decryption of `ciphertext ‖ tag`.
    pub fn decrypt(
        &self,
        ciphertext_with_tag: &[u8],
        nonce: &[u8; AEAD_NONCE_LENGTH],
        key: &[u8; AEAD_KEY_LENGTH],
    ) -> Result<Vec<u8>, CryptoError> {
        encryption::decrypt(key, nonce, ciphertext_with_tag)
    }
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::with_os_rng()
    }
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CryptoEngine")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_engines_agree() {
        let a = CryptoEngine::seeded(99);
        let b = CryptoEngine::seeded(99);
        assert_eq!(a.protocol_nonce(), b.protocol_nonce());
        assert_eq!(
            a.generate_signing_keypair().public_key_bytes(),
            b.generate_signing_keypair().public_key_bytes()
        );
    }

    #[test]
    fn random_nonce_has_requested_length() {
        let engine = CryptoEngine::with_os_rng();
        assert_eq!(engine.random_nonce(0).len(), 0);
        assert_eq!(engine.random_nonce(16).len(), 16);
        assert_eq!(engine.random_nonce(64).len(), 64);
    }

    #[test]
    fn aead_nonce_is_truncated_protocol_nonce() {
        let a = CryptoEngine::seeded(1);
        let b = CryptoEngine::seeded(1);
        let full = a.protocol_nonce();
        assert_eq!(b.aead_nonce(), full[..12]);
    }

    #[test]
    fn encrypt_generates_nonce_when_absent() {
        let engine = CryptoEngine::with_os_rng();
        let key = [7u8; 32];
        let s1 = engine.encrypt(b"same", &key, None).unwrap();
        let s2 = engine.encrypt(b"same", &key, None).unwrap();
        assert_ne!(s1.nonce, s2.nonce);
        assert_eq!(
            engine.decrypt(&s1.ciphertext, &s1.nonce, &key).unwrap(),
            b"same"
        );
    }

    #[test]
    fn encrypt_honours_supplied_nonce() {
        let engine = CryptoEngine::with_os_rng();
        let sealed = engine.encrypt(b"x", &[1u8; 32], Some([9u8; 12])).unwrap();
        assert_eq!(sealed.nonce, [9u8; 12]);
    }

    #[test]
    fn engine_sign_verify() {
        let engine = CryptoEngine::seeded(3);
        let kp = engine.generate_signing_keypair();
        let sig = engine.sign(b"data", &kp);
        assert!(engine.verify(b"data", &sig, &kp.public_key_bytes()));
        assert!(!engine.verify(b"dat4", &sig, &kp.public_key_bytes()));
    }

    #[test]
    fn engine_session_keys_match() {
        let engine = CryptoEngine::seeded(5);
        let a = engine.generate_agreement_keypair();
        let b = engine.generate_agreement_keypair();
        let k1 = engine
            .derive_session_key(&a.private_key_bytes(), &b.public_key_bytes(), b"salt")
            .unwrap();
        let k2 = engine
            .derive_session_key(&b.private_key_bytes(), &a.public_key_bytes(), b"salt")
            .unwrap();
        assert_eq!(k1, k2);
    }
}
