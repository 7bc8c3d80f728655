//! # ChaCha20-Poly1305 Encryption
//!
//! Authenticated encryption for token payloads and response breadcrumbs.
//!
//! ChaCha20-Poly1305 rather than AES-GCM because the payer side is a phone
//! and the merchant side is often a cheap terminal SoC: neither can be
//! counted on for AES hardware, and ChaCha20 is constant-time in software.
//!
//! ## Nonce management
//!
//! 96-bit nonces. When the caller doesn't supply one we draw a fresh 16-byte
//! protocol nonce and keep its first 12 bytes (see
//! [`CryptoEngine::encrypt`](super::CryptoEngine::encrypt)). Keys are derived
//! per session, so the birthday bound is never in play.
//!
//! ## Wire format
//!
//! On the wire an encrypted blob is `nonce(12) ‖ ciphertext ‖ tag(16)`.
//! [`SealedBox`] holds the two halves separately and converts to and from
//! that layout.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::config::{AEAD_KEY_LENGTH, AEAD_NONCE_LENGTH, AEAD_TAG_LENGTH};

use super::error::CryptoError;

/// Ciphertext (with its Poly1305 tag appended) plus the nonce it was
/// sealed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// `ciphertext ‖ tag(16)`.
    pub ciphertext: Vec<u8>,
    /// The 12-byte AEAD nonce.
    pub nonce: [u8; AEAD_NONCE_LENGTH],
}

impl SealedBox {
    /// Serialize as `nonce ‖ ciphertext ‖ tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split a `nonce ‖ ciphertext ‖ tag` buffer.
    ///
    /// A buffer too short to hold even a nonce and an empty-plaintext tag is
    /// reported as an authentication failure: a truncated ciphertext is a
    /// tampered ciphertext.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < AEAD_NONCE_LENGTH + AEAD_TAG_LENGTH {
            return Err(CryptoError::AuthenticationFailed);
        }
        let (nonce, ciphertext) = bytes.split_at(AEAD_NONCE_LENGTH);
        let mut nonce_arr = [0u8; AEAD_NONCE_LENGTH];
        nonce_arr.copy_from_slice(nonce);
        Ok(Self {
            ciphertext: ciphertext.to_vec(),
            nonce: nonce_arr,
        })
    }

    /// Length of the serialized form.
    pub fn wire_len(&self) -> usize {
        AEAD_NONCE_LENGTH + self.ciphertext.len()
    }
}

/// Encrypt `plaintext` under `key` with an explicit nonce.
///
/// Returns `ciphertext ‖ tag`. The caller owns nonce uniqueness; use
/// [`CryptoEngine::encrypt`](super::CryptoEngine::encrypt) to have one
/// generated.
pub fn encrypt(
    key: &[u8; AEAD_KEY_LENGTH],
    nonce: &[u8; AEAD_NONCE_LENGTH],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::EncryptFailed)
}

/// Decrypt `ciphertext ‖ tag`.
///
/// # Errors
///
/// [`CryptoError::AuthenticationFailed`] for a wrong key, a wrong nonce, a
/// flipped bit anywhere in ciphertext or tag, or a buffer shorter than the
/// tag. We don't distinguish these on purpose.
pub fn decrypt(
    key: &[u8; AEAD_KEY_LENGTH],
    nonce: &[u8; AEAD_NONCE_LENGTH],
    ciphertext_with_tag: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext_with_tag.len() < AEAD_TAG_LENGTH {
        return Err(CryptoError::AuthenticationFailed);
    }
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext_with_tag)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Open a [`SealedBox`].
pub fn open(key: &[u8; AEAD_KEY_LENGTH], sealed: &SealedBox) -> Result<Vec<u8>, CryptoError> {
    decrypt(key, &sealed.nonce, &sealed.ciphertext)
}

/// Length-checked key conversion for keys that arrive as slices.
pub fn key_from_slice(key: &[u8]) -> Result<[u8; AEAD_KEY_LENGTH], CryptoError> {
    key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: AEAD_KEY_LENGTH,
        got: key.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    const NONCE: [u8; 12] = *b"unique nonce";

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let ct = encrypt(&key, &NONCE, b"breadcrumb: aisle 4").unwrap();
        assert_eq!(decrypt(&key, &NONCE, &ct).unwrap(), b"breadcrumb: aisle 4");
    }

    #[test]
    fn test_rfc8439_vector() {
        // RFC 8439 §2.8.2 AEAD test vector.
        let key: [u8; 32] =
            hex::decode("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f")
                .unwrap()
                .try_into()
                .unwrap();
        let nonce: [u8; 12] = hex::decode("070000004041424344454647")
            .unwrap()
            .try_into()
            .unwrap();
        let aad = hex::decode("50515253c0c1c2c3c4c5c6c7").unwrap();
        let plaintext = b"Ladies and Gentlemen of the class of '99: If I could offer you only one tip for the future, sunscreen would be it.";

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ct = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                chacha20poly1305::aead::Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .unwrap();
        assert_eq!(
            hex::encode(&ct[ct.len() - 16..]),
            "1ae10b594f09e26a7e902ecbd0600691"
        );
    }

    #[test]
    fn test_empty_plaintext_is_just_a_tag() {
        let key = test_key();
        let ct = encrypt(&key, &NONCE, b"").unwrap();
        assert_eq!(ct.len(), AEAD_TAG_LENGTH);
        assert!(decrypt(&key, &NONCE, &ct).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_fails() {
        let ct = encrypt(&test_key(), &NONCE, b"secret").unwrap();
        let mut wrong = test_key();
        wrong[0] ^= 0xFF;
        assert_eq!(
            decrypt(&wrong, &NONCE, &ct).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let ct = encrypt(&test_key(), &NONCE, b"secret").unwrap();
        let mut wrong = NONCE;
        wrong[11] ^= 0x01;
        assert!(decrypt(&test_key(), &wrong, &ct).is_err());
    }

    #[test]
    fn test_every_flipped_byte_fails() {
        let key = test_key();
        let ct = encrypt(&key, &NONCE, b"twelve bytes").unwrap();
        for i in 0..ct.len() {
            let mut tampered = ct.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                decrypt(&key, &NONCE, &tampered).unwrap_err(),
                CryptoError::AuthenticationFailed,
                "flip at byte {i} went unnoticed"
            );
        }
    }

    #[test]
    fn test_truncated_fails() {
        let key = test_key();
        let ct = encrypt(&key, &NONCE, b"hello").unwrap();
        assert!(decrypt(&key, &NONCE, &ct[..ct.len() - 1]).is_err());
        assert!(decrypt(&key, &NONCE, &ct[..10]).is_err());
        assert!(decrypt(&key, &NONCE, &[]).is_err());
    }

    #[test]
    fn test_sealed_box_wire_roundtrip() {
        let key = test_key();
        let sealed = SealedBox {
            ciphertext: encrypt(&key, &NONCE, b"payload").unwrap(),
            nonce: NONCE,
        };
        let wire = sealed.to_bytes();
        assert_eq!(wire.len(), sealed.wire_len());
        assert_eq!(&wire[..12], &NONCE);
        let parsed = SealedBox::from_bytes(&wire).unwrap();
        assert_eq!(parsed, sealed);
        assert_eq!(open(&key, &parsed).unwrap(), b"payload");
    }

    #[test]
    fn test_sealed_box_too_short() {
        assert_eq!(
            SealedBox::from_bytes(&[0u8; 27]).unwrap_err(),
            CryptoError::AuthenticationFailed
        );
    }

    #[test]
    fn test_slice_conversions() {
        assert!(key_from_slice(&[0u8; 32]).is_ok());
        assert!(key_from_slice(&[0u8; 16]).unwrap_err().is_argument_error());
    }
}
