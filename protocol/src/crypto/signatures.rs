//! # Digital Signatures
//!
//! Ed25519 signing and verification for tokens and challenge responses.
//!
//! ## Digest-then-sign
//!
//! The protocol never signs raw data. It signs `SHA-256(data)`, and the
//! verifier recomputes the same digest before calling Ed25519. Ed25519
//! already hashes internally with SHA-512, so this is redundant as
//! cryptography, but it is how every other implementation of the wire
//! format behaves and a signature over the raw bytes would not verify
//! anywhere else. Don't "optimize" it away.
//!
//! ## Failure modes
//!
//! A signature that doesn't verify is `false`. A public key or signature of
//! the wrong *length* is a caller bug and comes back as a [`CryptoError`]
//! from the slice-based entry points; the array-typed ones make it
//! unrepresentable.

use ed25519_dalek::{Signature as DalekSignature, Signer, Verifier, VerifyingKey};

use crate::config::{SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH};

use super::error::CryptoError;
use super::hash::sha256;
use super::keys::SigningKeypair;

/// Sign the SHA-256 digest of `data`.
///
/// Deterministic (RFC 8032): same key + same data = same 64 bytes.
///
/// # Example
///
/// ```
/// use tapauth_protocol::crypto::{sign, verify, SigningKeypair};
///
/// let kp = SigningKeypair::from_seed(&[3u8; 32]);
/// let sig = sign(&kp, b"token prefix");
/// assert!(verify(&kp.public_key_bytes(), b"token prefix", &sig));
/// ```
pub fn sign(keypair: &SigningKeypair, data: &[u8]) -> [u8; SIGNATURE_LENGTH] {
    let digest = sha256(data);
    keypair.signing_key().sign(&digest).to_bytes()
}

/// Verify a digest-then-sign signature.
///
/// Returns `false` for a bad signature *and* for public key bytes that
/// don't decode to a curve point; from the verifier's point of view both
/// mean "this token was not signed by who it claims".
pub fn verify(
    public_key: &[u8; VERIFYING_KEY_LENGTH],
    data: &[u8],
    signature: &[u8; SIGNATURE_LENGTH],
) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let digest = sha256(data);
    let signature = DalekSignature::from_bytes(signature);
    verifying_key.verify(&digest, &signature).is_ok()
}

/// Verify with key and signature arriving as unchecked slices.
///
/// Length mismatches are argument errors, not verification failures.
pub fn verify_slices(
    public_key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, CryptoError> {
    let public_key: &[u8; VERIFYING_KEY_LENGTH] =
        public_key.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: VERIFYING_KEY_LENGTH,
            got: public_key.len(),
        })?;
    let signature: &[u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| CryptoError::InvalidSignatureLength(signature.len()))?;
    Ok(verify(public_key, data, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> SigningKeypair {
        SigningKeypair::from_seed(&[0x11; 32])
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = keypair();
        let sig = sign(&kp, b"hello, terminal");
        assert!(verify(&kp.public_key_bytes(), b"hello, terminal", &sig));
    }

    #[test]
    fn test_signs_digest_not_data() {
        // The raw Ed25519 signature over the data must differ from ours,
        // and ours must equal a raw signature over SHA-256(data).
        let kp = keypair();
        let data = b"digest-then-sign";
        let ours = sign(&kp, data);
        let over_digest = kp.signing_key().sign(&sha256(data)).to_bytes();
        let over_data = kp.signing_key().sign(data).to_bytes();
        assert_eq!(ours, over_digest);
        assert_ne!(ours, over_data);
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = keypair();
        let sig = sign(&kp, b"correct message");
        assert!(!verify(&kp.public_key_bytes(), b"wrong message", &sig));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sig = sign(&keypair(), b"msg");
        let other = SigningKeypair::from_seed(&[0x22; 32]);
        assert!(!verify(&other.public_key_bytes(), b"msg", &sig));
    }

    #[test]
    fn test_deterministic_signatures() {
        let kp = keypair();
        assert_eq!(sign(&kp, b"same"), sign(&kp, b"same"));
    }

    #[test]
    fn test_empty_message() {
        let kp = keypair();
        let sig = sign(&kp, b"");
        assert!(verify(&kp.public_key_bytes(), b"", &sig));
    }

    #[test]
    fn test_garbage_public_key_is_false_not_panic() {
        // Not every 32-byte string decompresses to a curve point.
        let mut bad_pk = [0xFFu8; 32];
        bad_pk[31] = 0x7F;
        assert!(!verify(&bad_pk, b"doesn't matter", &[0u8; 64]));
    }

    #[test]
    fn test_verify_slices_length_errors() {
        let kp = keypair();
        let sig = sign(&kp, b"x");
        assert_eq!(
            verify_slices(&[0u8; 31], b"x", &sig).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                got: 31
            }
        );
        assert_eq!(
            verify_slices(&kp.public_key_bytes(), b"x", &sig[..63]).unwrap_err(),
            CryptoError::InvalidSignatureLength(63)
        );
        assert!(verify_slices(&kp.public_key_bytes(), b"x", &sig).unwrap());
    }
}
