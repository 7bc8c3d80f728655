//! # Challenge & Response
//!
//! The two-tap flow, used when the terminal wants the payer to prove
//! presence against a specific, merchant-chosen nonce rather than trusting a
//! pre-issued token.
//!
//! ```text
//!   Terminal                                   Payer device
//!   ────────                                   ────────────
//!   issue_challenge ───────── tap 1 ─────────► sign_response
//!     nonce, ts, amount, cell, memo?             signs nonce ‖ userPub
//!                                                  ‖ pad(cell, 15) ‖ ts
//!   verify_response ◄──────── tap 2 ──────────
//!     1. nonce echoed?
//!     2. replay guard on (nonce, ts)
//!     3. signature
//! ```
//!
//! ## Wire format
//!
//! Both bodies are canonical JSON: camelCase keys sorted lexicographically,
//! byte strings as standard (padded) base64, absent optional fields
//! omitted. `serde_json::Value` keeps object keys in a `BTreeMap`, so going
//! through a `Value` before writing gives the sorted form for free.
//!
//! The challenge itself is not signed. Everything the payer commits to is
//! inside the response signature.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{
    AEAD_KEY_LENGTH, LOCATION_CELL_LENGTH, NONCE_LENGTH, SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH,
};
use crate::crypto::encryption::{self, SealedBox};
use crate::crypto::SigningKeypair;
use crate::replay::ReplayGuard;
use crate::token::codec::{normalize_ascii, pad_ascii};
use crate::token::CodecError;

use super::error::ProtocolError;
use super::token_flow::PaymentProtocol;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Merchant-issued challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    /// Issue time, ms since epoch. Also the replay-window timestamp for the
    /// matching response.
    pub timestamp: i64,
    /// Fresh 16-byte nonce the payer must echo and sign.
    #[serde(with = "b64")]
    pub nonce: [u8; NONCE_LENGTH],
    /// Merchant's Ed25519 public key.
    #[serde(with = "b64")]
    pub merchant_public_key: [u8; VERIFYING_KEY_LENGTH],
    /// Requested amount in minor units.
    pub amount_minor_units: i64,
    /// Currency code.
    pub currency: String,
    /// Merchant's location cell.
    pub location_cell: String,
    /// Free text shown to the payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Payer's signed answer to a [`Challenge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Echo of `Challenge::nonce`.
    #[serde(with = "b64")]
    pub challenge_nonce: [u8; NONCE_LENGTH],
    /// Payer's Ed25519 public key.
    #[serde(with = "b64")]
    pub user_public_key: [u8; VERIFYING_KEY_LENGTH],
    /// Payer's own location cell.
    pub user_location_cell: String,
    /// Ed25519 over SHA-256 of the response signable bytes.
    #[serde(with = "b64")]
    pub signature: [u8; SIGNATURE_LENGTH],
    /// `nonce(12) ‖ ciphertext ‖ tag(16)`.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "b64_opt")]
    pub encrypted_breadcrumb: Option<Vec<u8>>,
}

macro_rules! canonical_json {
    ($ty:ty) => {
        impl $ty {
            /// Canonical JSON bytes: sorted keys, no whitespace.
            pub fn to_canonical_json(&self) -> Result<Vec<u8>, ProtocolError> {
                let value = serde_json::to_value(self)?;
                Ok(serde_json::to_vec(&value)?)
            }

            /// Parse a JSON body. Key order doesn't matter on input.
            pub fn from_json(bytes: &[u8]) -> Result<Self, ProtocolError> {
                Ok(serde_json::from_slice(bytes)?)
            }
        }
    };
}

canonical_json!(Challenge);
canonical_json!(Response);

/// The bytes a response signature covers:
/// `challenge_nonce ‖ user_public_key ‖ pad(user_location_cell, 15) ‖ ts BE`.
pub fn response_signable_bytes(
    challenge_nonce: &[u8; NONCE_LENGTH],
    user_public_key: &[u8; VERIFYING_KEY_LENGTH],
    user_location_cell: &str,
    challenge_timestamp: i64,
) -> Result<Vec<u8>, CodecError> {
    let capacity = NONCE_LENGTH + VERIFYING_KEY_LENGTH + LOCATION_CELL_LENGTH + 8;
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(challenge_nonce);
    out.extend_from_slice(user_public_key);
    out.extend_from_slice(&pad_ascii(
        user_location_cell,
        LOCATION_CELL_LENGTH,
        "user_location_cell",
    )?);
    out.extend_from_slice(&challenge_timestamp.to_be_bytes());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Orchestrator operations
// ---------------------------------------------------------------------------

impl PaymentProtocol {
    /// Build a challenge with a fresh nonce and the current time.
    pub fn issue_challenge(
        &self,
        merchant_public_key: &[u8; VERIFYING_KEY_LENGTH],
        amount_minor_units: i64,
        currency: &str,
        location_cell: &str,
        memo: Option<&str>,
    ) -> Challenge {
        let challenge = Challenge {
            timestamp: self.clock.now_millis(),
            nonce: self.engine.protocol_nonce(),
            merchant_public_key: *merchant_public_key,
            amount_minor_units,
            currency: currency.to_string(),
            location_cell: location_cell.to_string(),
            memo: memo.map(str::to_string),
        };
        info!(
            nonce = %hex::encode(challenge.nonce),
            amount = amount_minor_units,
            currency,
            "issued challenge"
        );
        challenge
    }

    /// Answer `challenge`, optionally sealing a breadcrumb for the merchant.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Argument`] for a breadcrumb without a key,
    /// [`ProtocolError::Codec`] for a non-ASCII location cell.
    pub fn sign_response(
        &self,
        challenge: &Challenge,
        user_keys: &SigningKeypair,
        user_location_cell: &str,
        breadcrumb: Option<&[u8]>,
        encryption_key: Option<&[u8; AEAD_KEY_LENGTH]>,
    ) -> Result<Response, ProtocolError> {
        let user_location_cell =
            normalize_ascii(user_location_cell, LOCATION_CELL_LENGTH, "user_location_cell")?;

        let encrypted_breadcrumb = match (breadcrumb, encryption_key) {
            (Some(plaintext), Some(key)) => {
                Some(self.engine.encrypt(plaintext, key, None)?.to_bytes())
            }
            (Some(_), None) => {
                return Err(ProtocolError::Argument(
                    "breadcrumb supplied without an encryption key".into(),
                ))
            }
            (None, _) => None,
        };

        let user_public_key = user_keys.public_key_bytes();
        let signable = response_signable_bytes(
            &challenge.nonce,
            &user_public_key,
            &user_location_cell,
            challenge.timestamp,
        )?;
        let signature = self.engine.sign(&signable, user_keys);

        debug!(
            nonce = %hex::encode(challenge.nonce),
            breadcrumb = encrypted_breadcrumb.is_some(),
            "signed challenge response"
        );
        Ok(Response {
            challenge_nonce: challenge.nonce,
            user_public_key,
            user_location_cell,
            signature,
            encrypted_breadcrumb,
        })
    }

    /// Check a response against the challenge it claims to answer.
    ///
    /// Consumes the challenge nonce in `guard` once the echo matches, even
    /// if the signature then fails: a challenge is good for one attempt.
    pub fn verify_response(
        &self,
        challenge: &Challenge,
        response: &Response,
        guard: &ReplayGuard,
    ) -> bool {
        let nonce = hex::encode(challenge.nonce);

        if response.challenge_nonce != challenge.nonce {
            debug!(nonce = %nonce, "response rejected: nonce not echoed");
            return false;
        }
        if !guard.check_and_register(&challenge.nonce, challenge.timestamp) {
            debug!(nonce = %nonce, "response rejected: replay or stale challenge");
            return false;
        }

        let signable = match response_signable_bytes(
            &challenge.nonce,
            &response.user_public_key,
            &response.user_location_cell,
            challenge.timestamp,
        ) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(nonce = %nonce, "response rejected: unencodable location cell");
                return false;
            }
        };
        if !self
            .engine
            .verify(&signable, &response.signature, &response.user_public_key)
        {
            debug!(nonce = %nonce, "response rejected: invalid signature");
            return false;
        }

        info!(nonce = %nonce, "response accepted");
        true
    }

    /// Open a response's sealed breadcrumb.
    pub fn decrypt_breadcrumb(
        &self,
        response: &Response,
        key: &[u8; AEAD_KEY_LENGTH],
    ) -> Result<Vec<u8>, ProtocolError> {
        let bytes = response.encrypted_breadcrumb.as_deref().ok_or_else(|| {
            ProtocolError::Argument("response carries no breadcrumb".into())
        })?;
        let sealed = SealedBox::from_bytes(bytes)?;
        Ok(encryption::open(key, &sealed)?)
    }
}

// ---------------------------------------------------------------------------
// Base64 field adapters
// ---------------------------------------------------------------------------

mod b64 {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: AsRef<[u8]>,
    {
        serializer.serialize_str(&BASE64.encode(bytes.as_ref()))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let text = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(text.as_bytes()).map_err(de::Error::custom)?;
        let len = bytes.len();
        T::try_from(bytes)
            .map_err(|_| de::Error::invalid_length(len, &"a fixed-length byte string"))
    }
}

mod b64_opt {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|text| BASE64.decode(text.as_bytes()).map_err(de::Error::custom))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ProtocolConfig;
    use crate::crypto::CryptoEngine;
    use crate::exchange::ErrorKind;

    const NOW: i64 = 1_760_000_000_000;
    const KEY: [u8; 32] = [0x11; 32];

    fn setup() -> (PaymentProtocol, SigningKeypair, SigningKeypair) {
        let protocol = PaymentProtocol::new(
            CryptoEngine::seeded(3),
            Arc::new(ManualClock::new(NOW)),
            ProtocolConfig::default(),
        );
        let merchant = SigningKeypair::from_seed(&[1u8; 32]);
        let user = SigningKeypair::from_seed(&[2u8; 32]);
        (protocol, merchant, user)
    }

    fn challenge(protocol: &PaymentProtocol, merchant: &SigningKeypair) -> Challenge {
        protocol.issue_challenge(
            &merchant.public_key_bytes(),
            2500,
            "EUR",
            "891f8a2820fffff",
            Some("Table 4"),
        )
    }

    #[test]
    fn test_valid_response_accepted_once() {
        let (protocol, merchant, user) = setup();
        let guard = protocol.replay_guard();
        let challenge = challenge(&protocol, &merchant);
        let response = protocol
            .sign_response(&challenge, &user, "891f8a2820fffff", None, None)
            .unwrap();

        assert!(protocol.verify_response(&challenge, &response, &guard));
        assert!(!protocol.verify_response(&challenge, &response, &guard));
    }

    #[test]
    fn test_altered_user_key_rejected() {
        let (protocol, merchant, user) = setup();
        let challenge = challenge(&protocol, &merchant);
        let mut response = protocol
            .sign_response(&challenge, &user, "891f8a2820fffff", None, None)
            .unwrap();
        response.user_public_key = merchant.public_key_bytes();
        assert!(!protocol.verify_response(&challenge, &response, &protocol.replay_guard()));
    }

    #[test]
    fn test_altered_cell_rejected() {
        let (protocol, merchant, user) = setup();
        let challenge = challenge(&protocol, &merchant);
        let mut response = protocol
            .sign_response(&challenge, &user, "891f8a2820fffff", None, None)
            .unwrap();
        response.user_location_cell = "891f8a2820ffffe".into();
        assert!(!protocol.verify_response(&challenge, &response, &protocol.replay_guard()));
    }

    #[test]
    fn test_response_to_other_challenge_rejected() {
        let (protocol, merchant, user) = setup();
        let first = challenge(&protocol, &merchant);
        let second = challenge(&protocol, &merchant);
        assert_ne!(first.nonce, second.nonce);

        let response = protocol
            .sign_response(&first, &user, "891f8a2820fffff", None, None)
            .unwrap();
        let guard = protocol.replay_guard();
        assert!(!protocol.verify_response(&second, &response, &guard));
        // A mismatched echo doesn't consume anything.
        assert!(guard.is_empty());
    }

    #[test]
    fn test_signed_bytes_layout() {
        let bytes = response_signable_bytes(&[7u8; 16], &[8u8; 32], "abc", 0x0102).unwrap();
        assert_eq!(bytes.len(), 16 + 32 + 15 + 8);
        assert_eq!(&bytes[48..51], b"abc");
        assert_eq!(&bytes[51..63], &[b' '; 12]);
        assert_eq!(&bytes[63..], &0x0102i64.to_be_bytes());
    }

    #[test]
    fn test_breadcrumb_roundtrip() {
        let (protocol, merchant, user) = setup();
        let challenge = challenge(&protocol, &merchant);
        let response = protocol
            .sign_response(&challenge, &user, "cell", Some(b"visited aisle 7"), Some(&KEY))
            .unwrap();
        assert_eq!(
            protocol.decrypt_breadcrumb(&response, &KEY).unwrap(),
            b"visited aisle 7"
        );
        assert_eq!(
            protocol.decrypt_breadcrumb(&response, &[0u8; 32]).unwrap_err().kind(),
            ErrorKind::Authentication
        );
    }

    #[test]
    fn test_breadcrumb_without_key_is_argument_error() {
        let (protocol, merchant, user) = setup();
        let challenge = challenge(&protocol, &merchant);
        let err = protocol
            .sign_response(&challenge, &user, "cell", Some(b"x"), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_canonical_json_sorted_and_compact() {
        let challenge = Challenge {
            timestamp: 5,
            nonce: [0u8; 16],
            merchant_public_key: [0u8; 32],
            amount_minor_units: 2500,
            currency: "EUR".into(),
            location_cell: "c".into(),
            memo: None,
        };
        let json = String::from_utf8(challenge.to_canonical_json().unwrap()).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"amountMinorUnits":2500,"currency":"EUR","locationCell":"c","#,
                r#""merchantPublicKey":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=","#,
                r#""nonce":"AAAAAAAAAAAAAAAAAAAAAA==","timestamp":5}"#
            )
        );
        assert_eq!(Challenge::from_json(json.as_bytes()).unwrap(), challenge);
    }

    #[test]
    fn test_response_json_roundtrip_and_optional_field() {
        let (protocol, merchant, user) = setup();
        let challenge = challenge(&protocol, &merchant);

        let plain = protocol
            .sign_response(&challenge, &user, "cell", None, None)
            .unwrap();
        let json = plain.to_canonical_json().unwrap();
        assert!(!String::from_utf8_lossy(&json).contains("encryptedBreadcrumb"));
        assert_eq!(Response::from_json(&json).unwrap(), plain);

        let sealed = protocol
            .sign_response(&challenge, &user, "cell", Some(b"b"), Some(&KEY))
            .unwrap();
        let json = sealed.to_canonical_json().unwrap();
        assert_eq!(Response::from_json(&json).unwrap(), sealed);
    }

    #[test]
    fn test_wrong_length_base64_rejected() {
        let json = br#"{"challengeNonce":"AAAA","userPublicKey":"AAAA","userLocationCell":"c","signature":"AAAA"}"#;
        let err = Response::from_json(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }
}
