//! # Token Issue & Verify
//!
//! The one-shot flow: the payer's device issues a signed [`PaymentToken`]
//! and the terminal verifies it on tap.
//!
//! ```text
//!   Payer device                          Terminal
//!   ────────────                          ────────
//!   issue_token(TokenRequest)
//!     ├─ fresh nonce + timestamp
//!     ├─ seal optional payload
//!     └─ sign SHA-256(prefix)   ── tap ──►  verify_token
//!                                             ├─ Received
//!                                             ├─ SignatureChecked
//!                                             ├─ ReplayChecked  (nonce consumed)
//!                                             └─ LocationChecked → Accepted
//! ```
//!
//! Verification is a short-circuiting pipeline. The first failing stage
//! decides the [`RejectReason`]; later stages never run. A token whose
//! signature is bad never touches the replay guard, so a forged token can't
//! burn a legitimate nonce.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::{
    ProtocolConfig, AEAD_KEY_LENGTH, CURRENCY_LENGTH, LOCATION_CELL_LENGTH, SIGNATURE_LENGTH,
};
use crate::crypto::encryption::{self, SealedBox};
use crate::crypto::{CryptoEngine, SigningKeypair};
use crate::replay::ReplayGuard;
use crate::token::codec::normalize_ascii;
use crate::token::{self, PaymentToken, TokenFlags};

use super::error::ProtocolError;
use super::verdict::{location_matches, RejectReason, VerificationStage, Verdict};

// ---------------------------------------------------------------------------
// Token Request
// ---------------------------------------------------------------------------

/// Everything the issuer decides about a token. Nonce, timestamp and
/// signature are filled in by [`PaymentProtocol::issue_token`].
///
/// ```
/// use tapauth_protocol::exchange::TokenRequest;
///
/// let request = TokenRequest::new(2500, "EUR", "891f8a2820fffff").with_geo_auth();
/// assert!(request.require_geo_auth);
/// ```
#[derive(Clone, Copy)]
pub struct TokenRequest<'a> {
    /// Amount in minor units. Must not be negative.
    pub amount_minor_units: i64,
    /// ASCII currency code; truncated to 3 characters.
    pub currency: &'a str,
    /// ASCII location cell; truncated to 15 characters.
    pub location_cell: &'a str,
    /// Ask the verifier to check the location cell.
    pub require_geo_auth: bool,
    /// Plaintext to seal into the token.
    pub payload: Option<&'a [u8]>,
    /// Key for sealing `payload`. Required when `payload` is set.
    pub encryption_key: Option<&'a [u8; AEAD_KEY_LENGTH]>,
    /// Mark the sealed payload as containing a memo.
    pub has_memo: bool,
}

impl<'a> TokenRequest<'a> {
    /// Plain, unencrypted request with no geo-auth.
    pub fn new(amount_minor_units: i64, currency: &'a str, location_cell: &'a str) -> Self {
        Self {
            amount_minor_units,
            currency,
            location_cell,
            require_geo_auth: false,
            payload: None,
            encryption_key: None,
            has_memo: false,
        }
    }

    /// Require the verifier to check the location cell.
    pub fn with_geo_auth(mut self) -> Self {
        self.require_geo_auth = true;
        self
    }

    /// Seal `payload` under `key` into the token.
    pub fn with_encrypted_payload(
        mut self,
        payload: &'a [u8],
        key: &'a [u8; AEAD_KEY_LENGTH],
    ) -> Self {
        self.payload = Some(payload);
        self.encryption_key = Some(key);
        self
    }

    /// Flag the sealed payload as a memo.
    pub fn with_memo(mut self) -> Self {
        self.has_memo = true;
        self
    }
}

impl fmt::Debug for TokenRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("amount_minor_units", &self.amount_minor_units)
            .field("currency", &self.currency)
            .field("location_cell", &self.location_cell)
            .field("require_geo_auth", &self.require_geo_auth)
            .field("payload_len", &self.payload.map(<[u8]>::len))
            .field("encryption_key", &self.encryption_key.map(|_| "<redacted>"))
            .field("has_memo", &self.has_memo)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Protocol Orchestrator
// ---------------------------------------------------------------------------

/// Stateless protocol driver.
///
/// Holds the crypto engine, a clock and the tunable parameters. The only
/// mutable state in the protocol, the replay table, lives in a separate
/// [`ReplayGuard`] passed into each verify call, so one `PaymentProtocol`
/// can be shared freely across threads.
#[derive(Clone)]
pub struct PaymentProtocol {
    pub(super) engine: CryptoEngine,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: ProtocolConfig,
}

impl PaymentProtocol {
    /// Build a protocol from explicit collaborators.
    pub fn new(engine: CryptoEngine, clock: Arc<dyn Clock>, config: ProtocolConfig) -> Self {
        Self {
            engine,
            clock,
            config,
        }
    }

    /// OS randomness, the system clock, default parameters.
    pub fn with_defaults() -> Self {
        Self::new(
            CryptoEngine::with_os_rng(),
            Arc::new(SystemClock),
            ProtocolConfig::default(),
        )
    }

    /// The crypto engine in use.
    pub fn engine(&self) -> &CryptoEngine {
        &self.engine
    }

    /// The active parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Current protocol time, ms since epoch.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// A fresh replay guard using this protocol's clock and window.
    pub fn replay_guard(&self) -> ReplayGuard {
        ReplayGuard::from_config(&self.config, self.clock.clone())
    }

    /// Issue and sign a token.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Argument`] for a negative amount, a payload with no
    ///   key, or a memo flag with no payload.
    /// - [`ProtocolError::Codec`] for non-ASCII currency/cell text or a
    ///   payload too large for the 2-byte length field.
    pub fn issue_token(
        &self,
        signer: &SigningKeypair,
        request: &TokenRequest<'_>,
    ) -> Result<PaymentToken, ProtocolError> {
        if request.amount_minor_units < 0 {
            return Err(ProtocolError::Argument(format!(
                "amount must not be negative, got {}",
                request.amount_minor_units
            )));
        }
        if request.has_memo && request.payload.is_none() {
            return Err(ProtocolError::Argument(
                "memo flag requires an encrypted payload".into(),
            ));
        }

        let encrypted_payload = match (request.payload, request.encryption_key) {
            (Some(plaintext), Some(key)) => {
                let sealed = self.engine.encrypt(plaintext, key, None)?;
                Some(sealed.to_bytes())
            }
            (Some(_), None) => {
                return Err(ProtocolError::Argument(
                    "payload supplied without an encryption key".into(),
                ))
            }
            (None, _) => None,
        };

        let flags = TokenFlags::default()
            .with_geo_auth(request.require_geo_auth)
            .with_encrypted(encrypted_payload.is_some())
            .with_memo(request.has_memo);

        let mut token = PaymentToken {
            version: self.config.token_version,
            flags,
            timestamp: self.clock.now_millis(),
            nonce: self.engine.protocol_nonce(),
            signer_public_key: signer.public_key_bytes(),
            amount_minor_units: request.amount_minor_units,
            currency: normalize_ascii(request.currency, CURRENCY_LENGTH, "currency")?,
            location_cell: normalize_ascii(
                request.location_cell,
                LOCATION_CELL_LENGTH,
                "location_cell",
            )?,
            encrypted_payload,
            signature: [0u8; SIGNATURE_LENGTH],
        };

        let prefix = token::signable_prefix(&token)?;
        token.signature = self.engine.sign(&prefix, signer);

        info!(
            nonce = %token.nonce_hex(),
            amount = token.amount_minor_units,
            currency = %token.currency,
            flags = ?token.flags,
            "issued payment token"
        );
        Ok(token)
    }

    /// Run a token through the verification pipeline.
    ///
    /// `expected_cell` is only consulted when the token asks for geo-auth.
    /// `proximity_resolution` defaults to the configured value (8).
    ///
    /// Never errors: every failure is a [`Verdict::Rejected`]. An accepted
    /// token's nonce is consumed in `guard`.
    pub fn verify_token(
        &self,
        token: &PaymentToken,
        guard: &ReplayGuard,
        expected_cell: Option<&str>,
        proximity_resolution: Option<usize>,
    ) -> Verdict {
        let nonce = token.nonce_hex();
        debug!(nonce = %nonce, stage = %VerificationStage::Received, "verifying token");

        // A token that can't be re-encoded can't carry a valid signature.
        let signature_ok = match token::signable_prefix(token) {
            Ok(prefix) => {
                self.engine
                    .verify(&prefix, &token.signature, &token.signer_public_key)
            }
            Err(_) => false,
        };
        if !signature_ok {
            return reject(&nonce, VerificationStage::Received, RejectReason::InvalidSignature);
        }
        debug!(nonce = %nonce, stage = %VerificationStage::SignatureChecked, "signature ok");

        if !guard.check_and_register(&token.nonce, token.timestamp) {
            return reject(
                &nonce,
                VerificationStage::SignatureChecked,
                RejectReason::ReplayOrBadTimestamp,
            );
        }
        debug!(nonce = %nonce, stage = %VerificationStage::ReplayChecked, "nonce consumed");

        if token.flags.geo_auth_required() {
            if let Some(expected) = expected_cell {
                let resolution = proximity_resolution.unwrap_or(self.config.proximity_resolution);
                if !location_matches(&token.location_cell, expected, resolution) {
                    return reject(
                        &nonce,
                        VerificationStage::ReplayChecked,
                        RejectReason::LocationMismatch,
                    );
                }
            }
        }
        debug!(nonce = %nonce, stage = %VerificationStage::LocationChecked, "location ok");

        info!(nonce = %nonce, amount = token.amount_minor_units, "token accepted");
        Verdict::Accepted
    }

    /// Decode `bytes` and verify the result.
    ///
    /// Decode failures are errors (the bytes aren't a token at all);
    /// everything after that is a verdict.
    pub fn verify_token_bytes(
        &self,
        bytes: &[u8],
        guard: &ReplayGuard,
        expected_cell: Option<&str>,
        proximity_resolution: Option<usize>,
    ) -> Result<Verdict, ProtocolError> {
        let token = token::decode(bytes)?;
        Ok(self.verify_token(&token, guard, expected_cell, proximity_resolution))
    }

    /// Open a token's sealed payload.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Argument`] if the token has no payload;
    /// [`CryptoError::AuthenticationFailed`](crate::crypto::CryptoError::AuthenticationFailed)
    /// for a wrong key or a tampered payload.
    pub fn decrypt_token_payload(
        &self,
        token: &PaymentToken,
        key: &[u8; AEAD_KEY_LENGTH],
    ) -> Result<Vec<u8>, ProtocolError> {
        let sealed = match (&token.encrypted_payload, token.flags.is_encrypted()) {
            (Some(bytes), true) => SealedBox::from_bytes(bytes)?,
            _ => {
                return Err(ProtocolError::Argument(
                    "token carries no encrypted payload".into(),
                ))
            }
        };
        Ok(encryption::open(key, &sealed)?)
    }
}

impl Default for PaymentProtocol {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for PaymentProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentProtocol")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn reject(nonce: &str, reached: VerificationStage, reason: RejectReason) -> Verdict {
    debug!(nonce = %nonce, stage = %reached, %reason, "token rejected");
    Verdict::Rejected(reason)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
