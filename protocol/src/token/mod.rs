//! # Payment Tokens
//!
//! The authorization artifact that crosses the tap. A token is built once by
//! the issuing side, signed over its [signable prefix](codec::signable_prefix),
//! and never mutated afterwards.
//!
//! ```text
//! 0   version        1
//! 1   flags          1   bit0 geo-auth, bit1 encrypted, bit2 has-memo
//! 2   timestamp      8   i64 BE, ms since epoch
//! 10  nonce          16
//! 26  signerPubKey   32  Ed25519
//! 58  amount         8   i64 BE, minor units
//! 66  currency       3   ASCII, space-padded
//! 69  locationCell   15  ASCII, space-padded
//! 84  [encLen 2 BE + encPayload]   iff flags.bit1
//! ..  signature      64  always the final 64 bytes
//! ```

pub mod codec;

use std::fmt;

use crate::config::{
    FLAG_ENCRYPTED, FLAG_GEO_AUTH, FLAG_HAS_MEMO, NONCE_LENGTH, SIGNATURE_LENGTH,
    VERIFYING_KEY_LENGTH,
};

pub use codec::{decode, encode, signable_prefix, CodecError};

/// The flags byte. Unknown bits are carried through untouched so a v1
/// decoder doesn't mangle (and thereby invalidate the signature of) a token
/// from a newer issuer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenFlags(u8);

impl TokenFlags {
    /// Wrap a raw flags byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// The raw flags byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Bit 0: the verifier must check the location cell.
    pub const fn geo_auth_required(self) -> bool {
        self.0 & FLAG_GEO_AUTH != 0
    }

    /// Bit 1: a length-prefixed encrypted payload follows the header.
    pub const fn is_encrypted(self) -> bool {
        self.0 & FLAG_ENCRYPTED != 0
    }

    /// Bit 2: the encrypted payload carries a memo.
    pub const fn has_memo(self) -> bool {
        self.0 & FLAG_HAS_MEMO != 0
    }

    /// Set or clear bit 0.
    pub const fn with_geo_auth(self, on: bool) -> Self {
        self.set(FLAG_GEO_AUTH, on)
    }

    /// Set or clear bit 1.
    pub const fn with_encrypted(self, on: bool) -> Self {
        self.set(FLAG_ENCRYPTED, on)
    }

    /// Set or clear bit 2.
    pub const fn with_memo(self, on: bool) -> Self {
        self.set(FLAG_HAS_MEMO, on)
    }

    const fn set(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

impl fmt::Debug for TokenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TokenFlags({:#010b}: geo={}, enc={}, memo={})",
            self.0,
            self.geo_auth_required(),
            self.is_encrypted(),
            self.has_memo()
        )
    }
}

/// A signed payment authorization.
///
/// `currency` and `location_cell` hold the *trimmed* text; padding to the
/// fixed wire widths happens in the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentToken {
    /// Token format version.
    pub version: u8,
    /// Feature bits.
    pub flags: TokenFlags,
    /// Issue time, ms since epoch.
    pub timestamp: i64,
    /// Fresh random nonce; the replay guard's key.
    pub nonce: [u8; NONCE_LENGTH],
    /// Ed25519 public key of the issuer.
    pub signer_public_key: [u8; VERIFYING_KEY_LENGTH],
    /// Amount in minor units (cents, for EUR).
    pub amount_minor_units: i64,
    /// 3-letter ASCII currency code.
    pub currency: String,
    /// ASCII location cell identifier, at most 15 characters.
    pub location_cell: String,
    /// `nonce(12) ‖ ciphertext ‖ tag(16)`, present iff `flags.is_encrypted()`.
    pub encrypted_payload: Option<Vec<u8>>,
    /// Ed25519 signature over the signable prefix.
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl PaymentToken {
    /// `true` if the signature field is still all zeros.
    pub fn is_unsigned(&self) -> bool {
        self.signature.iter().all(|b| *b == 0)
    }

    /// Hex of the nonce, for logs. Nonces are public.
    pub fn nonce_hex(&self) -> String {
        hex::encode(self.nonce)
    }
}
