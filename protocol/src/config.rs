//! # Protocol Configuration & Constants
//!
//! Every magic number in TapAuth lives here. If you're hardcoding a field
//! width somewhere else, you're doing it wrong: the token layout, the
//! record header bits and the replay window all hang off these values.
//!
//! Constants that define the wire format are `const`. Parameters that a
//! deployment may reasonably tune (replay window, proximity resolution) live
//! in [`ProtocolConfig`], which round-trips through serde so the terminal
//! binary can load it from a JSON file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version string, reported by the terminal binary.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Token format version byte written at offset 0 of every payment token.
/// Bump on any layout change. Decoders key off this byte, not the crate version.
pub const TOKEN_VERSION: u8 = 1;

/// HKDF `info` string for session key derivation. Versioned so that a
/// future KDF change can never silently derive the same key as v1.
pub const SESSION_KEY_CONTEXT: &[u8] = b"tapauth/v1/session-key";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 seed (private key) length in bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// X25519 private and public key length in bytes.
pub const AGREEMENT_KEY_LENGTH: usize = 32;

/// Derived session key length: exactly one ChaCha20-Poly1305 key.
pub const SESSION_KEY_LENGTH: usize = 32;

/// ChaCha20-Poly1305 key length in bytes.
pub const AEAD_KEY_LENGTH: usize = 32;

/// ChaCha20-Poly1305 nonce length. 96 bits, the IETF variant.
pub const AEAD_NONCE_LENGTH: usize = 12;

/// Poly1305 authentication tag length, appended to every ciphertext.
pub const AEAD_TAG_LENGTH: usize = 16;

/// Protocol nonce length (tokens and challenges). 128 bits of randomness
/// is plenty for a replay window measured in minutes.
pub const NONCE_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Token Layout
// ---------------------------------------------------------------------------

/// Width of the ASCII currency code field (ISO 4217 style, e.g. "EUR").
pub const CURRENCY_LENGTH: usize = 3;

/// Width of the ASCII location cell field (e.g. a 15-char hex H3 index).
pub const LOCATION_CELL_LENGTH: usize = 15;

/// Width of the big-endian length prefix in front of an encrypted payload.
pub const PAYLOAD_LENGTH_FIELD: usize = 2;

/// Offset of the flags byte.
pub const OFFSET_FLAGS: usize = 1;
/// Offset of the 8-byte big-endian timestamp.
pub const OFFSET_TIMESTAMP: usize = 2;
/// Offset of the 16-byte nonce.
pub const OFFSET_NONCE: usize = OFFSET_TIMESTAMP + 8;
/// Offset of the signer's Ed25519 public key.
pub const OFFSET_SIGNER_KEY: usize = OFFSET_NONCE + NONCE_LENGTH;
/// Offset of the 8-byte big-endian amount.
pub const OFFSET_AMOUNT: usize = OFFSET_SIGNER_KEY + VERIFYING_KEY_LENGTH;
/// Offset of the currency code.
pub const OFFSET_CURRENCY: usize = OFFSET_AMOUNT + 8;
/// Offset of the location cell.
pub const OFFSET_LOCATION_CELL: usize = OFFSET_CURRENCY + CURRENCY_LENGTH;

/// Length of the fixed header: everything up to and including the
/// location cell. 1+1+8+16+32+8+3+15 = 84.
pub const TOKEN_HEADER_LENGTH: usize = OFFSET_LOCATION_CELL + LOCATION_CELL_LENGTH;

/// Smallest decodable token: fixed header plus signature. 84 + 64 = 148.
pub const MIN_TOKEN_LENGTH: usize = TOKEN_HEADER_LENGTH + SIGNATURE_LENGTH;

/// Largest encrypted payload the 2-byte length prefix can describe.
pub const MAX_ENCRYPTED_PAYLOAD_LENGTH: usize = u16::MAX as usize;

/// Largest plaintext that still fits once the AEAD nonce and tag are added.
pub const MAX_PLAINTEXT_PAYLOAD_LENGTH: usize =
    MAX_ENCRYPTED_PAYLOAD_LENGTH - AEAD_NONCE_LENGTH - AEAD_TAG_LENGTH;

/// Flag bit 0: the verifier must check the location cell.
pub const FLAG_GEO_AUTH: u8 = 0b0000_0001;
/// Flag bit 1: an encrypted payload (with length prefix) follows the header.
pub const FLAG_ENCRYPTED: u8 = 0b0000_0010;
/// Flag bit 2: the encrypted payload carries a memo.
pub const FLAG_HAS_MEMO: u8 = 0b0000_0100;

// ---------------------------------------------------------------------------
// Timing Constants
// ---------------------------------------------------------------------------

/// Maximum age of a nonce's timestamp before the replay guard refuses it.
pub const REPLAY_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// How far into the future a timestamp may be before we call it forged.
/// Phones are not NTP-disciplined validators; 30 seconds covers real drift.
pub const REPLAY_FUTURE_SKEW: Duration = Duration::from_secs(30);

/// Default proximity resolution for location matching. Cells are compared
/// on their first `resolution + 1` characters.
pub const DEFAULT_PROXIMITY_RESOLUTION: usize = 8;

// ---------------------------------------------------------------------------
// Record Framing
// ---------------------------------------------------------------------------

/// Media type carried by payment-token records.
pub const MEDIA_TYPE_TOKEN: &str = "application/vnd.tapauth.token";

/// Media type carried by challenge records.
pub const MEDIA_TYPE_CHALLENGE: &str = "application/vnd.tapauth.challenge";

/// Media type carried by response records.
pub const MEDIA_TYPE_RESPONSE: &str = "application/vnd.tapauth.response";

/// Well-known record type for text records.
pub const RTD_TEXT: &[u8] = b"T";

/// Well-known record type for URI records.
pub const RTD_URI: &[u8] = b"U";

/// URI identifier codes, indexed by code. Code 0 means "no prefix".
pub const URI_PREFIXES: [&str; 5] = ["", "http://www.", "https://www.", "http://", "https://"];

/// Default language code written into text records.
pub const DEFAULT_TEXT_LANGUAGE: &str = "en";

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Tunable protocol parameters.
///
/// Every field has a sane default, so an empty JSON object (`{}`) is a valid
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Replay window: maximum nonce age in milliseconds.
    pub replay_max_age_ms: i64,
    /// Replay window: tolerated future clock skew in milliseconds.
    pub replay_future_skew_ms: i64,
    /// Prefix resolution used when the caller doesn't pick one.
    pub proximity_resolution: usize,
    /// Version byte stamped into issued tokens.
    pub token_version: u8,
    /// Language code for text records built by the terminal.
    pub text_language: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            replay_max_age_ms: REPLAY_MAX_AGE.as_millis() as i64,
            replay_future_skew_ms: REPLAY_FUTURE_SKEW.as_millis() as i64,
            proximity_resolution: DEFAULT_PROXIMITY_RESOLUTION,
            token_version: TOKEN_VERSION,
            text_language: DEFAULT_TEXT_LANGUAGE.to_string(),
        }
    }
}

impl ProtocolConfig {
    /// Parse a configuration from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_token_length_matches_field_widths() {
        // Re-derived by hand: version, flags, timestamp, nonce, key,
        // amount, currency, cell, signature.
        assert_eq!(MIN_TOKEN_LENGTH, 1 + 1 + 8 + 16 + 32 + 8 + 3 + 15 + 64);
        assert_eq!(MIN_TOKEN_LENGTH, 148);
        assert_eq!(TOKEN_HEADER_LENGTH, 84);
    }

    #[test]
    fn test_offsets_match_wire_layout() {
        assert_eq!(OFFSET_NONCE, 10);
        assert_eq!(OFFSET_SIGNER_KEY, 26);
        assert_eq!(OFFSET_AMOUNT, 58);
        assert_eq!(OFFSET_CURRENCY, 66);
        assert_eq!(OFFSET_LOCATION_CELL, 69);
    }

    #[test]
    fn test_flag_bits_are_distinct() {
        assert_eq!(FLAG_GEO_AUTH & FLAG_ENCRYPTED, 0);
        assert_eq!(FLAG_GEO_AUTH & FLAG_HAS_MEMO, 0);
        assert_eq!(FLAG_ENCRYPTED & FLAG_HAS_MEMO, 0);
    }

    #[test]
    fn test_timing_constants_sanity() {
        // Future skew wider than the whole window would make no sense.
        assert!(REPLAY_FUTURE_SKEW < REPLAY_MAX_AGE);
    }

    #[test]
    fn test_uri_prefix_table() {
        assert_eq!(URI_PREFIXES[0], "");
        assert_eq!(URI_PREFIXES[2], "https://www.");
        assert_eq!(URI_PREFIXES.len(), 5);
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config = ProtocolConfig::from_json("{}").unwrap();
        assert_eq!(config, ProtocolConfig::default());
        assert_eq!(config.replay_max_age_ms, 300_000);
        assert_eq!(config.replay_future_skew_ms, 30_000);
    }

    #[test]
    fn test_config_partial_override() {
        let config = ProtocolConfig::from_json(r#"{"proximity_resolution": 5}"#).unwrap();
        assert_eq!(config.proximity_resolution, 5);
        assert_eq!(config.token_version, TOKEN_VERSION);
    }
}
