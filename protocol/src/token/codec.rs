//! Bit-exact token encoding and decoding.
//!
//! The 2-byte payload length field is written only when the encrypted flag
//! is set *and* the payload is non-empty. An encrypted-flagged token with
//! no payload is therefore exactly 148 bytes, the same as a plain one.
//!
//! On decode, a flagged token with nothing between header and signature
//! carries no payload. Anything else between them must start with a length
//! field that accounts for the rest of the body exactly. Every other shape
//! is a [`CodecError`].

use thiserror::Error;

use crate::config::{
    CURRENCY_LENGTH, LOCATION_CELL_LENGTH, MAX_ENCRYPTED_PAYLOAD_LENGTH, MIN_TOKEN_LENGTH,
    NONCE_LENGTH, OFFSET_AMOUNT, OFFSET_CURRENCY, OFFSET_FLAGS, OFFSET_LOCATION_CELL,
    OFFSET_NONCE, OFFSET_SIGNER_KEY, OFFSET_TIMESTAMP, PAYLOAD_LENGTH_FIELD, SIGNATURE_LENGTH,
    TOKEN_HEADER_LENGTH, VERIFYING_KEY_LENGTH,
};

use super::{PaymentToken, TokenFlags};

/// Malformed token bytes, or a token that can't be put on the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Shorter than header + signature.
    #[error("token truncated: {len} bytes, need at least {min}")]
    Truncated {
        /// Bytes received.
        len: usize,
        /// Minimum decodable length.
        min: usize,
    },

    /// Encrypted flag set and a body present, but too short to hold the
    /// 2-byte length field.
    #[error("encrypted flag set but payload length field is missing")]
    MissingPayloadLength,

    /// A length field declaring zero bytes. An empty payload is encoded by
    /// omitting the field altogether.
    #[error("payload length field declares an empty payload")]
    EmptyPayloadLength,

    /// The declared payload length disagrees with the bytes present.
    #[error("payload length mismatch: declared {declared}, found {available}")]
    PayloadLengthMismatch {
        /// Length from the 2-byte field.
        declared: usize,
        /// Bytes actually between the length field and the signature.
        available: usize,
    },

    /// Bytes between header and signature with the encrypted flag clear.
    #[error("{0} unexpected bytes between header and signature")]
    TrailingBytes(usize),

    /// A fixed-width text field held non-ASCII bytes.
    #[error("field `{0}` is not ASCII")]
    NonAscii(&'static str),

    /// Payload too large for the 2-byte length prefix.
    #[error("encrypted payload of {0} bytes exceeds the 65535-byte limit")]
    PayloadTooLarge(usize),

    /// A payload is attached but the encrypted flag is clear, so it would
    /// not be covered by the signature.
    #[error("encrypted payload present but encrypted flag is clear")]
    PayloadWithoutFlag,
}

/// Encode a complete token, signature included.
pub fn encode(token: &PaymentToken) -> Result<Vec<u8>, CodecError> {
    let mut out = encode_unsigned(token)?;
    out.extend_from_slice(&token.signature);
    Ok(out)
}

/// The exact bytes the signature covers: `encode(token)` minus its last
/// 64 bytes.
pub fn signable_prefix(token: &PaymentToken) -> Result<Vec<u8>, CodecError> {
    encode_unsigned(token)
}

fn encode_unsigned(token: &PaymentToken) -> Result<Vec<u8>, CodecError> {
    let payload: &[u8] = match (&token.encrypted_payload, token.flags.is_encrypted()) {
        (Some(p), true) => p.as_slice(),
        (None, true) => &[],
        (Some(p), false) if !p.is_empty() => return Err(CodecError::PayloadWithoutFlag),
        (_, false) => &[],
    };
    if payload.len() > MAX_ENCRYPTED_PAYLOAD_LENGTH {
        return Err(CodecError::PayloadTooLarge(payload.len()));
    }

    let body_len = if payload.is_empty() {
        0
    } else {
        PAYLOAD_LENGTH_FIELD + payload.len()
    };
    let mut out = Vec::with_capacity(TOKEN_HEADER_LENGTH + body_len + SIGNATURE_LENGTH);

    out.push(token.version);
    out.push(token.flags.bits());
    out.extend_from_slice(&token.timestamp.to_be_bytes());
    out.extend_from_slice(&token.nonce);
    out.extend_from_slice(&token.signer_public_key);
    out.extend_from_slice(&token.amount_minor_units.to_be_bytes());
    out.extend_from_slice(&pad_ascii(&token.currency, CURRENCY_LENGTH, "currency")?);
    out.extend_from_slice(&pad_ascii(
        &token.location_cell,
        LOCATION_CELL_LENGTH,
        "location_cell",
    )?);
    debug_assert_eq!(out.len(), TOKEN_HEADER_LENGTH);

    if !payload.is_empty() {
        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        out.extend_from_slice(payload);
    }
    Ok(out)
}

/// Decode token bytes.
///
/// # Errors
///
/// Every structural problem is a [`CodecError`]; this never panics on
/// hostile input.
pub fn decode(bytes: &[u8]) -> Result<PaymentToken, CodecError> {
    if bytes.len() < MIN_TOKEN_LENGTH {
        return Err(CodecError::Truncated {
            len: bytes.len(),
            min: MIN_TOKEN_LENGTH,
        });
    }

    let flags = TokenFlags::from_bits(bytes[OFFSET_FLAGS]);
    let signature_start = bytes.len() - SIGNATURE_LENGTH;
    let body = &bytes[TOKEN_HEADER_LENGTH..signature_start];

    let encrypted_payload = if body.is_empty() {
        None
    } else if flags.is_encrypted() {
        if body.len() < PAYLOAD_LENGTH_FIELD {
            return Err(CodecError::MissingPayloadLength);
        }
        let declared = u16::from_be_bytes([body[0], body[1]]) as usize;
        if declared == 0 {
            return Err(CodecError::EmptyPayloadLength);
        }
        let available = body.len() - PAYLOAD_LENGTH_FIELD;
        if declared != available {
            return Err(CodecError::PayloadLengthMismatch {
                declared,
                available,
            });
        }
        Some(body[PAYLOAD_LENGTH_FIELD..].to_vec())
    } else {
        return Err(CodecError::TrailingBytes(body.len()));
    };

    Ok(PaymentToken {
        version: bytes[0],
        flags,
        timestamp: i64::from_be_bytes(array(&bytes[OFFSET_TIMESTAMP..OFFSET_NONCE])),
        nonce: array::<NONCE_LENGTH>(&bytes[OFFSET_NONCE..OFFSET_SIGNER_KEY]),
        signer_public_key: array::<VERIFYING_KEY_LENGTH>(&bytes[OFFSET_SIGNER_KEY..OFFSET_AMOUNT]),
        amount_minor_units: i64::from_be_bytes(array(&bytes[OFFSET_AMOUNT..OFFSET_CURRENCY])),
        currency: unpad_ascii(&bytes[OFFSET_CURRENCY..OFFSET_LOCATION_CELL], "currency")?,
        location_cell: unpad_ascii(
            &bytes[OFFSET_LOCATION_CELL..TOKEN_HEADER_LENGTH],
            "location_cell",
        )?,
        encrypted_payload,
        signature: array::<SIGNATURE_LENGTH>(&bytes[signature_start..]),
    })
}

/// Right-pad with spaces (or truncate) to exactly `width` bytes.
pub(crate) fn pad_ascii(
    value: &str,
    width: usize,
    field: &'static str,
) -> Result<Vec<u8>, CodecError> {
    if !value.is_ascii() {
        return Err(CodecError::NonAscii(field));
    }
    let mut out: Vec<u8> = value.bytes().take(width).collect();
    out.resize(width, b' ');
    Ok(out)
}

/// The text a field will decode back to once padded to `width`: truncated,
/// then trimmed. Issuers store this so a token equals its own round trip.
pub(crate) fn normalize_ascii(
    value: &str,
    width: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    unpad_ascii(&pad_ascii(value, width, field)?, field)
}

fn unpad_ascii(bytes: &[u8], field: &'static str) -> Result<String, CodecError> {
    if !bytes.is_ascii() {
        return Err(CodecError::NonAscii(field));
    }
    // ASCII is valid UTF-8, so the lossy path never actually replaces anything.
    Ok(String::from_utf8_lossy(bytes).trim().to_string())
}

fn array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    out
}
