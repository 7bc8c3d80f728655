//! Error types for the protocol orchestrator.
//!
//! [`ProtocolError`] wraps every lower-layer error so callers only match on
//! one type. [`ErrorKind`] collapses it further into the three families a
//! terminal actually reacts to differently: garbage on the wire, a caller
//! bug, or tampering.
//!
//! Verification *outcomes* are not errors. A bad signature or a replayed
//! nonce produces a [`Verdict`](super::Verdict) or a `false`, never one of
//! these.

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::ndef::RecordError;
use crate::token::CodecError;

/// Coarse classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bytes that don't decode: truncated tokens, malformed records, bad JSON.
    Format,
    /// The caller passed something unusable (wrong key length, negative
    /// amount, payload without a key).
    Argument,
    /// An AEAD tag failed to verify.
    Authentication,
}

/// Errors returned by [`PaymentProtocol`](super::PaymentProtocol) and the
/// envelope helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Token encoding/decoding failed.
    #[error("token codec: {0}")]
    Codec(#[from] CodecError),

    /// Record framing failed.
    #[error("record framing: {0}")]
    Record(#[from] RecordError),

    /// A cryptographic primitive failed.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Invalid caller input not covered by a lower layer.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A challenge or response body couldn't be (de)serialized.
    #[error("serialization: {0}")]
    Serialization(String),
}

impl ProtocolError {
    /// Which family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(CodecError::NonAscii(_))
            | Self::Codec(CodecError::PayloadTooLarge(_))
            | Self::Codec(CodecError::PayloadWithoutFlag) => ErrorKind::Argument,
            Self::Codec(_) | Self::Record(_) | Self::Serialization(_) => ErrorKind::Format,
            Self::Crypto(e) if e.is_argument_error() => ErrorKind::Argument,
            Self::Crypto(CryptoError::AuthenticationFailed) => ErrorKind::Authentication,
            Self::Crypto(_) | Self::Argument(_) => ErrorKind::Argument,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
