//! One-tap envelopes: what actually goes over the air.
//!
//! A tap carries one record message. This module maps the protocol's
//! payloads to records by media type and back, so a terminal can ship a
//! challenge plus a receipt URI (or a token plus a thank-you note) in a
//! single exchange.
//!
//! | Payload      | Record                                      |
//! |--------------|---------------------------------------------|
//! | token        | media `application/vnd.tapauth.token`       |
//! | challenge    | media `application/vnd.tapauth.challenge`   |
//! | response     | media `application/vnd.tapauth.response`    |
//! | text         | well-known `T`                              |
//! | URI          | well-known `U`                              |
//! | anything else| passed through untouched                    |

use tracing::trace;

use crate::config::{
    MEDIA_TYPE_CHALLENGE, MEDIA_TYPE_RESPONSE, MEDIA_TYPE_TOKEN, RTD_TEXT, RTD_URI,
};
use crate::ndef::{self, Record, TextRecord, UriRecord};
use crate::token::{self, PaymentToken};

use super::challenge::{Challenge, Response};
use super::error::ProtocolError;

/// A decoded record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapPayload {
    /// A payment token.
    Token(PaymentToken),
    /// A merchant challenge.
    Challenge(Challenge),
    /// A signed challenge response.
    Response(Response),
    /// A text record.
    Text(TextRecord),
    /// A URI record.
    Uri(UriRecord),
    /// Any record we don't interpret.
    Opaque(Record),
}

impl TapPayload {
    /// Short label for logs and the terminal's `inspect` output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::Challenge(_) => "challenge",
            Self::Response(_) => "response",
            Self::Text(_) => "text",
            Self::Uri(_) => "uri",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Frame this payload as a record.
    pub fn to_record(&self) -> Result<Record, ProtocolError> {
        Ok(match self {
            Self::Token(t) => Record::media(MEDIA_TYPE_TOKEN, token::encode(t)?),
            Self::Challenge(c) => Record::media(MEDIA_TYPE_CHALLENGE, c.to_canonical_json()?),
            Self::Response(r) => Record::media(MEDIA_TYPE_RESPONSE, r.to_canonical_json()?),
            Self::Text(t) => t.to_record()?,
            Self::Uri(u) => u.to_record(),
            Self::Opaque(r) => r.clone(),
        })
    }

    /// Interpret a record. Unknown types come back as [`TapPayload::Opaque`];
    /// a known type with a malformed payload is an error.
    pub fn from_record(record: Record) -> Result<Self, ProtocolError> {
        let payload = if record.is_media_type(MEDIA_TYPE_TOKEN) {
            Self::Token(token::decode(&record.payload)?)
        } else if record.is_media_type(MEDIA_TYPE_CHALLENGE) {
            Self::Challenge(Challenge::from_json(&record.payload)?)
        } else if record.is_media_type(MEDIA_TYPE_RESPONSE) {
            Self::Response(Response::from_json(&record.payload)?)
        } else if record.is_well_known(RTD_TEXT) {
            Self::Text(TextRecord::from_record(&record)?)
        } else if record.is_well_known(RTD_URI) {
            Self::Uri(UriRecord::from_record(&record)?)
        } else {
            Self::Opaque(record)
        };
        Ok(payload)
    }
}

impl From<PaymentToken> for TapPayload {
    fn from(token: PaymentToken) -> Self {
        Self::Token(token)
    }
}

impl From<Challenge> for TapPayload {
    fn from(challenge: Challenge) -> Self {
        Self::Challenge(challenge)
    }
}

impl From<Response> for TapPayload {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Frame `payloads` as one message.
pub fn to_message_bytes(payloads: &[TapPayload]) -> Result<Vec<u8>, ProtocolError> {
    let records = payloads
        .iter()
        .map(TapPayload::to_record)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ndef::build_message(&records)?)
}

/// Parse one message and interpret every record in it.
pub fn from_message_bytes(bytes: &[u8]) -> Result<Vec<TapPayload>, ProtocolError> {
    let records = ndef::parse_message(bytes)?;
    let payloads = records
        .into_iter()
        .map(TapPayload::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    trace!(
        kinds = ?payloads.iter().map(TapPayload::kind).collect::<Vec<_>>(),
        "parsed tap message"
    );
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ProtocolConfig;
    use crate::crypto::{CryptoEngine, SigningKeypair};
    use crate::exchange::{ErrorKind, PaymentProtocol, TokenRequest};
    use crate::ndef::TypeNameFormat;

    fn protocol() -> PaymentProtocol {
        PaymentProtocol::new(
            CryptoEngine::seeded(11),
            Arc::new(ManualClock::new(1_760_000_000_000)),
            ProtocolConfig::default(),
        )
    }

    #[test]
    fn test_mixed_message_roundtrip() {
        let protocol = protocol();
        let signer = SigningKeypair::from_seed(&[4u8; 32]);
        let token = protocol
            .issue_token(&signer, &TokenRequest::new(2500, "EUR", "891f8a2820fffff"))
            .unwrap();
        let challenge =
            protocol.issue_challenge(&signer.public_key_bytes(), 100, "EUR", "cell", None);
        let external = Record::new(TypeNameFormat::External, "example.com:loyalty", vec![1, 2]);

        let payloads = vec![
            TapPayload::from(token),
            TapPayload::from(challenge),
            TapPayload::Text(TextRecord::new("en", "Thank you")),
            TapPayload::Uri(UriRecord::new("https://example.com/r/1")),
            TapPayload::Opaque(external),
        ];
        let bytes = to_message_bytes(&payloads).unwrap();
        let parsed = from_message_bytes(&bytes).unwrap();
        assert_eq!(parsed, payloads);
        assert_eq!(
            parsed.iter().map(TapPayload::kind).collect::<Vec<_>>(),
            ["token", "challenge", "text", "uri", "opaque"]
        );
    }

    #[test]
    fn test_token_record_uses_media_type() {
        let protocol = protocol();
        let signer = SigningKeypair::from_seed(&[4u8; 32]);
        let token = protocol
            .issue_token(&signer, &TokenRequest::new(1, "EUR", "c"))
            .unwrap();
        let record = TapPayload::from(token.clone()).to_record().unwrap();
        assert!(record.is_media_type(MEDIA_TYPE_TOKEN));
        assert_eq!(record.payload, token::encode(&token).unwrap());
    }

    #[test]
    fn test_malformed_known_payload_is_format_error() {
        let record = Record::media(MEDIA_TYPE_TOKEN, vec![0u8; 20]);
        let bytes = ndef::build_message(&[record]).unwrap();
        assert_eq!(from_message_bytes(&bytes).unwrap_err().kind(), ErrorKind::Format);

        let record = Record::media(MEDIA_TYPE_CHALLENGE, b"not json".to_vec());
        let bytes = ndef::build_message(&[record]).unwrap();
        assert_eq!(from_message_bytes(&bytes).unwrap_err().kind(), ErrorKind::Format);
    }

    #[test]
    fn test_unknown_media_type_is_opaque() {
        let record = Record::media("image/png", vec![0x89, b'P', b'N', b'G']);
        let payload = TapPayload::from_record(record.clone()).unwrap();
        assert_eq!(payload, TapPayload::Opaque(record));
    }

    #[test]
    fn test_empty_payload_list_rejected() {
        assert_eq!(to_message_bytes(&[]).unwrap_err().kind(), ErrorKind::Format);
    }
}
