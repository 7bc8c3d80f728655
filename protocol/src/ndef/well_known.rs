//! Well-known text (`T`) and URI (`U`) records.
//!
//! Text payload: `[status][language code][UTF-8 text]`, where the low six
//! status bits hold the language code length and bit 7 would mean UTF-16
//! (which we refuse).
//!
//! URI payload: `[prefix code][rest]`. Only the first five codes of the
//! RTD URI table are recognised (none, the two `www.` forms, bare http and
//! https); anything else is rejected on decode.

use serde::{Deserialize, Serialize};

use crate::config::{RTD_TEXT, RTD_URI, URI_PREFIXES};

use super::error::RecordError;
use super::record::Record;

const STATUS_UTF16: u8 = 0x80;
const STATUS_LANG_MASK: u8 = 0x3F;

/// A decoded text record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    /// IANA language code, e.g. `en`.
    pub language: String,
    /// The text itself.
    pub text: String,
}

impl TextRecord {
    /// Convenience constructor.
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }

    /// Build the framing record.
    pub fn to_record(&self) -> Result<Record, RecordError> {
        let lang = self.language.as_bytes();
        let too_long = lang.len() > STATUS_LANG_MASK as usize;
        if lang.is_empty() || too_long || !self.language.is_ascii() {
            return Err(RecordError::InvalidLanguageCode);
        }
        let mut payload = Vec::with_capacity(1 + lang.len() + self.text.len());
        payload.push(lang.len() as u8);
        payload.extend_from_slice(lang);
        payload.extend_from_slice(self.text.as_bytes());
        Ok(Record::well_known(RTD_TEXT, payload))
    }

    /// Decode a well-known `T` record.
    pub fn from_record(record: &Record) -> Result<Self, RecordError> {
        if !record.is_well_known(RTD_TEXT) {
            return Err(RecordError::WrongRecordType { expected: "T" });
        }
        let (&status, rest) = record
            .payload
            .split_first()
            .ok_or(RecordError::Truncated {
                offset: 0,
                needed: 1,
            })?;
        if status & STATUS_UTF16 != 0 {
            return Err(RecordError::Utf16NotSupported);
        }
        let lang_len = (status & STATUS_LANG_MASK) as usize;
        if lang_len == 0 {
            return Err(RecordError::InvalidLanguageCode);
        }
        if rest.len() < lang_len {
            return Err(RecordError::Truncated {
                offset: 1,
                needed: lang_len - rest.len(),
            });
        }
        let (lang, text) = rest.split_at(lang_len);
        if !lang.is_ascii() {
            return Err(RecordError::InvalidLanguageCode);
        }
        Ok(Self {
            language: String::from_utf8(lang.to_vec()).map_err(|_| RecordError::InvalidUtf8)?,
            text: String::from_utf8(text.to_vec()).map_err(|_| RecordError::InvalidUtf8)?,
        })
    }
}

/// A decoded URI record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriRecord {
    /// The full URI, prefix restored.
    pub uri: String,
}

impl UriRecord {
    /// Convenience constructor.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// The prefix code this URI will be abbreviated with: the longest
    /// matching table entry, or 0.
    pub fn prefix_code(&self) -> u8 {
        (1..URI_PREFIXES.len())
            .filter(|&code| self.uri.starts_with(URI_PREFIXES[code]))
            .max_by_key(|&code| URI_PREFIXES[code].len())
            .unwrap_or(0) as u8
    }

    /// Build the framing record.
    pub fn to_record(&self) -> Record {
        let code = self.prefix_code();
        let rest = &self.uri[URI_PREFIXES[code as usize].len()..];
        let mut payload = Vec::with_capacity(1 + rest.len());
        payload.push(code);
        payload.extend_from_slice(rest.as_bytes());
        Record::well_known(RTD_URI, payload)
    }

    /// Decode a well-known `U` record.
    pub fn from_record(record: &Record) -> Result<Self, RecordError> {
        if !record.is_well_known(RTD_URI) {
            return Err(RecordError::WrongRecordType { expected: "U" });
        }
        let (&code, rest) = record
            .payload
            .split_first()
            .ok_or(RecordError::Truncated {
                offset: 0,
                needed: 1,
            })?;
        let prefix = URI_PREFIXES
            .get(code as usize)
            .ok_or(RecordError::UnknownUriPrefix(code))?;
        let rest = std::str::from_utf8(rest).map_err(|_| RecordError::InvalidUtf8)?;
        Ok(Self {
            uri: format!("{prefix}{rest}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_layout() {
        let record = TextRecord::new("en", "Thanks!").to_record().unwrap();
        assert_eq!(record.record_type, b"T");
        assert_eq!(record.payload[0], 2);
        assert_eq!(&record.payload[1..3], b"en");
        assert_eq!(&record.payload[3..], b"Thanks!");
    }

    #[test]
    fn text_roundtrip_with_unicode() {
        let original = TextRecord::new("pt-BR", "Obrigado, volte sempre. Até logo!");
        let decoded = TextRecord::from_record(&original.to_record().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn text_empty_body_is_fine() {
        let decoded = TextRecord::from_record(&TextRecord::new("en", "").to_record().unwrap());
        assert_eq!(decoded.unwrap().text, "");
    }

    #[test]
    fn text_bad_language_rejected() {
        assert_eq!(
            TextRecord::new("", "x").to_record(),
            Err(RecordError::InvalidLanguageCode)
        );
        assert_eq!(
            TextRecord::new("x".repeat(64), "x").to_record(),
            Err(RecordError::InvalidLanguageCode)
        );
    }

    #[test]
    fn text_utf16_rejected() {
        let record = Record::well_known(b"T", vec![0x82, b'e', b'n', 0, b'h']);
        assert_eq!(
            TextRecord::from_record(&record),
            Err(RecordError::Utf16NotSupported)
        );
    }

    #[test]
    fn text_language_longer_than_payload_rejected() {
        let record = Record::well_known(b"T", vec![0x05, b'e', b'n']);
        assert!(matches!(
            TextRecord::from_record(&record),
            Err(RecordError::Truncated { .. })
        ));
    }

    #[test]
    fn uri_prefers_longest_prefix() {
        assert_eq!(UriRecord::new("https://www.example.com").prefix_code(), 2);
        assert_eq!(UriRecord::new("http://www.example.com").prefix_code(), 1);
        assert_eq!(UriRecord::new("https://example.com").prefix_code(), 4);
        assert_eq!(UriRecord::new("http://example.com").prefix_code(), 3);
        assert_eq!(UriRecord::new("mailto:shop@example.com").prefix_code(), 0);
    }

    #[test]
    fn uri_prefix_is_elided() {
        let record = UriRecord::new("https://www.shop.example/r/42").to_record();
        assert_eq!(record.payload[0], 2);
        assert_eq!(&record.payload[1..], b"shop.example/r/42");
    }

    #[test]
    fn uri_roundtrip_all_codes() {
        for uri in [
            "tel:+3512100000",
            "http://www.a.b",
            "https://www.a.b",
            "http://a.b",
            "https://a.b/c?d=e",
        ] {
            let decoded = UriRecord::from_record(&UriRecord::new(uri).to_record()).unwrap();
            assert_eq!(decoded.uri, uri);
        }
    }

    #[test]
    fn uri_unknown_code_rejected() {
        let record = Record::well_known(b"U", vec![0x05, b'x']);
        assert_eq!(
            UriRecord::from_record(&record),
            Err(RecordError::UnknownUriPrefix(5))
        );
    }

    #[test]
    fn wrong_type_rejected() {
        let record = Record::media("text/plain", b"hi".to_vec());
        assert!(TextRecord::from_record(&record).is_err());
        assert!(UriRecord::from_record(&record).is_err());
    }
}
