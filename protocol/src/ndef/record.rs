//! A single framing record and its header byte.
//!
//! ```text
//!  bit  7    6    5    4    3    2..0
//!      MB   ME   CF   SR   IL   TNF
//! ```
//!
//! followed by `type_len(1)`, `payload_len(1 if SR else 4 BE)`,
//! `id_len(1 if IL)`, then type, id and payload bytes.

use serde::{Deserialize, Serialize};

use super::error::RecordError;

/// Message-begin bit.
pub const FLAG_MB: u8 = 0x80;
/// Message-end bit.
pub const FLAG_ME: u8 = 0x40;
/// Chunk flag. Always written as 0; rejected on parse.
pub const FLAG_CF: u8 = 0x20;
/// Short-record bit: payload length fits one byte.
pub const FLAG_SR: u8 = 0x10;
/// ID-length-present bit.
pub const FLAG_IL: u8 = 0x08;
/// Mask for the 3-bit type name format.
pub const TNF_MASK: u8 = 0x07;

/// How to interpret a record's `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeNameFormat {
    /// No type, id or payload.
    Empty = 0,
    /// RTD well-known type (`T`, `U`, ...).
    WellKnown = 1,
    /// RFC 2046 media type.
    MediaType = 2,
    /// Absolute URI as the type.
    AbsoluteUri = 3,
    /// External type (`domain:type`).
    External = 4,
    /// Payload of unknown type.
    Unknown = 5,
    /// Continuation chunk. Parsed, never produced by this crate.
    Unchanged = 6,
}

impl TypeNameFormat {
    /// Decode the low three header bits.
    pub fn from_bits(bits: u8) -> Result<Self, RecordError> {
        match bits & TNF_MASK {
            0 => Ok(Self::Empty),
            1 => Ok(Self::WellKnown),
            2 => Ok(Self::MediaType),
            3 => Ok(Self::AbsoluteUri),
            4 => Ok(Self::External),
            5 => Ok(Self::Unknown),
            6 => Ok(Self::Unchanged),
            other => Err(RecordError::ReservedTypeNameFormat(other)),
        }
    }

    /// The enum ordinal as written into the header.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// One framing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Type name format.
    pub tnf: TypeNameFormat,
    /// Type bytes; interpretation depends on `tnf`.
    pub record_type: Vec<u8>,
    /// Optional record id.
    pub id: Option<Vec<u8>>,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Record {
    /// A record with arbitrary fields.
    pub fn new(tnf: TypeNameFormat, record_type: impl Into<Vec<u8>>, payload: Vec<u8>) -> Self {
        Self {
            tnf,
            record_type: record_type.into(),
            id: None,
            payload,
        }
    }

    /// The empty record.
    pub fn empty() -> Self {
        Self::new(TypeNameFormat::Empty, Vec::new(), Vec::new())
    }

    /// A media-type record, e.g. `application/vnd.tapauth.token`.
    pub fn media(media_type: &str, payload: Vec<u8>) -> Self {
        Self::new(TypeNameFormat::MediaType, media_type.as_bytes(), payload)
    }

    /// A well-known record, e.g. `T` or `U`.
    pub fn well_known(record_type: &[u8], payload: Vec<u8>) -> Self {
        Self::new(TypeNameFormat::WellKnown, record_type, payload)
    }

    /// Attach an id.
    pub fn with_id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// `true` if this is a media-type record of exactly `media_type`.
    pub fn is_media_type(&self, media_type: &str) -> bool {
        self.tnf == TypeNameFormat::MediaType && self.record_type == media_type.as_bytes()
    }

    /// `true` if this is a well-known record of exactly `record_type`.
    pub fn is_well_known(&self, record_type: &[u8]) -> bool {
        self.tnf == TypeNameFormat::WellKnown && self.record_type == record_type
    }

    /// Whether the payload fits the one-byte short-record length.
    pub fn is_short(&self) -> bool {
        self.payload.len() <= u8::MAX as usize
    }

    /// Serialize this record, setting MB/ME as instructed.
    pub(crate) fn write(
        &self,
        out: &mut Vec<u8>,
        begin: bool,
        end: bool,
    ) -> Result<(), RecordError> {
        if self.record_type.len() > u8::MAX as usize {
            return Err(RecordError::TypeTooLong(self.record_type.len()));
        }
        if let Some(id) = &self.id {
            if id.len() > u8::MAX as usize {
                return Err(RecordError::IdTooLong(id.len()));
            }
        }
        if self.payload.len() > u32::MAX as usize {
            return Err(RecordError::PayloadTooLarge(self.payload.len()));
        }

        let mut header = self.tnf.bits();
        if begin {
            header |= FLAG_MB;
        }
        if end {
            header |= FLAG_ME;
        }
        if self.is_short() {
            header |= FLAG_SR;
        }
        if self.id.is_some() {
            header |= FLAG_IL;
        }

        out.push(header);
        out.push(self.record_type.len() as u8);
        if self.is_short() {
            out.push(self.payload.len() as u8);
        } else {
            out.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        }
        if let Some(id) = &self.id {
            out.push(id.len() as u8);
        }
        out.extend_from_slice(&self.record_type);
        if let Some(id) = &self.id {
            out.extend_from_slice(id);
        }
        out.extend_from_slice(&self.payload);
        Ok(())
    }
}

/// A record as it came off the wire, with its MB/ME bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedRecord {
    pub record: Record,
    pub begin: bool,
    pub end: bool,
}

/// Cursor over a message buffer.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], RecordError> {
        if self.remaining() < n {
            return Err(RecordError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, RecordError> {
        Ok(self.take(1)?[0])
    }

    /// Read one record.
    pub fn read_record(&mut self) -> Result<ParsedRecord, RecordError> {
        let start = self.pos;
        let header = self.byte()?;
        if header & FLAG_CF != 0 {
            return Err(RecordError::ChunkedNotSupported(start));
        }
        let tnf = TypeNameFormat::from_bits(header)?;

        let type_len = self.byte()? as usize;
        let payload_len = if header & FLAG_SR != 0 {
            self.byte()? as usize
        } else {
            let raw = self.take(4)?;
            u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        };
        let id_len = if header & FLAG_IL != 0 {
            Some(self.byte()? as usize)
        } else {
            None
        };

        let record_type = self.take(type_len)?.to_vec();
        let id = match id_len {
            Some(n) => Some(self.take(n)?.to_vec()),
            None => None,
        };
        let payload = self.take(payload_len)?.to_vec();

        let has_id = id.as_ref().is_some_and(|i| !i.is_empty());
        if tnf == TypeNameFormat::Empty
            && (!record_type.is_empty() || !payload.is_empty() || has_id)
        {
            return Err(RecordError::MalformedEmptyRecord);
        }

        Ok(ParsedRecord {
            record: Record {
                tnf,
                record_type,
                id,
                payload,
            },
            begin: header & FLAG_MB != 0,
            end: header & FLAG_ME != 0,
        })
    }
}
