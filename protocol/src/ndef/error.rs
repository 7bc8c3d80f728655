//! Error types for record framing.

use thiserror::Error;

/// Errors raised while building or parsing record messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// `build_message` was handed zero records, or `parse_message` zero bytes.
    #[error("a record message needs at least one record")]
    EmptyMessage,

    /// The buffer ended in the middle of a record.
    #[error("record truncated at offset {offset}: needed {needed} more bytes")]
    Truncated {
        /// Offset where the read started.
        offset: usize,
        /// Bytes the field required.
        needed: usize,
    },

    /// Chunked records (CF bit) are not part of this protocol.
    #[error("chunked record at offset {0} is not supported")]
    ChunkedNotSupported(usize),

    /// TNF value 7 is reserved.
    #[error("reserved type name format {0}")]
    ReservedTypeNameFormat(u8),

    /// An Empty-TNF record carried a type, ID or payload.
    #[error("empty record must have zero-length type, id and payload")]
    MalformedEmptyRecord,

    /// The first record lacks the message-begin bit.
    #[error("first record does not carry the message-begin flag")]
    MissingMessageBegin,

    /// A later record claims to begin a message.
    #[error("record {0} carries a second message-begin flag")]
    UnexpectedMessageBegin(usize),

    /// Input ran out before a record with the message-end bit.
    #[error("message ended without a message-end record")]
    MissingMessageEnd,

    /// Bytes follow the message-end record.
    #[error("{0} trailing bytes after message-end record")]
    TrailingBytes(usize),

    /// Type field longer than one length byte can describe.
    #[error("record type is {0} bytes; maximum is 255")]
    TypeTooLong(usize),

    /// ID field longer than one length byte can describe.
    #[error("record id is {0} bytes; maximum is 255")]
    IdTooLong(usize),

    /// Payload longer than four length bytes can describe.
    #[error("record payload of {0} bytes is too large")]
    PayloadTooLarge(usize),

    /// The record isn't the well-known type the caller asked for.
    #[error("expected well-known record type {expected:?}")]
    WrongRecordType {
        /// The type we were looking for.
        expected: &'static str,
    },

    /// Text record status byte claims UTF-16 text.
    #[error("UTF-16 text records are not supported")]
    Utf16NotSupported,

    /// Text record language code is empty, too long, or not ASCII.
    #[error("invalid text record language code")]
    InvalidLanguageCode,

    /// URI record prefix code outside the supported table.
    #[error("unknown URI prefix code {0:#04x}")]
    UnknownUriPrefix(u8),

    /// Text or URI bytes weren't valid UTF-8.
    #[error("record text is not valid UTF-8")]
    InvalidUtf8,
}
