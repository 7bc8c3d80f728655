//! Whole messages: an ordered, non-empty chain of records with MB on the
//! first and ME on the last. One message is what crosses a single tap.

use tracing::trace;

use super::error::RecordError;
use super::record::{Reader, Record};

/// Serialize `records` as one message.
///
/// # Errors
///
/// [`RecordError::EmptyMessage`] for an empty slice, or a field-size error
/// from an individual record.
///
/// # Example
///
/// ```
/// use tapauth_protocol::ndef::{build_message, parse_message, Record};
///
/// let bytes = build_message(&[Record::media("text/plain", b"hi".to_vec())]).unwrap();
/// assert_eq!(bytes[0] & 0xC0, 0xC0); // single record: MB and ME
/// assert_eq!(parse_message(&bytes).unwrap().len(), 1);
/// ```
pub fn build_message(records: &[Record]) -> Result<Vec<u8>, RecordError> {
    if records.is_empty() {
        return Err(RecordError::EmptyMessage);
    }
    let last = records.len() - 1;
    let mut out = Vec::new();
    for (i, record) in records.iter().enumerate() {
        record.write(&mut out, i == 0, i == last)?;
    }
    trace!(records = records.len(), bytes = out.len(), "built record message");
    Ok(out)
}

/// Parse a message back into its records.
///
/// Strict about framing: the first record must carry MB, no later record
/// may, parsing stops at the first ME, and nothing may follow it.
pub fn parse_message(bytes: &[u8]) -> Result<Vec<Record>, RecordError> {
    if bytes.is_empty() {
        return Err(RecordError::EmptyMessage);
    }

    let mut reader = Reader::new(bytes);
    let mut records = Vec::new();
    loop {
        let parsed = reader.read_record()?;
        match (records.is_empty(), parsed.begin) {
            (true, false) => return Err(RecordError::MissingMessageBegin),
            (false, true) => return Err(RecordError::UnexpectedMessageBegin(records.len())),
            _ => {}
        }
        records.push(parsed.record);

        if parsed.end {
            if reader.remaining() > 0 {
                return Err(RecordError::TrailingBytes(reader.remaining()));
            }
            return Ok(records);
        }
        if reader.remaining() == 0 {
            return Err(RecordError::MissingMessageEnd);
        }
    }
}
