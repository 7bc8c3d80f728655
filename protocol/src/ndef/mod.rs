//! # Record Framing
//!
//! A self-describing, NDEF-style container. Each tap carries exactly one
//! message; a message is a chain of typed records (payment token, challenge,
//! response, text, URI, or anything else the caller wants to ship).
//!
//! This module knows nothing about tokens or challenges. Mapping media
//! types to protocol structures happens in
//! [`exchange::envelope`](crate::exchange::envelope).

pub mod message;
pub mod record;
pub mod well_known;

mod error;

pub use error::RecordError;
pub use message::{build_message, parse_message};
pub use record::{Record, TypeNameFormat};
pub use well_known::{TextRecord, UriRecord};
