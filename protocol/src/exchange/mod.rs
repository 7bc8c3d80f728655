//! # Protocol Orchestrator
//!
//! Ties the codec, record framer, crypto engine and replay guard together
//! into the two payment flows:
//!
//! - **Token flow** (`token_flow.rs`): payer issues a signed token, the
//!   terminal verifies it in one tap. Verification walks
//!   `Received → SignatureChecked → ReplayChecked → LocationChecked` and
//!   ends in a [`Verdict`].
//! - **Challenge flow** (`challenge.rs`): the terminal issues a challenge,
//!   the payer signs a response bound to its nonce and timestamp.
//!
//! `envelope.rs` maps both flows' messages onto record messages for the
//! transport.
//!
//! ## Errors vs. verdicts
//!
//! Malformed input and caller mistakes are [`ProtocolError`]s. A token or
//! response that is well formed but *wrong* (bad signature, replayed,
//! out of range) is a verdict: [`Verdict::Rejected`] or `false`. That split
//! keeps "the terminal is misconfigured" apart from "someone is cheating".

pub mod challenge;
pub mod envelope;
pub mod token_flow;
pub mod verdict;

mod error;

pub use challenge::{response_signable_bytes, Challenge, Response};
pub use envelope::{from_message_bytes, to_message_bytes, TapPayload};
pub use error::{ErrorKind, ProtocolError};
pub use token_flow::{PaymentProtocol, TokenRequest};
pub use verdict::{location_matches, RejectReason, VerificationStage, Verdict};
