// Copyright (c) 2026 TapAuth Contributors. MIT License.
// See LICENSE for details.

//! # TapAuth Protocol: Core Library
//!
//! Signed, replay-resistant payment authorization over a single NFC tap.
//! A payer's device hands the terminal a compact binary token (or answers a
//! terminal-issued challenge); the terminal checks the signature, makes sure
//! it has never seen that nonce before, and optionally checks that both
//! sides are standing in roughly the same place.
//!
//! Ed25519 over SHA-256 for signatures, X25519 + HKDF-SHA-256 for session
//! keys, ChaCha20-Poly1305 for anything that needs to stay private on the
//! wire. Nothing exotic.
//!
//! ## Architecture
//!
//! - **token**: bit-exact binary codec for payment tokens.
//! - **ndef**: NDEF-style record framing, the envelope every tap carries.
//! - **crypto**: signatures, key agreement, AEAD, and the injectable
//!   randomness behind them.
//! - **replay**: the bounded nonce window. The only shared mutable state.
//! - **exchange**: the orchestrator. Issue and verify tokens, run the
//!   challenge/response flow, map payloads to records.
//! - **clock**: injectable time source.
//! - **config**: protocol constants and tunable parameters.
//!
//! ## Quick tour
//!
//! ```
//! use tapauth_protocol::crypto::CryptoEngine;
//! use tapauth_protocol::exchange::{PaymentProtocol, TokenRequest, Verdict};
//!
//! let protocol = PaymentProtocol::with_defaults();
//! let payer = CryptoEngine::default().generate_signing_keypair();
//! let guard = protocol.replay_guard();
//!
//! let token = protocol
//!     .issue_token(&payer, &TokenRequest::new(2500, "EUR", "891f8a2820fffff").with_geo_auth())
//!     .unwrap();
//!
//! assert_eq!(
//!     protocol.verify_token(&token, &guard, Some("891f8a2820fffff"), None),
//!     Verdict::Accepted
//! );
//! // Same token again: the nonce is spent.
//! assert!(!protocol.verify_token(&token, &guard, None, None).is_accepted());
//! ```
//!
//! ## Design Philosophy
//!
//! 1. Verification outcomes are values. Errors are for malformed input.
//! 2. No globals: crypto, randomness and time are passed in.
//! 3. If it touches money, it has tests. Plural.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod exchange;
pub mod ndef;
pub mod replay;
pub mod token;

pub use exchange::{PaymentProtocol, ProtocolError, Verdict};
pub use replay::ReplayGuard;
pub use token::PaymentToken;
