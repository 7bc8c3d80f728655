//! # Cryptographic Primitives for TapAuth
//!
//! Every signature, session key and encrypted payload in the protocol flows
//! through here. The choices are boring on purpose:
//!
//! - **Ed25519** over a **SHA-256** digest for token and response signatures.
//! - **X25519** + **HKDF-SHA-256** for session keys.
//! - **ChaCha20-Poly1305** for payloads and breadcrumbs.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, length-checked wrapper around
//! audited RustCrypto / dalek implementations. The only protocol-specific
//! twist is the digest-then-sign rule, and that exists for interoperability.
//!
//! All functions are pure; randomness comes from an injected
//! [`RandomSource`] held by [`CryptoEngine`].

pub mod agreement;
pub mod encryption;
pub mod engine;
pub mod hash;
pub mod keys;
pub mod random;
pub mod signatures;

mod error;

pub use agreement::{derive_session_key, AgreementKeypair};
pub use encryption::{decrypt, encrypt, SealedBox};
pub use engine::CryptoEngine;
pub use error::CryptoError;
pub use hash::sha256;
pub use keys::SigningKeypair;
pub use random::{OsRandom, RandomSource, SeededRandom};
pub use signatures::{sign, verify, verify_slices};
